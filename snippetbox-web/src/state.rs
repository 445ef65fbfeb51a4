//! Shared application state

use crate::session::SessionManager;
use crate::store::{SessionStore, SnippetStore, UserStore};
use crate::templates::Templates;

/// Application state shared by every request
pub struct AppState<N, U, S> {
    pub snippets: N,
    pub users: U,
    pub sessions: SessionManager<S>,
    pub templates: Box<dyn Templates>,
}

impl<N, U, S> AppState<N, U, S>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    pub fn new(
        snippets: N,
        users: U,
        sessions: SessionManager<S>,
        templates: impl Templates + 'static,
    ) -> Self {
        Self {
            snippets,
            users,
            sessions,
            templates: Box::new(templates),
        }
    }
}
