//! Snippetbox web application
//!
//! A server-rendered site for sharing short text snippets, with user
//! accounts, server-side sessions and CSRF-protected forms.

pub mod config;
pub mod crypto;
pub mod csrf;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod templates;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use session::{Session, SessionManager};
pub use state::AppState;
pub use store::{
    InMemorySessionStore, InMemorySnippetStore, InMemoryUserStore, SessionStore, SnippetStore,
    SqliteStore, StoreResult, UserStore,
};
pub use templates::{TemplateCache, TemplateData, TemplateError, Templates};
