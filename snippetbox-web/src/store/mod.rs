//! Storage abstractions for snippets, users and sessions

pub mod memory;
pub mod models;
pub mod sqlite;

use std::sync::Arc;

pub use memory::{InMemorySessionStore, InMemorySnippetStore, InMemoryUserStore};
pub use models::*;
pub use sqlite::SqliteStore;

use snippetbox_core::{Snippet, SnippetId, UserId};

/// Result type for store operations
pub type StoreResult<T> = snippetbox_core::Result<T>;

/// Number of snippets shown on the home page
pub const LATEST_LIMIT: usize = 10;

/// Trait for snippet storage
pub trait SnippetStore: Send + Sync {
    /// Store a new snippet that expires `expires_days` from now
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> StoreResult<SnippetId>;

    /// Get an unexpired snippet by ID, `ModelError::NoRecord` otherwise
    fn get(&self, id: SnippetId) -> StoreResult<Snippet>;

    /// The most recently created unexpired snippets, newest first
    fn latest(&self) -> StoreResult<Vec<Snippet>>;
}

/// Trait for user account storage
pub trait UserStore: Send + Sync {
    /// Create an account, `ModelError::DuplicateEmail` if the email is taken
    fn insert(&self, name: &str, email: &str, password: &str) -> StoreResult<UserId>;

    /// Check credentials, `ModelError::InvalidCredentials` on any mismatch
    fn authenticate(&self, email: &str, password: &str) -> StoreResult<UserId>;

    /// Whether an account with this ID exists
    fn exists(&self, id: UserId) -> StoreResult<bool>;
}

/// Trait for session record storage
pub trait SessionStore: Send + Sync {
    /// Get a session record by token, expired or not
    fn find(&self, token: &SessionToken) -> StoreResult<Option<SessionRecord>>;

    /// Insert or replace a session record
    fn commit(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Delete a session record
    fn delete(&self, token: &SessionToken) -> StoreResult<()>;

    /// Delete every expired record, returning how many were removed
    fn delete_expired(&self) -> StoreResult<u64>;
}

// Shared handles, so a single backend can serve several roles
impl<T: SnippetStore + ?Sized> SnippetStore for Arc<T> {
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> StoreResult<SnippetId> {
        (**self).insert(title, content, expires_days)
    }

    fn get(&self, id: SnippetId) -> StoreResult<Snippet> {
        (**self).get(id)
    }

    fn latest(&self) -> StoreResult<Vec<Snippet>> {
        (**self).latest()
    }
}

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn insert(&self, name: &str, email: &str, password: &str) -> StoreResult<UserId> {
        (**self).insert(name, email, password)
    }

    fn authenticate(&self, email: &str, password: &str) -> StoreResult<UserId> {
        (**self).authenticate(email, password)
    }

    fn exists(&self, id: UserId) -> StoreResult<bool> {
        (**self).exists(id)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn find(&self, token: &SessionToken) -> StoreResult<Option<SessionRecord>> {
        (**self).find(token)
    }

    fn commit(&self, record: &SessionRecord) -> StoreResult<()> {
        (**self).commit(record)
    }

    fn delete(&self, token: &SessionToken) -> StoreResult<()> {
        (**self).delete(token)
    }

    fn delete_expired(&self) -> StoreResult<u64> {
        (**self).delete_expired()
    }
}
