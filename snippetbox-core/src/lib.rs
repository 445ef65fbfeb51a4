//! Snippetbox Core Library
//!
//! Domain types shared by the Snippetbox web application:
//! - Snippets and users as returned by the storage layer
//! - Typed storage errors (missing record, duplicate email, bad credentials)
//! - Field-level form validation

pub mod error;
pub mod models;
pub mod validator;

pub use error::ModelError;
pub use models::{Snippet, SnippetId, User, UserId};
pub use validator::Validator;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, ModelError>;
