//! Error types returned by storage collaborators

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No matching record found")]
    NoRecord,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Duplicate email")]
    DuplicateEmail,

    #[error("Storage error: {0}")]
    Storage(String),
}
