//! Application error types

use axum::http::header::CONNECTION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snippetbox_core::ModelError;
use thiserror::Error;

use crate::templates::TemplateError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid CSRF token")]
    InvalidCsrf,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::Model(ModelError::NoRecord) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidCsrf => StatusCode::BAD_REQUEST,
            AppError::Model(_) | AppError::Template(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Server error");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error");
        }

        // Only the canonical status text reaches the client
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

/// Response for a handler that panicked
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONNECTION, "close")],
        "Internal Server Error",
    )
        .into_response()
}
