//! CSRF protection
//!
//! Every session carries a random secret generated when the session is
//! created. The token embedded in forms is derived from that secret, so it
//! stays valid for repeated submissions until the session is destroyed or
//! expires, and is useless against any other session.

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::crypto::constant_time_eq;
use crate::error::AppError;
use crate::session::Session;

/// Name of the hidden form field carrying the token
pub const CSRF_FIELD: &str = "csrf_token";

/// Largest form body buffered for token extraction
pub const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Token to embed in forms rendered for this session
pub fn token(session: &Session) -> String {
    session.issue_csrf_secret()
}

/// Check a submitted token against the session
pub fn verify(session: &Session, submitted: &str) -> bool {
    // A session that was never saved has never handed out a token
    if session.is_new() {
        return false;
    }
    constant_time_eq(session.csrf_secret().as_bytes(), submitted.as_bytes())
}

/// Middleware: reject state-changing requests without a matching token.
///
/// Must run inside the session layer. Safe methods pass through untouched.
pub async fn verify_csrf(request: Request, next: Next) -> Response {
    if request.method().is_safe() {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return AppError::Internal("CSRF check ran without a session".to_string()).into_response();
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::BadRequest(e.to_string()).into_response(),
    };

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned());

    match submitted {
        Some(token) if verify(&session, &token) => {}
        _ => {
            tracing::warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                "CSRF token missing or invalid"
            );
            return AppError::InvalidCsrf.into_response();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
