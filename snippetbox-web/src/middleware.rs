//! Cross-cutting request middleware

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use snippetbox_core::UserId;

use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;
use crate::store::{SessionStore, SnippetStore, UserStore};

/// Session key holding the logged-in user's ID
pub const AUTHENTICATED_USER_KEY: &str = "authenticated_user_id";

/// Headers stamped on every response
pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

/// Middleware: add the fixed security headers. Status and body are untouched.
pub async fn secure_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}

/// Who is making the request, derived from the session on every request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthStatus {
    pub user_id: Option<UserId>,
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthStatus
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthStatus>()
            .copied()
            .unwrap_or_default())
    }
}

/// Middleware: resolve the session's user into an [`AuthStatus`].
///
/// A user ID is only trusted if the account still exists.
pub async fn authenticate<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let user_id = request
        .extensions()
        .get::<Session>()
        .and_then(|session| session.get_i64(AUTHENTICATED_USER_KEY))
        .map(UserId);

    let mut status = AuthStatus::default();
    if let Some(id) = user_id {
        match state.users.exists(id) {
            Ok(true) => status.user_id = Some(id),
            Ok(false) => tracing::debug!(user_id = id.0, "Session refers to unknown user"),
            Err(e) => return AppError::from(e).into_response(),
        }
    }

    request.extensions_mut().insert(status);
    next.run(request).await
}

/// Middleware: send anonymous users to the login page and keep protected
/// pages out of shared caches.
pub async fn require_authentication(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<AuthStatus>()
        .is_some_and(AuthStatus::is_authenticated);

    if !authenticated {
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
