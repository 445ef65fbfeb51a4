//! HTTP routes

mod ping;
mod snippet;
mod user;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Utc};
use tower_cookies::CookieManagerLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{panic_response, AppError};
use crate::middleware::{authenticate, require_authentication, secure_headers, AuthStatus};
use crate::session::{load_and_save, Session};
use crate::state::AppState;
use crate::store::{SessionStore, SnippetStore, UserStore};
use crate::templates::{TemplateData, Templates};
use crate::{csrf, csrf::verify_csrf};

/// Session key for one-time status messages
pub const FLASH_KEY: &str = "flash";

/// Create the router with all routes
pub fn create_router<N, U, S>(state: Arc<AppState<N, U, S>>) -> Router
where
    N: SnippetStore + 'static,
    U: UserStore + 'static,
    S: SessionStore + 'static,
{
    create_router_with_static_path(state, "static")
}

/// Create the router with a custom static file path
pub fn create_router_with_static_path<N, U, S>(
    state: Arc<AppState<N, U, S>>,
    static_path: &str,
) -> Router
where
    N: SnippetStore + 'static,
    U: UserStore + 'static,
    S: SessionStore + 'static,
{
    // Only reachable with a logged-in user
    let protected = Router::new()
        .route(
            "/snippet/create",
            get(snippet::snippet_create::<N, U, S>).post(snippet::snippet_create_post::<N, U, S>),
        )
        .route("/user/logout", post(user::logout))
        .route_layer(from_fn(require_authentication));

    // Everything that needs a session; the last layer added runs first
    let dynamic = Router::new()
        .route("/", get(snippet::home::<N, U, S>))
        .route("/snippet/view/:id", get(snippet::snippet_view::<N, U, S>))
        .route(
            "/user/signup",
            get(user::signup::<N, U, S>).post(user::signup_post::<N, U, S>),
        )
        .route(
            "/user/login",
            get(user::login::<N, U, S>).post(user::login_post::<N, U, S>),
        )
        .merge(protected)
        .route_layer(from_fn_with_state(state.clone(), authenticate::<N, U, S>))
        .route_layer(from_fn(verify_csrf))
        .route_layer(from_fn_with_state(state.clone(), load_and_save::<N, U, S>))
        .route_layer(CookieManagerLayer::new());

    let app = Router::new()
        .route("/ping", get(ping::ping))
        .nest_service("/static", ServeDir::new(static_path))
        .merge(dynamic)
        .fallback(not_found);

    with_global_layers(app).with_state(state)
}

/// Layers every response goes through, fallback included
pub fn with_global_layers<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(secure_headers))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Data every page needs
pub(crate) fn new_template_data(session: &Session, auth: &AuthStatus) -> TemplateData {
    TemplateData {
        current_year: Utc::now().year(),
        flash: session.pop_string(FLASH_KEY),
        is_authenticated: auth.is_authenticated(),
        csrf_token: csrf::token(session),
        ..Default::default()
    }
}

/// Render a page into a complete response.
///
/// The page is rendered fully before anything is sent, so a template error
/// becomes a clean 500.
pub(crate) fn render(
    templates: &dyn Templates,
    status: StatusCode,
    page: &str,
    data: &TemplateData,
) -> Result<Response, AppError> {
    let body = templates.render(page, data)?;
    Ok((status, Html(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_panic_becomes_500_with_headers() {
        let app = with_global_layers(Router::new().route("/boom", get(boom)));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["connection"], "close");
        assert_eq!(response.headers()["x-frame-options"], "deny");
    }
}
