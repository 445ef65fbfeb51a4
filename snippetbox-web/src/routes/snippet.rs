//! Snippet pages

use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use snippetbox_core::validator::{max_chars, not_blank, permitted_value};
use snippetbox_core::{ModelError, SnippetId, Validator};

use super::{new_template_data, render, FLASH_KEY};
use crate::error::AppError;
use crate::forms::DecodedForm;
use crate::middleware::AuthStatus;
use crate::session::Session;
use crate::state::AppState;
use crate::store::{SessionStore, SnippetStore, UserStore};
use crate::templates::FormData;

const BLANK: &str = "This field cannot be blank";
const MAX_TITLE_LENGTH: usize = 100;
const PERMITTED_EXPIRES: [i64; 3] = [1, 7, 365];

/// GET /
pub async fn home<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let snippets = state.snippets.latest()?;

    let mut data = new_template_data(&session, &auth);
    data.snippets = snippets;
    render(state.templates.as_ref(), StatusCode::OK, "home", &data)
}

/// GET /snippet/view/:id
///
/// Any id that isn't a known positive integer is a 404, so malformed and
/// unknown ids are indistinguishable.
pub async fn snippet_view<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let id = raw_id
        .ok()
        .and_then(|Path(raw)| SnippetId::parse(&raw))
        .ok_or(AppError::NotFound)?;

    let snippet = match state.snippets.get(id) {
        Ok(snippet) => snippet,
        Err(ModelError::NoRecord) => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let mut data = new_template_data(&session, &auth);
    data.snippet = Some(snippet);
    render(state.templates.as_ref(), StatusCode::OK, "view", &data)
}

/// GET /snippet/create
pub async fn snippet_create<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let mut data = new_template_data(&session, &auth);
    data.form = FormData::default().with_value("expires", "365");
    render(state.templates.as_ref(), StatusCode::OK, "create", &data)
}

#[derive(Debug, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: i64,
}

/// POST /snippet/create
pub async fn snippet_create_post<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
    DecodedForm(form): DecodedForm<SnippetCreateForm>,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let mut validator = Validator::default();
    validator.check_field(not_blank(&form.title), "title", BLANK);
    validator.check_field(
        max_chars(&form.title, MAX_TITLE_LENGTH),
        "title",
        "This field cannot be more than 100 characters long",
    );
    validator.check_field(not_blank(&form.content), "content", BLANK);
    validator.check_field(
        permitted_value(&form.expires, &PERMITTED_EXPIRES),
        "expires",
        "This field must equal 1, 7 or 365",
    );

    if !validator.valid() {
        let mut data = new_template_data(&session, &auth);
        data.form = FormData {
            validator,
            ..Default::default()
        }
        .with_value("title", form.title)
        .with_value("content", form.content)
        .with_value("expires", form.expires.to_string());
        return render(
            state.templates.as_ref(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "create",
            &data,
        );
    }

    let id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)?;
    tracing::info!(snippet_id = id.0, "Snippet created");

    session.put(FLASH_KEY, "Snippet successfully created!");
    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
