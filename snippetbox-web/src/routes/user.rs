//! Account pages: signup, login, logout

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use snippetbox_core::validator::{matches, min_chars, not_blank, EMAIL_RX};
use snippetbox_core::{ModelError, Validator};

use super::{new_template_data, render, FLASH_KEY};
use crate::error::AppError;
use crate::forms::DecodedForm;
use crate::middleware::{AuthStatus, AUTHENTICATED_USER_KEY};
use crate::session::Session;
use crate::state::AppState;
use crate::store::{SessionStore, SnippetStore, UserStore};
use crate::templates::FormData;

const BLANK: &str = "This field cannot be blank";
const INVALID_EMAIL: &str = "This field must be a valid email address";

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// GET /user/signup
pub async fn signup<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let data = new_template_data(&session, &auth);
    render(state.templates.as_ref(), StatusCode::OK, "signup", &data)
}

/// Re-render the signup form with errors. The password is never echoed back.
fn signup_rejected<N, U, S>(
    state: &AppState<N, U, S>,
    session: &Session,
    auth: &AuthStatus,
    form: SignupForm,
    validator: Validator,
) -> Result<Response, AppError> {
    let mut data = new_template_data(session, auth);
    data.form = FormData {
        validator,
        ..Default::default()
    }
    .with_value("name", form.name)
    .with_value("email", form.email);
    render(
        state.templates.as_ref(),
        StatusCode::UNPROCESSABLE_ENTITY,
        "signup",
        &data,
    )
}

/// POST /user/signup
pub async fn signup_post<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
    DecodedForm(form): DecodedForm<SignupForm>,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let mut validator = Validator::default();
    validator.check_field(not_blank(&form.name), "name", BLANK);
    validator.check_field(not_blank(&form.email), "email", BLANK);
    validator.check_field(matches(&form.email, &EMAIL_RX), "email", INVALID_EMAIL);
    validator.check_field(not_blank(&form.password), "password", BLANK);
    validator.check_field(
        min_chars(&form.password, MIN_PASSWORD_LENGTH),
        "password",
        "This field must be at least 8 characters long",
    );

    if !validator.valid() {
        return signup_rejected(&state, &session, &auth, form, validator);
    }

    match state.users.insert(&form.name, &form.email, &form.password) {
        Ok(id) => tracing::info!(user_id = id.0, "User signed up"),
        Err(ModelError::DuplicateEmail) => {
            validator.add_field_error("email", "Email address is already in use");
            return signup_rejected(&state, &session, &auth, form, validator);
        }
        Err(e) => return Err(e.into()),
    }

    session.put(FLASH_KEY, "Your signup was successful. Please log in.");
    Ok(Redirect::to("/user/login").into_response())
}

/// GET /user/login
pub async fn login<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let data = new_template_data(&session, &auth);
    render(state.templates.as_ref(), StatusCode::OK, "login", &data)
}

/// POST /user/login
pub async fn login_post<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    session: Session,
    auth: AuthStatus,
    DecodedForm(form): DecodedForm<LoginForm>,
) -> Result<Response, AppError>
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let mut validator = Validator::default();
    validator.check_field(not_blank(&form.email), "email", BLANK);
    validator.check_field(matches(&form.email, &EMAIL_RX), "email", INVALID_EMAIL);
    validator.check_field(not_blank(&form.password), "password", BLANK);

    let user_id = if validator.valid() {
        match state.users.authenticate(&form.email, &form.password) {
            Ok(id) => Some(id),
            Err(ModelError::InvalidCredentials) => {
                validator.add_non_field_error("Email or password is incorrect");
                None
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    let Some(user_id) = user_id else {
        let mut data = new_template_data(&session, &auth);
        data.form = FormData {
            validator,
            ..Default::default()
        }
        .with_value("email", form.email);
        return render(
            state.templates.as_ref(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "login",
            &data,
        );
    };

    session.renew_token();
    session.put(AUTHENTICATED_USER_KEY, user_id.0);
    tracing::info!(user_id = user_id.0, "User logged in");

    Ok(Redirect::to("/snippet/create").into_response())
}

/// POST /user/logout
pub async fn logout(session: Session) -> Redirect {
    session.renew_token();
    session.remove(AUTHENTICATED_USER_KEY);
    session.put(FLASH_KEY, "You've been logged out successfully!");

    Redirect::to("/")
}
