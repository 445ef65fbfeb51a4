//! Form decoding

use axum::async_trait;
use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequest, Request};
use axum::Form;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Form` that answers malformed bodies with 400 instead of axum's 422,
/// which is reserved for submissions that decode but fail validation
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for DecodedForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(DecodedForm(value))
    }
}
