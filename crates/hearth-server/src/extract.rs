//! Extractors that keep rejections in the JSON error shape.

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use hearth_auth::Identity;

use crate::error::ApiError;

/// `axum::Json` with rejections rendered as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with rejections rendered as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// The identity attached by the authentication gate.
pub struct CurrentAccount(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentAccount)
            .ok_or(ApiError::MissingToken)
    }
}

/// The identity attached by the optional gate, if any.
pub struct MaybeAccount(pub Option<Identity>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAccount {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAccount(parts.extensions.get::<Identity>().cloned()))
    }
}
