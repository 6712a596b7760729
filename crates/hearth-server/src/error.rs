//! HTTP error type and its JSON rendering.
//!
//! Every failure leaves as `{success:false, message, code}`. Internal
//! failures are logged under a correlation id and answered generically.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hearth_core::error::HearthError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] HearthError),

    #[error("Authentication required")]
    MissingToken,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Access token is invalid")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::TokenExpired | ApiError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                HearthError::NotFound { .. } => StatusCode::NOT_FOUND,
                HearthError::AlreadyExists { .. } | HearthError::DuplicateAccount => {
                    StatusCode::CONFLICT
                }
                HearthError::InvalidCredentials
                | HearthError::AccountInactive
                | HearthError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
                HearthError::Forbidden { .. } => StatusCode::FORBIDDEN,
                HearthError::Validation { .. } => StatusCode::BAD_REQUEST,
                HearthError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                HearthError::Database(_) | HearthError::Crypto(_) | HearthError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingToken => "MissingToken",
            ApiError::TokenExpired => "TokenExpired",
            ApiError::InvalidToken => "InvalidToken",
            ApiError::BadRequest(_) => "ValidationError",
            ApiError::Domain(err) => err.code(),
        }
    }

    /// Message safe to show a caller.
    fn public_message(&self) -> String {
        match self {
            ApiError::Domain(HearthError::Forbidden { .. }) => {
                "You do not have permission to perform this action".into()
            }
            ApiError::Domain(HearthError::ServiceUnavailable(_)) => {
                "Service temporarily unavailable, please retry".into()
            }
            ApiError::Domain(
                HearthError::Database(_) | HearthError::Crypto(_) | HearthError::Internal(_),
            ) => "An internal server error occurred".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.public_message();

        let body = if status.is_server_error() {
            let correlation_id = Uuid::new_v4();
            error!(correlation_id = %correlation_id, error = %self, "Request failed");
            json!({
                "success": false,
                "message": message,
                "code": code,
                "correlationId": correlation_id,
            })
        } else {
            json!({
                "success": false,
                "message": message,
                "code": code,
            })
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ApiError::MissingToken, StatusCode::UNAUTHORIZED, "MissingToken"),
            (ApiError::TokenExpired, StatusCode::UNAUTHORIZED, "TokenExpired"),
            (ApiError::InvalidToken, StatusCode::UNAUTHORIZED, "InvalidToken"),
            (
                HearthError::DuplicateAccount.into(),
                StatusCode::CONFLICT,
                "DuplicateAccount",
            ),
            (
                HearthError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
                "InvalidCredentials",
            ),
            (
                HearthError::forbidden("nope").into(),
                StatusCode::FORBIDDEN,
                "Forbidden",
            ),
            (
                HearthError::ServiceUnavailable("store".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailable",
            ),
            (
                HearthError::Database("boom".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{err:?}");
            assert_eq!(err.error_code(), code, "{err:?}");
        }
    }

    #[tokio::test]
    async fn internal_detail_does_not_leak() {
        let response =
            ApiError::from(HearthError::Database("secret table exploded".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "InternalError");
        assert!(body["correlationId"].is_string());
        assert!(!body.to_string().contains("exploded"));
    }
}
