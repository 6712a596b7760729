//! Authentication error types.

use hearth_core::error::HearthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("invalid auth configuration: {0}")]
    Config(String),
}

impl From<AuthError> for HearthError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                HearthError::InvalidOrExpiredToken
            }
            AuthError::Crypto(msg) => HearthError::Crypto(msg),
            AuthError::Timeout(what) => HearthError::ServiceUnavailable(format!("{what} timed out")),
            AuthError::Config(msg) => HearthError::Internal(msg),
        }
    }
}
