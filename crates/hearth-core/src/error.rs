//! Error types shared by every hearth crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HearthError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("An account with these details cannot be created")]
    DuplicateAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HearthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code placed in every error payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::DuplicateAccount => "DuplicateAccount",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::AccountInactive => "AccountInactive",
            Self::InvalidOrExpiredToken => "InvalidOrExpiredToken",
            Self::Forbidden { .. } => "Forbidden",
            Self::Validation { .. } => "ValidationError",
            Self::ServiceUnavailable(_) => "ServiceUnavailable",
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => "InternalError",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

pub type HearthResult<T> = Result<T, HearthError>;
