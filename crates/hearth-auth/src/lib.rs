//! Hearth Auth: password hashing, JWT issuance/validation, one-time
//! email tokens, authorization predicates and the session rotation
//! service.

pub mod authz;
pub mod config;
pub mod error;
pub mod notify;
pub mod one_time;
pub mod password;
pub mod service;
pub mod token;

pub use authz::{Identity, OwnedResource};
pub use config::{AuthConfig, HashCost, PasswordPolicy};
pub use error::AuthError;
pub use notify::{Notifier, NotifyError};
pub use service::{AuthService, ChangePasswordInput, LoginOutput, RegisterInput};
pub use token::{TokenIssuer, TokenPair};
