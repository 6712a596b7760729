//! Hearth Core: domain models, repository traits and the shared error
//! taxonomy for credential and session management.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{HearthError, HearthResult};
