//! Hearth Database: SurrealDB connection management, schema migrations
//! and the Credential Store implementation.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The account repository ([`SurrealAccountRepository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::SurrealAccountRepository;
pub use schema::{run_migrations, schema_v1};
