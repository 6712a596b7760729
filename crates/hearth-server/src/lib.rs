//! Hearth Server: axum routes, request gates and wiring for the
//! credential and session service.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
