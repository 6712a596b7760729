//! Route table.

pub mod admin;
pub mod auth;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post, put};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::middleware::{ADMIN_ONLY, optional_auth, require_auth, require_roles};
use crate::state::AppState;

/// Bare acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: &'static str,
}

impl Ack {
    pub fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password_with_body))
        .route("/reset-password/{token}", post(auth::reset_password));

    let authenticated = Router::new()
        .route("/logout", post(auth::logout))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let session = Router::new()
        .route("/session", get(auth::session))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let admin = Router::new()
        .route("/accounts/{id}/status", patch(admin::set_status))
        .route("/accounts/{id}/role", patch(admin::set_role))
        .route("/accounts/{id}", delete(admin::delete_account))
        .route_layer(from_fn_with_state(ADMIN_ONLY, require_roles))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/auth", public.merge(authenticated).merge(session))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
