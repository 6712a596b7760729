//! `/api/admin` handlers. Mounted behind the admin role gate.

use axum::Json;
use axum::extract::State;
use hearth_core::models::role::Role;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::Ack;
use super::auth::AccountResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, CurrentAccount};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_status(
    State(state): State<AppState>,
    CurrentAccount(admin): CurrentAccount,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth.set_active(id, body.is_active).await?;
    info!(admin_id = %admin.id, account_id = %id, is_active = body.is_active, "Account status changed");
    Ok(Json(AccountResponse {
        success: true,
        account: account.view(),
    }))
}

pub async fn set_role(
    State(state): State<AppState>,
    CurrentAccount(admin): CurrentAccount,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth.set_role(id, body.role).await?;
    info!(admin_id = %admin.id, account_id = %id, role = %body.role, "Account role changed");
    Ok(Json(AccountResponse {
        success: true,
        account: account.view(),
    }))
}

pub async fn delete_account(
    State(state): State<AppState>,
    CurrentAccount(admin): CurrentAccount,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Ack>, ApiError> {
    state.auth.delete_account(id).await?;
    info!(admin_id = %admin.id, account_id = %id, "Account deleted");
    Ok(Json(Ack::new("Account deleted")))
}
