//! `/api/auth` handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use hearth_auth::{ChangePasswordInput, LoginOutput, RegisterInput, TokenPair};
use hearth_core::models::account::AccountView;
use hearth_core::models::role::Role;
use serde::{Deserialize, Serialize};

use super::Ack;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, CurrentAccount, MaybeAccount};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Reset with the token carried in the body, which keeps it out of access logs.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    pub raw_token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBody {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenBody {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub account: AccountView,
    #[serde(flatten)]
    pub tokens: TokenBody,
}

impl From<LoginOutput> for SessionResponse {
    fn from(output: LoginOutput) -> Self {
        Self {
            success: true,
            account: output.account.view(),
            tokens: output.tokens.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    #[serde(flatten)]
    pub tokens: TokenBody,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub account: AccountView,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub success: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let output = state
        .auth
        .register(RegisterInput {
            email: body.email,
            password: body.password,
            name: body.name,
            phone: body.phone,
            role: body.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(output.into())))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let output = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(output.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let tokens = state.auth.refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse {
        success: true,
        tokens: tokens.into(),
    }))
}

/// Ends the caller's session. A `refreshToken` body may be sent but is not
/// needed: the authenticated account identifies the session.
pub async fn logout(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
) -> Result<Json<Ack>, ApiError> {
    state.auth.logout(identity.id).await?;
    Ok(Json(Ack::new("Logged out")))
}

pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth.verify_email(&token).await?;
    Ok(Json(AccountResponse {
        success: true,
        account: account.view(),
    }))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
) -> Result<Json<Ack>, ApiError> {
    let sent = state.auth.resend_verification(identity.id).await?;
    Ok(Json(Ack::new(if sent {
        "Verification email sent"
    } else {
        "Email already verified"
    })))
}

/// Answers identically whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Ack>, ApiError> {
    state.auth.forgot_password(&body.email).await?;
    Ok(Json(Ack::new(
        "If that address is registered, a reset link has been sent",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Ack>, ApiError> {
    reset(&state, &token, &body.new_password).await
}

pub async fn reset_password_with_body(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordBody>,
) -> Result<Json<Ack>, ApiError> {
    reset(&state, &body.raw_token, &body.new_password).await
}

async fn reset(state: &AppState, token: &str, new_password: &str) -> Result<Json<Ack>, ApiError> {
    state.auth.reset_password(token, new_password).await?;
    Ok(Json(Ack::new("Password has been reset, please log in")))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth.account(identity.id).await?;
    Ok(Json(AccountResponse {
        success: true,
        account: account.view(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let tokens = state
        .auth
        .change_password(
            identity.id,
            ChangePasswordInput {
                current_password: body.current_password,
                new_password: body.new_password,
            },
        )
        .await?;
    Ok(Json(TokenResponse {
        success: true,
        tokens: tokens.into(),
    }))
}

pub async fn session(
    State(state): State<AppState>,
    MaybeAccount(identity): MaybeAccount,
) -> Result<Json<SessionStatus>, ApiError> {
    let account = match identity {
        Some(identity) => Some(state.auth.account(identity.id).await?.view()),
        None => None,
    };
    Ok(Json(SessionStatus {
        success: true,
        authenticated: account.is_some(),
        account,
    }))
}
