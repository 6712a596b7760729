//! Request gates: authentication, role and ownership checks.
//!
//! Gates run as `axum::middleware::from_fn` layers and communicate through
//! request extensions: authentication inserts an [`Identity`], later gates
//! and handlers read it back.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hearth_auth::error::AuthError;
use hearth_auth::{Identity, OwnedResource};
use hearth_core::error::HearthError;
use hearth_core::models::role::Role;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Staff roles allowed on the admin surface.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::MissingToken)?;
    let account_id = state
        .auth
        .tokens()
        .verify_access(token)
        .map_err(|err| match err {
            AuthError::TokenExpired => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        })?;
    Ok(state.auth.load_identity(account_id).await?)
}

/// Rejects the request unless it carries a valid access token for an
/// active account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Attaches an identity when one can be established. Never rejects.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
        }
        Err(err) => {
            debug!(code = err.error_code(), "Continuing without identity");
        }
    }
    next.run(req).await
}

/// Rejects callers whose role is not in `allowed`. Must run after
/// [`require_auth`].
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(ApiError::MissingToken)?;
    identity.require_role(allowed)?;
    Ok(next.run(req).await)
}

/// Rejects callers that neither own the loaded `R` nor are admins.
///
/// Expects [`require_auth`] and a loader that inserts `R` into the request
/// extensions to have run first.
pub async fn require_owner_or_admin<R>(req: Request, next: Next) -> Result<Response, ApiError>
where
    R: OwnedResource + Clone + Send + Sync + 'static,
{
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(ApiError::MissingToken)?;
    let resource = req.extensions().get::<R>().ok_or_else(|| {
        HearthError::Internal(format!(
            "ownership gate for {} ran before its loader",
            std::any::type_name::<R>()
        ))
    })?;
    identity.require_owner_or_admin(resource)?;
    Ok(next.run(req).await)
}
