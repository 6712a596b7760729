//! Account domain model, the Credential Store's unit.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Public profile fields supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Digest and expiry of an outstanding one-time token.
///
/// Kept as a single value so the two halves are always set or cleared
/// together.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingToken {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for PendingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingToken")
            .field("digest", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A stored account, secrets included.
///
/// Deliberately not `Serialize`: responses go through [`AccountView`].
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    /// Lower-cased, trimmed email; unique across accounts.
    pub email: String,
    /// `None` only for accounts linked to an external identity.
    pub password_hash: Option<String>,
    pub federated_id: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    /// SHA-256 digest of the single active refresh token.
    pub refresh_token_digest: Option<String>,
    pub email_verification: Option<PendingToken>,
    pub password_reset: Option<PendingToken>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn has_active_session(&self) -> bool {
        self.refresh_token_digest.is_some()
    }

    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("is_verified", &self.is_verified)
            .field("has_active_session", &self.has_active_session())
            .field("last_login_at", &self.last_login_at)
            .finish_non_exhaustive()
    }
}

/// Input for creating an account.
#[derive(Clone)]
pub struct CreateAccount {
    pub email: String,
    /// Already-hashed password. Required unless `federated_id` is set.
    pub password_hash: Option<String>,
    pub federated_id: Option<String>,
    pub role: Role,
    pub profile: Profile,
    /// Verification pair set atomically with the new record.
    pub email_verification: Option<PendingToken>,
}

/// Secret-free projection of an [`Account`], safe for any response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            is_active: account.is_active,
            is_verified: account.is_verified,
            name: account.profile.name.clone(),
            phone: account.profile.phone.clone(),
            avatar_url: account.profile.avatar_url.clone(),
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
