//! Authentication configuration.

use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::AuthError;

/// Longest lifetime accepted for any token: ten years.
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Upper bound in bytes, keeps hashing cost bounded.
    pub max_length: usize,
    pub require_letter: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: true,
            require_digit: true,
        }
    }
}

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// JWT audience (`aud` claim).
    pub jwt_audience: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Email verification token lifetime (default: 86_400 = 24 hours).
    pub email_verification_lifetime_secs: u64,
    /// Password reset token lifetime (default: 600 = 10 minutes).
    pub password_reset_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before hashing.
    pub pepper: Option<String>,
    pub hash_cost: HashCost,
    pub password_policy: PasswordPolicy,
    /// Upper bound for CPU-bound work moved off the request path.
    pub blocking_timeout_ms: u64,
    /// Upper bound for a single credential store call.
    pub store_timeout_ms: u64,
}

impl AuthConfig {
    pub fn blocking_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn access_token_lifetime(&self) -> Result<TimeDelta, AuthError> {
        lifetime("access token lifetime", self.access_token_lifetime_secs)
    }

    pub fn refresh_token_lifetime(&self) -> Result<TimeDelta, AuthError> {
        lifetime("refresh token lifetime", self.refresh_token_lifetime_secs)
    }

    pub fn email_verification_lifetime(&self) -> Result<TimeDelta, AuthError> {
        lifetime(
            "email verification lifetime",
            self.email_verification_lifetime_secs,
        )
    }

    pub fn password_reset_lifetime(&self) -> Result<TimeDelta, AuthError> {
        lifetime("password reset lifetime", self.password_reset_lifetime_secs)
    }

    /// Check every lifetime converts before anything is issued with it.
    pub fn validate(&self) -> Result<(), AuthError> {
        self.access_token_lifetime()?;
        self.refresh_token_lifetime()?;
        self.email_verification_lifetime()?;
        self.password_reset_lifetime()?;
        Ok(())
    }
}

fn lifetime(what: &'static str, secs: u64) -> Result<TimeDelta, AuthError> {
    if secs > MAX_LIFETIME_SECS {
        return Err(AuthError::Config(format!(
            "{what} of {secs}s exceeds the {MAX_LIFETIME_SECS}s maximum"
        )));
    }
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| AuthError::Config(format!("{what} of {secs}s is out of range")))
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "hearth".into(),
            jwt_audience: "hearth-api".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            email_verification_lifetime_secs: 86_400,
            password_reset_lifetime_secs: 600,
            pepper: None,
            hash_cost: HashCost::default(),
            password_policy: PasswordPolicy::default(),
            blocking_timeout_ms: 5_000,
            store_timeout_ms: 5_000,
        }
    }
}
