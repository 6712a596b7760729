//! Password hashing and verification using Argon2id.
//!
//! Hashing is CPU-bound. The async helpers run it on the blocking pool
//! under a deadline so it never stalls request handling.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version};
use hearth_core::error::{HearthError, HearthResult};
use tracing::warn;

use crate::config::{HashCost, PasswordPolicy};
use crate::error::AuthError;

/// Salted, peppered Argon2id hasher with a configurable work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    pepper: Option<Arc<str>>,
    /// Digest verified against when there is no real one, so that a
    /// missing account costs the same as a wrong password.
    dummy_digest: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cost: HashCost, pepper: Option<String>) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            pepper: pepper.map(Arc::from),
            dummy_digest: Arc::from(""),
        };
        hasher.dummy_digest = Arc::from(hasher.hash("hearth-dummy-password")?);
        Ok(hasher)
    }

    fn peppered(&self, password: &str) -> Vec<u8> {
        match &self.pepper {
            Some(p) => format!("{p}{password}").into_bytes(),
            None => password.as_bytes().to_vec(),
        }
    }

    /// Hash a password into a PHC-format string. Each call draws a new
    /// random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(&self.peppered(password), &salt)
            .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a PHC-format hash.
    ///
    /// The digest comparison is constant-time. A malformed digest counts
    /// as a mismatch.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };
        match self.argon2.verify_password(&self.peppered(password), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    /// Burn one verification against the dummy digest.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let digest = Arc::clone(&self.dummy_digest);
        self.verify(password, &digest);
        false
    }

    pub async fn hash_blocking(&self, password: String, deadline: Duration) -> HearthResult<String> {
        let hasher = self.clone();
        run_blocking(deadline, move || hasher.hash(&password)).await?.map_err(Into::into)
    }

    /// Verify on the blocking pool. `None` verifies against the dummy
    /// digest and always fails.
    pub async fn verify_blocking(
        &self,
        password: String,
        digest: Option<String>,
        deadline: Duration,
    ) -> HearthResult<bool> {
        let hasher = self.clone();
        run_blocking(deadline, move || match digest {
            Some(digest) => hasher.verify(&password, &digest),
            None => hasher.verify_dummy(&password),
        })
        .await
    }
}

async fn run_blocking<T, F>(deadline: Duration, work: F) -> HearthResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) => Err(HearthError::Internal(format!("hashing task failed: {join}"))),
        Err(_) => Err(AuthError::Timeout("password hashing").into()),
    }
}

impl PasswordPolicy {
    /// Check a candidate password, returning the first rule it breaks.
    pub fn check(&self, password: &str) -> HearthResult<()> {
        if password.chars().count() < self.min_length {
            return Err(HearthError::validation(format!(
                "password must be at least {} characters",
                self.min_length
            )));
        }
        if password.len() > self.max_length {
            return Err(HearthError::validation(format!(
                "password must be at most {} bytes",
                self.max_length
            )));
        }
        if self.require_letter && !password.chars().any(char::is_alphabetic) {
            return Err(HearthError::validation("password must contain a letter"));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(HearthError::validation("password must contain a digit"));
        }
        Ok(())
    }
}
