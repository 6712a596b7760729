//! One-time tokens for email verification and password reset.
//!
//! The raw value goes to the notifier exactly once; only its digest and
//! expiry are persisted.

use chrono::{DateTime, TimeDelta, Utc};
use hearth_core::models::account::PendingToken;

use crate::token::{generate_opaque_token, hash_token};

/// A freshly minted one-time token.
pub struct OneTimeToken {
    /// Raw value for the recipient. Never stored.
    pub raw: String,
    pub pending: PendingToken,
}

impl OneTimeToken {
    pub fn mint(lifetime: TimeDelta, now: DateTime<Utc>) -> Self {
        let raw = generate_opaque_token();
        let pending = PendingToken {
            digest: hash_token(&raw),
            expires_at: now + lifetime,
        };
        Self { raw, pending }
    }
}
