//! Repository trait definitions for the Credential Store.
//!
//! Every mutating method is a single invariant-preserving transition on
//! one account. There is no generic "save whatever changed" operation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::HearthResult;
use crate::models::account::{Account, CreateAccount, PendingToken};
use crate::models::role::Role;

pub trait AccountRepository: Send + Sync {
    /// Insert a new account with a fresh random id.
    ///
    /// Fails with `AlreadyExists` when the email is taken.
    fn create(&self, input: CreateAccount) -> impl Future<Output = HearthResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HearthResult<Account>> + Send;
    /// Lookup by normalized email.
    fn get_by_email(&self, email: &str) -> impl Future<Output = HearthResult<Account>> + Send;

    /// Unconditionally install `refresh_digest` as the active session and
    /// stamp `last_login_at`.
    fn record_login(
        &self,
        id: Uuid,
        refresh_digest: String,
    ) -> impl Future<Output = HearthResult<()>> + Send;
    /// Unconditionally install `refresh_digest` as the active session.
    fn set_refresh_token(
        &self,
        id: Uuid,
        refresh_digest: String,
    ) -> impl Future<Output = HearthResult<()>> + Send;
    /// Atomically replace the active refresh digest only if it still
    /// equals `expected`. Returns `false` when the swap lost.
    fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: String,
        replacement: String,
    ) -> impl Future<Output = HearthResult<bool>> + Send;
    /// Clear the active session. Succeeds when there is none.
    fn clear_refresh_token(&self, id: Uuid) -> impl Future<Output = HearthResult<()>> + Send;

    fn set_email_verification(
        &self,
        id: Uuid,
        token: PendingToken,
    ) -> impl Future<Output = HearthResult<()>> + Send;
    /// Atomically match an unexpired verification digest, clear the pair
    /// and mark the account verified. `None` when nothing matched.
    fn consume_email_verification(
        &self,
        digest: String,
        now: DateTime<Utc>,
    ) -> impl Future<Output = HearthResult<Option<Account>>> + Send;

    fn set_password_reset(
        &self,
        id: Uuid,
        token: PendingToken,
    ) -> impl Future<Output = HearthResult<()>> + Send;
    /// Atomically match an unexpired reset digest, clear the pair, replace
    /// the password hash and drop the active session.
    fn consume_password_reset(
        &self,
        digest: String,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> impl Future<Output = HearthResult<Option<Account>>> + Send;

    /// Replace the password hash and install `refresh_digest` as the only
    /// valid session in the same write.
    fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        refresh_digest: String,
    ) -> impl Future<Output = HearthResult<()>> + Send;

    /// Administrative toggle. Deactivation also clears the session.
    fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> impl Future<Output = HearthResult<Account>> + Send;
    fn set_role(&self, id: Uuid, role: Role) -> impl Future<Output = HearthResult<Account>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HearthResult<()>> + Send;
}
