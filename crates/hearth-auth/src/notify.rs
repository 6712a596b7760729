//! Outbound notification seam.
//!
//! Delivery (email, SMS, ...) lives outside this crate. Failures are
//! logged by the caller and never undo the token that was just stored;
//! the user can always ask for a resend.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn send_verification(
        &self,
        email: &str,
        raw_token: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;

    fn send_password_reset(
        &self,
        email: &str,
        raw_token: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
