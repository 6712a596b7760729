//! In-process outbox for account notifications.
//!
//! Handlers never wait on delivery: the notifier pushes onto an unbounded
//! channel and a background task drains it.

use hearth_auth::{Notifier, NotifyError};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A message waiting for delivery.
#[derive(Clone, PartialEq, Eq)]
pub enum Notification {
    Verification { email: String, token: String },
    PasswordReset { email: String, token: String },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Verification { .. } => "email_verification",
            Notification::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Notification::Verification { email, .. } | Notification::PasswordReset { email, .. } => {
                email
            }
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Notification::Verification { token, .. } | Notification::PasswordReset { token, .. } => {
                token
            }
        }
    }
}

#[derive(Clone)]
pub struct OutboxNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl OutboxNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        self.tx
            .send(notification)
            .map_err(|_| NotifyError("notification outbox is closed".into()))
    }
}

impl Notifier for OutboxNotifier {
    async fn send_verification(&self, email: &str, raw_token: &str) -> Result<(), NotifyError> {
        self.enqueue(Notification::Verification {
            email: email.to_owned(),
            token: raw_token.to_owned(),
        })
    }

    async fn send_password_reset(&self, email: &str, raw_token: &str) -> Result<(), NotifyError> {
        self.enqueue(Notification::PasswordReset {
            email: email.to_owned(),
            token: raw_token.to_owned(),
        })
    }
}

/// Drains the outbox until every sender is dropped.
///
/// Delivery itself belongs to a mail collaborator; this records the hand-off.
pub async fn drain_outbox(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        info!(
            kind = notification.kind(),
            email = notification.email(),
            "Notification handed off for delivery"
        );
    }
    warn!("Notification outbox closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueues_in_order() {
        let (notifier, mut rx) = OutboxNotifier::channel();
        notifier.send_verification("a@x.com", "t1").await.unwrap();
        notifier.send_password_reset("a@x.com", "t2").await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind(), "email_verification");
        assert_eq!(first.token(), "t1");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind(), "password_reset");
        assert_eq!(second.email(), "a@x.com");
    }

    #[tokio::test]
    async fn closed_outbox_reports_failure() {
        let (notifier, rx) = OutboxNotifier::channel();
        drop(rx);
        assert!(notifier.send_verification("a@x.com", "t").await.is_err());
    }
}
