/// Asynchronous notifications
///
/// The authentication core publishes messages here without waiting for them
/// to be delivered. Messages form a closed set ([`Notification`]); the worker
/// turns each kind into an outgoing email.
///
/// - [`StreamNotifier`]: `XADD` onto a Redis Stream consumed by `authd-worker`
/// - [`MemoryNotifier`]: records messages for tests

pub mod memory;
pub mod stream;
pub mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryNotifier;
pub use stream::StreamNotifier;

/// Default stream name for email notifications
pub const DEFAULT_STREAM: &str = "notifications:email";

/// Every message the core can publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Ask a freshly registered user to confirm their address
    ConfirmationEmail {
        to_email: String,
        subject: String,
        code: String,
    },
}

impl Notification {
    /// Stable name of the message kind, as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ConfirmationEmail { .. } => "confirmation_email",
        }
    }
}

/// Notifier errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Notifier unavailable: {0}")]
    Unavailable(String),

    /// Malformed stream entry (worker side)
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Fire-and-forget publisher
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publishes `message`; `key` groups messages for one recipient
    async fn publish(&self, key: &str, message: &Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirmation_email_json_shape() {
        let message = Notification::ConfirmationEmail {
            to_email: "a@x.com".to_string(),
            subject: "Confirm your email".to_string(),
            code: "K3Q9ZB".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "kind": "confirmation_email",
                "to_email": "a@x.com",
                "subject": "Confirm your email",
                "code": "K3Q9ZB",
            })
        );
        assert_eq!(message.kind(), "confirmation_email");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = serde_json::from_value::<Notification>(json!({"kind": "sms", "to": "1"}));
        assert!(result.is_err());
    }
}
