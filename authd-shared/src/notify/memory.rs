/// In-memory [`Notifier`] that records what was published

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{Notification, Notifier, NotifyError};

#[derive(Default)]
pub struct MemoryNotifier {
    published: Mutex<Vec<(String, Notification)>>,
    failing: AtomicBool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every `(key, message)` published so far, oldest first
    pub async fn published(&self) -> Vec<(String, Notification)> {
        self.published.lock().await.clone()
    }

    /// Code from the most recent confirmation email sent to `email`
    pub async fn last_code_for(&self, email: &str) -> Option<String> {
        self.published
            .lock()
            .await
            .iter()
            .rev()
            .find_map(|(_, message)| match message {
                Notification::ConfirmationEmail { to_email, code, .. } if to_email == email => {
                    Some(code.clone())
                }
                _ => None,
            })
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, key: &str, message: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("notifier is down".to_string()));
        }

        self.published
            .lock()
            .await
            .push((key.to_string(), message.clone()));
        Ok(())
    }
}
