/// Redis Streams [`Notifier`]
///
/// Appends each message to one stream with `XADD .. MAXLEN ~ n *`. The worker
/// reads the stream through a consumer group, so entries survive a worker
/// restart until they are acknowledged.

use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use tracing::debug;

use super::{wire, Notification, Notifier, NotifyError, DEFAULT_STREAM};
use crate::redis::RedisClient;

/// Approximate cap on stream length
pub const DEFAULT_MAX_LEN: usize = 10_000;

#[derive(Clone)]
pub struct StreamNotifier {
    client: RedisClient,
    stream: String,
    max_len: usize,
}

impl StreamNotifier {
    pub fn new(client: RedisClient, stream: impl Into<String>) -> Self {
        Self {
            client,
            stream: stream.into(),
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// Notifier on [`DEFAULT_STREAM`]
    pub fn with_default_stream(client: RedisClient) -> Self {
        Self::new(client, DEFAULT_STREAM)
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait]
impl Notifier for StreamNotifier {
    async fn publish(&self, key: &str, message: &Notification) -> Result<(), NotifyError> {
        let fields = wire::encode(key, message)?;
        let mut conn = self.client.get_connection();

        let id: String = conn
            .xadd_maxlen(&self.stream, StreamMaxlen::Approx(self.max_len), "*", &fields)
            .await?;

        debug!(stream = %self.stream, entry_id = %id, kind = message.kind(), "Notification published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::RedisConfig;

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_publish_appends_entry() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let notifier = StreamNotifier::new(client.clone(), "notifications:test");

        notifier
            .publish(
                "a@x.com",
                &Notification::ConfirmationEmail {
                    to_email: "a@x.com".into(),
                    subject: "Confirm".into(),
                    code: "ABC123".into(),
                },
            )
            .await
            .unwrap();

        let mut conn = client.get_connection();
        let len: usize = conn.xlen("notifications:test").await.unwrap();
        assert!(len >= 1);
        let _: () = conn.del("notifications:test").await.unwrap();
    }
}
