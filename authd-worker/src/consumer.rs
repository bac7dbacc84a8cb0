/// Notification stream consumer
///
/// Reads the notification stream through a consumer group and hands every
/// entry to a [`Mailer`].
///
/// # Delivery
///
/// ```text
/// XREADGROUP GROUP mailer <consumer> COUNT n BLOCK ms STREAMS notifications:email >
///   ├─> decode entry ──(malformed)──> XACK, drop
///   ├─> render + send ──(ok)──────> XACK
///   └─> send fails ───────────────> leave pending, pause, re-read own backlog
/// ```
///
/// Entries stay in the group's pending list until acknowledged, so a failed
/// delivery or a crash between send and ack results in another attempt.
/// Delivery is at-least-once.
///
/// # Shutdown
///
/// The loop exits when the [`CancellationToken`] returned by
/// [`NotificationConsumer::shutdown_token`] is cancelled. A blocked read is
/// abandoned; an in-flight send completes first.

use crate::config::WorkerConfig;
use crate::mailer::{EmailMessage, Mailer};
use authd_shared::notify::wire;
use authd_shared::redis::RedisClient;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Consumer group settings
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub block: Duration,
    pub batch_size: usize,
    pub retry_delay: Duration,
}

impl From<&WorkerConfig> for ConsumerConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            stream: config.stream.clone(),
            group: config.group.clone(),
            consumer: config.consumer.clone(),
            block: config.block,
            batch_size: config.batch_size,
            retry_delay: config.retry_delay,
        }
    }
}

/// What happened to one stream entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,

    /// Undecodable; acknowledged so it is not read again
    Malformed,

    /// Send failed; left pending for another attempt
    Failed,
}

impl Delivery {
    fn should_ack(self) -> bool {
        matches!(self, Delivery::Sent | Delivery::Malformed)
    }
}

/// Decodes, renders and sends one entry
pub async fn deliver(mailer: &dyn Mailer, entry: &StreamId) -> Delivery {
    let (key, notification) = match wire::decode_entry(entry) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(entry_id = %entry.id, error = %e, "Dropping malformed notification");
            return Delivery::Malformed;
        }
    };

    let message = EmailMessage::render(&notification);

    match mailer.send(&message).await {
        Ok(()) => {
            tracing::info!(entry_id = %entry.id, kind = notification.kind(), key = %key, "Email sent");
            Delivery::Sent
        }
        Err(e) => {
            tracing::warn!(entry_id = %entry.id, kind = notification.kind(), error = %e, "Email delivery failed");
            Delivery::Failed
        }
    }
}

pub struct NotificationConsumer {
    redis: RedisClient,
    mailer: Arc<dyn Mailer>,
    config: ConsumerConfig,
    shutdown_token: CancellationToken,
}

impl NotificationConsumer {
    pub fn new(redis: RedisClient, mailer: Arc<dyn Mailer>, config: ConsumerConfig) -> Self {
        Self {
            redis,
            mailer,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Used to signal graceful shutdown from external handlers
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Creates the consumer group (and the stream) if missing
    pub async fn ensure_group(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_connection();

        let created: Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&self.config.stream, &self.config.group, "0")
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %self.config.stream, group = %self.config.group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Runs until shutdown
    ///
    /// Starts by re-reading entries this consumer left pending in a previous
    /// run, then follows new entries.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.ensure_group().await?;

        tracing::info!(
            stream = %self.config.stream,
            group = %self.config.group,
            consumer = %self.config.consumer,
            "Notification consumer starting"
        );

        let mut conn = self.redis.get_connection();
        let mut backlog = true;

        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            let (start_id, opts) = if backlog {
                ("0", self.read_options())
            } else {
                (
                    ">",
                    self.read_options().block(self.config.block.as_millis() as usize),
                )
            };

            let keys = [&self.config.stream];
            let ids = [start_id];
            let read = tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                read = conn.xread_options::<_, _, Option<StreamReadReply>>(
                    &keys,
                    &ids,
                    &opts,
                ) => read,
            };

            let entries: Vec<StreamId> = match read {
                Ok(reply) => reply
                    .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
                    .unwrap_or_default(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read notification stream");
                    self.pause().await;
                    continue;
                }
            };

            if entries.is_empty() {
                backlog = false;
                continue;
            }

            let mut failed = false;
            for entry in &entries {
                let outcome = deliver(self.mailer.as_ref(), entry).await;

                if outcome.should_ack() {
                    let acked: Result<i64, redis::RedisError> = conn
                        .xack(&self.config.stream, &self.config.group, &[&entry.id])
                        .await;
                    if let Err(e) = acked {
                        tracing::error!(entry_id = %entry.id, error = %e, "Failed to acknowledge entry");
                        failed = true;
                    }
                } else {
                    failed = true;
                }
            }

            if failed {
                backlog = true;
                self.pause().await;
            }
        }

        tracing::info!("Notification consumer shut down");
        Ok(())
    }

    fn read_options(&self) -> StreamReadOptions {
        StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(self.config.batch_size)
    }

    async fn pause(&self) {
        tokio::select! {
            _ = self.shutdown_token.cancelled() => {}
            _ = sleep(self.config.retry_delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MailerError;
    use async_trait::async_trait;
    use authd_shared::notify::{Notification, Notifier, StreamNotifier};
    use authd_shared::redis::RedisConfig;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(MailerError::Rejected {
                    status: 503,
                    body: "try later".to_string(),
                });
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn entry(fields: &[(&str, &str)]) -> StreamId {
        let map: HashMap<String, redis::Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), redis::Value::Data(v.as_bytes().to_vec())))
            .collect();
        StreamId {
            id: "1-0".to_string(),
            map,
        }
    }

    fn confirmation() -> Notification {
        Notification::ConfirmationEmail {
            to_email: "a@x.com".to_string(),
            subject: "Confirm your email".to_string(),
            code: "ABC123".to_string(),
        }
    }

    fn valid_entry() -> StreamId {
        let payload = serde_json::to_string(&confirmation()).unwrap();
        entry(&[("key", "a@x.com"), ("payload", &payload)])
    }

    #[tokio::test]
    async fn test_deliver_sends_rendered_email() {
        let mailer = RecordingMailer::default();

        assert_eq!(deliver(&mailer, &valid_entry()).await, Delivery::Sent);

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert!(sent[0].text.contains("ABC123"));
    }

    #[tokio::test]
    async fn test_malformed_entry_is_acknowledged() {
        let mailer = RecordingMailer::default();

        let outcome = deliver(&mailer, &entry(&[("key", "a@x.com")])).await;

        assert_eq!(outcome, Delivery::Malformed);
        assert!(outcome.should_ack());
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_is_malformed() {
        let mailer = RecordingMailer::default();
        let payload = r#"{"kind":"password_reset","to_email":"a@x.com"}"#;

        let outcome = deliver(&mailer, &entry(&[("key", "a@x.com"), ("payload", payload)])).await;

        assert_eq!(outcome, Delivery::Malformed);
    }

    #[tokio::test]
    async fn test_failed_send_stays_pending() {
        let mailer = RecordingMailer::default();
        mailer.failing.store(true, Ordering::SeqCst);

        let outcome = deliver(&mailer, &valid_entry()).await;

        assert_eq!(outcome, Delivery::Failed);
        assert!(!outcome.should_ack());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_consumer_delivers_published_notification() {
        let stream = format!("notifications:test:{}", std::process::id());
        let redis = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();

        StreamNotifier::new(redis.clone(), stream.clone())
            .publish("a@x.com", &confirmation())
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let consumer = NotificationConsumer::new(
            redis.clone(),
            mailer.clone(),
            ConsumerConfig {
                stream: stream.clone(),
                group: "mailer".to_string(),
                consumer: "test-1".to_string(),
                block: Duration::from_millis(100),
                batch_size: 10,
                retry_delay: Duration::from_millis(50),
            },
        );
        let shutdown = consumer.shutdown_token();
        let handle = tokio::spawn(async move { consumer.run().await });

        for _ in 0..50 {
            if !mailer.sent.lock().await.is_empty() {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(mailer.sent.lock().await[0].to, "a@x.com");

        let mut conn = redis.get_connection();
        let _: () = conn.del(&stream).await.unwrap();
    }
}
