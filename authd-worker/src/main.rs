//! # authd Worker
//!
//! Sends the emails queued by the API server (confirmation codes).
//!
//! ## Usage
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379 \
//! MAIL_API_URL=https://mail.example.com \
//! MAIL_API_TOKEN=... \
//! MAIL_FROM=noreply@example.com \
//! cargo run -p authd-worker
//! ```

use authd_shared::redis::{RedisClient, RedisConfig};
use authd_worker::{
    config::WorkerConfig,
    consumer::{ConsumerConfig, NotificationConsumer},
    mailer::HttpMailer,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "authd_worker=debug,authd_shared=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(config.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("authd Worker v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::debug!(config = ?config, "Loaded configuration");

    let redis = RedisClient::new(RedisConfig::new(config.redis_url.clone())).await?;
    let mailer = Arc::new(HttpMailer::new(config.mail.clone())?);

    let consumer = NotificationConsumer::new(redis, mailer, ConsumerConfig::from(&config));
    let shutdown = consumer.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received, finishing current batch..."),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    consumer.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
