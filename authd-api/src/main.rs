//! # authd API Server
//!
//! Serves the authentication endpoints over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/authd \
//! REDIS_URL=redis://localhost:6379 \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p authd-api
//! ```

use authd_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use authd_shared::{
    cache::RedisSessionCache,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    notify::StreamNotifier,
    redis::{RedisClient, RedisConfig},
    store::PgCredentialStore,
    AuthService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!("authd API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let redis = RedisClient::new(RedisConfig::new(config.redis.url.clone())).await?;

    let auth = AuthService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(RedisSessionCache::new(redis.clone())),
        Arc::new(StreamNotifier::new(redis, config.notify.stream.clone())),
        config.auth_config(),
    );

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(Arc::new(auth), config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "authd_api=debug,authd_shared=debug,tower_http=debug".into());

    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
