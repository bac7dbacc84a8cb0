/// Postgres access for authd
///
/// - `pool`: Connection pool construction and health checks
/// - `migrations`: Embedded schema migrations (`users`, `users_tokens`, `users_code`)
///
/// Table-level queries live in `crate::models`.
///
/// # Example
///
/// ```no_run
/// use authd_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
