/// Configuration management for the API server
///
/// Loaded once at startup from environment variables (a `.env` file is
/// honoured in development).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply migrations at startup (default: true)
/// - `REDIS_URL`: Redis connection string (required)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `ACCESS_TOKEN_TTL_SECS`: Access token lifetime (default: 900)
/// - `REFRESH_TOKEN_TTL_SECS`: Refresh token lifetime (default: 604800)
/// - `CONFIRMATION_CODE_TTL_SECS`: Confirmation code lifetime (default: 86400)
/// - `STORE_CALL_TIMEOUT_MS`: Deadline per store/cache/notifier call (default: 5000)
/// - `NOTIFY_STREAM`: Redis stream for notifications (default: notifications:email)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// # Example
///
/// ```no_run
/// use authd_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use authd_shared::notify::DEFAULT_STREAM;
use authd_shared::AuthConfig;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Upper bound for token and code lifetimes (ten years)
const MAX_TTL_SECS: i64 = 315_360_000;

/// Upper bound for the per-call deadline (ten minutes)
const MAX_CALL_TIMEOUT_MS: u64 = 600_000;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthSettings,
    pub notify: NotifyConfig,
    pub log_format: LogFormat,
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &authd_shared::redis::sanitize_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &authd_shared::redis::sanitize_url(&self.url))
            .finish()
    }
}

/// Token and session settings
#[derive(Clone)]
pub struct AuthSettings {
    /// Secret key for token signing
    ///
    /// Must be kept secret and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub confirmation_ttl_secs: i64,
    pub call_timeout_ms: u64,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("confirmation_ttl_secs", &self.confirmation_ttl_secs)
            .field("call_timeout_ms", &self.call_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub stream: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected pretty or json, got {:?}", other)),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or `JWT_SECRET` is shorter than 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse_in_range(&lookup, "DATABASE_MAX_CONNECTIONS", 10, 1, 1_000)?,
                run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            auth: AuthSettings {
                jwt_secret,
                access_ttl_secs: parse_in_range(&lookup, "ACCESS_TOKEN_TTL_SECS", 900, 1, MAX_TTL_SECS)?,
                refresh_ttl_secs: parse_in_range(
                    &lookup,
                    "REFRESH_TOKEN_TTL_SECS",
                    604_800,
                    1,
                    MAX_TTL_SECS,
                )?,
                confirmation_ttl_secs: parse_in_range(
                    &lookup,
                    "CONFIRMATION_CODE_TTL_SECS",
                    86_400,
                    1,
                    MAX_TTL_SECS,
                )?,
                call_timeout_ms: parse_in_range(
                    &lookup,
                    "STORE_CALL_TIMEOUT_MS",
                    5_000,
                    1,
                    MAX_CALL_TIMEOUT_MS,
                )?,
            },
            notify: NotifyConfig {
                stream: lookup("NOTIFY_STREAM").unwrap_or_else(|| DEFAULT_STREAM.to_string()),
            },
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Settings for the authentication core
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.auth.jwt_secret.clone())
            .with_access_ttl(chrono::Duration::seconds(self.auth.access_ttl_secs))
            .with_refresh_ttl(chrono::Duration::seconds(self.auth.refresh_ttl_secs))
            .with_confirmation_ttl(chrono::Duration::seconds(self.auth.confirmation_ttl_secs))
            .with_call_timeout(std::time::Duration::from_millis(self.auth.call_timeout_ms))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_in_range<F, T>(lookup: &F, key: &str, default: T, min: T, max: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    let value = parse_or(lookup, key, default)?;
    if value < min || value > max {
        anyhow::bail!("{} must be between {} and {}, got {}", key, min, max, value);
    }
    Ok(value)
}
