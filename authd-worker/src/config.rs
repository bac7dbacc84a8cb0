/// Worker configuration
///
/// Loaded from environment variables, with `.env` support:
///
/// | Variable | Default |
/// |---|---|
/// | `REDIS_URL` | required |
/// | `NOTIFY_STREAM` | `notifications:email` |
/// | `NOTIFY_GROUP` | `mailer` |
/// | `NOTIFY_CONSUMER` | `$HOSTNAME`, else `mailer-1` |
/// | `NOTIFY_BLOCK_MS` | `5000` |
/// | `NOTIFY_BATCH` | `10` |
/// | `NOTIFY_RETRY_DELAY_MS` | `5000` |
/// | `MAIL_API_URL` | required |
/// | `MAIL_API_TOKEN` | required |
/// | `MAIL_FROM` | required |
/// | `LOG_FORMAT` | `pretty` |

use authd_shared::notify::DEFAULT_STREAM;
use std::{env, fmt, str::FromStr, time::Duration};

#[derive(Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub block: Duration,
    pub batch_size: usize,
    pub retry_delay: Duration,
    pub mail: MailConfig,
    pub json_logs: bool,
}

/// Outgoing mail API settings
#[derive(Clone)]
pub struct MailConfig {
    /// Base URL; messages are POSTed to `{api_url}/email/messages`
    pub api_url: String,
    pub api_token: String,
    pub from_email: String,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("redis_url", &authd_shared::redis::sanitize_url(&self.redis_url))
            .field("stream", &self.stream)
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .field("block", &self.block)
            .field("batch_size", &self.batch_size)
            .field("retry_delay", &self.retry_delay)
            .field("mail", &self.mail)
            .finish()
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .field("from_email", &self.from_email)
            .finish()
    }
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let batch_size: usize = parse_or(&lookup, "NOTIFY_BATCH", 10)?;
        if batch_size == 0 {
            anyhow::bail!("NOTIFY_BATCH must be at least 1");
        }

        let consumer = lookup("NOTIFY_CONSUMER")
            .or_else(|| lookup("HOSTNAME"))
            .unwrap_or_else(|| "mailer-1".to_string());

        Ok(Self {
            redis_url: required("REDIS_URL")?,
            stream: lookup("NOTIFY_STREAM").unwrap_or_else(|| DEFAULT_STREAM.to_string()),
            group: lookup("NOTIFY_GROUP").unwrap_or_else(|| "mailer".to_string()),
            consumer,
            block: Duration::from_millis(parse_or(&lookup, "NOTIFY_BLOCK_MS", 5_000)?),
            batch_size,
            retry_delay: Duration::from_millis(parse_or(&lookup, "NOTIFY_RETRY_DELAY_MS", 5_000)?),
            mail: MailConfig {
                api_url: required("MAIL_API_URL")?.trim_end_matches('/').to_string(),
                api_token: required("MAIL_API_TOKEN")?,
                from_email: required("MAIL_FROM")?,
            },
            json_logs: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
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
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
