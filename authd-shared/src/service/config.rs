use chrono::Duration;
use std::fmt;

/// Immutable settings for [`AuthService`](super::AuthService)
///
/// Built once at startup and moved into the service; nothing mutates it
/// afterwards.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for the token codec
    pub jwt_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,

    /// How long a confirmation code stays valid
    pub confirmation_ttl: Duration,

    /// Deadline for each individual store, cache or notifier call
    pub call_timeout: std::time::Duration,

    /// Subject line of the confirmation email
    pub confirmation_subject: String,
}

impl AuthConfig {
    /// Settings with default lifetimes (15 minutes, 7 days, 24 hours) and a
    /// 5 second call deadline
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            confirmation_ttl: Duration::hours(24),
            call_timeout: std::time::Duration::from_secs(5),
            confirmation_subject: "Confirm your email".to_string(),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_confirmation_ttl(mut self, ttl: Duration) -> Self {
        self.confirmation_ttl = ttl;
        self
    }

    pub fn with_call_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("confirmation_ttl", &self.confirmation_ttl)
            .field("call_timeout", &self.call_timeout)
            .field("confirmation_subject", &self.confirmation_subject)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new("secret");
        assert_eq!(config.access_ttl, Duration::seconds(900));
        assert_eq!(config.refresh_ttl, Duration::seconds(604_800));
        assert_eq!(config.confirmation_ttl, Duration::seconds(86_400));
        assert_eq!(config.call_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }
}
