use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{TokenPair, User};

/// Result of a successful login or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(user: User, pair: TokenPair) -> Self {
        Self {
            user,
            access_token: pair.access_token,
            access_expires_at: pair.access_expires_at,
            refresh_token: pair.refresh_token,
            refresh_expires_at: pair.refresh_expires_at,
        }
    }
}

/// Reachability of the backing services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub database: bool,
    pub cache: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.cache
    }
}
