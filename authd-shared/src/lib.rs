//! # authd Shared Library
//!
//! Session and credential management used by the authd API gateway and the
//! notification worker.
//!
//! ## Module Organization
//!
//! - `auth`: Token codec, password hashing, confirmation codes
//! - `models`: Database rows and queries (users, token pairs, codes)
//! - `db`: Postgres pool and migrations
//! - `redis`: Redis client wrapper
//! - `store`: Durable credential store (Postgres and in-memory)
//! - `cache`: Session cache (Redis and in-memory)
//! - `notify`: Async notifier (Redis Streams and in-memory)
//! - `service`: The authentication core (register, login, logout, refresh, me, confirm)

pub mod auth;
pub mod cache;
pub mod db;
pub mod models;
pub mod notify;
pub mod redis;
pub mod service;
pub mod store;

pub use service::{AuthConfig, AuthError, AuthResult, AuthService, HealthReport, Session};

/// Current version of the authd shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
