/// Durable credential store
///
/// Source of truth for users, password hashes, confirmation codes and the
/// latest issued token pair per user. The authentication core only ever sees
/// the [`CredentialStore`] trait.
///
/// - [`PgCredentialStore`]: Postgres via sqlx, used by the API binary
/// - [`MemoryCredentialStore`]: process-local maps for tests and local runs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{StoredToken, TokenPair, User};
use crate::redis::RedisClientError;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Failures of the store or the cache
#[derive(Error, Debug)]
pub enum StoreError {
    /// Postgres query failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Redis command failed
    #[error("Cache error: {0}")]
    Redis(#[from] RedisClientError),

    /// Unique constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend refused or could not be reached
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Call did not finish within its deadline
    #[error("Timed out: {0}")]
    Timeout(&'static str),

    /// Several independent steps failed
    #[error("Multiple failures: {}", join_errors(.0))]
    Multiple(Vec<StoreError>),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Redis(err.into())
    }
}

fn join_errors(errors: &[StoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for users, tokens and confirmation codes
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts an unconfirmed user; `Conflict` if the email is taken
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn user_exists(&self, email: &str) -> StoreResult<bool>;

    /// Records `pair` as the user's current pair, overwriting any previous one
    async fn save_tokens(&self, user_id: Uuid, pair: &TokenPair) -> StoreResult<()>;

    /// Clears the user's pair; succeeds when there is none
    async fn delete_tokens(&self, user_id: Uuid) -> StoreResult<()>;

    /// Records the user's confirmation code, replacing any previous one
    async fn save_confirmation_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Atomically matches an unexpired code for `email`, consumes it and
    /// marks the email confirmed
    ///
    /// `None` when anything does not match.
    async fn confirm_email(&self, email: &str, code: &str) -> StoreResult<Option<Uuid>>;

    /// Current access token and its expiry, `None` if absent or cleared
    async fn get_access_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>>;

    /// Current refresh token and its expiry, `None` if absent or cleared
    async fn get_refresh_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>>;

    /// Cheap liveness check
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_lists_every_cause() {
        let err = StoreError::Multiple(vec![
            StoreError::Unavailable("cache down".into()),
            StoreError::Timeout("delete_tokens"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("cache down"));
        assert!(msg.contains("delete_tokens"));
    }

    #[test]
    fn test_non_unique_sqlx_error_is_database() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
