/// Token pair persistence
///
/// Holds the latest issued access/refresh pair per user in `users_tokens`.
/// Saving a pair is an upsert on `user_id`, so concurrent logins for one user
/// resolve last-write-wins. Clearing NULLs the token columns and stamps
/// `deleted_at`; the row itself stays.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users_tokens (
///     user_id                  UUID PRIMARY KEY REFERENCES users(id),
///     access_token             TEXT,
///     access_token_expires_at  TIMESTAMPTZ,
///     refresh_token            TEXT,
///     refresh_token_expires_at TIMESTAMPTZ,
///     updated_at               TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at               TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// A freshly issued access/refresh pair, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// One token read back from the store with its recorded expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Checks whether the recorded expiry has passed
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Raw `users_tokens` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserTokens {
    pub user_id: Uuid,
    pub access_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserTokens {
    /// Current access token, if the pair has not been cleared
    pub fn access(&self) -> Option<StoredToken> {
        match (&self.access_token, self.access_token_expires_at) {
            (Some(token), Some(expires_at)) => Some(StoredToken {
                token: token.clone(),
                expires_at,
            }),
            _ => None,
        }
    }

    /// Current refresh token, if the pair has not been cleared
    pub fn refresh(&self) -> Option<StoredToken> {
        match (&self.refresh_token, self.refresh_token_expires_at) {
            (Some(token), Some(expires_at)) => Some(StoredToken {
                token: token.clone(),
                expires_at,
            }),
            _ => None,
        }
    }

    /// Inserts or overwrites the pair for a user
    pub async fn upsert(pool: &PgPool, user_id: Uuid, pair: &TokenPair) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users_tokens (
                user_id, access_token, access_token_expires_at,
                refresh_token, refresh_token_expires_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, NOW(), NULL)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                access_token_expires_at = EXCLUDED.access_token_expires_at,
                refresh_token = EXCLUDED.refresh_token,
                refresh_token_expires_at = EXCLUDED.refresh_token_expires_at,
                updated_at = NOW(),
                deleted_at = NULL
            "#,
        )
        .bind(user_id)
        .bind(&pair.access_token)
        .bind(pair.access_expires_at)
        .bind(&pair.refresh_token)
        .bind(pair.refresh_expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Clears the pair for a user
    ///
    /// Succeeds when there is nothing to clear.
    pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users_tokens
            SET access_token = NULL,
                access_token_expires_at = NULL,
                refresh_token = NULL,
                refresh_token_expires_at = NULL,
                updated_at = NOW(),
                deleted_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Loads the row for a user
    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTokens>(
            r#"
            SELECT user_id, access_token, access_token_expires_at,
                   refresh_token, refresh_token_expires_at, updated_at, deleted_at
            FROM users_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
