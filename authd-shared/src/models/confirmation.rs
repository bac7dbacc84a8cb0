/// Pending email confirmation codes (`users_code`)
///
/// One active code per user: issuing a new code replaces the old one.
/// Matching and consuming a code happens in `User::confirm_email`, which has
/// to see both tables in a single statement.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// A code waiting to be confirmed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfirmationCode {
    pub user_id: Uuid,
    pub confirmation_code: String,
    pub confirmation_code_expires_at: DateTime<Utc>,
}

impl ConfirmationCode {
    /// Inserts or replaces the user's code
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users_code (user_id, confirmation_code, confirmation_code_expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                confirmation_code = EXCLUDED.confirmation_code,
                confirmation_code_expires_at = EXCLUDED.confirmation_code_expires_at
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Loads the pending code for a user, expired or not
    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ConfirmationCode>(
            r#"
            SELECT user_id, confirmation_code, confirmation_code_expires_at
            FROM users_code
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
