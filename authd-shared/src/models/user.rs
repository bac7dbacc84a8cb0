/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email           TEXT NOT NULL UNIQUE,
///     password_hash   TEXT NOT NULL,
///     email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Email is compared exactly as stored (plain `TEXT`, case-sensitive).
///
/// # Example
///
/// ```no_run
/// use authd_shared::models::user::{NewUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     NewUser {
///         email: "a@x.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     },
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "a@x.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, unique
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Set once by a successful email confirmation
    pub email_confirmed: bool,

    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,

    /// Already hashed; never plaintext
    pub password_hash: String,
}

impl User {
    /// Inserts a new, unconfirmed user
    ///
    /// # Errors
    ///
    /// Fails with a unique-violation database error if the email is taken.
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, email_confirmed, created_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, email_confirmed, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by exact email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, email_confirmed, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Checks whether an account with this email exists
    pub async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Confirms an email address with its pending code
    ///
    /// In one statement: matches a code that is unexpired and belongs to the
    /// user with `email`, consumes it, and sets `email_confirmed`. Returns the
    /// user ID on success and `None` on any mismatch, without saying which
    /// condition failed.
    pub async fn confirm_email(
        pool: &PgPool,
        email: &str,
        code: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            WITH matched AS (
                DELETE FROM users_code c
                USING users u
                WHERE c.user_id = u.id
                  AND u.email = $1
                  AND c.confirmation_code = $2
                  AND c.confirmation_code_expires_at > NOW()
                RETURNING c.user_id
            )
            UPDATE users
            SET email_confirmed = TRUE
            WHERE id IN (SELECT user_id FROM matched)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email_confirmed: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["email_confirmed"], false);
        assert!(json.get("password_hash").is_none());
    }

    // Database-backed tests live in tests/pg_store_tests.rs
}
