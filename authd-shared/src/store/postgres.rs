/// Postgres-backed [`CredentialStore`]
///
/// Thin delegation to the row types in `crate::models`. Each method is one
/// statement, so there are no multi-statement transactions to leave
/// half-applied.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreResult};
use crate::db::pool::health_check;
use crate::models::{ConfirmationCode, NewUser, StoredToken, TokenPair, User, UserTokens};

/// Credential store over a shared `PgPool`
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let user = User::create(
            &self.pool,
            NewUser {
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
        )
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, user_id).await?)
    }

    async fn user_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(User::exists_by_email(&self.pool, email).await?)
    }

    async fn save_tokens(&self, user_id: Uuid, pair: &TokenPair) -> StoreResult<()> {
        Ok(UserTokens::upsert(&self.pool, user_id, pair).await?)
    }

    async fn delete_tokens(&self, user_id: Uuid) -> StoreResult<()> {
        Ok(UserTokens::clear(&self.pool, user_id).await?)
    }

    async fn save_confirmation_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(ConfirmationCode::upsert(&self.pool, user_id, code, expires_at).await?)
    }

    async fn confirm_email(&self, email: &str, code: &str) -> StoreResult<Option<Uuid>> {
        Ok(User::confirm_email(&self.pool, email, code).await?)
    }

    async fn get_access_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>> {
        let row = UserTokens::find(&self.pool, user_id).await?;
        Ok(row.and_then(|r| r.access()))
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>> {
        let row = UserTokens::find(&self.pool, user_id).await?;
        Ok(row.and_then(|r| r.refresh()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
