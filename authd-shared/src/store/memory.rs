/// In-memory [`CredentialStore`]
///
/// Everything lives behind one `RwLock`, so every trait method is atomic with
/// respect to every other, including `confirm_email`. Used by the test suites
/// and for running the API without Postgres.
///
/// [`MemoryCredentialStore::set_failing`] makes every call return
/// `StoreError::Unavailable`, which is how tests simulate an outage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreResult};
use crate::models::{StoredToken, TokenPair, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    ids_by_email: HashMap<String, Uuid>,
    tokens: HashMap<Uuid, Option<TokenPair>>,
    codes: HashMap<Uuid, (String, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
    failing: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The pair currently on record, bypassing the failure switch
    pub async fn stored_tokens(&self, user_id: Uuid) -> Option<TokenPair> {
        self.inner.read().await.tokens.get(&user_id).cloned().flatten()
    }

    /// The pending confirmation code, bypassing the failure switch
    pub async fn pending_code(&self, user_id: Uuid) -> Option<(String, DateTime<Utc>)> {
        self.inner.read().await.codes.get(&user_id).cloned()
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("credential store is down".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        self.check()?;
        let mut inner = self.inner.write().await;

        if inner.ids_by_email.contains_key(email) {
            return Err(StoreError::Conflict(format!("email {} already exists", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            email_confirmed: false,
            created_at: Utc::now(),
        };

        inner.ids_by_email.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .ids_by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        self.check()?;
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn user_exists(&self, email: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self.inner.read().await.ids_by_email.contains_key(email))
    }

    async fn save_tokens(&self, user_id: Uuid, pair: &TokenPair) -> StoreResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .tokens
            .insert(user_id, Some(pair.clone()));
        Ok(())
    }

    async fn delete_tokens(&self, user_id: Uuid) -> StoreResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.tokens.get_mut(&user_id) {
            *slot = None;
        }
        Ok(())
    }

    async fn save_confirmation_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .codes
            .insert(user_id, (code.to_string(), expires_at));
        Ok(())
    }

    async fn confirm_email(&self, email: &str, code: &str) -> StoreResult<Option<Uuid>> {
        self.check()?;
        let mut inner = self.inner.write().await;

        let Some(user_id) = inner.ids_by_email.get(email).copied() else {
            return Ok(None);
        };

        let matches = matches!(
            inner.codes.get(&user_id),
            Some((stored, expires_at)) if stored == code && *expires_at > Utc::now()
        );
        if !matches {
            return Ok(None);
        }

        inner.codes.remove(&user_id);
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.email_confirmed = true;
        }

        Ok(Some(user_id))
    }

    async fn get_access_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>> {
        self.check()?;
        Ok(self.inner.read().await.tokens.get(&user_id).and_then(|pair| {
            pair.as_ref().map(|p| StoredToken {
                token: p.access_token.clone(),
                expires_at: p.access_expires_at,
            })
        }))
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> StoreResult<Option<StoredToken>> {
        self.check()?;
        Ok(self.inner.read().await.tokens.get(&user_id).and_then(|pair| {
            pair.as_ref().map(|p| StoredToken {
                token: p.refresh_token.clone(),
                expires_at: p.refresh_expires_at,
            })
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pair(tag: &str) -> TokenPair {
        TokenPair {
            access_token: format!("access-{}", tag),
            access_expires_at: Utc::now() + Duration::minutes(15),
            refresh_token: format!("refresh-{}", tag),
            refresh_expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let store = MemoryCredentialStore::new();
        store.create_user("a@x.com", "h").await.unwrap();

        let result = store.create_user("a@x.com", "h").await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.user_exists("a@x.com").await.unwrap());
        assert!(!store.user_exists("A@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_tokens_overwrites() {
        let store = MemoryCredentialStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();

        store.save_tokens(user.id, &pair("1")).await.unwrap();
        store.save_tokens(user.id, &pair("2")).await.unwrap();

        let access = store.get_access_token(user.id).await.unwrap().unwrap();
        let refresh = store.get_refresh_token(user.id).await.unwrap().unwrap();
        assert_eq!(access.token, "access-2");
        assert_eq!(refresh.token, "refresh-2");
    }

    #[tokio::test]
    async fn test_delete_tokens_is_idempotent() {
        let store = MemoryCredentialStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();

        store.delete_tokens(user.id).await.unwrap();
        store.save_tokens(user.id, &pair("1")).await.unwrap();
        store.delete_tokens(user.id).await.unwrap();
        store.delete_tokens(user.id).await.unwrap();

        assert!(store.get_access_token(user.id).await.unwrap().is_none());
        assert!(store.get_refresh_token(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_email_consumes_code() {
        let store = MemoryCredentialStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        store
            .save_confirmation_code(user.id, "ABC123", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.confirm_email("a@x.com", "WRONG1").await.unwrap(), None);
        assert_eq!(store.confirm_email("b@x.com", "ABC123").await.unwrap(), None);
        assert_eq!(
            store.confirm_email("a@x.com", "ABC123").await.unwrap(),
            Some(user.id)
        );
        assert_eq!(store.confirm_email("a@x.com", "ABC123").await.unwrap(), None);

        let user = store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.email_confirmed);
    }

    #[tokio::test]
    async fn test_confirm_email_rejects_expired_code() {
        let store = MemoryCredentialStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        store
            .save_confirmation_code(user.id, "ABC123", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.confirm_email("a@x.com", "ABC123").await.unwrap(), None);
        assert!(!store.get_user_by_id(user.id).await.unwrap().unwrap().email_confirmed);
    }

    #[tokio::test]
    async fn test_failing_switch() {
        let store = MemoryCredentialStore::new();
        store.set_failing(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(store.get_user_by_email("a@x.com").await.is_err());

        store.set_failing(false);
        assert!(store.ping().await.is_ok());
    }
}
