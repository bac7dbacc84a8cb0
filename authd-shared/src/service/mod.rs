/// Authentication core
///
/// Orchestrates the credential store, session cache, token codec and
/// notifier to implement register, login, logout, refresh, me and
/// confirm-email.
///
/// # Consistency rules
///
/// - The store is the source of truth; the cache only ever holds a copy of
///   what was persisted. Every cache write follows its own store write.
/// - An access token is valid only while it equals the latest token recorded
///   for its user (cached or durable). A valid signature is not enough.
/// - Refresh rotates: the presented refresh token must equal the one on
///   record, so a superseded refresh token cannot mint a new pair. A refresh
///   that fails after rotating the stored pair puts the previous pair back.
/// - Logout leaves a revocation marker in the cache, and `me` repopulates
///   only empty cache entries, so a lookup that read the store before a
///   logout or login finished cannot resurrect the token it read.
/// - Every collaborator call runs under `AuthConfig::call_timeout`. A call
///   that runs past it fails the whole operation with `AuthError::Cancelled`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use authd_shared::cache::MemorySessionCache;
/// use authd_shared::notify::MemoryNotifier;
/// use authd_shared::store::MemoryCredentialStore;
/// use authd_shared::{AuthConfig, AuthService};
///
/// # async fn example() -> Result<(), authd_shared::AuthError> {
/// let service = AuthService::new(
///     Arc::new(MemoryCredentialStore::new()),
///     Arc::new(MemorySessionCache::new()),
///     Arc::new(MemoryNotifier::new()),
///     AuthConfig::new("test-secret-key-at-least-32-bytes-long"),
/// );
///
/// service.register("a@x.com", "p1", "p1").await?;
/// let session = service.login("a@x.com", "p1").await?;
/// let user = service.me(&session.access_token).await?;
/// assert_eq!(user.email, "a@x.com");
/// # Ok(())
/// # }
/// ```

mod config;
mod error;
mod session;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use session::{HealthReport, Session};

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::code::{constant_time_eq, generate_confirmation_code};
use crate::auth::jwt::{fingerprint, JwtError, TokenCodec, TokenKind};
use crate::auth::password::{hash_password, verify_password};
use crate::cache::{access_token_key, SessionCache, REVOKED};
use crate::models::{StoredToken, TokenPair, User};
use crate::notify::{Notification, Notifier};
use crate::store::{CredentialStore, StoreError, StoreResult};

/// The authentication core
///
/// Cheap to share: wrap it in an `Arc` and hand clones to request handlers.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn SessionCache>,
    notifier: Arc<dyn Notifier>,
    codec: TokenCodec,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<dyn SessionCache>,
        notifier: Arc<dyn Notifier>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            codec: TokenCodec::new(&config.jwt_secret),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Creates an unconfirmed account and sends its confirmation code
    ///
    /// No token is issued. If publishing the confirmation email fails the
    /// account still exists; registering again reports a duplicate email.
    ///
    /// # Errors
    ///
    /// - `Validation` if the passwords differ or the email is taken
    /// - `Storage` / `Cancelled` on store failure
    /// - `Notify` / `Cancelled` on notifier failure
    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        repeat_password: &str,
    ) -> AuthResult<Uuid> {
        debug!("Registering user");

        if password != repeat_password {
            return Err(AuthError::Validation("passwords do not match".to_string()));
        }

        if self.call("user_exists", self.store.user_exists(email)).await? {
            return Err(AuthError::Validation("email already exists".to_string()));
        }

        let password_hash = hash_blocking(password).await?;

        let user = match self
            .call("create_user", self.store.create_user(email, &password_hash))
            .await
        {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                return Err(AuthError::Validation("email already exists".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let code = generate_confirmation_code();
        let expires_at = Utc::now() + self.config.confirmation_ttl;
        self.call(
            "save_confirmation_code",
            self.store.save_confirmation_code(user.id, &code, expires_at),
        )
        .await?;

        let message = Notification::ConfirmationEmail {
            to_email: user.email.clone(),
            subject: self.config.confirmation_subject.clone(),
            code,
        };

        match tokio::time::timeout(self.config.call_timeout, self.notifier.publish(email, &message))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "Failed to publish confirmation email");
                return Err(AuthError::Notify(e));
            }
            Err(_) => {
                warn!(user_id = %user.id, "Publishing confirmation email timed out");
                return Err(AuthError::Cancelled("publish"));
            }
        }

        info!(user_id = %user.id, "User registered");
        Ok(user.id)
    }

    /// Verifies a password and issues a new token pair
    ///
    /// Any pair issued earlier for the same user stops validating.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        debug!("Login attempt");

        let user = self
            .call("get_user_by_email", self.store.get_user_by_email(email))
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        if !verify_blocking(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(user).await?;

        info!(user_id = %session.user.id, "User logged in");
        Ok(session)
    }

    /// Revokes the user's current pair
    ///
    /// Marks the cache entry revoked for one access-token lifetime, then
    /// clears the durable pair, attempting both even when the first fails.
    /// Succeeds when there was nothing to revoke.
    ///
    /// # Errors
    ///
    /// `Storage` (or `Cancelled`) if any step failed. When several failed,
    /// `StoreError::Multiple` carries every cause.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: Uuid) -> AuthResult<()> {
        let key = access_token_key(user_id);
        let mut failures = Vec::new();

        let ttl = self
            .config
            .access_ttl
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        if let Err(e) = self.call("cache_set", self.cache.set(&key, REVOKED, ttl)).await {
            warn!(error = %e, "Failed to mark cached access token revoked");
            failures.push(e);
        }

        if let Err(e) = self.call("delete_tokens", self.store.delete_tokens(user_id)).await {
            warn!(error = %e, "Failed to clear stored token pair");
            failures.push(e);
        }

        match failures.len() {
            0 => {
                info!("User logged out");
                Ok(())
            }
            1 => Err(failures.remove(0).into()),
            _ => Err(AuthError::Storage(StoreError::Multiple(failures))),
        }
    }

    /// Exchanges the current refresh token for a new pair
    ///
    /// The presented token must decode as a refresh token and equal the one
    /// on record. A refresh token whose recorded expiry has passed clears
    /// the stale pair.
    ///
    /// # Errors
    ///
    /// If the new pair is persisted but cannot be cached, the previous pair
    /// is saved back so the same refresh token can be presented again. When
    /// that also fails both causes are returned in `StoreError::Multiple`.
    #[instrument(skip_all, fields(token = %fingerprint(refresh_token)))]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let claims = self
            .codec
            .decode(refresh_token, TokenKind::Refresh)
            .map_err(invalid_token)?;
        let user_id = claims.user_id;

        let user = self
            .call("get_user_by_id", self.store.get_user_by_id(user_id))
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        let stored = self
            .call("get_refresh_token", self.store.get_refresh_token(user_id))
            .await?
            .ok_or_else(|| AuthError::InvalidToken("no active session".to_string()))?;

        if !constant_time_eq(&stored.token, refresh_token) {
            warn!(%user_id, "Refresh with a superseded token");
            return Err(AuthError::InvalidToken("refresh token superseded".to_string()));
        }

        // The token's own `exp` already passed decoding; this catches a store
        // record whose expiry disagrees with the token it holds.
        if stored.is_expired() {
            debug!(%user_id, "Stored refresh token expired, clearing pair");
            self.call("delete_tokens", self.store.delete_tokens(user_id))
                .await?;
            return Err(AuthError::InvalidToken("refresh token expired".to_string()));
        }

        let previous_access = self
            .call("get_access_token", self.store.get_access_token(user_id))
            .await?;

        let pair = self.mint_pair(&user)?;
        self.call("save_tokens", self.store.save_tokens(user_id, &pair))
            .await?;

        if let Err(e) = self
            .cache_access_token(user_id, &pair.access_token, pair.access_expires_at)
            .await
        {
            warn!(%user_id, error = %e, "Failed to cache refreshed access token, restoring previous pair");
            return Err(self.restore_pair(user_id, previous_access, stored, e).await);
        }

        let session = Session::new(user, pair);

        info!(%user_id, "Session refreshed");
        Ok(session)
    }

    /// Resolves an access token to its user
    ///
    /// The token must decode as an access token and equal the latest access
    /// token recorded for its user. See [`AuthService::current_access_token`]
    /// for where "latest" comes from.
    #[instrument(skip_all, fields(token = %fingerprint(access_token)))]
    pub async fn me(&self, access_token: &str) -> AuthResult<User> {
        let claims = self
            .codec
            .decode(access_token, TokenKind::Access)
            .map_err(invalid_token)?;
        let user_id = claims.user_id;

        match self.current_access_token(user_id).await? {
            Some(current) if constant_time_eq(&current, access_token) => {}
            Some(_) => {
                debug!(%user_id, "Access token superseded");
                return Err(AuthError::InvalidToken("token superseded".to_string()));
            }
            None => {
                debug!(%user_id, "No live session");
                return Err(AuthError::InvalidToken("token revoked".to_string()));
            }
        }

        self.call("get_user_by_id", self.store.get_user_by_id(user_id))
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))
    }

    /// Marks an email confirmed with its pending code
    ///
    /// Wrong email, wrong code and expired code all fail the same way.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn confirm_email(&self, email: &str, code: &str) -> AuthResult<Uuid> {
        match self
            .call("confirm_email", self.store.confirm_email(email, code))
            .await?
        {
            Some(user_id) => {
                info!(%user_id, "Email confirmed");
                Ok(user_id)
            }
            None => {
                debug!("Confirmation code did not match");
                Err(AuthError::Confirmation)
            }
        }
    }

    /// Pings the store and the cache
    pub async fn health(&self) -> HealthReport {
        let database = self.call("store_ping", self.store.ping()).await.is_ok();
        let cache = self.call("cache_ping", self.cache.ping()).await.is_ok();

        HealthReport { database, cache }
    }

    /// Latest access token on record for a user
    ///
    /// | cache       | store                    | result                          |
    /// |-------------|--------------------------|---------------------------------|
    /// | hit `t`     | not read                 | `Some(t)`                       |
    /// | hit revoked | not read                 | `None`                          |
    /// | miss        | none or cleared          | `None`                          |
    /// | miss        | `(t, exp)`, `exp <= now` | `None`, store left as is        |
    /// | miss        | `(t, exp)`, `exp > now`  | cache `t` for `exp - now` if still empty |
    ///
    /// When the repopulation finds the entry already written (a login,
    /// refresh or logout got there first) that entry wins over `t`. A cache
    /// read error counts as a miss. A failed repopulation is logged and does
    /// not change the result.
    async fn current_access_token(&self, user_id: Uuid) -> AuthResult<Option<String>> {
        let key = access_token_key(user_id);

        match self.call("cache_get", self.cache.get(&key)).await {
            Ok(Some(token)) => return Ok(live(token)),
            Ok(None) => {}
            Err(e) => warn!(%user_id, error = %e, "Session cache read failed, using store"),
        }

        let Some(stored) = self
            .call("get_access_token", self.store.get_access_token(user_id))
            .await?
        else {
            return Ok(None);
        };

        if stored.is_expired() {
            return Ok(None);
        }

        let ttl = remaining(stored.expires_at);
        match self
            .call("cache_set_if_absent", self.cache.set_if_absent(&key, &stored.token, ttl))
            .await
        {
            Ok(true) => Ok(Some(stored.token)),
            Ok(false) => match self.call("cache_get", self.cache.get(&key)).await {
                Ok(Some(token)) => {
                    debug!(%user_id, "Session cache written concurrently, using its entry");
                    Ok(live(token))
                }
                Ok(None) => Ok(Some(stored.token)),
                Err(e) => {
                    warn!(%user_id, error = %e, "Session cache read failed, using store");
                    Ok(Some(stored.token))
                }
            },
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to repopulate session cache");
                Ok(Some(stored.token))
            }
        }
    }

    /// Mints a pair, persists it, then caches the access token
    async fn issue_session(&self, user: User) -> AuthResult<Session> {
        let pair = self.mint_pair(&user)?;

        self.call("save_tokens", self.store.save_tokens(user.id, &pair))
            .await?;
        self.cache_access_token(user.id, &pair.access_token, pair.access_expires_at)
            .await?;

        debug!(
            user_id = %user.id,
            access = %fingerprint(&pair.access_token),
            "Issued token pair"
        );

        Ok(Session::new(user, pair))
    }

    fn mint_pair(&self, user: &User) -> AuthResult<TokenPair> {
        let access = self
            .codec
            .issue(user.id, &user.email, TokenKind::Access, self.config.access_ttl)
            .map_err(internal)?;
        let refresh = self
            .codec
            .issue(user.id, &user.email, TokenKind::Refresh, self.config.refresh_ttl)
            .map_err(internal)?;

        Ok(TokenPair {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// Saves back the pair a failed refresh replaced
    ///
    /// Returns the error to report for the refresh.
    async fn restore_pair(
        &self,
        user_id: Uuid,
        previous_access: Option<StoredToken>,
        previous_refresh: StoredToken,
        cause: StoreError,
    ) -> AuthError {
        let Some(access) = previous_access else {
            return cause.into();
        };

        let previous = TokenPair {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: previous_refresh.token,
            refresh_expires_at: previous_refresh.expires_at,
        };

        match self
            .call("save_tokens", self.store.save_tokens(user_id, &previous))
            .await
        {
            Ok(()) => cause.into(),
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to restore previous token pair");
                AuthError::Storage(StoreError::Multiple(vec![cause, e]))
            }
        }
    }

    async fn cache_access_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.call(
            "cache_set",
            self.cache
                .set(&access_token_key(user_id), token, remaining(expires_at)),
        )
        .await
    }

    /// Runs one collaborator call under the configured deadline
    async fn call<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, "Collaborator call timed out");
                Err(StoreError::Timeout(op))
            }
        }
    }
}

/// Time left until `expires_at`, zero if already past
fn remaining(expires_at: DateTime<Utc>) -> std::time::Duration {
    (expires_at - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

/// A cache entry as a token; the revocation marker means no live session
fn live(entry: String) -> Option<String> {
    (entry != REVOKED).then_some(entry)
}

fn invalid_token(err: JwtError) -> AuthError {
    AuthError::InvalidToken(err.to_string())
}

fn internal(err: JwtError) -> AuthError {
    AuthError::Internal(err.to_string())
}

async fn hash_blocking(password: &str) -> AuthResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(e.to_string()))
}

async fn verify_blocking(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("verification task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(e.to_string()))
}
