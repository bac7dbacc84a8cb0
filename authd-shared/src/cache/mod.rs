/// Volatile session cache
///
/// Maps `access_token:{user_id}` to the user's current access token, with a
/// TTL equal to the token's remaining lifetime. The cache is derived state:
/// the credential store stays authoritative and the authentication core
/// repopulates missing entries from it.
///
/// Logout stores [`REVOKED`] under the key instead of deleting it. Entries
/// are only ever repopulated with [`SessionCache::set_if_absent`], so a
/// repopulation racing a logout or a login cannot overwrite what they wrote.
///
/// - [`RedisSessionCache`]: Redis `SET .. PX`, `GET`, `DEL`
/// - [`MemorySessionCache`]: process-local map for tests

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::store::StoreResult;

pub use self::memory::MemorySessionCache;
pub use self::redis::RedisSessionCache;

/// Marker stored by logout; never a valid token
pub const REVOKED: &str = "revoked";

/// Cache key holding a user's current access token
pub fn access_token_key(user_id: Uuid) -> String {
    format!("access_token:{}", user_id)
}

/// Key/value cache with per-entry TTL
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Stores `value` only if `key` holds nothing live
    ///
    /// Returns whether the value was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Reads `key`; `None` if absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Removes `key`; succeeds when it is already gone
    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_key() {
        let id = Uuid::parse_str("6f1f0c2a-1c2b-4c1e-9a8e-2d2b6c1f0a11").unwrap();
        assert_eq!(
            access_token_key(id),
            "access_token:6f1f0c2a-1c2b-4c1e-9a8e-2d2b6c1f0a11"
        );
    }
}
