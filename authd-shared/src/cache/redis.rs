/// Redis-backed [`SessionCache`]

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use super::SessionCache;
use crate::redis::RedisClient;
use crate::store::{StoreError, StoreResult};

#[derive(Clone)]
pub struct RedisSessionCache {
    client: RedisClient,
}

impl RedisSessionCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.client.get_connection();

        // PX 0 is rejected by Redis; a token with under 1ms left is kept for 1ms
        let ttl_ms = ttl.as_millis().max(1) as u64;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.client.get_connection();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        // Nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.get_connection();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.client.get_connection();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.client.ping().await? {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "Redis answered PING without PONG".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::RedisConfig;

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_set_get_delete() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let cache = RedisSessionCache::new(client);

        cache
            .set("access_token:test", "tok", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(
            cache.get("access_token:test").await.unwrap().as_deref(),
            Some("tok")
        );

        cache.delete("access_token:test").await.unwrap();
        cache.delete("access_token:test").await.unwrap();
        assert_eq!(cache.get("access_token:test").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_set_if_absent() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let cache = RedisSessionCache::new(client);
        cache.delete("access_token:nx").await.unwrap();

        assert!(cache
            .set_if_absent("access_token:nx", "first", Duration::from_secs(30))
            .await
            .unwrap());
        assert!(!cache
            .set_if_absent("access_token:nx", "second", Duration::from_secs(30))
            .await
            .unwrap());
        assert_eq!(
            cache.get("access_token:nx").await.unwrap().as_deref(),
            Some("first")
        );

        cache.delete("access_token:nx").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_entry_expires() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let cache = RedisSessionCache::new(client);

        cache
            .set("access_token:short", "tok", Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("access_token:short").await.unwrap(), None);
    }
}
