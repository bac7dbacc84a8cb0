/// Redis connection handling
///
/// Redis backs two things in authd: the session cache (`access_token:{user_id}`
/// keys with a TTL) and the notification stream the worker consumes. Both go
/// through one [`RedisClient`] per process.
///
/// ```text
/// authd-api ──SET/GET/DEL──> access_token:{user_id}
///     │
///     └──XADD──> notifications:email ──XREADGROUP──> authd-worker
/// ```

pub mod client;

pub use client::{sanitize_url, RedisClient, RedisClientError, RedisConfig};
