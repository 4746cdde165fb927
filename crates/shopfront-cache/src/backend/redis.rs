//! Redis-based cache backend.

use super::CacheBackend;
use crate::{CacheError, CacheResult, KeyPattern};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use redis::{cmd, AsyncCommands, RedisError, Script};
use shopfront_config::CacheBackendKind;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 500;

/// Largest `EX` value Redis accepts; it stores expiry in milliseconds.
const MAX_EX_SECS: u64 = i64::MAX.unsigned_abs() / 1000;

/// Deletes `KEYS[1]` only while it still holds `ARGV[1]`.
const REMOVE_IF_EQ: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Redis-based cache backend.
///
/// TTLs are enforced by Redis itself. Pattern removal walks the keyspace
/// with `SCAN MATCH` and deletes each batch as it arrives.
///
/// Every pool checkout and every command is bounded by the operation
/// timeout, so a stalled server surfaces as [`CacheError::Connection`].
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
    timeout: Duration,
}

impl RedisBackend {
    /// Create a backend on an existing pool.
    #[must_use]
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Create a backend from a `redis://` or `rediss://` URL.
    ///
    /// The URL is parsed here; no connection is made until first use.
    /// `timeout` bounds waiting for, creating and recycling pooled
    /// connections as well as each command.
    pub fn from_url(url: &str, pool_size: usize, timeout: Duration) -> CacheResult<Self> {
        let mut pool_config = PoolConfig::new(pool_size.max(1));
        pool_config.timeouts = Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: Some(timeout),
        };

        let mut config = Config::from_url(url);
        config.pool = Some(pool_config);

        let pool = config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            CacheError::Configuration(format!("Failed to create Redis pool: {}", e))
        })?;

        Ok(Self::new(pool, timeout))
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to get Redis connection: {}", e)))
    }

    /// Runs one command under the operation timeout.
    async fn bounded<T>(
        &self,
        action: &str,
        target: &str,
        command: impl Future<Output = Result<T, RedisError>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.timeout, command).await {
            Ok(result) => result.map_err(|e| command_error(action, target, &e)),
            Err(_) => Err(CacheError::Connection(format!(
                "Timed out after {:?} trying to {} '{}'",
                self.timeout, action, target
            ))),
        }
    }
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisBackend")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn command_error(action: &str, target: &str, err: &RedisError) -> CacheError {
    CacheError::Backend(format!("Failed to {} '{}': {}", action, target, err))
}

/// Whole seconds for `SET EX`, rounded up, never zero, never above what
/// Redis accepts.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .clamp(1, MAX_EX_SECS)
}

/// Escapes Redis glob metacharacters so a prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn kind(&self) -> CacheBackendKind {
        CacheBackendKind::Redis
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = self.bounded("get key", key, conn.get(key)).await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let ttl_secs = ttl_secs(ttl);

        self.bounded("set key", key, conn.set_ex::<_, _, ()>(key, value, ttl_secs))
            .await?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = self.bounded("delete key", key, conn.del(key)).await?;

        Ok(deleted > 0)
    }

    async fn remove_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut conn = self.conn().await?;
        let script = Script::new(REMOVE_IF_EQ);
        let mut invocation = script.key(key);
        invocation.arg(expected);

        let deleted: i64 = self
            .bounded(
                "conditionally delete key",
                key,
                invocation.invoke_async(&mut conn),
            )
            .await?;

        Ok(deleted > 0)
    }

    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> CacheResult<u64> {
        let prefix = match pattern {
            KeyPattern::Exact(key) => return self.remove(key).await.map(u64::from),
            KeyPattern::Prefix(prefix) => prefix,
        };

        let mut conn = self.conn().await?;
        let glob = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let mut scan = cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(&glob)
                .arg("COUNT")
                .arg(SCAN_COUNT);
            let (next, keys): (u64, Vec<String>) = self
                .bounded("scan keys matching", &glob, scan.query_async(&mut conn))
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self
                    .bounded("delete keys matching", &glob, conn.del(&keys))
                    .await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Deleted {} keys matching pattern '{}'", deleted, glob);
        Ok(deleted)
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let flush = cmd("FLUSHDB");
        let _: () = self
            .bounded("flush", "database", flush.query_async(&mut conn))
            .await?;

        debug!("Flushed Redis database");
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn().await?;
        let exists: bool = self.bounded("check key", key, conn.exists(key)).await?;

        Ok(exists)
    }
}
