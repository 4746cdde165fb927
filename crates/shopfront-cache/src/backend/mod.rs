//! Cache backends.
//!
//! Every backend implements the same [`CacheBackend`] contract. The process
//! picks one at startup through [`Backend::from_config`] and keeps it for
//! its whole lifetime.

mod memory;
mod null;
mod redis;

pub use memory::MemoryBackend;
pub use null::NullBackend;
pub use self::redis::RedisBackend;

use crate::{CacheError, CacheResult, KeyPattern};
use async_trait::async_trait;
use shopfront_config::{CacheBackendKind, CacheConfig};
use std::time::Duration;
use tracing::{info, warn};

/// Storage contract shared by every backend.
///
/// Keys and patterns arrive fully namespaced. Values are JSON text. Errors
/// are reported as-is; [`CacheService`](crate::CacheService) decides how to
/// degrade.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> CacheBackendKind;

    /// Get a raw JSON value.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a raw JSON value, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete a key.
    ///
    /// Returns `true` if a live entry was deleted.
    async fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Delete a key only while it still holds `expected`.
    ///
    /// Returns `true` if the entry was deleted. A value written after
    /// `expected` was read is left alone.
    async fn remove_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool>;

    /// Delete every key matched by `pattern`.
    ///
    /// Returns the number of keys deleted.
    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> CacheResult<u64>;

    /// Delete every key held by this backend.
    async fn clear(&self) -> CacheResult<()>;

    /// Check if a live entry exists for `key`.
    async fn exists(&self, key: &str) -> CacheResult<bool>;
}

/// The backend selected from configuration.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Process-local map.
    Memory(MemoryBackend),
    /// Redis.
    Redis(RedisBackend),
    /// Caching disabled.
    Null(NullBackend),
}

impl Backend {
    /// Builds the configured backend.
    ///
    /// Malformed connection settings fail here rather than on first use.
    /// When the in-memory backend is selected and a Tokio runtime is
    /// running, its expiry sweeper is started as well.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let kind = config.effective_backend();

        if config.enable_compression {
            warn!(backend = %kind, "enable_compression is set but no backend compresses payloads; ignoring");
        }

        let backend = match kind {
            CacheBackendKind::InMemory => {
                let memory = MemoryBackend::new();
                if let Some(period) = config.sweep_interval() {
                    if tokio::runtime::Handle::try_current().is_ok() {
                        memory.spawn_sweeper(period);
                    } else {
                        warn!("No Tokio runtime available; expired entries are evicted on access only");
                    }
                }
                Self::Memory(memory)
            }
            CacheBackendKind::Redis => {
                let url = config
                    .connection_string
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        CacheError::Configuration(
                            "cache.connection_string is required for the redis backend".to_string(),
                        )
                    })?;
                Self::Redis(RedisBackend::from_url(
                    url,
                    config.pool_size,
                    config.operation_timeout(),
                )?)
            }
            CacheBackendKind::None => Self::Null(NullBackend),
        };

        info!(
            backend = %kind,
            default_ttl_secs = config.default_ttl().as_secs(),
            prefix = ?config.key_prefix(),
            "Cache backend initialized"
        );

        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for Backend {
    fn kind(&self) -> CacheBackendKind {
        match self {
            Self::Memory(b) => b.kind(),
            Self::Redis(b) => b.kind(),
            Self::Null(b) => b.kind(),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Memory(b) => b.get(key).await,
            Self::Redis(b) => b.get(key).await,
            Self::Null(b) => b.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Memory(b) => b.set(key, value, ttl).await,
            Self::Redis(b) => b.set(key, value, ttl).await,
            Self::Null(b) => b.set(key, value, ttl).await,
        }
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Memory(b) => b.remove(key).await,
            Self::Redis(b) => b.remove(key).await,
            Self::Null(b) => b.remove(key).await,
        }
    }

    async fn remove_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
        match self {
            Self::Memory(b) => b.remove_if_eq(key, expected).await,
            Self::Redis(b) => b.remove_if_eq(key, expected).await,
            Self::Null(b) => b.remove_if_eq(key, expected).await,
        }
    }

    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> CacheResult<u64> {
        match self {
            Self::Memory(b) => b.remove_by_pattern(pattern).await,
            Self::Redis(b) => b.remove_by_pattern(pattern).await,
            Self::Null(b) => b.remove_by_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        match self {
            Self::Memory(b) => b.clear().await,
            Self::Redis(b) => b.clear().await,
            Self::Null(b) => b.clear().await,
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Memory(b) => b.exists(key).await,
            Self::Redis(b) => b.exists(key).await,
            Self::Null(b) => b.exists(key).await,
        }
    }
}
