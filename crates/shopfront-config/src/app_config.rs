//! Application configuration structures.

use serde::{Deserialize, Serialize};
use shopfront_core::LoggingConfig;
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "shopfront".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Which cache backend to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Process-local map with lazy and swept expiry.
    #[default]
    #[serde(alias = "memory", alias = "in-process")]
    InMemory,
    /// Networked Redis store.
    #[serde(alias = "networked")]
    Redis,
    /// No-op backend; every read misses.
    #[serde(alias = "disabled")]
    None,
}

impl CacheBackendKind {
    /// Returns the configuration name of this backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::Redis => "redis",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; `false` selects the no-op backend regardless of `backend`.
    pub enabled: bool,
    /// Backend kind.
    pub backend: CacheBackendKind,
    /// Redis URL (redis backend only).
    pub connection_string: Option<String>,
    /// TTL applied when callers do not pass one.
    pub default_expiration_minutes: u64,
    /// Namespace prepended to every key as `{prefix}:`.
    pub key_prefix: Option<String>,
    /// Reserved. No backend compresses payloads yet.
    pub enable_compression: bool,
    /// Period of the in-memory expiry sweep. `0` disables the sweeper.
    pub sweep_interval_secs: u64,
    /// Redis connection pool size.
    pub pool_size: usize,
    /// Upper bound on each Redis pool checkout and command, in milliseconds.
    pub operation_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::InMemory,
            connection_string: None,
            default_expiration_minutes: 30,
            key_prefix: None,
            enable_compression: false,
            sweep_interval_secs: 60,
            pool_size: 10,
            operation_timeout_ms: 1000,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_expiration_minutes.saturating_mul(60))
    }

    /// Returns the Redis operation timeout as a Duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Returns the sweep period, or `None` when sweeping is disabled.
    #[must_use]
    pub const fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep_interval_secs))
        }
    }

    /// The backend that will actually run, taking `enabled` into account.
    #[must_use]
    pub const fn effective_backend(&self) -> CacheBackendKind {
        if self.enabled {
            self.backend
        } else {
            CacheBackendKind::None
        }
    }

    /// Returns the key prefix, treating a blank string as unset.
    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}
