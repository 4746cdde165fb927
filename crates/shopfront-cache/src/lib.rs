//! # Shopfront Cache
//!
//! Cache-aside layer between request handlers and the system of record.
//!
//! A [`CacheService`] sits on exactly one [`Backend`], chosen at startup from
//! [`CacheConfig`](shopfront_config::CacheConfig): an in-process map, Redis,
//! or a no-op. The service namespaces keys, supplies the default TTL, and
//! isolates backend failures so a cache outage degrades to misses instead of
//! failing the read or write path. [`CacheInvalidator`] drops stale entity
//! and collection keys after a write has been committed.

pub mod backend;
mod error;
pub mod invalidation;
pub mod keys;
pub mod metrics;
mod pattern;
mod service;

pub use backend::{Backend, CacheBackend, MemoryBackend, NullBackend, RedisBackend};
pub use error::{CacheError, CacheResult};
pub use invalidation::{CacheInvalidator, Mutation};
pub use keys::CacheKey;
pub use pattern::KeyPattern;
pub use service::CacheService;
