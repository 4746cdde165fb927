//! Cache-aside service on top of a single backend.

use crate::backend::{Backend, CacheBackend};
use crate::metrics;
use crate::{CacheError, CacheResult, KeyPattern};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shopfront_config::CacheConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Namespacing, TTL policy and failure isolation over one backend.
///
/// Backend failures never reach the caller: reads degrade to misses and
/// writes are dropped, with a warning and an error counter for each. The only
/// error a caller sees is a value that cannot be serialized.
///
/// There is no single-flight: two concurrent misses on the same key both run
/// their loader and both write.
#[derive(Debug)]
pub struct CacheService<B = Backend> {
    backend: B,
    namespace: Option<String>,
    default_ttl: Duration,
}

impl CacheService<Backend> {
    /// Builds the service and its backend from configuration.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let backend = Backend::from_config(config)?;
        Ok(Self::new(
            backend,
            config.key_prefix().map(str::to_string),
            config.default_ttl(),
        ))
    }
}

impl<B: CacheBackend> CacheService<B> {
    /// Create a service over `backend`.
    ///
    /// Every key and pattern is stored as `{namespace}:{key}` when a namespace
    /// is given.
    #[must_use]
    pub fn new(backend: B, namespace: Option<String>, default_ttl: Duration) -> Self {
        Self {
            backend,
            namespace,
            default_ttl,
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// TTL applied when a caller passes `None`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The key as stored in the backend.
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key.to_string(),
        }
    }

    fn backend_name(&self) -> &'static str {
        self.backend.kind().as_str()
    }

    /// Logs and counts a backend failure, returning `fallback` in its place.
    fn degrade<T>(
        &self,
        operation: &'static str,
        target: &str,
        result: CacheResult<T>,
        fallback: T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                metrics::record_error(self.backend_name(), operation);
                warn!(
                    backend = self.backend_name(),
                    operation,
                    key = target,
                    error = %e,
                    "Cache operation failed; continuing without cache"
                );
                fallback
            }
        }
    }

    /// Get a typed value.
    ///
    /// Returns `None` on a miss, on a backend failure, and on a stored payload
    /// that no longer deserializes as `T`. The bad payload is removed.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let result = self.backend.get(&full_key).await;

        let Some(json) = self.degrade("get", &full_key, result, None) else {
            metrics::record_miss(self.backend_name());
            debug!("Cache miss for key '{}'", full_key);
            return None;
        };

        match serde_json::from_str::<T>(&json) {
            Ok(value) => {
                metrics::record_hit(self.backend_name());
                debug!("Cache hit for key '{}'", full_key);
                Some(value)
            }
            Err(e) => {
                metrics::record_corrupt_entry(self.backend_name());
                metrics::record_miss(self.backend_name());
                warn!(key = %full_key, error = %e, "Discarding unreadable cache entry");
                // Only the payload just read; a concurrent set may have replaced it.
                let removed = self.backend.remove_if_eq(&full_key, &json).await;
                self.degrade("remove", &full_key, removed, false);
                None
            }
        }
    }

    /// Store a typed value, replacing any existing entry under `key`.
    ///
    /// `ttl` falls back to the configured default.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let full_key = self.full_key(key);
        let json = serde_json::to_string(value).map_err(|source| CacheError::Serialization {
            key: full_key.clone(),
            source,
        })?;
        let ttl = ttl.unwrap_or(self.default_ttl);

        let result = self.backend.set(&full_key, &json, ttl).await;
        if result.is_ok() {
            metrics::record_write(self.backend_name());
        }
        self.degrade("set", &full_key, result, ());
        Ok(())
    }

    /// Remove one key. Returns `true` if a live entry was removed.
    pub async fn remove(&self, key: &str) -> bool {
        let full_key = self.full_key(key);
        let result = self.backend.remove(&full_key).await;
        let removed = self.degrade("remove", &full_key, result, false);
        metrics::record_removals(self.backend_name(), u64::from(removed));
        removed
    }

    /// Remove every key matched by `pattern` (see [`KeyPattern`]).
    ///
    /// Returns the number of keys removed.
    pub async fn remove_by_pattern(&self, pattern: &str) -> u64 {
        let pattern = KeyPattern::parse(pattern).namespaced(self.namespace.as_deref());
        let target = pattern.to_string();
        let result = self.backend.remove_by_pattern(&pattern).await;
        let removed = self.degrade("remove_by_pattern", &target, result, 0);
        metrics::record_removals(self.backend_name(), removed);
        debug!(pattern = %target, removed, "Invalidated cache keys");
        removed
    }

    /// Remove every entry in this service's namespace.
    ///
    /// With a namespace configured this is a prefix removal of
    /// `{namespace}:`, so entries written by other services sharing the
    /// backend survive. Without one the whole backend is cleared.
    pub async fn clear(&self) {
        match &self.namespace {
            Some(namespace) => {
                let pattern = KeyPattern::Prefix(format!("{}:", namespace));
                let target = pattern.to_string();
                let result = self.backend.remove_by_pattern(&pattern).await;
                let removed = self.degrade("clear", &target, result, 0);
                metrics::record_removals(self.backend_name(), removed);
            }
            None => {
                let result = self.backend.clear().await;
                self.degrade("clear", "*", result, ());
            }
        }
        debug!(namespace = ?self.namespace, "Cleared cache");
    }

    /// Check whether a live entry exists for `key`.
    pub async fn exists(&self, key: &str) -> bool {
        let full_key = self.full_key(key);
        let result = self.backend.exists(&full_key).await;
        self.degrade("exists", &full_key, result, false)
    }

    /// Return the cached value, or run `loader`, cache its result and return it.
    ///
    /// A loader error is returned unchanged and nothing is written. Dropping
    /// the returned future before it completes writes nothing either.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        metrics::record_load(self.backend_name());
        let value = loader().await?;
        self.set(key, &value, ttl).await?;
        Ok(value)
    }

    /// Like [`get_or_set`](Self::get_or_set) for loaders that may find
    /// nothing. A `None` result is returned without being cached.
    pub async fn get_or_set_optional<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(Some(cached));
        }

        metrics::record_load(self.backend_name());
        let Some(value) = loader().await? else {
            return Ok(None);
        };
        self.set(key, &value, ttl).await?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, NullBackend};
    use async_trait::async_trait;
    use serde::Deserialize;
    use shopfront_config::CacheBackendKind;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(15 * 60);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ProductView {
        name: String,
        price_cents: u64,
    }

    fn product(name: &str) -> ProductView {
        ProductView {
            name: name.to_string(),
            price_cents: 1999,
        }
    }

    fn memory_service(namespace: Option<&str>) -> CacheService<MemoryBackend> {
        CacheService::new(MemoryBackend::new(), namespace.map(str::to_string), TTL)
    }

    /// Backend whose every operation fails, standing in for an unreachable store.
    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        fn kind(&self) -> CacheBackendKind {
            CacheBackendKind::Redis
        }
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn remove(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn remove_if_eq(&self, _key: &str, _expected: &str) -> CacheResult<bool> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn remove_by_pattern(&self, _pattern: &KeyPattern) -> CacheResult<u64> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn clear(&self) -> CacheResult<()> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
        async fn exists(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Connection("connection refused".to_string()))
        }
    }

    #[derive(Debug, PartialEq)]
    enum LoadError {
        NotFound,
        Cache(String),
    }

    impl From<CacheError> for LoadError {
        fn from(err: CacheError) -> Self {
            Self::Cache(err.to_string())
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = memory_service(None);
        cache.set("product:id:1", &product("lamp"), None).await.unwrap();
        assert_eq!(cache.get::<ProductView>("product:id:1").await, Some(product("lamp")));
    }

    #[tokio::test]
    async fn test_namespace_is_applied() {
        let cache = memory_service(Some("shop"));
        cache.set("product:id:1", &product("lamp"), None).await.unwrap();

        assert!(cache.backend().exists("shop:product:id:1").await.unwrap());
        assert!(!cache.backend().exists("product:id:1").await.unwrap());
        assert_eq!(cache.full_key("categories:list"), "shop:categories:list");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let cache = CacheService::new(MemoryBackend::new(), None, Duration::from_secs(60));
        cache.set("k", &1u32, None).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get::<u32>("k").await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_ttl_overrides_default() {
        let cache = memory_service(None);
        cache.set("k", &1u32, Some(Duration::from_secs(5))).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_miss_and_removed() {
        let cache = memory_service(Some("shop"));
        cache
            .backend()
            .set("shop:product:id:1", "{not json", TTL)
            .await
            .unwrap();

        assert_eq!(cache.get::<ProductView>("product:id:1").await, None);
        assert!(!cache.backend().exists("shop:product:id:1").await.unwrap());
    }

    /// Serves a stale unreadable payload while the store already holds a
    /// newer valid value, as when a `set` lands between read and evict.
    struct StaleReadBackend {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl CacheBackend for StaleReadBackend {
        fn kind(&self) -> CacheBackendKind {
            CacheBackendKind::InMemory
        }
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Ok(Some("{not json".to_string()))
        }
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
            self.inner.set(key, value, ttl).await
        }
        async fn remove(&self, key: &str) -> CacheResult<bool> {
            self.inner.remove(key).await
        }
        async fn remove_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
            self.inner.remove_if_eq(key, expected).await
        }
        async fn remove_by_pattern(&self, pattern: &KeyPattern) -> CacheResult<u64> {
            self.inner.remove_by_pattern(pattern).await
        }
        async fn clear(&self) -> CacheResult<()> {
            self.inner.clear().await
        }
        async fn exists(&self, key: &str) -> CacheResult<bool> {
            self.inner.exists(key).await
        }
    }

    #[tokio::test]
    async fn test_corrupt_read_spares_concurrent_write() {
        let inner = MemoryBackend::new();
        let cache = CacheService::new(StaleReadBackend { inner: inner.clone() }, None, TTL);
        cache.set("product:id:1", &product("lamp"), None).await.unwrap();

        assert_eq!(cache.get::<ProductView>("product:id:1").await, None);

        let stored = inner.get("product:id:1").await.unwrap();
        let stored: ProductView = serde_json::from_str(&stored.unwrap()).unwrap();
        assert_eq!(stored, product("lamp"));
    }

    #[tokio::test]
    async fn test_incompatible_entry_is_miss() {
        let cache = memory_service(None);
        cache.set("k", &"just a string", None).await.unwrap();
        assert_eq!(cache.get::<ProductView>("k").await, None);
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_serialization_failure_is_surfaced() {
        let cache = memory_service(None);
        // JSON object keys must be strings.
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], "x");

        let err = cache.set("k", &bad, None).await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_remove_by_pattern_stays_in_namespace() {
        let backend = MemoryBackend::new();
        let shop = CacheService::new(backend.clone(), Some("shop".to_string()), TTL);
        let admin = CacheService::new(backend.clone(), Some("admin".to_string()), TTL);

        shop.set("products:list:page:1:size:10", &vec![1], None).await.unwrap();
        admin.set("products:list:page:1:size:10", &vec![1], None).await.unwrap();

        assert_eq!(shop.remove_by_pattern("products:list*").await, 1);
        assert!(!shop.exists("products:list:page:1:size:10").await);
        assert!(admin.exists("products:list:page:1:size:10").await);
    }

    #[tokio::test]
    async fn test_clear_stays_in_namespace() {
        let backend = MemoryBackend::new();
        let shop = CacheService::new(backend.clone(), Some("shop".to_string()), TTL);
        let admin = CacheService::new(backend.clone(), Some("admin".to_string()), TTL);

        shop.set("a", &1, None).await.unwrap();
        shop.set("b", &2, None).await.unwrap();
        admin.set("a", &3, None).await.unwrap();

        shop.clear().await;
        assert!(!shop.exists("a").await);
        assert!(!shop.exists("b").await);
        assert_eq!(admin.get::<i32>("a").await, Some(3));
    }

    #[tokio::test]
    async fn test_clear_without_namespace_empties_backend() {
        let cache = memory_service(None);
        cache.set("a", &1, None).await.unwrap();
        cache.set("b", &2, None).await.unwrap();
        cache.clear().await;
        assert!(cache.backend().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_set_loads_once() {
        let cache = memory_service(None);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first: Result<ProductView, LoadError> = cache
            .get_or_set("product:id:1", None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(product("lamp"))
            })
            .await;
        assert_eq!(first, Ok(product("lamp")));

        let second: Result<ProductView, LoadError> = cache
            .get_or_set("product:id:1", None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(product("chair"))
            })
            .await;
        assert_eq!(second, Ok(product("lamp")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_loader_error_is_not_cached() {
        let cache = memory_service(None);

        let result: Result<ProductView, LoadError> = cache
            .get_or_set("product:id:1", None, || async { Err(LoadError::NotFound) })
            .await;

        assert_eq!(result, Err(LoadError::NotFound));
        assert!(!cache.exists("product:id:1").await);
    }

    #[tokio::test]
    async fn test_get_or_set_optional_does_not_cache_none() {
        let cache = memory_service(None);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let result: Result<Option<ProductView>, LoadError> = cache
                .get_or_set_optional("product:id:404", None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await;
            assert_eq!(result, Ok(None));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!cache.exists("product:id:404").await);
    }

    #[tokio::test]
    async fn test_get_or_set_optional_caches_some() {
        let cache = memory_service(None);

        let loaded: Result<Option<ProductView>, LoadError> = cache
            .get_or_set_optional("product:id:1", None, || async { Ok(Some(product("lamp"))) })
            .await;
        assert_eq!(loaded, Ok(Some(product("lamp"))));
        assert_eq!(cache.get::<ProductView>("product:id:1").await, Some(product("lamp")));
    }

    #[tokio::test]
    async fn test_cancelled_get_or_set_writes_nothing() {
        let cache = memory_service(None);

        let pending = cache.get_or_set::<ProductView, LoadError, _, _>("product:id:1", None, || async {
            std::future::pending::<()>().await;
            Ok(product("never"))
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert!(timed_out.is_err());
        assert!(!cache.exists("product:id:1").await);
    }

    #[tokio::test]
    async fn test_null_backend_is_pass_through() {
        let cache = CacheService::new(NullBackend, None, TTL);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        cache.set("k", &1, None).await.unwrap();
        assert_eq!(cache.get::<i32>("k").await, None);
        assert!(!cache.remove("k").await);
        assert_eq!(cache.remove_by_pattern("k*").await, 0);
        cache.clear().await;

        for _ in 0..2 {
            let value: Result<i32, LoadError> = cache
                .get_or_set("k", None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backend_failures_degrade() {
        let cache = CacheService::new(FailingBackend, Some("shop".to_string()), TTL);

        assert_eq!(cache.get::<i32>("k").await, None);
        assert!(cache.set("k", &1, None).await.is_ok());
        assert!(!cache.remove("k").await);
        assert_eq!(cache.remove_by_pattern("products:list*").await, 0);
        assert!(!cache.exists("k").await);
        cache.clear().await;

        let value: Result<i32, LoadError> =
            cache.get_or_set("k", None, || async { Ok(42) }).await;
        assert_eq!(value, Ok(42));
    }
}
