//! No-op backend used when caching is disabled.

use super::CacheBackend;
use crate::{CacheResult, KeyPattern};
use async_trait::async_trait;
use shopfront_config::CacheBackendKind;
use std::time::Duration;

/// Backend that stores nothing.
///
/// Reads always miss and writes are accepted and discarded, so call sites
/// look the same whether or not caching is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    fn kind(&self) -> CacheBackendKind {
        CacheBackendKind::None
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn remove_if_eq(&self, _key: &str, _expected: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn remove_by_pattern(&self, _pattern: &KeyPattern) -> CacheResult<u64> {
        Ok(0)
    }

    async fn clear(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_backend_never_stores() {
        let backend = NullBackend;
        backend
            .set("product:id:1", "{}", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("product:id:1").await.unwrap(), None);
        assert!(!backend.exists("product:id:1").await.unwrap());
        assert!(!backend.remove("product:id:1").await.unwrap());
        assert!(!backend.remove_if_eq("product:id:1", "{}").await.unwrap());
        assert_eq!(
            backend
                .remove_by_pattern(&KeyPattern::parse("products:list*"))
                .await
                .unwrap(),
            0
        );
        assert!(backend.clear().await.is_ok());
    }
}
