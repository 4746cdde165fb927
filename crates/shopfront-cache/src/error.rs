//! Cache error types.

use shopfront_core::ShopfrontError;
use thiserror::Error;

/// Errors raised inside the cache layer.
///
/// Only [`CacheError::Serialization`] and [`CacheError::Configuration`] ever
/// leave [`CacheService`](crate::CacheService); backend and connection
/// failures are logged and turned into misses.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The value could not be encoded as JSON.
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend rejected or failed a command.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// No connection to the backend could be obtained.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The backend could not be built from configuration.
    #[error("Cache configuration error: {0}")]
    Configuration(String),
}

/// A specialized `Result` type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for ShopfrontError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Configuration(message) => Self::Configuration(message),
            other => Self::Cache(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_maps_to_configuration() {
        let err: ShopfrontError = CacheError::Configuration("bad url".to_string()).into();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_serialization_maps_to_cache() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err: ShopfrontError = CacheError::Serialization {
            key: "product:id:1".to_string(),
            source,
        }
        .into();
        assert_eq!(err.error_code(), "CACHE_ERROR");
        assert!(err.to_string().contains("product:id:1"));
    }
}
