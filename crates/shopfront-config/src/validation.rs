//! Configuration validation module.
//!
//! Collects every problem in one pass so startup fails with a complete
//! report instead of one error at a time.

use crate::{AppConfig, CacheBackendKind, CacheConfig};
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Redis backend selected without a connection string.
    MissingConnectionString,
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A duration that must be positive is zero.
    NonPositiveDuration { name: String },
    /// A duration exceeds its accepted maximum.
    DurationTooLarge { name: String, value: u64, maximum: u64 },
    /// Pool size is outside the accepted range.
    InvalidPoolSize { value: usize, maximum: usize },
    /// Key prefix contains a character reserved for patterns or separators.
    InvalidKeyPrefix { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConnectionString => {
                write!(f, "cache.connection_string is required for the redis backend")
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::DurationTooLarge {
                name,
                value,
                maximum,
            } => {
                write!(f, "'{}' is {} (must be at most {})", name, value, maximum)
            }
            Self::InvalidPoolSize { value, maximum } => {
                write!(f, "Invalid pool size {} (must be 1-{})", value, maximum)
            }
            Self::InvalidKeyPrefix { value } => {
                write!(
                    f,
                    "Invalid key prefix '{}': must not contain '*' or end with ':'",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;

    /// Maximum default expiration, one year in minutes.
    pub const MAX_EXPIRATION_MINUTES: u64 = 366 * 24 * 60;

    /// Maximum Redis operation timeout, one minute.
    pub const MAX_OPERATION_TIMEOUT_MS: u64 = 60_000;

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_cache(&config.cache, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates cache configuration.
    ///
    /// Redis settings are checked only when redis will actually run.
    pub fn validate_cache(config: &CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.default_expiration_minutes == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "cache.default_expiration_minutes".to_string(),
            });
        } else if config.default_expiration_minutes > Self::MAX_EXPIRATION_MINUTES {
            errors.push(ConfigValidationError::DurationTooLarge {
                name: "cache.default_expiration_minutes".to_string(),
                value: config.default_expiration_minutes,
                maximum: Self::MAX_EXPIRATION_MINUTES,
            });
        }

        if let Some(prefix) = config.key_prefix() {
            if prefix.contains('*') || prefix.ends_with(':') {
                errors.push(ConfigValidationError::InvalidKeyPrefix {
                    value: prefix.to_string(),
                });
            }
        }

        if config.effective_backend() != CacheBackendKind::Redis {
            return;
        }

        match config.connection_string.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigValidationError::MissingConnectionString),
            Some(url) => match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "redis" | "rediss") => {}
                Ok(parsed) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "redis".to_string(),
                    message: format!(
                        "scheme '{}' is not supported, use redis:// or rediss://",
                        parsed.scheme()
                    ),
                }),
                Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "redis".to_string(),
                    message: e.to_string(),
                }),
            },
        }

        if config.operation_timeout_ms == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "cache.operation_timeout_ms".to_string(),
            });
        } else if config.operation_timeout_ms > Self::MAX_OPERATION_TIMEOUT_MS {
            errors.push(ConfigValidationError::DurationTooLarge {
                name: "cache.operation_timeout_ms".to_string(),
                value: config.operation_timeout_ms,
                maximum: Self::MAX_OPERATION_TIMEOUT_MS,
            });
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }
}
