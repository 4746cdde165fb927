//! Result type aliases for Shopfront.

use crate::ShopfrontError;

/// A specialized `Result` type for Shopfront operations.
pub type ShopfrontResult<T> = Result<T, ShopfrontError>;
