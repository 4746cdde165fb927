//! Cache key builders for consistent key naming.
//!
//! The rendered strings are an external contract: any component that builds
//! keys on its own must produce exactly these shapes. Keys are un-namespaced
//! here; [`CacheService`](crate::CacheService) applies the configured prefix.

use shopfront_core::{CategoryId, ProductId, UserId};
use std::fmt;
use std::time::Duration;

/// TTL for user lookups (30 minutes).
pub const USER_TTL: Duration = Duration::from_secs(30 * 60);

/// TTL for product lookups and product pages (15 minutes).
pub const PRODUCT_TTL: Duration = Duration::from_secs(15 * 60);

/// TTL for category lookups (1 hour).
pub const CATEGORY_TTL: Duration = Duration::from_secs(60 * 60);

const PRODUCTS_LIST: &str = "products:list";
const CATEGORIES_LIST: &str = "categories:list";

/// A typed cache key.
///
/// Attributes are named fields, so the rendered key never depends on the
/// order in which a caller supplies them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `user:id:{id}`
    UserById(UserId),
    /// `user:email:{email}`, email lower-cased when rendered.
    UserByEmail(String),
    /// `product:id:{id}`
    ProductById(ProductId),
    /// `products:list:page:{page}:size:{size}`
    ProductsList { page: u32, size: u32 },
    /// `category:id:{id}`
    CategoryById(CategoryId),
    /// `categories:list`
    CategoriesList,
}

impl CacheKey {
    /// Returns the TTL that entries under this key normally get.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        match self {
            Self::UserById(_) | Self::UserByEmail(_) => USER_TTL,
            Self::ProductById(_) | Self::ProductsList { .. } => PRODUCT_TTL,
            Self::CategoryById(_) | Self::CategoriesList => CATEGORY_TTL,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserById(id) => write!(f, "user:id:{}", id),
            Self::UserByEmail(email) => write!(f, "user:email:{}", email.to_lowercase()),
            Self::ProductById(id) => write!(f, "product:id:{}", id),
            Self::ProductsList { page, size } => {
                write!(f, "{}:page:{}:size:{}", PRODUCTS_LIST, page, size)
            }
            Self::CategoryById(id) => write!(f, "category:id:{}", id),
            Self::CategoriesList => f.write_str(CATEGORIES_LIST),
        }
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

/// Generate a cache key for a user by ID.
#[must_use]
pub fn user_by_id(id: UserId) -> String {
    CacheKey::UserById(id).to_string()
}

/// Generate a cache key for a user by email.
#[must_use]
pub fn user_by_email(email: &str) -> String {
    CacheKey::UserByEmail(email.to_string()).to_string()
}

/// Generate a cache key for a product by ID.
#[must_use]
pub fn product_by_id(id: ProductId) -> String {
    CacheKey::ProductById(id).to_string()
}

/// Generate a cache key for one page of the product list.
#[must_use]
pub fn products_list(page: u32, size: u32) -> String {
    CacheKey::ProductsList { page, size }.to_string()
}

/// Generate a cache key for a category by ID.
#[must_use]
pub fn category_by_id(id: CategoryId) -> String {
    CacheKey::CategoryById(id).to_string()
}

/// Generate the cache key for the category list.
#[must_use]
pub fn categories_list() -> String {
    CacheKey::CategoriesList.to_string()
}

/// Pattern matching every cached entry for one product.
#[must_use]
pub fn product_pattern(id: ProductId) -> String {
    format!("product:id:{}*", id)
}

/// Pattern matching every cached product by ID.
#[must_use]
pub fn all_products_pattern() -> String {
    "product:id:*".to_string()
}

/// Pattern matching every cached page of the product list.
#[must_use]
pub fn products_list_pattern() -> String {
    format!("{}*", PRODUCTS_LIST)
}

/// Pattern matching every cached entry for one category.
#[must_use]
pub fn category_pattern(id: CategoryId) -> String {
    format!("category:id:{}*", id)
}

/// Pattern matching the cached category list.
#[must_use]
pub fn categories_list_pattern() -> String {
    format!("{}*", CATEGORIES_LIST)
}
