//! Write-path invalidation.
//!
//! Stale keys are dropped strictly after the write that made them stale has
//! been committed. A read that raced the write may still repopulate a key
//! with pre-write data right after invalidation; that window is bounded by
//! the entry's TTL.

use crate::backend::{Backend, CacheBackend};
use crate::keys;
use crate::CacheService;
use shopfront_core::{CategoryId, ProductId, UserId};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A committed change to an entity whose cached views must be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A user was created, updated or deleted.
    ///
    /// `email` is the address the user was cached under. When the email
    /// itself changed, invalidate the old address too.
    User { id: UserId, email: String },
    /// A product was created, updated or deleted.
    Product { id: ProductId },
    /// A category was created, updated or deleted.
    Category { id: CategoryId },
}

impl Mutation {
    /// Patterns covering every key that may now be stale.
    #[must_use]
    pub fn stale_patterns(&self) -> Vec<String> {
        match self {
            Self::User { id, email } => vec![keys::user_by_id(*id), keys::user_by_email(email)],
            Self::Product { id } => vec![keys::product_pattern(*id), keys::products_list_pattern()],
            // Product views embed their category's name.
            Self::Category { id } => vec![
                keys::category_pattern(*id),
                keys::categories_list_pattern(),
                keys::all_products_pattern(),
                keys::products_list_pattern(),
            ],
        }
    }
}

/// Drops stale cache entries after committed writes.
#[derive(Debug)]
pub struct CacheInvalidator<B = Backend> {
    cache: Arc<CacheService<B>>,
}

impl<B> Clone for CacheInvalidator<B> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<B: CacheBackend> CacheInvalidator<B> {
    /// Create an invalidator over a shared cache service.
    #[must_use]
    pub fn new(cache: Arc<CacheService<B>>) -> Self {
        Self { cache }
    }

    /// Invalidate every key made stale by an already committed mutation.
    ///
    /// Returns the number of keys removed. Backend failures are absorbed by
    /// the service.
    pub async fn invalidate(&self, mutation: &Mutation) -> u64 {
        let mut removed = 0;
        for pattern in mutation.stale_patterns() {
            removed += self.cache.remove_by_pattern(&pattern).await;
        }

        debug!(?mutation, removed, "Invalidated cache after commit");
        removed
    }

    /// Run a write and invalidate its mutation once it has committed.
    ///
    /// The write resolves to its result plus the [`Mutation`] it committed.
    /// Nothing is invalidated when the write fails.
    pub async fn after_commit<T, E, F, Fut>(&self, write: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, Mutation), E>>,
    {
        let (value, mutation) = write().await?;
        self.invalidate(&mutation).await;
        Ok(value)
    }
}
