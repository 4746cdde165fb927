//! Shared fixtures for cache integration tests.

use serde::{Deserialize, Serialize};
use shopfront_cache::{CacheError, CacheService, MemoryBackend};
use shopfront_core::ProductId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub enum StoreError {
    NotFound,
    Unavailable,
    Cache(String),
}

impl From<CacheError> for StoreError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err.to_string())
    }
}

/// Stand-in for the system of record. Counts every read.
#[derive(Default)]
pub struct ProductStore {
    rows: Mutex<HashMap<ProductId, Product>>,
    reads: AtomicUsize,
}

impl ProductStore {
    pub fn insert(&self, name: &str) -> Product {
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
        };
        self.rows
            .lock()
            .unwrap()
            .insert(product.id, product.clone());
        product
    }

    pub async fn find(&self, id: ProductId) -> Result<Product, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn list(&self, page: u32, size: u32) -> Result<Vec<Product>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let skip = (page.saturating_sub(1) * size) as usize;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .skip(skip)
            .take(size as usize)
            .cloned()
            .collect())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

pub fn memory_cache(namespace: Option<&str>) -> CacheService<MemoryBackend> {
    CacheService::new(
        MemoryBackend::new(),
        namespace.map(str::to_string),
        DEFAULT_TTL,
    )
}
