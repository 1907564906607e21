//! In-process cache for hot, rarely-changing catalog reads.
//!
//! Entries live for 5 minutes and are invalidated by admin writes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::models::catalog::{CategoryNode, ProductSummary};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Featured { limit: i64 },
    CategoryTree,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<ProductSummary>>),
    Categories(Arc<Vec<CategoryNode>>),
}

/// Featured products and the category tree.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(100)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    pub async fn featured(&self, limit: i64) -> Option<Arc<Vec<ProductSummary>>> {
        match self.cache.get(&CacheKey::Featured { limit }).await {
            Some(CacheValue::Products(products)) => {
                debug!(limit, "Cache hit for featured products");
                Some(products)
            }
            _ => None,
        }
    }

    pub async fn put_featured(&self, limit: i64, products: Arc<Vec<ProductSummary>>) {
        self.cache
            .insert(CacheKey::Featured { limit }, CacheValue::Products(products))
            .await;
    }

    pub async fn category_tree(&self) -> Option<Arc<Vec<CategoryNode>>> {
        match self.cache.get(&CacheKey::CategoryTree).await {
            Some(CacheValue::Categories(tree)) => {
                debug!("Cache hit for category tree");
                Some(tree)
            }
            _ => None,
        }
    }

    pub async fn put_category_tree(&self, tree: Arc<Vec<CategoryNode>>) {
        self.cache
            .insert(CacheKey::CategoryTree, CacheValue::Categories(tree))
            .await;
    }

    /// Drop every cached product list.
    pub async fn invalidate_products(&self) {
        // Featured lists are keyed by limit, so drop them all.
        if self
            .cache
            .invalidate_entries_if(|key, _| matches!(key, CacheKey::Featured { .. }))
            .is_err()
        {
            self.cache.invalidate_all();
        }
        self.cache.run_pending_tasks().await;
    }

    pub async fn invalidate_categories(&self) {
        self.cache.invalidate(&CacheKey::CategoryTree).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_category_tree_round_trip_and_invalidate() {
        let cache = CatalogCache::default();
        assert!(cache.category_tree().await.is_none());

        cache.put_category_tree(Arc::new(Vec::new())).await;
        assert!(cache.category_tree().await.is_some());

        cache.invalidate_categories().await;
        assert!(cache.category_tree().await.is_none());
    }

    #[tokio::test]
    async fn test_featured_keyed_by_limit() {
        let cache = CatalogCache::default();
        cache.put_featured(8, Arc::new(Vec::new())).await;
        assert!(cache.featured(8).await.is_some());
        assert!(cache.featured(4).await.is_none());
    }
}
