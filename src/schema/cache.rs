//! TTL metadata cache
//!
//! Get-or-load cache with at most one load in flight per key. Concurrent
//! callers for the same key wait on the running load and share its result.
//! A loaded value is served until the TTL elapses; failed loads are not
//! stored.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::schema::error::SchemaResult;
use crate::schema::model::{TableSchema, TransformConfig};
use crate::schema::provider::SchemaProvider;

struct CacheEntry<V> {
    value: V,
    loaded_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<CacheEntry<V>>>>;

/// Keyed TTL cache with single-flight loading
pub struct MetadataCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V: Clone> MetadataCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, running `load` when absent or expired
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.to_string()).or_default().clone()
        };

        // Holding the slot lock across the load makes other callers wait on it
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                tracing::trace!(key = %key, "Metadata cache hit");
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!(key = %key, "Loading metadata");
        let value = match load().await {
            Ok(value) => value,
            Err(e) => {
                if entry.is_none() {
                    self.remove_slot(key, &slot).await;
                }
                return Err(e);
            }
        };
        *entry = Some(CacheEntry {
            value: value.clone(),
            loaded_at: Instant::now(),
        });
        Ok(value)
    }

    /// Remove `slot` from the map if it is still the one stored for `key`
    async fn remove_slot(&self, key: &str, slot: &Slot<V>) {
        let mut slots = self.slots.lock().await;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    /// Drop the entry for `key`
    pub async fn invalidate(&self, key: &str) {
        self.slots.lock().await.remove(key);
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}

/// [`SchemaProvider`] that caches another provider's answers
pub struct CachedSchemaProvider<P> {
    inner: P,
    tables: MetadataCache<Vec<String>>,
    schemas: MetadataCache<TableSchema>,
    transforms: MetadataCache<Vec<TransformConfig>>,
}

impl<P: SchemaProvider> CachedSchemaProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            tables: MetadataCache::new(ttl),
            schemas: MetadataCache::new(ttl),
            transforms: MetadataCache::new(ttl),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Forget everything cached for `table`
    pub async fn invalidate(&self, table: &str) {
        self.schemas.invalidate(table).await;
        self.transforms.invalidate(table).await;
        self.tables.clear().await;
    }
}

#[async_trait]
impl<P: SchemaProvider> SchemaProvider for CachedSchemaProvider<P> {
    async fn list_tables(&self) -> SchemaResult<Vec<String>> {
        self.tables.get_or_load("", || self.inner.list_tables()).await
    }

    async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema> {
        self.schemas.get_or_load(table, || self.inner.get_schema(table)).await
    }

    async fn get_transform_configs(&self, table: &str) -> SchemaResult<Vec<TransformConfig>> {
        self.transforms
            .get_or_load(table, || self.inner.get_transform_configs(table))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::error::SchemaError;
    use crate::schema::provider::tests::{time_series_schema, StaticProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_value_served_until_ttl() {
        let cache = MetadataCache::new(Duration::from_secs(3600));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_load("k", || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, SchemaError>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_value_reloaded() {
        let cache = MetadataCache::new(Duration::ZERO);
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_load("k", || async {
                    Ok::<_, SchemaError>(loads.fetch_add(1, Ordering::SeqCst))
                })
                .await
                .unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cache: MetadataCache<u32> = MetadataCache::new(Duration::from_secs(3600));

        let err = cache
            .get_or_load("k", || async { Err(SchemaError::TableNotFound("k".to_string())) })
            .await;
        assert!(err.is_err());

        let value = cache
            .get_or_load("k", || async { Ok::<_, SchemaError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_failed_keys_leave_no_slot() {
        let cache: MetadataCache<u32> = MetadataCache::new(Duration::from_secs(3600));

        for i in 0..100 {
            let key = format!("missing_{}", i);
            let result = cache
                .get_or_load(&key, || async { Err(SchemaError::TableNotFound(key.clone())) })
                .await;
            assert!(result.is_err());
        }
        assert!(cache.slots.lock().await.is_empty());

        cache.get_or_load("k", || async { Ok::<_, SchemaError>(1) }).await.unwrap();
        assert_eq!(cache.slots.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let cache = Arc::new(MetadataCache::new(Duration::from_secs(3600)));
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    cache
                        .get_or_load("schema", || async {
                            loads.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, SchemaError>("loaded".to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "loaded");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MetadataCache::new(Duration::from_secs(3600));
        cache.get_or_load("k", || async { Ok::<_, SchemaError>(1) }).await.unwrap();
        cache.invalidate("k").await;
        let value = cache.get_or_load("k", || async { Ok::<_, SchemaError>(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_cached_provider() {
        let provider = CachedSchemaProvider::new(
            StaticProvider::default().with_table(time_series_schema("metrics"), vec![]),
            Duration::from_secs(3600),
        );

        for _ in 0..3 {
            let schema = provider.get_schema("metrics").await.unwrap();
            assert_eq!(schema.schema_name, "metrics");
        }
        assert_eq!(provider.inner().schema_fetches.load(Ordering::SeqCst), 1);

        provider.invalidate("metrics").await;
        provider.get_schema("metrics").await.unwrap();
        assert_eq!(provider.inner().schema_fetches.load(Ordering::SeqCst), 2);

        assert!(provider.get_schema("missing").await.is_err());
    }
}
