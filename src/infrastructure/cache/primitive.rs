//! Synchronous cache primitive backed by moka

use std::fmt::Debug;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache as MokaCache;
use thiserror::Error;

/// Failure of a create-if-absent insert
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddError {
    #[error("item '{0}' already exists")]
    Exists(String),
}

/// A blocking, non-cancellable key-value cache
///
/// Implementations provide their own thread-safety; callers add no locking.
pub trait SyncCache<V>: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<V>;

    /// Inserts only if `key` is absent
    fn add(&self, key: &str, value: V, ttl: Duration) -> Result<(), AddError>;

    fn delete(&self, key: &str);
}

/// Configuration for [`MokaSyncCache`]
#[derive(Debug, Clone)]
pub struct MokaSyncCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
}

impl Default for MokaSyncCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl MokaSyncCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

#[derive(Debug, Clone)]
struct TimedEntry<V> {
    value: V,
    ttl: Duration,
}

/// Expires every entry after the TTL it was added with
struct PerEntryTtl;

impl<V> Expiry<String, TimedEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TimedEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory cache with per-entry TTL
pub struct MokaSyncCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: MokaCache<String, TimedEntry<V>>,
    config: MokaSyncCacheConfig,
}

impl<V> Debug for MokaSyncCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaSyncCache")
            .field("max_capacity", &self.config.max_capacity)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl<V> Default for MokaSyncCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MokaSyncCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_config(MokaSyncCacheConfig::default())
    }

    pub fn with_config(config: MokaSyncCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache, config }
    }
}

impl<V> SyncCache<V> for MokaSyncCache<V>
where
    V: Clone + Debug + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).map(|entry| entry.value)
    }

    fn add(&self, key: &str, value: V, ttl: Duration) -> Result<(), AddError> {
        // The entry API makes check-and-insert atomic across threads
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(|| TimedEntry { value, ttl });

        if entry.is_fresh() {
            Ok(())
        } else {
            Err(AddError::Exists(key.to_string()))
        }
    }

    fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }
}
