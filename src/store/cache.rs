//! Cache of full-entity views.
//!
//! Building a full entity joins the entity row with its project, episode and
//! tasks. The result is cached by entity id in an LRU. Misses are cached too
//! (as [`CachedEntity::Missing`]), so a lookup that found nothing keeps
//! finding nothing until the entry is invalidated or evicted.
//!
//! Every invalidation bumps a cache-wide generation. A reader that loaded
//! from the store stores its result with [`EntityCache::put_if_current`],
//! which refuses the write when an invalidation happened since the reader
//! took its [`EntityCache::generation`]. A view read before a delete can
//! therefore never land in the cache after it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;

use crate::model::FullEntity;

/// Default number of full-entity views kept in memory.
pub const DEFAULT_ENTITY_CACHE_CAPACITY: usize = 1_000;

/// A cached lookup result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntity {
    Present(Arc<FullEntity>),
    Missing,
}

impl CachedEntity {
    pub fn into_option(self) -> Option<Arc<FullEntity>> {
        match self {
            CachedEntity::Present(entity) => Some(entity),
            CachedEntity::Missing => None,
        }
    }
}

impl From<Option<FullEntity>> for CachedEntity {
    fn from(value: Option<FullEntity>) -> Self {
        match value {
            Some(entity) => CachedEntity::Present(Arc::new(entity)),
            None => CachedEntity::Missing,
        }
    }
}

/// LRU cache of full-entity views keyed by entity id.
///
/// Safe to share across tasks; all access goes through an async `RwLock`.
pub struct EntityCache {
    cache: RwLock<LruCache<String, CachedEntity>>,
    capacity: NonZeroUsize,

    /// Bumped under the write lock by every invalidation
    generation: AtomicU64,
}

impl EntityCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ENTITY_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            capacity,
            generation: AtomicU64::new(0),
        }
    }

    /// Look up an entry, marking it as recently used.
    pub async fn get(&self, entity_id: &str) -> Option<CachedEntity> {
        let mut cache = self.cache.write().await;
        cache.get(entity_id).cloned()
    }

    /// Check for an entry without updating LRU order.
    pub async fn contains(&self, entity_id: &str) -> bool {
        let cache = self.cache.read().await;
        cache.contains(entity_id)
    }

    /// Store a lookup result, replacing any previous entry.
    pub async fn put(&self, entity_id: impl Into<String>, entry: CachedEntity) {
        let mut cache = self.cache.write().await;
        cache.put(entity_id.into(), entry);
    }

    /// Current invalidation generation. Take it before reading the store.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a lookup result unless the cache was invalidated after
    /// `generation` was taken. Returns whether the entry was stored.
    pub async fn put_if_current(
        &self,
        entity_id: impl Into<String>,
        entry: CachedEntity,
        generation: u64,
    ) -> bool {
        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        cache.put(entity_id.into(), entry);
        true
    }

    /// Drop the entry for an entity. Returns whether one was present.
    pub async fn invalidate(&self, entity_id: &str) -> bool {
        let mut cache = self.cache.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        cache.pop(entity_id).is_some()
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        cache.clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}
