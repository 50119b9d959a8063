//! Process-wide cache of loaded indexes.
//!
//! Entries are keyed by [`IndexPaths`] and loaded lazily on first use. A rebuild
//! either calls [`IndexCache::invalidate`] so the next query reloads from disk, or
//! swaps a freshly built pairing in with [`IndexCache::replace`]. Both swap a
//! single `Arc<LoadedIndex>`, so queries already holding the old pairing finish
//! against it unchanged.

use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, info};

use super::{IndexPaths, IndexResult, LoadedIndex};

/// Lazily-initialized, reload-on-demand cache of loaded indexes.
#[derive(Clone)]
pub struct IndexCache {
    cache: Cache<IndexPaths, Arc<LoadedIndex>>,
}

impl IndexCache {
    /// Create a cache holding at most `max_entries` index pairings.
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_entries).build();
        Self { cache }
    }

    /// Return the cached pairing for `paths`, loading it from disk on a miss.
    ///
    /// Concurrent misses for the same key load the files once.
    ///
    /// # Errors
    /// Returns `IndexError::Unavailable` if the files cannot be loaded; nothing
    /// is cached in that case, so a later call retries.
    pub fn get_or_load(&self, paths: &IndexPaths) -> IndexResult<Arc<LoadedIndex>> {
        self.cache
            .try_get_with(paths.clone(), || {
                debug!("Index cache miss for {}", paths.index.display());
                LoadedIndex::load(paths).map(Arc::new)
            })
            .map_err(|e| (*e).clone())
    }

    /// Cached pairing for `paths`, without loading.
    pub fn get(&self, paths: &IndexPaths) -> Option<Arc<LoadedIndex>> {
        self.cache.get(paths)
    }

    /// Swap in a freshly built pairing for `paths`.
    pub fn replace(&self, paths: IndexPaths, loaded: LoadedIndex) -> Arc<LoadedIndex> {
        let loaded = Arc::new(loaded);
        info!("Replacing cached index for {}", paths.index.display());
        self.cache.insert(paths, Arc::clone(&loaded));
        loaded
    }

    /// Drop the cached pairing for `paths`; the next lookup reloads it.
    pub fn invalidate(&self, paths: &IndexPaths) {
        info!("Invalidating cached index for {}", paths.index.display());
        self.cache.invalidate(paths);
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(4)
    }
}
