//! Bounded LRU cache of loaded model bundles
//!
//! Keyed by resolved artifact path. Loads run outside the lock, so two
//! simultaneous misses on the same path may both load the artifact; the first
//! bundle inserted wins and every later call returns that instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ServeError;
use crate::model::ModelBundle;

/// Default number of bundles kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Cache entry
struct CacheEntry {
    bundle: Arc<ModelBundle>,
    /// Logical clock value of the last access
    last_accessed: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<PathBuf, CacheEntry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, path: &Path) -> Option<Arc<ModelBundle>> {
        let now = self.tick();
        let entry = self.entries.get_mut(path)?;
        entry.last_accessed = now;
        Some(Arc::clone(&entry.bundle))
    }

    /// Drop least-recently-used entries until at most `keep` remain
    fn evict_to(&mut self, keep: usize) {
        while self.entries.len() > keep {
            let lru = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(path, _)| path.clone());

            match lru {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Evicting model");
                    self.entries.remove(&path);
                }
                None => break,
            }
        }
    }
}

/// Model cache
///
/// - Returns the same `Arc` for repeated requests of one path
/// - Calls the loader once per distinct path until that path is evicted
/// - Evicts the least recently used bundle when full
pub struct ModelCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl ModelCache {
    /// Create a cache holding at most `capacity` bundles (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached bundle for `path`, refreshing its recency
    pub fn get(&self, path: &Path) -> Option<Arc<ModelBundle>> {
        self.lock().touch(path)
    }

    /// Cached bundle for `path`, or the result of `load` on a miss
    ///
    /// Load errors are returned as-is and nothing is cached.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<Arc<ModelBundle>, ServeError>
    where
        F: FnOnce(&Path) -> Result<ModelBundle, ServeError>,
    {
        if let Some(bundle) = self.get(path) {
            tracing::debug!(path = %path.display(), "Model cache hit");
            return Ok(bundle);
        }

        tracing::debug!(path = %path.display(), "Model cache miss");
        let bundle = Arc::new(load(path)?);

        let mut state = self.lock();
        if let Some(existing) = state.touch(path) {
            return Ok(existing);
        }

        state.evict_to(self.capacity - 1);
        let now = state.tick();
        state.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                bundle: Arc::clone(&bundle),
                last_accessed: now,
            },
        );

        Ok(bundle)
    }

    /// Drop one entry; returns whether it was cached
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().entries.remove(path).is_some()
    }

    /// Cached paths, most recently used first
    pub fn loaded(&self) -> Vec<PathBuf> {
        let state = self.lock();
        let mut entries: Vec<(&PathBuf, u64)> = state
            .entries
            .iter()
            .map(|(path, entry)| (path, entry.last_accessed))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.into_iter().map(|(path, _)| path.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
