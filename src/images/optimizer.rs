//! Prompt optimization with a per-run bounded cache.

use crate::error::ImageError;
use crate::provider::PromptOptimizer;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Fixed-capacity map that evicts its oldest entry when full
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert `key` as the newest entry. Returns the evicted oldest entry, if any.
    ///
    /// Re-inserting an existing key replaces its value and makes it the newest.
    pub fn insert_evicting_oldest(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.entries.shift_remove(&key);
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0)
        } else {
            None
        };
        self.entries.insert(key, value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Wraps an optimizer, caching results by prompt and context
pub struct CachingOptimizer {
    inner: Arc<dyn PromptOptimizer>,
    cache: Mutex<BoundedCache<String, String>>,
}

impl CachingOptimizer {
    pub fn new(inner: Arc<dyn PromptOptimizer>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    fn cache_key(prompt: &str, context: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(prompt.as_bytes());
        hasher.update(&[0]);
        hasher.update(context.as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

#[async_trait]
impl PromptOptimizer for CachingOptimizer {
    async fn optimize(&self, prompt: &str, context: &str) -> Result<String, ImageError> {
        let key = Self::cache_key(prompt, context);
        let cached = self.cache.lock().get(&key).cloned();
        if let Some(hit) = cached {
            debug!(cache_key = %&key[..12], "Optimized prompt served from cache");
            return Ok(hit);
        }

        // Lock is not held across the optimizer call; concurrent misses for the
        // same key both call through and the later insert wins.
        let optimized = self.inner.optimize(prompt, context).await?;
        self.cache
            .lock()
            .insert_evicting_oldest(key, optimized.clone());
        Ok(optimized)
    }
}
