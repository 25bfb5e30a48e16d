//! Result cache plugin
//!
//! Stores query results keyed by [`OperationKey`] and serves them according
//! to the operation's [`CachePolicy`]. Results can be tagged; a successful
//! mutation declaring `clear_cache_tags` evicts every entry sharing a tag.
//!
//! Writes are last-write-wins. A slow `cache-and-network` refresh that
//! lands after a newer `network-only` fetch overwrites the newer value.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use turbogql_client::plugins::CachePlugin;
//!
//! let cache = CachePlugin::new();
//! // Keep a clone to bust the cache from outside the pipeline
//! let handle = cache.clone();
//! handle.clear_tags(["posts"]);
//! handle.clear();
//! ```

use crate::plugins::context::OperationContext;
use crate::plugins::core::{ClientPlugin, PluginResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use turbogql_protocol::{CachePolicy, OperationKey, OperationResult, OperationType};

/// A cached query result
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key of the operation that produced the result
    pub key: OperationKey,
    /// The stored result
    pub result: OperationResult,
    /// Tags used for bulk invalidation
    pub tags: HashSet<String>,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Current entry count
    pub current_entries: usize,
}

/// Thread-safe result store with tag invalidation.
#[derive(Debug, Default)]
struct CacheStore {
    entries: RwLock<HashMap<OperationKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    fn get(&self, key: OperationKey) -> Option<OperationResult> {
        let entries = self.entries.read();
        match entries.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: OperationKey, result: &OperationResult, tags: &[String]) {
        // Empty and failed-without-data results are never cached
        if result.data.is_none() {
            debug!("Not caching result for {} without data", key);
            return;
        }

        let entry = CacheEntry {
            key,
            result: result.clone(),
            tags: tags.iter().cloned().collect(),
        };
        self.entries.write().insert(key, entry);
        debug!("Cached result for {}", key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn clear_tags(&self, tags: &HashSet<String>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.tags.is_disjoint(tags));
        before - entries.len()
    }
}

/// Plugin serving and storing query results
///
/// Cloning is cheap and clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct CachePlugin {
    store: Arc<CacheStore>,
}

impl CachePlugin {
    /// Create a plugin with an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every entry
    pub fn clear(&self) {
        debug!("Clearing result cache");
        self.store.clear();
    }

    /// Remove every entry carrying at least one of `tags`
    ///
    /// Returns the number of evicted entries.
    pub fn clear_tags<I, S>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lookup: HashSet<String> = tags.into_iter().map(Into::into).collect();
        let evicted = self.store.clear_tags(&lookup);
        debug!("Evicted {} cache entries for tags {:?}", evicted, lookup);
        evicted
    }

    /// Inspect the entry stored under `key`
    pub fn get(&self, key: OperationKey) -> Option<CacheEntry> {
        self.store.entries.read().get(&key).cloned()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.store.hits.load(Ordering::Relaxed),
            misses: self.store.misses.load(Ordering::Relaxed),
            current_entries: self.store.entries.read().len(),
        }
    }

    fn register_eviction(&self, context: &mut OperationContext) {
        if context.operation.clear_cache_tags.is_empty() {
            return;
        }

        let store = Arc::clone(&self.store);
        let tags: HashSet<String> = context.operation.clear_cache_tags.iter().cloned().collect();
        context.after_query(Box::new(move |result, _| {
            if result.data.is_some() {
                let evicted = store.clear_tags(&tags);
                debug!("Mutation evicted {} cache entries", evicted);
            }
            Ok(())
        }));
    }
}

#[async_trait]
impl ClientPlugin for CachePlugin {
    fn name(&self) -> &str {
        "cache"
    }

    fn description(&self) -> Option<&str> {
        Some("Serves and stores query results with tag-based invalidation")
    }

    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
        match context.kind() {
            OperationType::Mutation => {
                self.register_eviction(context);
                return Ok(());
            }
            OperationType::Subscription => return Ok(()),
            OperationType::Query => {}
        }

        let store = Arc::clone(&self.store);
        let key = context.key;
        let tags = context.operation.tags.clone();
        context.after_query(Box::new(move |result, _| {
            store.put(key, result, &tags);
            Ok(())
        }));

        let policy = context.cache_policy;
        if policy == CachePolicy::NetworkOnly {
            return Ok(());
        }

        let cached = self.store.get(key);
        debug!(
            "Cache {} for {} ({})",
            if cached.is_some() { "hit" } else { "miss" },
            key,
            policy
        );

        match (policy, cached) {
            (CachePolicy::CacheOnly, cached) => {
                context.use_result(cached.unwrap_or_else(OperationResult::empty), true);
            }
            (CachePolicy::CacheFirst, Some(cached)) => context.use_result(cached, true),
            (CachePolicy::CacheAndNetwork, Some(cached)) => context.use_result(cached, false),
            _ => {}
        }

        Ok(())
    }
}
