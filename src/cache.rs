//! In-memory cache for remote relevance scores.
//!
//! Caches one score per `(model, query, document)` triple, keyed by a hash
//! of the already-truncated strings that were (or would be) sent to the
//! remote service. Uses [`moka`] for async-friendly caching with TTL and
//! capacity-bounded eviction. Each engine owns its own cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

/// Cache key: hash of model id, truncated query and truncated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreKey(u64);

impl ScoreKey {
    /// Build a deterministic key for one scoring pair.
    pub fn new(model: &str, query: &str, document: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        query.hash(&mut hasher);
        document.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Per-engine remote score cache. Disabled when the TTL is zero.
#[derive(Clone)]
pub struct ScoreCache {
    inner: Option<Cache<ScoreKey, f64>>,
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl ScoreCache {
    /// Create a cache holding at most `capacity` scores for `ttl_seconds`.
    pub fn new(ttl_seconds: u64, capacity: u64) -> Self {
        if ttl_seconds == 0 || capacity == 0 {
            return Self::disabled();
        }
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Self { inner: Some(inner) }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a cached score. Always `None` when disabled.
    pub async fn get(&self, key: &ScoreKey) -> Option<f64> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    /// Store a score. No-op when disabled.
    pub async fn insert(&self, key: ScoreKey, score: f64) {
        if let Some(cache) = &self.inner {
            cache.insert(key, score).await;
        }
    }
}
