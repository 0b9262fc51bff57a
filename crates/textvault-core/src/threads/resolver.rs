//! Cached address-to-thread resolution with graceful degradation.

use tracing::{debug, warn};

use super::registry::ThreadRegistry;
use crate::lru::LruCache;

/// Maximum number of address → thread-id mappings kept per run.
pub const THREAD_CACHE_CAPACITY: usize = 500;

/// Resolves recipient addresses to conversation-thread ids through a bounded
/// LRU cache.
///
/// If the underlying registry fails once, the resolver permanently disables
/// itself for the remainder of the run and answers "unavailable" without
/// retrying the capability. The cache lives for one restore run; a new run
/// gets a fresh resolver.
pub struct ThreadResolver<'a, R> {
    registry: &'a R,
    cache: LruCache<String, i64>,
    available: bool,
}

impl<'a, R: ThreadRegistry> ThreadResolver<'a, R> {
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            cache: LruCache::new(THREAD_CACHE_CAPACITY),
            available: true,
        }
    }

    /// Resolves an address to a thread id, or `None` when the capability is
    /// unavailable.
    pub async fn resolve(&mut self, address: &str) -> Option<i64> {
        if !self.available || address.is_empty() {
            return None;
        }
        if let Some(id) = self.cache.get(&address.to_string()) {
            return Some(*id);
        }
        match self.registry.get_or_create_thread(address).await {
            Ok(id) => {
                debug!(address, id, "resolved thread");
                self.cache.insert(address.to_string(), id);
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "thread registry failed, disabling resolution for this run");
                self.available = false;
                None
            }
        }
    }

    /// Whether the registry is still considered usable.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }
}
