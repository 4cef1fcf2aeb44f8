//! Process-wide cache of the resolved [`AssignmentGraph`].
//!
//! The cache holds at most one immutable graph, published by atomically swapping an
//! `Arc`. Readers never block and keep whatever snapshot they loaded, even while
//! a rebuild or an invalidation happens concurrently.
//!
//! Every invalidation bumps a generation counter. A rebuild remembers the generation
//! it started in and only publishes its graph if no invalidation happened in the
//! meantime, so a graph read before a write can never be published after that write
//! has invalidated the cache.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{errors::AuthorizationResult, graph::AssignmentGraph, storage::AuthorizationStorage};


pub const PERMISSION_CACHE_KEY: &str = "warden.permission.cache";


/// Called synchronously after every invalidation.
///
/// This is the extension point for deployments with several serving processes:
/// a hook can forward the invalidation to a shared channel that the other processes
/// listen on (and then invalidate their own caches).
pub trait InvalidationHook: Send + Sync {
    fn on_invalidate(&self, cache_key: &str);
}


/// Forwards invalidations to a `tokio` broadcast channel.
pub struct BroadcastInvalidationHook {
    sender: broadcast::Sender<String>,
}

impl BroadcastInvalidationHook {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl InvalidationHook for BroadcastInvalidationHook {
    fn on_invalidate(&self, cache_key: &str) {
        // No subscribers is fine, there is simply nobody to notify.
        let _ = self.sender.send(cache_key.to_string());
    }
}



struct CachedGraph {
    graph: Arc<AssignmentGraph>,

    built_at: Instant,
}


pub struct AuthorizationCache {
    cache_key: String,

    time_to_live: Duration,

    current: ArcSwapOption<CachedGraph>,

    generation: AtomicU64,

    /// Serializes publishing against invalidation.
    publish_lock: Mutex<()>,

    invalidation_hooks: RwLock<Vec<Arc<dyn InvalidationHook>>>,
}

impl AuthorizationCache {
    pub fn new(time_to_live: Duration) -> Self {
        Self::with_cache_key(PERMISSION_CACHE_KEY, time_to_live)
    }

    pub fn with_cache_key<K>(cache_key: K, time_to_live: Duration) -> Self
    where
        K: Into<String>,
    {
        Self {
            cache_key: cache_key.into(),
            time_to_live,
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
            invalidation_hooks: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    #[inline]
    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Number of invalidations so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn register_invalidation_hook(&self, hook: Arc<dyn InvalidationHook>) {
        self.invalidation_hooks.write().push(hook);
    }

    /// Returns the cached graph, or `None` if the cache is empty or the graph has expired.
    pub fn get(&self) -> Option<Arc<AssignmentGraph>> {
        let cached_graph = self.current.load_full()?;

        if cached_graph.built_at.elapsed() >= self.time_to_live {
            return None;
        }

        Some(cached_graph.graph.clone())
    }

    /// Reads the whole assignment graph from `storage` and publishes it,
    /// unless the cache was invalidated while reading.
    pub async fn rebuild(
        &self,
        storage: &dyn AuthorizationStorage,
    ) -> AuthorizationResult<Arc<AssignmentGraph>> {
        let generation_at_start = self.generation();

        let snapshot = storage.load_snapshot().await?;
        let graph = Arc::new(AssignmentGraph::from_snapshot(snapshot));

        if self.publish_if_current(generation_at_start, graph.clone()) {
            debug!(
                cache_key = self.cache_key.as_str(),
                backend = storage.backend_name(),
                permissions = graph.permission_count(),
                roles = graph.role_count(),
                "Rebuilt and published authorization graph."
            );
        } else {
            debug!(
                cache_key = self.cache_key.as_str(),
                "Cache was invalidated during rebuild, discarding stale graph."
            );
        }

        Ok(graph)
    }

    /// Publishes `graph` if no invalidation happened since `generation_at_start`.
    fn publish_if_current(&self, generation_at_start: u64, graph: Arc<AssignmentGraph>) -> bool {
        let _publish_guard = self.publish_lock.lock();

        if self.generation.load(Ordering::Acquire) != generation_at_start {
            return false;
        }

        self.current.store(Some(Arc::new(CachedGraph {
            graph,
            built_at: Instant::now(),
        })));

        true
    }

    /// Returns the cached graph, rebuilding it from `storage` on a miss.
    pub async fn get_or_rebuild(
        &self,
        storage: &dyn AuthorizationStorage,
    ) -> AuthorizationResult<Arc<AssignmentGraph>> {
        if let Some(graph) = self.get() {
            return Ok(graph);
        }

        self.rebuild(storage).await
    }

    /// Clears the cache unconditionally and notifies every registered hook.
    pub fn invalidate(&self) {
        {
            let _publish_guard = self.publish_lock.lock();

            self.generation.fetch_add(1, Ordering::AcqRel);
            self.current.store(None);
        }

        debug!(
            cache_key = self.cache_key.as_str(),
            "Invalidated authorization cache."
        );

        for hook in self.invalidation_hooks.read().iter() {
            hook.on_invalidate(&self.cache_key);
        }
    }
}



#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::storage::MemoryStorage;

    struct CountingHook {
        invalidations: AtomicUsize,
    }

    impl InvalidationHook for CountingHook {
        fn on_invalidate(&self, cache_key: &str) {
            assert_eq!(cache_key, PERMISSION_CACHE_KEY);
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn caches_until_invalidated() {
        let storage = MemoryStorage::new();
        let cache = AuthorizationCache::new(Duration::from_secs(60));

        assert!(cache.get().is_none());

        let first_graph = cache.get_or_rebuild(&storage).await.unwrap();
        let second_graph = cache.get_or_rebuild(&storage).await.unwrap();
        assert!(Arc::ptr_eq(&first_graph, &second_graph));

        cache.invalidate();
        assert!(cache.get().is_none());
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn expired_graphs_are_misses() {
        let storage = MemoryStorage::new();
        let cache = AuthorizationCache::new(Duration::ZERO);

        cache.rebuild(&storage).await.unwrap();

        assert!(cache.get().is_none());
    }

    #[tokio::test]
    async fn notifies_hooks_on_invalidation() {
        let cache = AuthorizationCache::new(Duration::from_secs(60));

        let counting_hook = Arc::new(CountingHook {
            invalidations: AtomicUsize::new(0),
        });
        let broadcast_hook = Arc::new(BroadcastInvalidationHook::new(8));
        let mut receiver = broadcast_hook.subscribe();

        cache.register_invalidation_hook(counting_hook.clone());
        cache.register_invalidation_hook(broadcast_hook);

        cache.invalidate();
        cache.invalidate();

        assert_eq!(counting_hook.invalidations.load(Ordering::SeqCst), 2);
        assert_eq!(receiver.recv().await.unwrap(), PERMISSION_CACHE_KEY);
        assert_eq!(receiver.recv().await.unwrap(), PERMISSION_CACHE_KEY);
    }


    #[tokio::test]
    async fn stale_rebuild_is_not_published() {
        let storage = MemoryStorage::new();
        let cache = AuthorizationCache::new(Duration::from_secs(60));

        // A rebuild reads its rows, then a write invalidates before it gets to publish.
        let generation_at_start = cache.generation();
        let stale_graph = Arc::new(AssignmentGraph::from_snapshot(
            storage.load_snapshot().await.unwrap(),
        ));
        cache.invalidate();

        assert!(!cache.publish_if_current(generation_at_start, stale_graph));
        assert!(cache.get().is_none());

        // Without a concurrent invalidation the graph is published.
        cache.rebuild(&storage).await.unwrap();
        assert!(cache.get().is_some());
    }
}
