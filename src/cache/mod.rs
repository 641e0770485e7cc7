//! Expiring in-memory key/value cache.
//!
//! Entries expire at a fixed offset from insertion; reads never renew the
//! TTL. Expired entries are invisible to readers immediately and are removed
//! for real by [`ExpiringCache::sweep`], either called directly or from the
//! background sweeper task. Instances are cheap clones sharing one map, so
//! they can be handed to handlers and the sweeper alike.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Shared<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    default_ttl: Duration,
}

pub struct ExpiringCache<K, V> {
    shared: std::sync::Arc<Shared<K, V>>,
}

impl<K, V> Clone for ExpiringCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: std::sync::Arc::clone(&self.shared),
        }
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            shared: std::sync::Arc::new(Shared {
                entries: RwLock::new(HashMap::new()),
                default_ttl,
            }),
        }
    }

    /// Insert with the cache's default TTL, replacing any previous entry.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.shared.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.shared
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    /// Look up an unexpired entry. An expired entry is a miss, whether or not
    /// the sweeper got to it yet.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self
            .shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Remove an entry, returning its value if it was present and unexpired.
    /// An expired entry is evicted too, but reported as absent.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self
            .shared
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .remove(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .shared
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries still held, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic background sweep. The returned handle owns the
    /// task; dropping it leaves the task running, shutting it down stops it.
    #[must_use]
    pub fn spawn_sweeper(&self, interval: Duration, name: &'static str) -> SweeperHandle {
        let cache = self.clone();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh cache is
            // not swept before anything can expire.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            debug!(cache = name, removed, "swept expired entries");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!(cache = name, "sweeper stopped");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            name,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle for one background sweeper task.
pub struct SweeperHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(cache = self.name, "sweeper task failed: {err}");
        }
    }
}
