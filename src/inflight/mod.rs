//! Deduplication of concurrent fetches for the same link.
//!
//! All callers asking for one link while its fetch is running converge
//! on a single shared future, so the remote call happens exactly once.
//! The underlying work is spawned: it runs to completion and commits
//! its result even if every awaiting caller has been dropped, which is
//! what lets a canceled debounce ticket still warm the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;

/// Registry of not-yet-settled fetches, keyed by link.
///
/// Invariant: at most one pending entry exists per link; an entry is
/// removed the moment its fetch settles, before the commit step runs,
/// so a failing commit can never leave a stuck entry behind. Entries
/// carry a registration generation so a settling fetch only removes its
/// own entry, never one re-registered under the same link after a
/// `clear`.
pub struct InflightRegistry<T: Clone + Send + Sync + 'static> {
    pending: Mutex<HashMap<String, (u64, Shared<BoxFuture<'static, T>>)>>,
    registrations: AtomicU64,
    dedup_hits: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> InflightRegistry<T> {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            registrations: AtomicU64::new(0),
            dedup_hits: AtomicU64::new(0),
        })
    }

    /// Join the pending fetch for `link`, or start one.
    ///
    /// `factory` performs the fetch itself; `commit` runs once after
    /// the entry has been deregistered (the cache write lives there);
    /// `fallback` produces a result if the spawned task is torn down
    /// by runtime shutdown.
    pub async fn get_or_create<F, C>(
        self: &Arc<Self>,
        link: &str,
        factory: F,
        commit: C,
        fallback: impl FnOnce() -> T + Send + 'static,
    ) -> T
    where
        F: Future<Output = T> + Send + 'static,
        C: FnOnce(T) -> BoxFuture<'static, T> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;

        if let Some((_, existing)) = pending.get(link) {
            self.dedup_hits.fetch_add(1, Ordering::Relaxed);
            let shared = existing.clone();
            drop(pending);
            return shared.await;
        }

        let generation = self.registrations.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::downgrade(self);
        let key = link.to_string();
        let task = tokio::spawn(async move {
            let result = factory.await;
            // Deregister first: the fetch has settled, and whatever
            // commit does must not be able to strand this entry. Only
            // our own generation is removed; after a clear, a successor
            // registered under the same link must stay pending
            if let Some(registry) = registry.upgrade() {
                let mut pending = registry.pending.lock().await;
                let ours = matches!(pending.get(&key), Some((g, _)) if *g == generation);
                if ours {
                    pending.remove(&key);
                }
            }
            commit(result).await
        });

        let link_owned = link.to_string();
        let shared = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("in-flight fetch task for {link_owned} failed: {e}");
                    fallback()
                }
            }
        }
        .boxed()
        .shared();

        pending.insert(link.to_string(), (generation, shared.clone()));
        drop(pending);
        shared.await
    }

    /// Number of fetches currently pending.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// How many callers joined an already-pending fetch.
    #[must_use]
    pub fn dedup_count(&self) -> u64 {
        self.dedup_hits.load(Ordering::Relaxed)
    }

    /// Forget all pending entries and reset the dedup counter.
    ///
    /// Already-running fetches keep running and still commit; they just
    /// stop being joinable by new callers. When they settle, the
    /// generation guard keeps them from touching entries registered
    /// after the clear.
    pub async fn clear(&self) {
        self.pending.lock().await.clear();
        self.dedup_hits.store(0, Ordering::Relaxed);
    }
}
