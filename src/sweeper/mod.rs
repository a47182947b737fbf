//! Background cache maintenance.
//!
//! Runs on a fixed period independent of request traffic: each pass
//! evicts TTL-expired entries, then trims oldest-by-creation entries if
//! the count ceiling is still exceeded. A single loop task owns the
//! schedule; an atomic flag guards against overlapping passes if a
//! sweep ever outlives the period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::cache::ContentCache;

/// Periodic sweeper over one [`ContentCache`].
pub struct MaintenanceSweeper {
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    sweeping: Arc<AtomicBool>,
}

impl MaintenanceSweeper {
    /// Spawn the sweep loop for `cache` with the given period.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(cache: Arc<ContentCache>, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let sweeping = Arc::new(AtomicBool::new(false));

        let shutdown_signal = Arc::clone(&shutdown);
        let sweep_guard = Arc::clone(&sweeping);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Consume the immediate first tick; the first real sweep
            // happens one full period after startup
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::sweep_once(&cache, &sweep_guard).await;
                    }
                    _ = shutdown_signal.notified() => {
                        log::debug!("maintenance sweeper shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            handle: Mutex::new(Some(handle)),
            shutdown,
            sweeping,
        }
    }

    async fn sweep_once(cache: &Arc<ContentCache>, guard: &AtomicBool) {
        if guard.swap(true, Ordering::SeqCst) {
            log::warn!("skipping maintenance sweep: previous pass still running");
            return;
        }

        let expired = cache.evict_expired().await;
        let ceiling = cache.limits().max_entries;
        let trimmed = cache.enforce_count_ceiling(ceiling).await;
        if expired > 0 || trimmed > 0 {
            log::debug!("maintenance sweep removed {expired} expired and {trimmed} excess entries");
        }

        guard.store(false, Ordering::SeqCst);
    }

    /// Whether a sweep pass is currently executing.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::SeqCst)
    }

    /// Stop the sweep loop and wait for it to exit.
    pub async fn stop(&self) {
        self.shutdown.notify_one();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::error!("maintenance sweeper task failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLimits;
    use crate::source::{Clock, SystemClock};
    use std::time::Instant;

    struct BackdatingClock {
        start: Instant,
        offset: std::sync::Mutex<Duration>,
    }

    impl BackdatingClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: std::sync::Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().expect("clock lock") += by;
        }
    }

    impl Clock for BackdatingClock {
        fn now(&self) -> Instant {
            self.start + *self.offset.lock().expect("clock lock")
        }
    }

    fn limits() -> CacheLimits {
        CacheLimits {
            max_entries: 10,
            max_bytes: 100_000,
            max_entry_bytes: 10_000,
            ttl: Duration::from_secs(30),
            size_multiplier: 2,
            overhead_bytes: 64,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sweep_evicts_expired_entries() {
        let clock = Arc::new(BackdatingClock::new());
        let cache = Arc::new(ContentCache::new(limits(), clock.clone()));
        cache.put("stale", "body".to_string(), true).await;

        let sweeper = MaintenanceSweeper::start(Arc::clone(&cache), Duration::from_secs(600));
        // Let the spawned loop register its interval before the paused
        // clock moves; `advance` bumps time before yielding, so without
        // this the first tick would land a full period after the jump
        tokio::task::yield_now().await;

        // Entry ages past TTL; the sweeper removes it on its next pass
        // without any read traffic
        clock.advance(Duration::from_secs(31));
        tokio::time::advance(Duration::from_secs(601)).await;
        for _ in 0..100 {
            if cache.stats().await.entry_count == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.stats().await.entry_count, 0);
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn stop_terminates_the_loop() {
        let cache = Arc::new(ContentCache::new(limits(), Arc::new(SystemClock)));
        let sweeper = MaintenanceSweeper::start(cache, Duration::from_secs(600));
        sweeper.stop().await;
        assert!(!sweeper.is_sweeping());
    }
}
