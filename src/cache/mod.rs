//! Bounded content cache with TTL and true-LRU eviction.
//!
//! Entries are keyed by link string and hold sanitized, marker-wrapped
//! content (or a negative record of a failed resolution). Three bounds
//! apply: entry count, total estimated bytes, and a single-entry
//! ceiling above which content is returned to the caller but never
//! retained. Expired entries are evicted lazily on read and proactively
//! by the maintenance sweeper.
//!
//! The size estimate is a policy heuristic
//! (`content.len() * multiplier + overhead`), deliberately configurable
//! rather than precise.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::ResolverConfig;
use crate::source::Clock;

/// One cached resolution, positive or negative.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Marker-wrapped sanitized content, or the original link for a
    /// negative entry
    pub content: String,
    /// When the entry was created; drives TTL
    pub created_at: Instant,
    /// Last cache hit; drives LRU ordering
    pub last_accessed: Instant,
    /// Estimated footprint counted against the byte budget
    pub size_bytes: usize,
    /// `false` marks a cached failure (negative entry)
    pub valid: bool,
}

/// Capacity and TTL policy for a [`ContentCache`].
#[derive(Debug, Clone)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_bytes: usize,
    pub max_entry_bytes: usize,
    pub ttl: Duration,
    pub size_multiplier: usize,
    pub overhead_bytes: usize,
}

impl CacheLimits {
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            max_entries: config.cache_max_entries(),
            max_bytes: config.cache_max_bytes(),
            max_entry_bytes: config.max_entry_bytes(),
            ttl: config.cache_ttl(),
            size_multiplier: config.entry_size_multiplier,
            overhead_bytes: config.entry_overhead_bytes,
        }
    }
}

/// Read-only counters for observability.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`; zero lookups count as 0.0.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

struct CacheState {
    /// Unbounded LRU; both bounds are enforced manually in `put` so the
    /// byte accounting stays exact
    entries: LruCache<String, CacheEntry>,
    total_bytes: usize,
    hits: u64,
    misses: u64,
}

/// Bounded key/value store for resolved page content.
pub struct ContentCache {
    state: Mutex<CacheState>,
    limits: CacheLimits,
    clock: Arc<dyn Clock>,
}

impl ContentCache {
    #[must_use]
    pub fn new(limits: CacheLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                total_bytes: 0,
                hits: 0,
                misses: 0,
            }),
            limits,
            clock,
        }
    }

    /// Estimated footprint for content of the given character length.
    #[must_use]
    pub fn estimate_size(&self, content_len: usize) -> usize {
        content_len * self.limits.size_multiplier + self.limits.overhead_bytes
    }

    /// Look up a link, promoting it to most-recently-used on a hit.
    ///
    /// A TTL-expired entry is removed on the spot and reported absent,
    /// so stale entries never linger against the capacity bounds.
    pub async fn get(&self, link: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let expired = match state.entries.peek(link) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => now.duration_since(entry.created_at) > self.limits.ttl,
        };

        if expired {
            if let Some(old) = state.entries.pop(link) {
                state.total_bytes = state.total_bytes.saturating_sub(old.size_bytes);
            }
            state.misses += 1;
            return None;
        }

        state.hits += 1;
        let entry = state.entries.get_mut(link)?;
        entry.last_accessed = now;
        Some(entry.clone())
    }

    /// Insert content for a link, evicting LRU entries to make room.
    ///
    /// Returns `false` when the content exceeds the single-entry
    /// ceiling and was deliberately not retained.
    pub async fn put(&self, link: &str, content: String, valid: bool) -> bool {
        let size_bytes = self.estimate_size(content.len());
        // The total budget caps the per-entry ceiling: limits built by
        // hand could otherwise admit one entry larger than the budget
        let retain_cap = self.limits.max_entry_bytes.min(self.limits.max_bytes);
        if size_bytes > retain_cap {
            log::debug!(
                "not caching {link}: estimated {size_bytes} bytes exceeds per-entry ceiling {retain_cap}"
            );
            return false;
        }

        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if let Some(old) = state.entries.pop(link) {
            state.total_bytes = state.total_bytes.saturating_sub(old.size_bytes);
        }

        while !state.entries.is_empty()
            && (state.entries.len() >= self.limits.max_entries
                || state.total_bytes + size_bytes > self.limits.max_bytes)
        {
            if let Some((evicted_link, evicted)) = state.entries.pop_lru() {
                state.total_bytes = state.total_bytes.saturating_sub(evicted.size_bytes);
                log::trace!("evicted {evicted_link} to make room");
            }
        }

        state.entries.put(
            link.to_string(),
            CacheEntry {
                content,
                created_at: now,
                last_accessed: now,
                size_bytes,
                valid,
            },
        );
        state.total_bytes += size_bytes;
        true
    }

    /// Remove every entry whose age exceeds the TTL.
    ///
    /// Returns the number of entries removed.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.created_at) > self.limits.ttl)
            .map(|(link, _)| link.clone())
            .collect();

        for link in &expired {
            if let Some(old) = state.entries.pop(link) {
                state.total_bytes = state.total_bytes.saturating_sub(old.size_bytes);
            }
        }
        expired.len()
    }

    /// Remove oldest-by-creation entries until at most `ceiling` remain.
    ///
    /// Used by the maintenance sweeper, which ranks by creation age
    /// rather than access recency.
    pub async fn enforce_count_ceiling(&self, ceiling: usize) -> usize {
        let mut state = self.state.lock().await;
        if state.entries.len() <= ceiling {
            return 0;
        }

        let mut by_age: Vec<(String, Instant)> = state
            .entries
            .iter()
            .map(|(link, entry)| (link.clone(), entry.created_at))
            .collect();
        by_age.sort_by_key(|(_, created_at)| *created_at);

        let excess = state.entries.len() - ceiling;
        for (link, _) in by_age.into_iter().take(excess) {
            if let Some(old) = state.entries.pop(&link) {
                state.total_bytes = state.total_bytes.saturating_sub(old.size_bytes);
            }
        }
        excess
    }

    /// Drop every entry and reset the byte accounting.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.total_bytes = 0;
    }

    /// Reset the hit/miss counters without touching the entries.
    pub async fn reset_counters(&self) {
        let mut state = self.state.lock().await;
        state.hits = 0;
        state.misses = 0;
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entry_count: state.entries.len(),
            total_bytes: state.total_bytes,
            hits: state.hits,
            misses: state.misses,
        }
    }

    /// Configured limits, exposed for the sweeper.
    #[must_use]
    pub fn limits(&self) -> &CacheLimits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct ManualClock {
        now: StdMutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: StdMutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().expect("clock lock");
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().expect("clock lock")
        }
    }

    fn limits() -> CacheLimits {
        CacheLimits {
            max_entries: 3,
            max_bytes: 10_000,
            max_entry_bytes: 1_000,
            ttl: Duration::from_secs(60),
            size_multiplier: 2,
            overhead_bytes: 64,
        }
    }

    fn cache_with_clock() -> (ContentCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ContentCache::new(limits(), clock.clone()), clock)
    }

    #[tokio::test]
    async fn hit_returns_content_and_counts() {
        let (cache, _clock) = cache_with_clock();
        assert!(cache.put("a", "body".to_string(), true).await);

        let entry = cache.get("a").await.expect("entry should be present");
        assert_eq!(entry.content, "body");
        assert!(entry.valid);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_removed_on_read() {
        let (cache, clock) = cache_with_clock();
        cache.put("a", "body".to_string(), true).await;

        clock.advance(Duration::from_secs(61));
        assert!(cache.get("a").await.is_none());

        // Lazy eviction: the expired entry no longer counts against capacity
        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[tokio::test]
    async fn count_bound_evicts_least_recently_used() {
        let (cache, clock) = cache_with_clock();
        cache.put("a", "1".to_string(), true).await;
        clock.advance(Duration::from_secs(1));
        cache.put("b", "2".to_string(), true).await;
        clock.advance(Duration::from_secs(1));
        cache.put("c", "3".to_string(), true).await;

        // Touch "a" so "b" becomes the LRU entry
        clock.advance(Duration::from_secs(1));
        assert!(cache.get("a").await.is_some());

        cache.put("d", "4".to_string(), true).await;
        assert_eq!(cache.stats().await.entry_count, 3);
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
    }

    #[tokio::test]
    async fn byte_budget_is_never_exceeded() {
        let clock = Arc::new(ManualClock::new());
        let cache = ContentCache::new(
            CacheLimits {
                max_entries: 100,
                max_bytes: 1_000,
                max_entry_bytes: 600,
                ttl: Duration::from_secs(60),
                size_multiplier: 2,
                overhead_bytes: 0,
            },
            clock,
        );

        for i in 0..20 {
            cache.put(&format!("k{i}"), "x".repeat(100), true).await;
            let stats = cache.stats().await;
            assert!(stats.total_bytes <= 1_000, "budget exceeded: {stats:?}");
        }
    }

    #[tokio::test]
    async fn entry_ceiling_above_the_budget_cannot_break_it() {
        let clock = Arc::new(ManualClock::new());
        // Hand-built limits with a per-entry ceiling above the total
        // budget must still honor the budget
        let cache = ContentCache::new(
            CacheLimits {
                max_entries: 100,
                max_bytes: 1_000,
                max_entry_bytes: 10_000,
                ttl: Duration::from_secs(60),
                size_multiplier: 2,
                overhead_bytes: 0,
            },
            clock,
        );

        assert!(!cache.put("big", "x".repeat(2_000), true).await);
        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 0);
        assert!(stats.total_bytes <= 1_000, "budget exceeded: {stats:?}");
    }

    #[tokio::test]
    async fn oversized_content_is_not_retained() {
        let (cache, _clock) = cache_with_clock();
        // 1000 chars * 2 + 64 > 1000-byte per-entry ceiling
        assert!(!cache.put("big", "x".repeat(1000), true).await);
        assert!(cache.get("big").await.is_none());
    }

    #[tokio::test]
    async fn negative_entries_count_and_expire() {
        let (cache, clock) = cache_with_clock();
        cache
            .put("bad", "https://original/link".to_string(), false)
            .await;

        let entry = cache.get("bad").await.expect("negative entry cached");
        assert!(!entry.valid);
        assert_eq!(cache.stats().await.entry_count, 1);

        clock.advance(Duration::from_secs(61));
        assert!(cache.get("bad").await.is_none());
    }

    #[tokio::test]
    async fn sweeper_hooks_evict_by_age() {
        let (cache, clock) = cache_with_clock();
        cache.put("old", "1".to_string(), true).await;
        clock.advance(Duration::from_secs(30));
        cache.put("new", "2".to_string(), true).await;

        clock.advance(Duration::from_secs(31)); // "old" is now past TTL
        assert_eq!(cache.evict_expired().await, 1);
        assert!(cache.get("new").await.is_some());

        cache.put("third", "3".to_string(), true).await;
        // Ceiling of 1 keeps only the youngest-by-creation entry
        assert_eq!(cache.enforce_count_ceiling(1).await, 1);
        assert_eq!(cache.stats().await.entry_count, 1);
    }

    #[tokio::test]
    async fn replacing_a_key_adjusts_byte_accounting() {
        let (cache, _clock) = cache_with_clock();
        cache.put("a", "x".repeat(100), true).await;
        let before = cache.stats().await.total_bytes;
        cache.put("a", "x".repeat(10), true).await;
        let after = cache.stats().await.total_bytes;
        assert!(after < before);
        assert_eq!(cache.stats().await.entry_count, 1);
    }
}
