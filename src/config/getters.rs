//! Read accessors for `ResolverConfig`
//!
//! Fields are `pub(crate)`; external callers read through these.

use std::time::Duration;

use super::types::ResolverConfig;

impl ResolverConfig {
    /// Host/path pattern candidate links must match
    #[must_use]
    pub fn base_url_pattern(&self) -> &str {
        &self.base_url_pattern
    }

    /// Whether the debounce scheduler is enabled
    #[must_use]
    pub fn debounce_enabled(&self) -> bool {
        self.enable_debounce
    }

    /// Whether batch resolution runs links concurrently
    #[must_use]
    pub fn batching_enabled(&self) -> bool {
        self.enable_batching
    }

    /// Whether the content cache is consulted and populated
    #[must_use]
    pub fn caching_enabled(&self) -> bool {
        self.enable_caching
    }

    /// Maximum simultaneous remote fetches
    #[must_use]
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    /// Maximum number of cached entries
    #[must_use]
    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries
    }

    /// Total byte budget for cached content estimates
    #[must_use]
    pub fn cache_max_bytes(&self) -> usize {
        self.cache_max_bytes
    }

    /// Entry time-to-live
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Single-entry retention ceiling; defaults to a tenth of the budget
    #[must_use]
    pub fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
            .unwrap_or(self.cache_max_bytes / 10)
            .max(1)
    }

    /// Fast debounce bound
    #[must_use]
    pub fn debounce_fast(&self) -> Duration {
        Duration::from_millis(self.debounce_fast_ms)
    }

    /// Slow debounce bound
    #[must_use]
    pub fn debounce_slow(&self) -> Duration {
        Duration::from_millis(self.debounce_slow_ms)
    }

    /// Period of the background maintenance sweep
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
