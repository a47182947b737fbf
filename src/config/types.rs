//! Core configuration types for reference resolution
//!
//! This module contains the main `ResolverConfig` struct that defines
//! the knobs for link extraction, caching, concurrency, debouncing, and
//! background maintenance.

use serde::{Deserialize, Serialize};

/// Main configuration struct for the reference resolution pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Host (optionally host/path-prefix) pattern links must match.
    ///
    /// **INVARIANT:** Always compiles to a valid link regex (validated
    /// in the builder). `*` is a glob wildcard within one path segment,
    /// e.g. `"*.atlassian.net/wiki"`.
    pub(crate) base_url_pattern: String,

    /// Delay resolution behind an adaptive debounce window
    pub(crate) enable_debounce: bool,
    /// Resolve the links of one text concurrently instead of one by one
    pub(crate) enable_batching: bool,
    /// Consult and populate the content cache
    pub(crate) enable_caching: bool,

    /// Maximum simultaneous remote fetches
    /// Default: 3
    pub(crate) max_concurrent_fetches: usize,

    /// Maximum number of cached entries
    /// Default: 100
    pub(crate) cache_max_entries: usize,

    /// Total byte budget for cached content estimates
    /// Default: 5 MB
    pub(crate) cache_max_bytes: usize,

    /// Time-to-live for cache entries, positive and negative alike
    /// Default: 1800 seconds (30 minutes)
    pub(crate) cache_ttl_secs: u64,

    /// Bytes charged per content character in the size estimate.
    ///
    /// The estimate is a policy knob, not a measurement; the original
    /// heuristic is `length x 2 + overhead`.
    /// Default: 2
    pub(crate) entry_size_multiplier: usize,

    /// Fixed per-entry overhead added to the size estimate
    /// Default: 64 bytes
    pub(crate) entry_overhead_bytes: usize,

    /// Ceiling above which a single entry is not retained.
    ///
    /// Oversized content is still returned to the caller once, just not
    /// cached. Default: `cache_max_bytes / 10`.
    pub(crate) max_entry_bytes: Option<usize>,

    /// Fast debounce bound for short inputs
    /// Default: 300 ms
    pub(crate) debounce_fast_ms: u64,

    /// Slow debounce bound for long inputs; also the clamp ceiling
    /// Default: 1500 ms
    pub(crate) debounce_slow_ms: u64,

    /// Text length at or below which the fast bound applies
    /// Default: 500 characters
    pub(crate) debounce_len_lower: usize,

    /// Text length at or above which the slow bound applies
    /// Default: 5000 characters
    pub(crate) debounce_len_upper: usize,

    /// Candidate link count above which the delay is multiplied
    /// Default: 3
    pub(crate) debounce_link_threshold: usize,

    /// Delay multiplier applied when the link threshold is exceeded
    /// Default: 1.5
    pub(crate) debounce_link_multiplier: f64,

    /// Complexity score above which the delay is multiplied
    /// Default: 0.7
    pub(crate) debounce_complexity_threshold: f64,

    /// Delay multiplier applied when the complexity threshold is exceeded
    /// Default: 1.3
    pub(crate) debounce_complexity_multiplier: f64,

    /// Period of the background maintenance sweep
    /// Default: 600 seconds (10 minutes)
    pub(crate) sweep_interval_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url_pattern: String::new(),
            enable_debounce: true,
            enable_batching: true,
            enable_caching: true,
            max_concurrent_fetches: 3,
            cache_max_entries: 100,
            cache_max_bytes: 5 * 1024 * 1024,
            cache_ttl_secs: 1800,
            entry_size_multiplier: 2,
            entry_overhead_bytes: 64,
            max_entry_bytes: None,
            debounce_fast_ms: 300,
            debounce_slow_ms: 1500,
            debounce_len_lower: 500,
            debounce_len_upper: 5000,
            debounce_link_threshold: 3,
            debounce_link_multiplier: 1.5,
            debounce_complexity_threshold: 0.7,
            debounce_complexity_multiplier: 1.3,
            sweep_interval_secs: 600,
        }
    }
}

impl ResolverConfig {
    /// Create a builder for configuring a `ResolverConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> super::builder::ResolverConfigBuilder<()> {
        super::builder::ResolverConfigBuilder::default()
    }
}
