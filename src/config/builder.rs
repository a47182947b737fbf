//! Type-safe builder for `ResolverConfig` using the typestate pattern
//!
//! This module provides a fluent builder interface with compile-time
//! validation ensuring that the base URL pattern is set before a
//! `ResolverConfig` can be built.

use anyhow::{Result, anyhow};
use regex::Regex;
use std::marker::PhantomData;

use super::types::ResolverConfig;

/// Compile a base URL pattern into the link-matching regex
///
/// The pattern is a host (optionally host/path-prefix) where `*`
/// matches within one path segment. Compilation happens once at config
/// creation to keep regex building out of the extraction hot path.
///
/// # Errors
///
/// Returns an error if the resulting regex pattern is invalid.
pub(crate) fn compile_link_pattern(pattern: &str) -> Result<Regex> {
    let trimmed = pattern
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(anyhow!("base URL pattern must not be empty"));
    }

    // Escape regex metacharacters, then re-open the glob wildcard
    let escaped = regex::escape(trimmed).replace(r"\*", r"[^\s./]*");
    let full = format!(r#"https?://{escaped}[^\s<>"']*"#);

    Regex::new(&full).map_err(|e| anyhow!("Invalid base URL pattern '{pattern}': {e}"))
}

// Type states for the builder
pub struct WithBaseUrl;

pub struct ResolverConfigBuilder<State = ()> {
    pub(crate) config: ResolverConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ResolverConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: ResolverConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl ResolverConfigBuilder<()> {
    /// Set the host/path pattern candidate links must match (required)
    pub fn base_url_pattern(
        mut self,
        pattern: impl Into<String>,
    ) -> ResolverConfigBuilder<WithBaseUrl> {
        self.config.base_url_pattern = pattern.into();
        ResolverConfigBuilder {
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

// Tuning knobs available at any state
impl<State> ResolverConfigBuilder<State> {
    /// Enable or disable the debounce scheduler (default: enabled)
    #[must_use]
    pub fn debounce(mut self, enabled: bool) -> Self {
        self.config.enable_debounce = enabled;
        self
    }

    /// Enable or disable concurrent batch resolution (default: enabled)
    #[must_use]
    pub fn batching(mut self, enabled: bool) -> Self {
        self.config.enable_batching = enabled;
        self
    }

    /// Enable or disable the content cache (default: enabled)
    #[must_use]
    pub fn caching(mut self, enabled: bool) -> Self {
        self.config.enable_caching = enabled;
        self
    }

    /// Set the maximum number of simultaneous remote fetches
    #[must_use]
    pub fn max_concurrent_fetches(mut self, max: usize) -> Self {
        self.config.max_concurrent_fetches = max;
        self
    }

    /// Set the maximum number of cached entries
    #[must_use]
    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.config.cache_max_entries = max;
        self
    }

    /// Set the total byte budget for cached content
    #[must_use]
    pub fn cache_max_bytes(mut self, max: usize) -> Self {
        self.config.cache_max_bytes = max;
        self
    }

    /// Set the entry time-to-live in seconds
    #[must_use]
    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    /// Set the bytes-per-character multiplier of the size estimate
    ///
    /// The estimate is a heuristic (`length x multiplier + overhead`),
    /// not a measurement; tune it rather than trusting it.
    #[must_use]
    pub fn entry_size_multiplier(mut self, multiplier: usize) -> Self {
        self.config.entry_size_multiplier = multiplier;
        self
    }

    /// Override the single-entry retention ceiling in bytes
    #[must_use]
    pub fn max_entry_bytes(mut self, max: usize) -> Self {
        self.config.max_entry_bytes = Some(max);
        self
    }

    /// Set the fast and slow debounce bounds in milliseconds
    #[must_use]
    pub fn debounce_bounds_ms(mut self, fast: u64, slow: u64) -> Self {
        self.config.debounce_fast_ms = fast;
        self.config.debounce_slow_ms = slow;
        self
    }

    /// Set the period of the background maintenance sweep in seconds
    #[must_use]
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.config.sweep_interval_secs = secs;
        self
    }
}

// Build method only available once the base URL pattern is set
impl ResolverConfigBuilder<WithBaseUrl> {
    /// Validate the configuration and produce a `ResolverConfig`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL pattern does not compile, the
    /// concurrency bound is zero, the cache budgets are zero, or the
    /// debounce bounds are inverted.
    pub fn build(self) -> Result<ResolverConfig> {
        let config = self.config;

        // Compile once here so a bad pattern fails at construction,
        // not on the first resolve call
        compile_link_pattern(&config.base_url_pattern)?;

        if config.max_concurrent_fetches == 0 {
            return Err(anyhow!("max_concurrent_fetches must be at least 1"));
        }
        if config.cache_max_entries == 0 || config.cache_max_bytes == 0 {
            return Err(anyhow!("cache budgets must be non-zero"));
        }
        if let Some(cap) = config.max_entry_bytes {
            if cap > config.cache_max_bytes {
                return Err(anyhow!(
                    "max_entry_bytes ({cap}) exceeds cache_max_bytes ({})",
                    config.cache_max_bytes
                ));
            }
        }
        if config.debounce_fast_ms > config.debounce_slow_ms {
            return Err(anyhow!(
                "debounce fast bound ({} ms) exceeds slow bound ({} ms)",
                config.debounce_fast_ms,
                config.debounce_slow_ms
            ));
        }
        if config.debounce_len_lower >= config.debounce_len_upper {
            return Err(anyhow!(
                "debounce length thresholds must satisfy lower < upper"
            ));
        }

        Ok(config)
    }
}
