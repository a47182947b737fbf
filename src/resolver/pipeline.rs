//! The pipeline facade callers interact with.
//!
//! One `ReferencePipeline` per application session: it owns the
//! extractor, resolver (with its cache, registry, and gate), the
//! debounce scheduler, and the maintenance sweeper. No state is shared
//! across pipeline instances.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::oneshot;

use super::{ReferenceResolver, substitute};
use crate::config::ResolverConfig;
use crate::debounce::{DebounceScheduler, DebounceTuning};
use crate::extract::LinkExtractor;
use crate::source::{Clock, MarkupSanitizer, PageSource, Sanitizer, SystemClock};
use crate::stats::ResolverStats;
use crate::sweeper::MaintenanceSweeper;

/// Entry point for resolving wiki references inside free-form text.
pub struct ReferencePipeline {
    config: ResolverConfig,
    extractor: Arc<LinkExtractor>,
    resolver: Arc<ReferenceResolver>,
    debounce: Arc<DebounceScheduler>,
    sweeper: MaintenanceSweeper,
}

impl ReferencePipeline {
    /// Build a pipeline with the default sanitizer and system clock.
    ///
    /// Must be called from within a tokio runtime (the sweeper task is
    /// spawned here).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL pattern does not
    /// compile.
    pub fn new(config: ResolverConfig, source: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_collaborators(
            config,
            source,
            Arc::new(MarkupSanitizer),
            Arc::new(SystemClock),
        )
    }

    /// Build a pipeline with explicit collaborators (used by tests to
    /// inject clocks and fake sources).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL pattern does not
    /// compile.
    pub fn with_collaborators(
        config: ResolverConfig,
        source: Arc<dyn PageSource>,
        sanitizer: Arc<dyn Sanitizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let extractor = Arc::new(LinkExtractor::new(&config)?);
        let resolver = Arc::new(ReferenceResolver::new(&config, source, sanitizer, clock));
        let debounce = Arc::new(DebounceScheduler::new(DebounceTuning::from_config(&config)));
        let sweeper = MaintenanceSweeper::start(
            Arc::clone(resolver.cache()),
            config.sweep_interval(),
        );

        Ok(Self {
            config,
            extractor,
            resolver,
            debounce,
            sweeper,
        })
    }

    /// Resolve every wiki reference in `text`, returning the rewritten
    /// text.
    ///
    /// Links that cannot be resolved stay in place verbatim; this call
    /// never fails on their account.
    pub async fn resolve_text(&self, text: &str) -> String {
        Self::resolve_into(&self.extractor, &self.resolver, text).await
    }

    /// Debounced variant of [`resolve_text`](Self::resolve_text).
    ///
    /// The call waits out the adaptive delay for `key`; a newer call
    /// under the same key supersedes it, in which case this returns
    /// `None`. With debouncing disabled in the config, this resolves
    /// immediately.
    pub async fn resolve_text_debounced(&self, key: &str, text: &str) -> Option<String> {
        if !self.config.debounce_enabled() {
            return Some(self.resolve_text(text).await);
        }

        let links = self.extractor.extract(text);
        let (tx, rx) = oneshot::channel();

        let extractor = Arc::clone(&self.extractor);
        let resolver = Arc::clone(&self.resolver);
        let text_owned = text.to_string();
        self.debounce
            .schedule(key, text, links.len(), move || async move {
                let rewritten = Self::resolve_into(&extractor, &resolver, &text_owned).await;
                // The receiver may be gone if the caller hung up; the
                // resolution still happened and warmed the cache
                let _ = tx.send(rewritten);
            })
            .await;

        rx.await.ok()
    }

    async fn resolve_into(
        extractor: &LinkExtractor,
        resolver: &ReferenceResolver,
        text: &str,
    ) -> String {
        let links = extractor.extract(text);
        if links.is_empty() {
            return text.to_string();
        }
        let replacements = resolver.resolve(&links).await;
        substitute(text, &replacements)
    }

    /// Drop all cached content.
    pub async fn clear_cache(&self) {
        self.resolver.cache().clear().await;
    }

    /// Full session reset: cache, counters, pending dedup entries, and
    /// any scheduled debounce tickets.
    pub async fn clear_session(&self) {
        self.debounce.cancel_all().await;
        self.resolver.registry().clear().await;
        self.resolver.cache().clear().await;
        self.resolver.cache().reset_counters().await;
    }

    /// Read-only snapshot of pipeline counters; no side effects.
    pub async fn statistics(&self) -> ResolverStats {
        let cache = self.resolver.cache().stats().await;
        ResolverStats {
            entry_count: cache.entry_count,
            memory_bytes: cache.total_bytes,
            hit_rate: cache.hit_rate(),
            hits: cache.hits,
            misses: cache.misses,
            dedup_count: self.resolver.registry().dedup_count(),
            pending_count: self.resolver.registry().pending_count().await,
            active_fetches: self.resolver.gate().active(),
            peak_concurrent_fetches: self.resolver.gate().peak(),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Stop background work (the sweeper loop and pending tickets).
    pub async fn shutdown(&self) {
        self.debounce.cancel_all().await;
        self.sweeper.stop().await;
    }
}
