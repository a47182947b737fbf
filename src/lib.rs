//! pageref: bounded, cache-backed inlining of remote wiki page content
//! into free-form text.
//!
//! Authors drop wiki links into text; the pipeline extracts them,
//! fetches and sanitizes the pages through a pluggable content source,
//! and rewrites the text with marker-wrapped snapshots in place of the
//! links. Resolution is cached (LRU + TTL), deduplicated across
//! concurrent callers, bounded in fetch concurrency, and optionally
//! debounced behind an adaptive delay.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pageref::{HttpPageSource, ReferencePipeline, ResolverConfig};
//!
//! let config = ResolverConfig::builder()
//!     .base_url_pattern("co.atlassian.net/wiki")
//!     .build()?;
//! let source = Arc::new(HttpPageSource::new("https://co.atlassian.net/wiki")?);
//! let pipeline = ReferencePipeline::new(config, source)?;
//!
//! let rewritten = pipeline
//!     .resolve_text("See https://co.atlassian.net/wiki/spaces/X/pages/123/Title.")
//!     .await;
//! ```

pub mod cache;
pub mod config;
pub mod debounce;
pub mod extract;
pub mod gate;
pub mod inflight;
pub mod resolver;
pub mod source;
pub mod stats;
pub mod sweeper;

pub use cache::{CacheEntry, CacheLimits, CacheStats, ContentCache};
pub use config::{ResolverConfig, ResolverConfigBuilder};
pub use debounce::{DebounceScheduler, DebounceTuning, complexity_score};
pub use extract::LinkExtractor;
pub use gate::{FetchGate, GatePermit};
pub use inflight::InflightRegistry;
pub use resolver::{
    MARKER_CLOSE, MARKER_OPEN, ReferencePipeline, ReferenceResolver, ResolutionResult,
    substitute, wrap_content,
};
pub use source::{
    Clock, FetchError, HttpPageSource, MarkupSanitizer, PageSource, Sanitizer, SystemClock,
};
pub use stats::ResolverStats;
pub use sweeper::MaintenanceSweeper;
