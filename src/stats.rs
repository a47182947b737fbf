//! Read-only pipeline statistics.

use serde::Serialize;

/// Snapshot of pipeline counters, safe to expose to observability
/// surfaces. Taking a snapshot has no behavioral side effects.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverStats {
    /// Entries currently cached, positive and negative alike
    pub entry_count: usize,
    /// Estimated bytes held by the cache
    pub memory_bytes: usize,
    /// Cache hit rate in `[0, 1]` since the last counter reset
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    /// Callers that joined an already-running fetch instead of issuing
    /// their own
    pub dedup_count: u64,
    /// Fetches currently in flight in the dedup registry
    pub pending_count: usize,
    /// Fetches currently holding a gate slot
    pub active_fetches: usize,
    /// Highest simultaneous gate occupancy observed
    pub peak_concurrent_fetches: usize,
}
