//! Adaptive debounce scheduling for resolution requests.
//!
//! Calls are keyed by a caller-chosen string (one per logical text
//! field). Scheduling a new call under a key atomically supersedes any
//! pending one, so within a settled window exactly one execution
//! happens and it always sees the last input. The delay itself adapts
//! to the shape of the input: longer texts, link-heavy texts, and
//! structurally complex texts wait longer.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ResolverConfig;

/// Delay-shaping knobs, copied out of the resolver config.
#[derive(Debug, Clone)]
pub struct DebounceTuning {
    pub fast: Duration,
    pub slow: Duration,
    pub len_lower: usize,
    pub len_upper: usize,
    pub link_threshold: usize,
    pub link_multiplier: f64,
    pub complexity_threshold: f64,
    pub complexity_multiplier: f64,
}

impl DebounceTuning {
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            fast: config.debounce_fast(),
            slow: config.debounce_slow(),
            len_lower: config.debounce_len_lower,
            len_upper: config.debounce_len_upper,
            link_threshold: config.debounce_link_threshold,
            link_multiplier: config.debounce_link_multiplier,
            complexity_threshold: config.debounce_complexity_threshold,
            complexity_multiplier: config.debounce_complexity_multiplier,
        }
    }

    /// Compute the delay for one input.
    ///
    /// Base delay interpolates linearly between the fast and slow
    /// bounds over the configured length window; the link and
    /// complexity multipliers stretch it; the result is clamped back
    /// into `[fast, slow]`.
    #[must_use]
    pub fn delay_for(&self, text: &str, link_count: usize) -> Duration {
        let fast = self.fast.as_millis() as f64;
        let slow = self.slow.as_millis() as f64;

        let len = text.chars().count();
        let t = if len <= self.len_lower {
            0.0
        } else if len >= self.len_upper {
            1.0
        } else {
            (len - self.len_lower) as f64 / (self.len_upper - self.len_lower) as f64
        };
        let mut delay = fast + (slow - fast) * t;

        if link_count > self.link_threshold {
            delay *= self.link_multiplier;
        }
        if complexity_score(text) > self.complexity_threshold {
            delay *= self.complexity_multiplier;
        }

        Duration::from_millis(delay.clamp(fast, slow).round() as u64)
    }
}

/// Heuristic structural complexity of a text, normalized to `[0, 1]`.
///
/// Weighted combination of line count, URL count, special-character
/// density, and character variety, each individually normalized.
#[must_use]
pub fn complexity_score(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let total_chars = text.chars().count();
    let line_factor = (text.lines().count() as f64 / 40.0).min(1.0);
    let url_factor = (text.matches("://").count() as f64 / 8.0).min(1.0);

    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    let density_factor = ((special as f64 / total_chars as f64) / 0.25).min(1.0);

    let distinct: HashSet<char> = text.chars().collect();
    let variety_factor = (distinct.len() as f64 / 96.0).min(1.0);

    0.3 * line_factor + 0.3 * url_factor + 0.2 * density_factor + 0.2 * variety_factor
}

struct Ticket {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Collapsing, per-key scheduler for delayed resolution.
pub struct DebounceScheduler {
    tickets: Arc<Mutex<HashMap<String, Ticket>>>,
    next_generation: AtomicU64,
    tuning: DebounceTuning,
}

impl DebounceScheduler {
    #[must_use]
    pub fn new(tuning: DebounceTuning) -> Self {
        Self {
            tickets: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            tuning,
        }
    }

    /// Tuning in effect, exposed for delay inspection.
    #[must_use]
    pub fn tuning(&self) -> &DebounceTuning {
        &self.tuning
    }

    /// Schedule `callback` to run after the adaptive delay for `text`.
    ///
    /// Any pending ticket under the same key is aborted and discarded
    /// before the new one is registered: a superseded callback never
    /// fires. The generation check runs under the ticket lock after the
    /// sleep, so even a task that has already woken cannot fire once it
    /// has been superseded or canceled.
    pub async fn schedule<F, Fut>(&self, key: &str, text: &str, link_count: usize, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.tuning.delay_for(text, link_count);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        let mut tickets = self.tickets.lock().await;
        if let Some(old) = tickets.remove(key) {
            old.handle.abort();
            log::trace!("superseded debounce ticket for key {key}");
        }

        let tickets_map = Arc::clone(&self.tickets);
        let key_owned = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut tickets = tickets_map.lock().await;
            let still_current = matches!(
                tickets.get(&key_owned),
                Some(ticket) if ticket.generation == generation
            );
            if still_current {
                tickets.remove(&key_owned);
            }
            drop(tickets);

            if still_current {
                callback().await;
            }
        });

        tickets.insert(key.to_string(), Ticket { generation, handle });
    }

    /// Cancel the pending ticket for one key, if any.
    pub async fn cancel(&self, key: &str) {
        if let Some(ticket) = self.tickets.lock().await.remove(key) {
            ticket.handle.abort();
        }
    }

    /// Cancel every pending ticket.
    ///
    /// Guaranteed total: tickets already woken but not yet fired are
    /// blocked by the generation check and never invoke their callback.
    pub async fn cancel_all(&self) {
        let mut tickets = self.tickets.lock().await;
        for (_, ticket) in tickets.drain() {
            ticket.handle.abort();
        }
    }

    /// Number of tickets currently waiting out their delay.
    pub async fn pending_tickets(&self) -> usize {
        self.tickets.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> DebounceTuning {
        DebounceTuning {
            fast: Duration::from_millis(300),
            slow: Duration::from_millis(1500),
            len_lower: 500,
            len_upper: 5000,
            link_threshold: 3,
            link_multiplier: 1.5,
            complexity_threshold: 0.7,
            complexity_multiplier: 1.3,
        }
    }

    #[test]
    fn short_text_gets_fast_bound() {
        assert_eq!(
            tuning().delay_for("short", 0),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn long_text_gets_slow_bound() {
        let text = "a".repeat(10_000);
        assert_eq!(tuning().delay_for(&text, 0), Duration::from_millis(1500));
    }

    #[test]
    fn mid_length_interpolates() {
        let text = "a".repeat(2750); // halfway between 500 and 5000
        let delay = tuning().delay_for(&text, 0);
        assert!(delay > Duration::from_millis(300));
        assert!(delay < Duration::from_millis(1500));
    }

    #[test]
    fn many_links_stretch_the_delay() {
        let text = "a".repeat(1000);
        let few = tuning().delay_for(&text, 2);
        let many = tuning().delay_for(&text, 6);
        assert!(many > few);
    }

    #[test]
    fn delay_never_escapes_the_bounds() {
        let busy = "x?!#://@".repeat(2000);
        let delay = tuning().delay_for(&busy, 50);
        assert!(delay >= Duration::from_millis(300));
        assert!(delay <= Duration::from_millis(1500));
    }

    #[test]
    fn complexity_score_is_bounded() {
        assert_eq!(complexity_score(""), 0.0);
        for text in ["plain words", "a\nb\nc\nd", "https://x https://y {{%$#}}"] {
            let score = complexity_score(text);
            assert!((0.0..=1.0).contains(&score), "{score} out of range");
        }
    }
}
