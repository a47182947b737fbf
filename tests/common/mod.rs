//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pageref::{Clock, FetchError, PageSource};

/// Route `log` output into the test harness. Safe to call repeatedly.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted in-memory page source with call accounting.
pub struct FakePageSource {
    responses: StdMutex<HashMap<String, Result<String, FetchError>>>,
    calls: AtomicUsize,
    per_page: StdMutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl FakePageSource {
    pub fn new() -> Self {
        Self {
            responses: StdMutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            per_page: StdMutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Simulate network latency per fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script_page(&self, page_id: &str, body: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(page_id.to_string(), Ok(body.to_string()));
    }

    pub fn script_failure(&self, page_id: &str, error: FetchError) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(page_id.to_string(), Err(error));
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, page_id: &str) -> usize {
        self.per_page
            .lock()
            .expect("per-page lock")
            .get(page_id)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneously executing fetches observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakePageSource {
    async fn fetch_page(&self, page_id: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_page
            .lock()
            .expect("per-page lock")
            .entry(page_id.to_string())
            .or_insert(0) += 1;

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .responses
            .lock()
            .expect("responses lock")
            .get(page_id)
            .cloned();
        match scripted {
            Some(result) => result,
            None => Ok(format!("<p>content of page {page_id}</p>")),
        }
    }
}

/// Manually advanced clock for TTL tests.
pub struct ManualClock {
    start: Instant,
    offset: StdMutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: StdMutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().expect("clock lock") += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().expect("clock lock")
    }
}

/// Canonical wiki link for page `id`.
pub fn wiki_link(id: u64, title: &str) -> String {
    format!("https://co.atlassian.net/wiki/spaces/X/pages/{id}/{title}")
}
