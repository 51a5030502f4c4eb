use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Per-run state threaded through the pipeline.
///
/// Counters are atomics so fetch workers can record outcomes without locking.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pages_requested: AtomicUsize,
    pages_fetched: AtomicUsize,
    pages_failed: AtomicUsize,
    cache_hits: AtomicUsize,
}

/// Snapshot of the run counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub pages_requested: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub cache_hits: usize,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            pages_requested: AtomicUsize::new(0),
            pages_fetched: AtomicUsize::new(0),
            pages_failed: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    pub fn record_request(&self) {
        self.pages_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_stats(&self) -> FetchStats {
        FetchStats {
            pages_requested: self.pages_requested.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}
