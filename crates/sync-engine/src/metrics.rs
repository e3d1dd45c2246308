use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    days_processed: AtomicU64,
    days_skipped: AtomicU64,
    rows_uploaded: AtomicU64,
    batches_uploaded: AtomicU64,
    dead_letters: AtomicU64,
}

/// Cheap shared counters for one engine instance. Clones share the same
/// counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSnapshot {
    pub days_processed: u64,
    pub days_skipped: u64,
    pub rows_uploaded: u64,
    pub batches_uploaded: u64,
    pub dead_letters: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_days_processed(&self, count: u64) {
        self.inner.days_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_days_skipped(&self, count: u64) {
        self.inner.days_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows_uploaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_uploaded
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_dead_letters(&self, count: u64) {
        self.inner.dead_letters.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            days_processed: self.inner.days_processed.load(Ordering::Relaxed),
            days_skipped: self.inner.days_skipped.load(Ordering::Relaxed),
            rows_uploaded: self.inner.rows_uploaded.load(Ordering::Relaxed),
            batches_uploaded: self.inner.batches_uploaded.load(Ordering::Relaxed),
            dead_letters: self.inner.dead_letters.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
