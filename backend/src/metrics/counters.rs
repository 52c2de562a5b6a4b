use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub cycles_started: Arc<AtomicU64>,
    pub cycles_published: Arc<AtomicU64>,
    pub cycles_skipped: Arc<AtomicU64>,
    pub cycles_failed: Arc<AtomicU64>,

    // per-venue pipeline failures
    pub deribit_failures: Arc<AtomicU64>,
    pub bybit_failures: Arc<AtomicU64>,

    /// Venue records dropped by validation or normalization.
    pub records_skipped: Arc<AtomicU64>,
    pub instrument_refresh_failures: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
