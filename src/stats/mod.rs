//! In-process performance counters.
//!
//! [`MetricsRecorder`] keeps running totals under one mutex: requests,
//! cache hits, a smoothed request duration and a peak-memory high-water
//! mark. A background reporter ([`spawn_reporter`]) samples process memory
//! and worker activity on a fixed cadence and hands a [`MetricsSnapshot`]
//! to a [`MetricsSink`](crate::traits::MetricsSink).
//!
//! Every update is mirrored to the `metrics` facade (see
//! [`telemetry`](crate::telemetry)), so an installed exporter sees the
//! same numbers.
//!
//! # Smoothed duration
//!
//! The average is updated as `avg = if avg == 0 { d } else { (avg + d) / 2 }`.
//! That is an exponential smoother with a fixed 0.5 weight, not an
//! arithmetic mean: recent requests dominate and a single outlier moves
//! the value by half its distance.

mod memory;
mod reporter;

pub use memory::resident_memory_bytes;
pub use reporter::{TracingSink, sample_once, spawn_reporter};

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::telemetry;
use crate::types::serialize_millis;

/// Default interval between metric samples.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(30);

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests accepted, cache hits included.
    pub total_requests: u64,
    /// Requests served from the cache.
    pub cache_hits: u64,
    /// Smoothed duration of requests that missed the cache.
    #[serde(rename = "avg_duration_ms", serialize_with = "serialize_millis")]
    pub avg_duration: Duration,
    /// Highest sampled resident memory, in bytes.
    pub peak_memory_bytes: u64,
    /// Resident memory at the last sample, in bytes.
    pub memory_bytes: u64,
    /// Worker-pool tasks executing at the last sample.
    pub active_workers: usize,
}

impl MetricsSnapshot {
    /// Fraction of requests served from the cache (0 when idle).
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.total_requests as f64
    }
}

/// Thread-safe running counters.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        // Counters stay meaningful even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a request served from the cache.
    pub fn record_cache_hit(&self) {
        let mut m = self.lock();
        m.total_requests += 1;
        m.cache_hits += 1;
        metrics::counter!(telemetry::REQUESTS_TOTAL).increment(1);
    }

    /// Record a request that went through execution, with its duration.
    pub fn record_request(&self, duration: Duration) {
        let mut m = self.lock();
        m.total_requests += 1;
        m.avg_duration = smooth(m.avg_duration, duration);
        metrics::counter!(telemetry::REQUESTS_TOTAL).increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Record a memory/concurrency sample, raising the peak if needed.
    pub fn observe(&self, memory_bytes: u64, active_workers: usize) {
        let mut m = self.lock();
        m.memory_bytes = memory_bytes;
        m.peak_memory_bytes = m.peak_memory_bytes.max(memory_bytes);
        m.active_workers = active_workers;
        metrics::gauge!(telemetry::PEAK_MEMORY_BYTES).set(m.peak_memory_bytes as f64);
        metrics::gauge!(telemetry::ACTIVE_WORKERS).set(active_workers as f64);
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.lock()
    }
}

fn smooth(avg: Duration, sample: Duration) -> Duration {
    if avg.is_zero() {
        sample
    } else {
        (avg + sample) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_sample_seeds_average() {
        let r = MetricsRecorder::new();
        r.record_request(ms(80));
        assert_eq!(r.snapshot().avg_duration, ms(80));
    }

    #[test]
    fn average_halves_toward_each_sample() {
        let r = MetricsRecorder::new();
        r.record_request(ms(100));
        r.record_request(ms(200));
        assert_eq!(r.snapshot().avg_duration, ms(150));
        r.record_request(ms(50));
        assert_eq!(r.snapshot().avg_duration, ms(100));
    }

    #[test]
    fn hits_count_as_requests() {
        let r = MetricsRecorder::new();
        r.record_request(ms(10));
        r.record_cache_hit();
        r.record_cache_hit();
        r.record_cache_hit();

        let s = r.snapshot();
        assert_eq!(s.total_requests, 4);
        assert_eq!(s.cache_hits, 3);
        assert!((s.cache_hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(s.avg_duration, ms(10));
    }

    #[test]
    fn hit_rate_is_zero_when_idle() {
        assert_eq!(MetricsSnapshot::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn peak_memory_is_high_water_mark() {
        let r = MetricsRecorder::new();
        r.observe(1_000, 2);
        r.observe(5_000, 4);
        r.observe(3_000, 1);

        let s = r.snapshot();
        assert_eq!(s.peak_memory_bytes, 5_000);
        assert_eq!(s.memory_bytes, 3_000);
        assert_eq!(s.active_workers, 1);
    }

    #[test]
    fn snapshot_serializes_millis() {
        let r = MetricsRecorder::new();
        r.record_request(ms(40));
        let v = serde_json::to_value(r.snapshot()).unwrap();
        assert_eq!(v["avg_duration_ms"], serde_json::json!(40.0));
        assert_eq!(v["total_requests"], serde_json::json!(1));
    }
}
