//! Periodic metrics reporting.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::{MetricsRecorder, MetricsSnapshot, resident_memory_bytes};
use crate::pool::WorkerPool;
use crate::traits::MetricsSink;

/// Default sink: logs each snapshot as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn report(&self, s: &MetricsSnapshot) {
        debug!(
            total_requests = s.total_requests,
            cache_hits = s.cache_hits,
            cache_hit_rate = s.cache_hit_rate(),
            avg_duration_ms = s.avg_duration.as_secs_f64() * 1000.0,
            memory_mb = s.memory_bytes / 1024 / 1024,
            peak_memory_mb = s.peak_memory_bytes / 1024 / 1024,
            active_workers = s.active_workers,
            "performance metrics"
        );
    }
}

/// Take one sample and report it. Returns the reported snapshot.
pub fn sample_once(
    recorder: &MetricsRecorder,
    pool: &WorkerPool,
    sink: &dyn MetricsSink,
) -> MetricsSnapshot {
    // Keep the previous reading when memory cannot be sampled.
    let memory = resident_memory_bytes().unwrap_or_else(|| recorder.snapshot().memory_bytes);
    recorder.observe(memory, pool.active());
    let snapshot = recorder.snapshot();
    sink.report(&snapshot);
    snapshot
}

/// Spawn the periodic sampler. The first sample is taken one `interval`
/// after spawning.
pub fn spawn_reporter(
    recorder: Arc<MetricsRecorder>,
    pool: Arc<WorkerPool>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sample_once(&recorder, &pool, sink.as_ref());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        reports: Mutex<Vec<MetricsSnapshot>>,
    }

    impl MetricsSink for Capture {
        fn report(&self, snapshot: &MetricsSnapshot) {
            self.reports.lock().unwrap().push(*snapshot);
        }
    }

    #[tokio::test]
    async fn sample_reports_current_counters() {
        let recorder = MetricsRecorder::new();
        let pool = WorkerPool::new(2);
        let sink = Capture::default();
        recorder.record_cache_hit();

        let snapshot = sample_once(&recorder, &pool, &sink);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.active_workers, 0);
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_samples_on_interval() {
        let recorder = Arc::new(MetricsRecorder::new());
        let pool = Arc::new(WorkerPool::new(1));
        let sink = Arc::new(Capture::default());

        let handle = spawn_reporter(recorder, pool, sink.clone(), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.abort();

        assert_eq!(sink.reports.lock().unwrap().len(), 3);
    }

    #[test]
    fn tracing_sink_accepts_snapshots() {
        TracingSink.report(&MetricsSnapshot::default());
    }
}
