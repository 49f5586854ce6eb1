//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms and gauges use meaningful units (e.g. `_seconds`, `_bytes`).
//!
//! # Common labels
//!
//! - `strategy`: group strategy that invoked the executor:
//!   "combine", "parallel" or "sequential"
//! - `trigger`: what flushed a batch: "size", "timer" or "shutdown"

/// Total requests accepted by the optimizer (cache hits included).
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// End-to-end duration of slow-path requests, in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses (expired entries count as misses).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total entries removed by the periodic sweep.
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// Total non-empty batches flushed by the collector.
///
/// Labels: `trigger`.
pub const BATCHES_TOTAL: &str = "huginn_batches_total";

/// Size of each flushed batch.
pub const BATCH_SIZE: &str = "huginn_batch_size";

/// Requests executed synchronously because the collector inbox was full.
pub const HANDOFF_FALLBACKS_TOTAL: &str = "huginn_handoff_fallbacks_total";

/// Total invocations of the command executor.
///
/// Labels: `strategy`.
pub const EXECUTOR_CALLS_TOTAL: &str = "huginn_executor_calls_total";

/// Process memory high-water mark, in bytes.
pub const PEAK_MEMORY_BYTES: &str = "huginn_peak_memory_bytes";

/// Number of worker-pool tasks executing at sample time.
pub const ACTIVE_WORKERS: &str = "huginn_active_workers";
