//! The optimizer facade.
//!
//! [`Optimizer`] is the single entry point. A request first consults the
//! result cache; on a miss it becomes a [`PendingRequest`] handed to the
//! batch collector, and the caller waits on its fulfillment slot or on its
//! own cancellation, whichever comes first.
//!
//! ```text
//!  execute() ─► cache hit? ──yes──► cached response
//!                  │ no
//!                  ▼
//!            batch collector ──(handoff timeout)──► direct execution
//!                  │
//!                  ▼
//!            group dispatcher ─► executor ─► slot + cache
//! ```
//!
//! Cancellation is best-effort: the caller returns promptly, but a request
//! already handed off keeps running and still populates the cache.

mod builder;

pub use builder::OptimizerBuilder;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::batch::BatchCollector;
use crate::cache::{CacheLookup, ResultCache};
use crate::config::OptimizerConfig;
use crate::dispatch::GroupDispatcher;
use crate::pool::WorkerPool;
use crate::stats::{MetricsRecorder, MetricsSnapshot};
use crate::telemetry;
use crate::traits::CommandExecutor;
use crate::types::{CacheKey, OptimizedResponse, PendingRequest};
use crate::{HuginnError, Result};

/// Caches, batches and dispatches commands to a [`CommandExecutor`].
///
/// Construct with [`Optimizer::builder`] and share by reference (or
/// `Arc`). Dropping it stops the background tasks.
pub struct Optimizer {
    config: OptimizerConfig,
    cache: Option<Arc<ResultCache>>,
    collector: Option<BatchCollector>,
    dispatcher: Arc<GroupDispatcher>,
    pool: Arc<WorkerPool>,
    recorder: Arc<MetricsRecorder>,
    tasks: Vec<JoinHandle<()>>,
}

impl Optimizer {
    /// Create a new builder around `executor`.
    pub fn builder(executor: Arc<dyn CommandExecutor>) -> OptimizerBuilder {
        OptimizerBuilder::new(executor)
    }

    /// Build an optimizer with the default configuration.
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        Self::builder(executor).build()
    }

    /// Execute `command` for `session_id`.
    ///
    /// Returns the cached result when one is fresh, otherwise waits for the
    /// batched execution. Fails with [`HuginnError::Cancelled`] as soon as
    /// `cancel` fires; executor failures are returned unchanged.
    #[instrument(skip(self, cancel))]
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        session_id: &str,
        command: &str,
    ) -> Result<OptimizedResponse> {
        if session_id.trim().is_empty() {
            return Err(HuginnError::InvalidInput("session id is empty".to_string()));
        }
        if command.trim().is_empty() {
            return Err(HuginnError::InvalidInput("command is empty".to_string()));
        }

        let start = Instant::now();
        if let Some(cache) = &self.cache
            && let CacheLookup::Hit(value) = cache.lookup(&CacheKey::new(session_id, command))
        {
            self.recorder.record_cache_hit();
            return Ok(OptimizedResponse::cached(value, start.elapsed()));
        }

        let (request, rx) = PendingRequest::new(session_id, command, cancel.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HuginnError::Cancelled),
            _ = self.submit(request) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("caller cancelled, request continues in background");
                return Err(HuginnError::Cancelled);
            }
            received = rx => received.unwrap_or(Err(HuginnError::Shutdown)),
        };
        self.recorder.record_request(start.elapsed());
        outcome
    }

    /// Hand `request` to the collector, or execute it directly when
    /// batching is off or the handoff times out.
    async fn submit(&self, request: PendingRequest) {
        let request = match &self.collector {
            Some(collector) => match collector.enqueue(request).await {
                Ok(()) => return,
                Err(request) => {
                    metrics::counter!(telemetry::HANDOFF_FALLBACKS_TOTAL).increment(1);
                    request
                }
            },
            None => request,
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move { dispatcher.process_single(request).await });
    }

    /// Stop batching new requests.
    ///
    /// Requests already queued are flushed as one last batch. Later cache
    /// misses fall back to direct single-request execution.
    pub fn stop_batching(&self) {
        if let Some(collector) = &self.collector {
            collector.close();
        }
    }

    /// Latest counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.recorder.snapshot()
    }

    /// The result cache, if caching is enabled.
    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_deref()
    }

    /// Number of workers in the pool.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl Drop for Optimizer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl CommandExecutor for Echo {
        async fn execute(&self, session_id: &str, command: &str) -> Result<Value> {
            Ok(json!(format!("{session_id}:{command}")))
        }
    }

    #[test]
    fn build_outside_runtime_fails() {
        let result = Optimizer::new(Arc::new(Echo));
        assert!(matches!(result, Err(HuginnError::Configuration(_))));
    }

    #[tokio::test]
    async fn build_rejects_invalid_config() {
        let result = Optimizer::builder(Arc::new(Echo))
            .config(OptimizerConfig::new().batch_size(0))
            .build();
        assert!(matches!(result, Err(HuginnError::Configuration(_))));
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let optimizer = Optimizer::new(Arc::new(Echo)).unwrap();
        let cancel = CancellationToken::new();
        assert!(matches!(
            optimizer.execute(&cancel, "s1", "   ").await,
            Err(HuginnError::InvalidInput(_))
        ));
        assert!(matches!(
            optimizer.execute(&cancel, "", "build a").await,
            Err(HuginnError::InvalidInput(_))
        ));
        assert_eq!(optimizer.snapshot().total_requests, 0);
    }

    #[tokio::test]
    async fn already_cancelled_returns_immediately() {
        let optimizer = Optimizer::new(Arc::new(Echo)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            optimizer.execute(&cancel, "s1", "build a").await,
            Err(HuginnError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn miss_waits_for_batch_flush() {
        let optimizer = Optimizer::builder(Arc::new(Echo))
            .config(OptimizerConfig::new().metrics_enabled(false))
            .build()
            .unwrap();
        let cancel = CancellationToken::new();

        let mut call = tokio_test::task::spawn(optimizer.execute(&cancel, "s1", "build a"));
        tokio_test::assert_pending!(call.poll());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(call.is_woken());
        let response = tokio_test::assert_ready_ok!(call.poll());
        assert_eq!(response.result, json!("s1:build a"));
        assert!(!response.cache_hit);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_batching_executes_without_delay() {
        let optimizer = Optimizer::builder(Arc::new(Echo))
            .config(OptimizerConfig::new().metrics_enabled(false))
            .build()
            .unwrap();
        optimizer.stop_batching();

        let cancel = CancellationToken::new();
        let start = Instant::now();
        let response = optimizer.execute(&cancel, "s1", "build a").await.unwrap();
        assert_eq!(response.result, json!("s1:build a"));
        assert_eq!(response.batch_size, 1);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn cache_disabled_has_no_cache() {
        let optimizer = Optimizer::builder(Arc::new(Echo))
            .config(OptimizerConfig::new().cache_enabled(false).workers(3))
            .build()
            .unwrap();
        assert!(optimizer.cache().is_none());
        assert_eq!(optimizer.workers(), 3);
    }
}
