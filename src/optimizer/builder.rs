//! Builder for configuring optimizer instances

use std::sync::Arc;

use tracing::info;

use super::Optimizer;
use crate::batch::BatchCollector;
use crate::cache::{ResultCache, spawn_sweeper};
use crate::config::OptimizerConfig;
use crate::dispatch::GroupDispatcher;
use crate::pool::WorkerPool;
use crate::stats::{MetricsRecorder, TracingSink, spawn_reporter};
use crate::traits::{BatchHandler, CommandExecutor, MetricsSink};
use crate::{HuginnError, Result};

/// Builder for configuring optimizer instances.
pub struct OptimizerBuilder {
    executor: Arc<dyn CommandExecutor>,
    config: OptimizerConfig,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl OptimizerBuilder {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            config: OptimizerConfig::default(),
            sink: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive periodic snapshots (default: [`TracingSink`]).
    pub fn sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and start the background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Optimizer> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(HuginnError::Configuration(
                "optimizer must be built inside a tokio runtime".to_string(),
            ));
        }
        self.config.validate()?;

        let config = self.config;
        let pool = Arc::new(WorkerPool::new(config.resolved_workers()));
        let recorder = Arc::new(MetricsRecorder::new());
        let mut tasks = Vec::new();

        let cache = config
            .cache_enabled
            .then(|| Arc::new(ResultCache::new(config.cache_ttl, config.cache_max_entries)));

        let mut dispatcher =
            GroupDispatcher::new(self.executor, Arc::clone(&pool), config.strategies.clone());
        if let Some(cache) = &cache {
            dispatcher = dispatcher.with_cache(Arc::clone(cache));
            tasks.push(spawn_sweeper(Arc::clone(cache), config.sweep_interval));
        }
        let dispatcher = Arc::new(dispatcher);

        // The collector loop ends on its own once the optimizer drops its handle.
        let collector = config.batching_enabled.then(|| {
            let handler: Arc<dyn BatchHandler> = dispatcher.clone();
            let (collector, _task) = BatchCollector::spawn(config.collector(), handler);
            collector
        });

        if config.metrics_enabled {
            let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
            tasks.push(spawn_reporter(
                Arc::clone(&recorder),
                Arc::clone(&pool),
                sink,
                config.metrics_interval,
            ));
        }

        info!(
            workers = pool.workers(),
            cache = config.cache_enabled,
            batching = config.batching_enabled,
            batch_size = config.batch_size,
            batch_delay_ms = config.batch_delay.as_millis() as u64,
            "optimizer started"
        );

        Ok(Optimizer {
            config,
            cache,
            collector,
            dispatcher,
            pool,
            recorder,
            tasks,
        })
    }
}
