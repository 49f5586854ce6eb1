//! Group strategy dispatcher.
//!
//! [`GroupDispatcher`] receives flushed batches, partitions them by command
//! type and runs each type-group under its [`Strategy`]:
//!
//! ```text
//!  batch ──► partition by type ──┬─ combine    ─► partition by (session, target) ─► 1 call each, concurrently
//!                                ├─ parallel   ─► worker pool, 1 task per request
//!                                └─ sequential ─► 1 call at a time
//! ```
//!
//! Type-groups of one batch run concurrently with each other. Every
//! executed request is fulfilled exactly once; successful results are also
//! written to the cache under the request's own key. A combined result is
//! only cached for members whose command is the one actually executed.

mod strategy;

pub use strategy::{Strategy, StrategyTable};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::Result;
use crate::cache::ResultCache;
use crate::pool::WorkerPool;
use crate::telemetry;
use crate::traits::{BatchHandler, CommandExecutor};
use crate::types::{OptimizedResponse, PendingRequest};

/// Executes requests and delivers their outcomes.
#[derive(Clone)]
struct Runner {
    executor: Arc<dyn CommandExecutor>,
    cache: Option<Arc<ResultCache>>,
}

impl Runner {
    async fn invoke(&self, session_id: &str, command: &str, strategy: Strategy) -> Result<Value> {
        metrics::counter!(telemetry::EXECUTOR_CALLS_TOTAL, "strategy" => strategy.as_str())
            .increment(1);
        self.executor.execute(session_id, command).await
    }

    /// Fulfill `request`, caching the value on success.
    fn deliver(&self, request: PendingRequest, outcome: Result<Value>, shared_by: usize) {
        self.fulfill(request, outcome, shared_by, true);
    }

    fn fulfill(
        &self,
        request: PendingRequest,
        outcome: Result<Value>,
        shared_by: usize,
        cacheable: bool,
    ) {
        let response = outcome.map(|value| {
            if cacheable && let Some(cache) = &self.cache {
                cache.store(request.key(), value.clone());
            }
            OptimizedResponse::executed(value, shared_by, request.age())
        });
        request.fulfill(response);
    }

    async fn run_one(&self, request: PendingRequest, strategy: Strategy) {
        let outcome = self
            .invoke(&request.session_id, &request.command, strategy)
            .await;
        self.deliver(request, outcome, 1);
    }
}

/// Splits batches into type-groups and executes them.
pub struct GroupDispatcher {
    runner: Runner,
    pool: Arc<WorkerPool>,
    strategies: StrategyTable,
}

impl GroupDispatcher {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        pool: Arc<WorkerPool>,
        strategies: StrategyTable,
    ) -> Self {
        Self {
            runner: Runner {
                executor,
                cache: None,
            },
            pool,
            strategies,
        }
    }

    /// Write successful results into `cache`.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.runner.cache = Some(cache);
        self
    }

    /// Process one flushed batch. Returns when every group is done.
    #[instrument(skip_all, fields(size = batch.len()))]
    pub async fn dispatch(&self, batch: Vec<PendingRequest>) {
        let groups = partition(batch, |r| r.command_type().to_owned());
        join_all(
            groups
                .into_iter()
                .map(|(command_type, requests)| self.run_group(command_type, requests)),
        )
        .await;
    }

    /// Execute a single request outside any batch.
    pub async fn process_single(&self, request: PendingRequest) {
        self.runner.run_one(request, Strategy::Sequential).await;
    }

    async fn run_group(&self, command_type: String, requests: Vec<PendingRequest>) {
        let strategy = self.strategies.strategy_for(&command_type);
        debug!(
            command_type = %command_type,
            strategy = strategy.as_str(),
            size = requests.len(),
            "processing command group"
        );
        match strategy {
            Strategy::Combine => self.combine(requests).await,
            Strategy::Parallel => self.parallel(requests).await,
            Strategy::Sequential => self.sequential(requests).await,
        }
    }

    /// One executor call per distinct `(session, target)`, shared by every
    /// requester in that sub-group.
    ///
    /// Sessions never share a call. Members whose command differs from the
    /// executed one still receive the shared result but are not cached.
    async fn combine(&self, requests: Vec<PendingRequest>) {
        let subgroups = partition(requests, |r| (r.session_id.clone(), r.target().to_owned()));
        join_all(
            subgroups
                .into_iter()
                .map(|((session_id, target), members)| {
                    self.combine_members(session_id, target, members)
                }),
        )
        .await;
    }

    async fn combine_members(
        &self,
        session_id: String,
        target: String,
        members: Vec<PendingRequest>,
    ) {
        let Some(command) = members.first().map(|r| r.command.clone()) else {
            return;
        };
        let outcome = self
            .runner
            .invoke(&session_id, &command, Strategy::Combine)
            .await;

        let shared_by = members.len();
        debug!(session_id = %session_id, target = %target, shared_by, "combined execution");
        for member in members {
            let cacheable = member.command == command;
            self.runner
                .fulfill(member, outcome.clone(), shared_by, cacheable);
        }
    }

    /// Every request on its own pool task; returns once all have finished.
    async fn parallel(&self, requests: Vec<PendingRequest>) {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let runner = self.runner.clone();
            let submitted = self
                .pool
                .submit(async move { runner.run_one(request, Strategy::Parallel).await })
                .await;
            match submitted {
                Ok(handle) => handles.push(handle),
                // The request went down with the task; its caller sees `Shutdown`.
                Err(e) => warn!(error = %e, "worker pool rejected task"),
            }
        }
        for handle in handles {
            if handle.join().await.is_err() {
                warn!("parallel task ended without completing");
            }
        }
    }

    async fn sequential(&self, requests: Vec<PendingRequest>) {
        for request in requests {
            self.runner.run_one(request, Strategy::Sequential).await;
        }
    }
}

#[async_trait]
impl BatchHandler for GroupDispatcher {
    async fn handle_batch(&self, batch: Vec<PendingRequest>) {
        self.dispatch(batch).await;
    }
}

/// Group requests by `key`, preserving arrival order within each group.
fn partition<K, F>(requests: Vec<PendingRequest>, key: F) -> BTreeMap<K, Vec<PendingRequest>>
where
    K: Ord,
    F: Fn(&PendingRequest) -> K,
{
    let mut groups: BTreeMap<K, Vec<PendingRequest>> = BTreeMap::new();
    for request in requests {
        groups.entry(key(&request)).or_default().push(request);
    }
    groups
}
