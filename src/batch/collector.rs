//! Collector actor and its producer handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::telemetry;
use crate::traits::BatchHandler;
use crate::types::PendingRequest;

/// Default flush size.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default flush period, also used as the handoff timeout.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Default inbox capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Collector tuning.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Flush as soon as this many requests are buffered. Default: 10.
    pub batch_size: usize,
    /// Flush period and handoff timeout. Default: 100ms.
    pub batch_delay: Duration,
    /// Inbox capacity before producers start waiting. Default: 100.
    pub queue_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Timer,
    Shutdown,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Timer => "timer",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Producer side of the collector.
///
/// Dropping every handle, or calling [`close`](Self::close), ends the
/// collector loop after a final flush.
#[derive(Clone)]
pub struct BatchCollector {
    tx: mpsc::Sender<PendingRequest>,
    handoff_timeout: Duration,
    closed: CancellationToken,
}

impl BatchCollector {
    /// Spawn the collector loop feeding `handler`.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(config: CollectorConfig, handler: Arc<dyn BatchHandler>) -> (Self, JoinHandle<()>) {
        let batch_size = config.batch_size.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let closed = CancellationToken::new();
        let task = tokio::spawn(run_collector(
            rx,
            handler,
            batch_size,
            config.batch_delay,
            closed.clone(),
        ));
        let handle = Self {
            tx,
            handoff_timeout: config.batch_delay,
            closed,
        };
        (handle, task)
    }

    /// Stop accepting requests. Whatever is already queued is flushed
    /// once more; later [`enqueue`](Self::enqueue) calls hand the request
    /// straight back.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// Hand a request to the collector.
    ///
    /// Waits at most the handoff timeout for inbox space. On timeout (or
    /// if the collector is gone) the request is handed back so the caller
    /// can execute it directly.
    pub async fn enqueue(&self, request: PendingRequest) -> Result<(), PendingRequest> {
        if self.closed.is_cancelled() {
            debug!(command = %request.command, "batch collector closed, executing directly");
            return Err(request);
        }
        match self.tx.send_timeout(request, self.handoff_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(request)) => {
                warn!(
                    command = %request.command,
                    timeout_ms = self.handoff_timeout.as_millis() as u64,
                    "batch queue saturated, executing directly"
                );
                Err(request)
            }
            Err(SendTimeoutError::Closed(request)) => {
                warn!(command = %request.command, "batch collector closed, executing directly");
                Err(request)
            }
        }
    }
}

async fn run_collector(
    mut rx: mpsc::Receiver<PendingRequest>,
    handler: Arc<dyn BatchHandler>,
    batch_size: usize,
    period: Duration,
    closed: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buffer: Vec<PendingRequest> = Vec::with_capacity(batch_size);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(request) => {
                    buffer.push(request);
                    if buffer.len() >= batch_size {
                        flush(&handler, &mut buffer, batch_size, FlushTrigger::Size);
                    }
                }
                None => {
                    flush(&handler, &mut buffer, batch_size, FlushTrigger::Shutdown);
                    debug!("batch collector stopped");
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(&handler, &mut buffer, batch_size, FlushTrigger::Timer);
            }
            _ = closed.cancelled() => {
                rx.close();
                while let Some(request) = rx.recv().await {
                    buffer.push(request);
                }
                flush(&handler, &mut buffer, batch_size, FlushTrigger::Shutdown);
                debug!("batch collector closed");
                break;
            }
        }
    }
}

/// Seal the buffer and hand it to the handler on its own task.
fn flush(
    handler: &Arc<dyn BatchHandler>,
    buffer: &mut Vec<PendingRequest>,
    batch_size: usize,
    trigger: FlushTrigger,
) {
    if buffer.is_empty() {
        return;
    }
    let batch = std::mem::replace(buffer, Vec::with_capacity(batch_size));

    metrics::counter!(telemetry::BATCHES_TOTAL, "trigger" => trigger.as_str()).increment(1);
    metrics::histogram!(telemetry::BATCH_SIZE).record(batch.len() as f64);
    debug!(size = batch.len(), trigger = trigger.as_str(), "processing batch");

    let handler = Arc::clone(handler);
    tokio::spawn(async move {
        handler.handle_batch(batch).await;
    });
}
