//! In-flight requests and their one-shot fulfillment slots.

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::command::{CacheKey, command_target, command_type};
use super::response::OptimizedResponse;
use crate::Result;

/// Receiving half of a fulfillment slot, held by the waiting caller.
pub type ResponseReceiver = oneshot::Receiver<Result<OptimizedResponse>>;

/// Single-write channel delivering a request's outcome to its caller.
///
/// Writing consumes the slot, so a second write cannot be expressed.
#[derive(Debug)]
pub struct FulfillmentSlot {
    tx: oneshot::Sender<Result<OptimizedResponse>>,
}

impl FulfillmentSlot {
    /// Create a slot and the receiver the caller waits on.
    pub fn new() -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the outcome. Returns `false` if the caller stopped waiting.
    pub fn fulfill(self, outcome: Result<OptimizedResponse>) -> bool {
        self.tx.send(outcome).is_ok()
    }
}

/// One caller's operation, waiting to be batched and executed.
#[derive(Debug)]
pub struct PendingRequest {
    pub session_id: String,
    pub command: String,
    /// The caller's cancellation signal. Strategies do not abort on it;
    /// it only tells whether an undeliverable result was abandoned.
    pub cancel: CancellationToken,
    pub enqueued_at: Instant,
    slot: FulfillmentSlot,
}

impl PendingRequest {
    /// Build a request with a fresh fulfillment slot.
    pub fn new(
        session_id: impl Into<String>,
        command: impl Into<String>,
        cancel: CancellationToken,
    ) -> (Self, ResponseReceiver) {
        let (slot, rx) = FulfillmentSlot::new();
        let request = Self {
            session_id: session_id.into(),
            command: command.into(),
            cancel,
            enqueued_at: Instant::now(),
            slot,
        };
        (request, rx)
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.session_id, &self.command)
    }

    pub fn command_type(&self) -> &str {
        command_type(&self.command)
    }

    pub fn target(&self) -> &str {
        command_target(&self.command)
    }

    /// Time since the request was created.
    pub fn age(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Write the outcome to the caller, consuming the request.
    ///
    /// Returns `false` if the caller is no longer waiting.
    pub fn fulfill(self, outcome: Result<OptimizedResponse>) -> bool {
        let delivered = self.slot.fulfill(outcome);
        if !delivered {
            debug!(
                session = %self.session_id,
                command = %self.command,
                cancelled = self.cancel.is_cancelled(),
                "caller stopped waiting before fulfillment"
            );
        }
        delivered
    }
}
