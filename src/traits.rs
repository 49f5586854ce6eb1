//! Collaborator traits
//!
//! The optimizer consumes exactly one required collaborator, a
//! [`CommandExecutor`], and one optional one, a [`MetricsSink`].
//! [`BatchHandler`] is the seam between the batch collector and the
//! strategy dispatcher.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::stats::MetricsSnapshot;
use crate::types::PendingRequest;

/// Does the actual work for a command.
///
/// Invoked by every group strategy. Failures are delivered to the caller
/// unchanged and are never cached.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, session_id: &str, command: &str) -> Result<Value>;
}

/// Receives periodic metrics snapshots.
///
/// Called from a background task; implementations must not block.
pub trait MetricsSink: Send + Sync {
    fn report(&self, snapshot: &MetricsSnapshot);
}

/// Processes a flushed batch.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle_batch(&self, batch: Vec<PendingRequest>);
}
