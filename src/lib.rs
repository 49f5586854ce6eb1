//! Huginn - request optimizer for session-scoped commands
//!
//! This crate sits in front of a [`CommandExecutor`] and reduces the work it
//! has to do: results are cached per `(session, command)`, concurrent
//! misses are collected into micro-batches, and each batch is split by
//! command type and executed under a per-type strategy (combined, parallel
//! on a bounded worker pool, or sequential).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use huginn::{CancellationToken, CommandExecutor, Optimizer, OptimizerConfig};
//! use serde_json::{Value, json};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl CommandExecutor for Echo {
//!     async fn execute(&self, session_id: &str, command: &str) -> huginn::Result<Value> {
//!         Ok(json!({ "session": session_id, "command": command }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let optimizer = Optimizer::builder(Arc::new(Echo))
//!         .config(OptimizerConfig::new().batch_size(20))
//!         .build()?;
//!
//!     let cancel = CancellationToken::new();
//!     let first = optimizer.execute(&cancel, "s1", "analyze src").await?;
//!     let second = optimizer.execute(&cancel, "s1", "analyze src").await?;
//!     assert!(!first.cache_hit && second.cache_hit);
//!
//!     println!("{:?}", optimizer.snapshot());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod optimizer;
pub mod pool;
pub mod stats;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{HuginnError, Result};
pub use optimizer::{Optimizer, OptimizerBuilder};
pub use traits::{BatchHandler, CommandExecutor, MetricsSink};

pub use cache::{CacheLookup, ResultCache};
pub use config::{FileConfig, OptimizerConfig};
pub use dispatch::{Strategy, StrategyTable};
pub use stats::{MetricsSnapshot, TracingSink};
pub use types::{CacheKey, OptimizedResponse, PendingRequest};
pub use version::{PKG_NAME, PKG_VERSION, version_string};

pub use tokio_util::sync::CancellationToken;
