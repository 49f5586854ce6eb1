//! Per-command-type execution strategies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a group of same-type requests is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Execute once per distinct target and share the result.
    Combine,
    /// Execute every request independently on the worker pool.
    Parallel,
    /// Execute one request at a time in the dispatching task.
    Sequential,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Combine => "combine",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

/// Lookup table from command type to [`Strategy`].
///
/// Types with no entry use [`Strategy::Sequential`]. By default
/// `analyze` combines and `test` runs in parallel.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyTable {
    by_type: HashMap<String, Strategy>,
    parallel_enabled: bool,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::empty()
            .with("analyze", Strategy::Combine)
            .with("test", Strategy::Parallel)
    }
}

impl StrategyTable {
    /// Table with no overrides: everything runs sequentially.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            parallel_enabled: true,
        }
    }

    /// Set the strategy for a command type.
    pub fn with(mut self, command_type: impl Into<String>, strategy: Strategy) -> Self {
        self.by_type.insert(command_type.into(), strategy);
        self
    }

    /// Allow or forbid the parallel strategy. When forbidden, parallel
    /// types run sequentially instead.
    pub fn parallel_enabled(mut self, enabled: bool) -> Self {
        self.parallel_enabled = enabled;
        self
    }

    /// Strategy to apply to `command_type`.
    pub fn strategy_for(&self, command_type: &str) -> Strategy {
        match self.by_type.get(command_type) {
            Some(Strategy::Parallel) if !self.parallel_enabled => Strategy::Sequential,
            Some(strategy) => *strategy,
            None => Strategy::Sequential,
        }
    }
}
