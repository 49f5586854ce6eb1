//! Optimizer configuration.
//!
//! [`OptimizerConfig`] is the programmatic form, built with chained
//! setters:
//!
//! ```rust
//! # use huginn::OptimizerConfig;
//! # use std::time::Duration;
//! let config = OptimizerConfig::new()
//!     .batch_size(20)
//!     .batch_delay(Duration::from_millis(50))
//!     .cache_ttl(Duration::from_secs(600));
//! assert!(config.validate().is_ok());
//! ```
//!
//! [`FileConfig`] is the TOML form. It is loaded with the following
//! resolution order:
//! 1. explicit path (e.g. a `--config` flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//! 4. built-in defaults
//!
//! ```toml
//! [cache]
//! ttl_secs = 900
//!
//! [batch]
//! size = 10
//! delay_ms = 100
//!
//! [strategies]
//! analyze = "combine"
//! review = "parallel"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::batch::{
    CollectorConfig, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY,
};
use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use crate::dispatch::{Strategy, StrategyTable};
use crate::pool::default_worker_count;
use crate::stats::DEFAULT_METRICS_INTERVAL;
use crate::{HuginnError, Result};

/// Runtime configuration for an [`Optimizer`](crate::Optimizer).
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Serve and store results in the cache. Default: true.
    pub cache_enabled: bool,
    /// Maximum age of a cached result. Default: 15 minutes.
    pub cache_ttl: Duration,
    /// Maximum number of cached results. Default: 1,000.
    pub cache_max_entries: u64,
    /// Interval between expiry sweeps. Default: 5 minutes.
    pub sweep_interval: Duration,
    /// Route misses through the batch collector. When false every miss is
    /// executed on its own. Default: true.
    pub batching_enabled: bool,
    /// Flush size. Default: 10.
    pub batch_size: usize,
    /// Flush period and handoff timeout. Default: 100ms.
    pub batch_delay: Duration,
    /// Collector inbox capacity. Default: 100.
    pub queue_capacity: usize,
    /// Worker-pool size; 0 means available parallelism × 2. Default: 0.
    pub workers: usize,
    /// Periodically sample and report metrics. Default: true.
    pub metrics_enabled: bool,
    /// Sampling interval. Default: 30s.
    pub metrics_interval: Duration,
    /// Strategy per command type.
    pub strategies: StrategyTable,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            batching_enabled: true,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers: 0,
            metrics_enabled: true,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            strategies: StrategyTable::default(),
        }
    }
}

impl OptimizerConfig {
    /// Create a new config with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the result cache.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the time-to-live for cached results.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the maximum number of cached results.
    pub fn cache_max_entries(mut self, n: u64) -> Self {
        self.cache_max_entries = n;
        self
    }

    /// Set the interval between expiry sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable batching.
    pub fn batching_enabled(mut self, enabled: bool) -> Self {
        self.batching_enabled = enabled;
        self
    }

    /// Set the flush size.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set the flush period (also the handoff timeout).
    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Set the collector inbox capacity.
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    /// Set the worker-pool size (0 = automatic).
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Allow or forbid the parallel strategy.
    pub fn parallel_enabled(mut self, enabled: bool) -> Self {
        self.strategies = self.strategies.parallel_enabled(enabled);
        self
    }

    /// Enable or disable periodic metrics reporting.
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Set the metrics sampling interval.
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    /// Set the strategy for a command type.
    pub fn strategy(mut self, command_type: impl Into<String>, strategy: Strategy) -> Self {
        self.strategies = self.strategies.with(command_type, strategy);
        self
    }

    /// Replace the whole strategy table.
    pub fn strategies(mut self, table: StrategyTable) -> Self {
        self.strategies = table;
        self
    }

    /// Worker count with `0` resolved to the automatic size.
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            default_worker_count()
        } else {
            self.workers
        }
    }

    /// Collector settings derived from this config.
    pub fn collector(&self) -> CollectorConfig {
        CollectorConfig {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Reject values the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(HuginnError::Configuration(msg.to_string()));
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if self.batch_delay.is_zero() {
            return invalid("batch_delay must be greater than zero");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity must be at least 1");
        }
        if self.cache_max_entries == 0 {
            return invalid("cache_max_entries must be at least 1");
        }
        if self.cache_ttl.is_zero() {
            return invalid("cache_ttl must be greater than zero");
        }
        if self.sweep_interval.is_zero() {
            return invalid("sweep_interval must be greater than zero");
        }
        if self.metrics_interval.is_zero() {
            return invalid("metrics_interval must be greater than zero");
        }
        Ok(())
    }
}

// ============================================================================
// File configuration
// ============================================================================

/// Configuration file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub workers: WorkersSection,
    #[serde(default)]
    pub metrics: MetricsSection,
    /// Per-type overrides, merged over the built-in table.
    #[serde(default)]
    pub strategies: HashMap<String, Strategy>,
}

/// `[cache]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// TTL in seconds (default: 900).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Capacity (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Sweep interval in seconds (default: 300).
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

/// `[batch]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Flush size (default: 10).
    #[serde(default = "default_batch_size")]
    pub size: usize,
    /// Flush period in milliseconds (default: 100).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Inbox capacity (default: 100).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            size: default_batch_size(),
            delay_ms: default_delay_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// `[workers]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersSection {
    /// Pool size; 0 = available parallelism × 2 (default: 0).
    #[serde(default)]
    pub count: usize,
    /// Allow the parallel strategy (default: true).
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            count: 0,
            parallel: true,
        }
    }
}

/// `[metrics]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sampling interval in seconds (default: 30).
    #[serde(default = "default_metrics_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_metrics_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

fn default_sweep_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_delay_ms() -> u64 {
    DEFAULT_BATCH_DELAY.as_millis() as u64
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_metrics_secs() -> u64 {
    DEFAULT_METRICS_INTERVAL.as_secs()
}

impl FileConfig {
    /// Load configuration from the standard locations, falling back to
    /// defaults when no file exists.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl From<FileConfig> for OptimizerConfig {
    fn from(file: FileConfig) -> Self {
        let mut strategies = StrategyTable::default().parallel_enabled(file.workers.parallel);
        for (command_type, strategy) in file.strategies {
            strategies = strategies.with(command_type, strategy);
        }

        Self {
            cache_enabled: file.cache.enabled,
            cache_ttl: Duration::from_secs(file.cache.ttl_secs),
            cache_max_entries: file.cache.max_entries,
            sweep_interval: Duration::from_secs(file.cache.sweep_interval_secs),
            batching_enabled: file.batch.enabled,
            batch_size: file.batch.size,
            batch_delay: Duration::from_millis(file.batch.delay_ms),
            queue_capacity: file.batch.queue_capacity,
            workers: file.workers.count,
            metrics_enabled: file.metrics.enabled,
            metrics_interval: Duration::from_secs(file.metrics.interval_secs),
            strategies,
        }
    }
}
