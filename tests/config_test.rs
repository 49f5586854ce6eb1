use std::io::Write;
use std::time::Duration;

use huginn::{FileConfig, HuginnError, Optimizer, OptimizerConfig, Strategy};

#[test]
fn optimizer_config_defaults() {
    let config = OptimizerConfig::default();
    assert!(config.cache_enabled);
    assert_eq!(config.cache_ttl, Duration::from_secs(15 * 60));
    assert_eq!(config.cache_max_entries, 1000);
    assert_eq!(config.sweep_interval, Duration::from_secs(5 * 60));
    assert!(config.batching_enabled);
    assert_eq!(config.batch_size, 10);
    assert_eq!(config.batch_delay, Duration::from_millis(100));
    assert_eq!(config.queue_capacity, 100);
    assert_eq!(config.workers, 0);
    assert!(config.metrics_enabled);
    assert_eq!(config.metrics_interval, Duration::from_secs(30));
    assert_eq!(config.strategies.strategy_for("analyze"), Strategy::Combine);
    assert_eq!(config.strategies.strategy_for("test"), Strategy::Parallel);
    assert_eq!(config.strategies.strategy_for("build"), Strategy::Sequential);
}

#[test]
fn optimizer_config_builder() {
    let config = OptimizerConfig::new()
        .cache_ttl(Duration::from_secs(60))
        .batch_size(4)
        .batch_delay(Duration::from_millis(25))
        .workers(8)
        .strategy("review", Strategy::Parallel)
        .parallel_enabled(false);

    assert_eq!(config.cache_ttl, Duration::from_secs(60));
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.collector().batch_delay, Duration::from_millis(25));
    assert_eq!(config.resolved_workers(), 8);
    assert_eq!(config.strategies.strategy_for("review"), Strategy::Sequential);
}

#[test]
fn load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[batch]
size = 25
delay_ms = 250

[strategies]
review = "combine"
"#
    )
    .unwrap();

    let config: OptimizerConfig = FileConfig::load(Some(file.path())).unwrap().into();
    assert_eq!(config.batch_size, 25);
    assert_eq!(config.batch_delay, Duration::from_millis(250));
    // Untouched sections keep their defaults.
    assert_eq!(config.cache_ttl, Duration::from_secs(900));
    assert_eq!(config.strategies.strategy_for("review"), Strategy::Combine);
    assert_eq!(config.strategies.strategy_for("analyze"), Strategy::Combine);
}

#[test]
fn malformed_file_is_configuration_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[batch]\nsize = \"ten\"").unwrap();

    let err = FileConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, HuginnError::Configuration(_)));
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[tokio::test]
async fn file_values_reach_the_optimizer() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[workers]\ncount = 3\n\n[cache]\nenabled = false").unwrap();

    let config: OptimizerConfig = FileConfig::load(Some(file.path())).unwrap().into();
    let optimizer = Optimizer::builder(std::sync::Arc::new(Noop))
        .config(config)
        .build()
        .unwrap();

    assert_eq!(optimizer.workers(), 3);
    assert!(optimizer.cache().is_none());
}

#[tokio::test]
async fn zero_batch_size_from_file_is_rejected_at_build() {
    let config: OptimizerConfig = FileConfig::from_toml_str("[batch]\nsize = 0")
        .unwrap()
        .into();
    let result = Optimizer::builder(std::sync::Arc::new(Noop))
        .config(config)
        .build();
    assert!(matches!(result, Err(HuginnError::Configuration(_))));
}

struct Noop;

#[async_trait::async_trait]
impl huginn::CommandExecutor for Noop {
    async fn execute(&self, _session_id: &str, _command: &str) -> huginn::Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}
