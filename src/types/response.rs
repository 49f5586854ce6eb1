//! Response type delivered to callers

use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Result of an optimized command execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedResponse {
    /// Executor output (or cached copy of it).
    pub result: Value,
    /// Whether the result was served from the cache.
    pub cache_hit: bool,
    /// Number of requests that shared the underlying computation.
    /// 1 unless the combine strategy merged several requests.
    pub batch_size: usize,
    /// Time from request creation to delivery.
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl OptimizedResponse {
    /// A freshly executed result.
    pub fn executed(result: Value, batch_size: usize, duration: Duration) -> Self {
        Self {
            result,
            cache_hit: false,
            batch_size,
            duration,
        }
    }

    /// A result served from the cache.
    pub fn cached(result: Value, duration: Duration) -> Self {
        Self {
            result,
            cache_hit: true,
            batch_size: 1,
            duration,
        }
    }
}

pub(crate) fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_duration_as_millis() {
        let resp = OptimizedResponse::executed(json!("ok"), 3, Duration::from_millis(250));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["duration_ms"], json!(250.0));
        assert_eq!(v["batch_size"], json!(3));
        assert_eq!(v["cache_hit"], json!(false));
    }

    #[test]
    fn cached_response_has_unit_batch() {
        let resp = OptimizedResponse::cached(json!(1), Duration::ZERO);
        assert!(resp.cache_hit);
        assert_eq!(resp.batch_size, 1);
    }
}
