use crate::aggregate::Reducer;
use crate::error::{RollupError, RollupResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How per-group reductions and per-row joins are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    SingleThreaded,
    MultiThreaded,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        if cfg!(all(feature = "parallel", not(target_arch = "wasm32"))) {
            ExecutionMode::MultiThreaded
        } else {
            ExecutionMode::SingleThreaded
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOptions {
    #[serde(default)]
    pub mode: ExecutionMode,
}

/// One joined metric: how a fact source is reduced and what a dimension row gets when the
/// source has no group for its key.
///
/// `joinDefault` may be omitted in serialized form, in which case
/// [`Reducer::join_default`] (`0`) is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    pub name: String,
    pub reducer: Reducer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_default: Option<f64>,
}

impl MetricConfig {
    pub fn new(name: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            name: name.into(),
            reducer,
            join_default: None,
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, Reducer::Count)
    }

    pub fn average(name: impl Into<String>) -> Self {
        Self::new(name, Reducer::Average)
    }

    pub fn with_join_default(mut self, default: f64) -> Self {
        self.join_default = Some(default);
        self
    }

    pub fn join_default(&self) -> f64 {
        self.join_default.unwrap_or_else(|| self.reducer.join_default())
    }
}

/// A serializable description of a rollup: metrics per fact source, plus execution options.
///
/// ```json
/// {
///   "options": { "mode": "singleThreaded" },
///   "metrics": {
///     "accesses": [{ "name": "TotalViews", "reducer": "count" }],
///     "latencies": [{ "name": "AvgLatencyMs", "reducer": "average", "joinDefault": 0 }]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupConfig {
    #[serde(default)]
    pub options: RollupOptions,
    pub metrics: BTreeMap<String, Vec<MetricConfig>>,
}

impl RollupConfig {
    pub fn from_json(json: &str) -> RollupResult<Self> {
        serde_json::from_str(json).map_err(|err| RollupError::InvalidConfig(err.to_string()))
    }

    pub fn to_json(&self) -> RollupResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| RollupError::InvalidConfig(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_default_falls_back_to_zero() {
        let metric: MetricConfig =
            serde_json::from_str(r#"{ "name": "AvgLatencyMs", "reducer": "average" }"#).unwrap();
        assert_eq!(metric.reducer, Reducer::Average);
        assert_eq!(metric.join_default(), 0.0);
        assert_eq!(MetricConfig::new("MinLatencyMs", Reducer::Min).join_default(), 0.0);
        assert_eq!(MetricConfig::new("MaxLatencyMs", Reducer::Max).join_default(), 0.0);

        let metric: MetricConfig = serde_json::from_str(
            r#"{ "name": "MaxLatencyMs", "reducer": "max", "joinDefault": -1 }"#,
        )
        .unwrap();
        assert_eq!(metric.join_default(), -1.0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "latencies".to_string(),
            vec![MetricConfig::average("AvgLatencyMs").with_join_default(0.0)],
        );
        let config = RollupConfig {
            options: RollupOptions {
                mode: ExecutionMode::SingleThreaded,
            },
            metrics,
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"joinDefault\""));
        assert!(json.contains("\"singleThreaded\""));
        assert_eq!(RollupConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn unknown_reducer_is_an_invalid_config() {
        let err = RollupConfig::from_json(
            r#"{ "metrics": { "accesses": [{ "name": "Views", "reducer": "median" }] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RollupError::InvalidConfig(_)), "{err:?}");
    }
}
