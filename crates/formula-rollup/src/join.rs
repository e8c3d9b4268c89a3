use crate::aggregate::AggregateResult;
use crate::config::ExecutionMode;
use crate::error::{RollupError, RollupResult};
use crate::lookup::KeyedLookup;
use crate::parallel::try_map_ordered;
use crate::table::DimensionRow;
use crate::value::{format_number, GroupKey};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub type MetricExtractor = Arc<dyn Fn(&AggregateResult) -> Option<f64> + Send + Sync>;

/// One metric joined onto the dimension: where to probe, how to read a matched aggregate, and
/// what to use when there is no match.
#[derive(Clone)]
pub struct JoinMetric {
    pub name: String,
    pub lookup: Arc<KeyedLookup>,
    pub default: f64,
    extractor: MetricExtractor,
}

impl fmt::Debug for JoinMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinMetric")
            .field("name", &self.name)
            .field("lookup", &self.lookup.name())
            .field("default", &self.default)
            .finish()
    }
}

impl JoinMetric {
    /// Reads the first reduced value of a matched aggregate.
    pub fn new(name: impl Into<String>, lookup: Arc<KeyedLookup>, default: f64) -> Self {
        Self::value_at(name, lookup, 0, default)
    }

    /// Reads the `index`-th reduced value of a matched aggregate.
    pub fn value_at(
        name: impl Into<String>,
        lookup: Arc<KeyedLookup>,
        index: usize,
        default: f64,
    ) -> Self {
        Self {
            name: name.into(),
            lookup,
            default,
            extractor: Arc::new(move |result: &AggregateResult| result.value(index)),
        }
    }

    pub fn with_extractor(
        mut self,
        extractor: impl Fn(&AggregateResult) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    fn resolve(&self, key: &GroupKey) -> RollupResult<f64> {
        let Some(result) = self.lookup.get(key) else {
            log::trace!("rollup: {key} has no {} entry; using {}", self.name, self.default);
            return Ok(self.default);
        };
        (self.extractor)(result).ok_or_else(|| RollupError::MissingAggregateValue {
            metric: self.name.clone(),
            key: key.clone(),
        })
    }
}

/// One output row: the dimension key plus one value per joined metric.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedRow {
    pub key: GroupKey,
    pub values: Vec<f64>,
}

/// The result of a left outer join: exactly one row per dimension row, in dimension order.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedTable {
    metric_names: Vec<String>,
    rows: Vec<JoinedRow>,
    index: HashMap<GroupKey, usize>,
}

impl JoinedTable {
    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &JoinedRow> + '_ {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &GroupKey) -> Option<&JoinedRow> {
        let pos = *self.index.get(key)?;
        self.rows.get(pos)
    }

    /// The value of `metric` for the row keyed by `key`.
    pub fn value(&self, key: &GroupKey, metric: &str) -> Option<f64> {
        let col = self.metric_names.iter().position(|m| m == metric)?;
        self.row(key)?.values.get(col).copied()
    }

    pub fn into_rows(self) -> Vec<JoinedRow> {
        self.rows
    }
}

impl fmt::Display for JoinedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key")?;
        for name in &self.metric_names {
            write!(f, "\t{name}")?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{}", row.key)?;
            for value in &row.values {
                write!(f, "\t{}", format_number(*value))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Join every metric onto `dimension`, substituting each metric's default for keys its lookup
/// does not contain.
///
/// Dimension keys must be unique; a repeated key fails with [`RollupError::DuplicateKey`].
/// Metric names must be unique too; a repeated name fails with [`RollupError::DuplicateMetric`].
pub fn left_outer_join(
    dimension: &[DimensionRow],
    metrics: &[JoinMetric],
    mode: ExecutionMode,
) -> RollupResult<JoinedTable> {
    let mut names = HashSet::with_capacity(metrics.len());
    for metric in metrics {
        if !names.insert(metric.name.as_str()) {
            return Err(RollupError::DuplicateMetric {
                metric: metric.name.clone(),
            });
        }
    }

    let mut index = HashMap::with_capacity(dimension.len());
    for (pos, row) in dimension.iter().enumerate() {
        if index.insert(row.key.clone(), pos).is_some() {
            return Err(RollupError::DuplicateKey {
                collection: "dimension".to_string(),
                key: row.key.clone(),
            });
        }
    }

    let rows = try_map_ordered(mode, dimension, |row| -> RollupResult<JoinedRow> {
        let values = metrics
            .iter()
            .map(|metric| metric.resolve(&row.key))
            .collect::<RollupResult<Vec<f64>>>()?;
        Ok(JoinedRow {
            key: row.key.clone(),
            values,
        })
    })?;
    log::debug!(
        "rollup: joined {} metrics onto {} dimension rows",
        metrics.len(),
        rows.len()
    );

    Ok(JoinedTable {
        metric_names: metrics.iter().map(|m| m.name.clone()).collect(),
        rows,
        index,
    })
}
