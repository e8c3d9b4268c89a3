use crate::aggregate::GroupAggregator;
use crate::config::{ExecutionMode, MetricConfig, RollupConfig, RollupOptions};
use crate::error::{RollupError, RollupResult};
use crate::join::{left_outer_join, JoinMetric, JoinedTable};
use crate::lookup::KeyedLookup;
use crate::table::{DimensionRow, FactRow};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fact collection and the metrics to derive from it.
#[derive(Clone, Debug)]
pub struct FactSource {
    pub name: String,
    pub facts: Vec<FactRow>,
    pub metrics: Vec<MetricConfig>,
}

impl FactSource {
    pub fn new(name: impl Into<String>, facts: Vec<FactRow>) -> Self {
        Self {
            name: name.into(),
            facts,
            metrics: Vec::new(),
        }
    }

    pub fn metric(mut self, metric: MetricConfig) -> Self {
        self.metrics.push(metric);
        self
    }
}

/// Groups every fact source, indexes the aggregates by key and left-outer-joins them onto the
/// dimension collection.
///
/// The joined table has one metric column per configured metric, ordered by source and then by
/// metric within the source.
#[derive(Clone, Debug)]
pub struct RollupPipeline {
    dimension: Vec<DimensionRow>,
    sources: Vec<FactSource>,
    options: RollupOptions,
}

impl RollupPipeline {
    pub fn new(dimension: Vec<DimensionRow>) -> Self {
        Self {
            dimension,
            sources: Vec::new(),
            options: RollupOptions::default(),
        }
    }

    /// Build a pipeline from a [`RollupConfig`], pairing each configured source with its facts.
    ///
    /// Sources are taken in config order (sorted by name). A configured source without facts
    /// joins as an empty collection, so every dimension row receives the metric defaults.
    /// Facts for a source the config does not mention, or supplied twice for one source, are
    /// rejected.
    pub fn from_config(
        dimension: Vec<DimensionRow>,
        config: &RollupConfig,
        facts: impl IntoIterator<Item = (String, Vec<FactRow>)>,
    ) -> RollupResult<Self> {
        let mut by_source: BTreeMap<String, Vec<FactRow>> = BTreeMap::new();
        for (name, source_facts) in facts {
            if !config.metrics.contains_key(&name) {
                return Err(RollupError::InvalidConfig(format!(
                    "facts supplied for unconfigured source {name}"
                )));
            }
            if by_source.contains_key(&name) {
                return Err(RollupError::InvalidConfig(format!(
                    "facts supplied more than once for source {name}"
                )));
            }
            by_source.insert(name, source_facts);
        }

        let mut pipeline = Self::new(dimension).with_options(config.options);
        for (name, metrics) in &config.metrics {
            let source_facts = by_source.remove(name).unwrap_or_default();
            pipeline.sources.push(FactSource {
                name: name.clone(),
                facts: source_facts,
                metrics: metrics.clone(),
            });
        }
        Ok(pipeline)
    }

    pub fn with_options(mut self, options: RollupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn source(mut self, source: FactSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn dimension(&self) -> &[DimensionRow] {
        &self.dimension
    }

    pub fn sources(&self) -> &[FactSource] {
        &self.sources
    }

    fn validate(&self) -> RollupResult<()> {
        if let Some(source) = self.sources.iter().find(|s| s.metrics.is_empty()) {
            return Err(RollupError::InvalidConfig(format!(
                "source {} has no metrics",
                source.name
            )));
        }
        Ok(())
    }

    pub fn run(&self) -> RollupResult<JoinedTable> {
        self.validate()?;
        let mode = self.options.mode;

        let mut join_metrics = Vec::new();
        for source in &self.sources {
            let reducers = source.metrics.iter().map(|m| m.reducer).collect();
            let results = GroupAggregator::new(reducers)
                .with_mode(mode)
                .aggregate(&source.facts)?;
            let lookup = Arc::new(KeyedLookup::build(source.name.clone(), results)?);

            for (idx, metric) in source.metrics.iter().enumerate() {
                join_metrics.push(JoinMetric::value_at(
                    metric.name.clone(),
                    Arc::clone(&lookup),
                    idx,
                    metric.join_default(),
                ));
            }
        }

        left_outer_join(&self.dimension, &join_metrics, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_without_metrics_is_rejected() {
        let err = RollupPipeline::new(vec![DimensionRow::new("abc.com")])
            .source(FactSource::new("accesses", vec![FactRow::marker("abc.com")]))
            .run()
            .unwrap_err();
        assert_eq!(
            err,
            RollupError::InvalidConfig("source accesses has no metrics".into())
        );
    }

    #[test]
    fn metric_names_must_be_unique_across_sources() {
        let err = RollupPipeline::new(vec![DimensionRow::new("abc.com")])
            .source(
                FactSource::new("accesses", vec![FactRow::marker("abc.com")])
                    .metric(MetricConfig::count("Total")),
            )
            .source(
                FactSource::new("latencies", vec![FactRow::new("abc.com", 2.0)])
                    .metric(MetricConfig::average("Total")),
            )
            .run()
            .unwrap_err();
        assert_eq!(
            err,
            RollupError::DuplicateMetric {
                metric: "Total".into()
            }
        );
    }

    #[test]
    fn no_sources_yields_bare_dimension_rows() {
        let dimension = vec![DimensionRow::new("abc.com"), DimensionRow::new("def.com")];
        let joined = RollupPipeline::new(dimension).run().unwrap();
        assert_eq!(joined.len(), 2);
        assert!(joined.metric_names().is_empty());
        assert!(joined.iter().all(|row| row.values.is_empty()));
    }
}
