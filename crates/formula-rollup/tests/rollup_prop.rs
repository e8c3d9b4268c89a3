#![cfg(not(target_arch = "wasm32"))]

use formula_rollup::{
    DimensionRow, ExecutionMode, FactRow, FactSource, GroupKey, MetricConfig, RollupPipeline,
};
use proptest::prelude::*;

const KEY_SPACE: usize = 12;

fn key(idx: usize) -> GroupKey {
    GroupKey::single(format!("page{idx}.com"))
}

fn arb_dimension() -> impl Strategy<Value = Vec<usize>> {
    proptest::sample::subsequence((0..KEY_SPACE).collect::<Vec<_>>(), 0..=KEY_SPACE).prop_shuffle()
}

/// Facts may reference keys outside the dimension (they never surface in the output).
fn arb_facts() -> impl Strategy<Value = Vec<(usize, i32)>> {
    proptest::collection::vec((0..KEY_SPACE + 3, -100i32..=100), 0..64)
}

fn run(
    dimension: &[usize],
    views: &[(usize, i32)],
    latencies: &[(usize, i32)],
    latency_default: f64,
    mode: ExecutionMode,
) -> formula_rollup::JoinedTable {
    let dimension = dimension.iter().map(|&k| DimensionRow::new(key(k))).collect();
    let views = views.iter().map(|&(k, _)| FactRow::marker(key(k))).collect();
    let latencies = latencies
        .iter()
        .map(|&(k, v)| FactRow::new(key(k), v as f64))
        .collect();

    RollupPipeline::new(dimension)
        .with_mode(mode)
        .source(FactSource::new("views", views).metric(MetricConfig::count("Views")))
        .source(
            FactSource::new("latencies", latencies)
                .metric(MetricConfig::average("AvgLatency").with_join_default(latency_default)),
        )
        .run()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn one_row_per_dimension_row_in_dimension_order(
        dimension in arb_dimension(),
        views in arb_facts(),
        latencies in arb_facts(),
    ) {
        let joined = run(&dimension, &views, &latencies, 0.0, ExecutionMode::SingleThreaded);
        let keys: Vec<GroupKey> = joined.iter().map(|row| row.key.clone()).collect();
        let expected: Vec<GroupKey> = dimension.iter().map(|&k| key(k)).collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn metrics_match_reference_aggregates_or_defaults(
        dimension in arb_dimension(),
        views in arb_facts(),
        latencies in arb_facts(),
        latency_default in -5.0f64..5.0,
    ) {
        let joined = run(&dimension, &views, &latencies, latency_default, ExecutionMode::SingleThreaded);

        for &k in &dimension {
            let row_key = key(k);
            let expected_views = views.iter().filter(|(fk, _)| *fk == k).count() as f64;
            prop_assert_eq!(joined.value(&row_key, "Views"), Some(expected_views));

            let samples: Vec<f64> = latencies
                .iter()
                .filter(|(fk, _)| *fk == k)
                .map(|&(_, v)| v as f64)
                .collect();
            let actual = joined.value(&row_key, "AvgLatency").unwrap();
            if samples.is_empty() {
                prop_assert_eq!(actual, latency_default);
            } else {
                let mean = samples.iter().sum::<f64>() / samples.len() as f64;
                prop_assert!((actual - mean).abs() < 1e-9, "{actual} vs {mean}");
            }
        }
    }

    #[test]
    fn execution_modes_and_reruns_agree(
        dimension in arb_dimension(),
        views in arb_facts(),
        latencies in arb_facts(),
    ) {
        let single = run(&dimension, &views, &latencies, 0.0, ExecutionMode::SingleThreaded);
        let multi = run(&dimension, &views, &latencies, 0.0, ExecutionMode::MultiThreaded);
        let rerun = run(&dimension, &views, &latencies, 0.0, ExecutionMode::MultiThreaded);
        prop_assert_eq!(&single, &multi);
        prop_assert_eq!(&multi, &rerun);
    }
}
