//! Per-key rollups over fact collections, left-outer-joined onto a dimension collection.
//!
//! The pipeline has three stages:
//! - [`GroupAggregator`] partitions fact rows by [`GroupKey`] and reduces each group with one or
//!   more [`Reducer`]s.
//! - [`KeyedLookup`] indexes the aggregates by key (keys must be unique).
//! - [`left_outer_join`] emits exactly one row per dimension row, probing every lookup and
//!   substituting the metric default when a key has no aggregate.
//!
//! [`RollupPipeline`] wires the stages together from [`FactSource`]s or a [`RollupConfig`].

#![forbid(unsafe_code)]

mod aggregate;
mod config;
mod error;
mod join;
mod lookup;
mod parallel;
mod pipeline;
mod table;
mod value;

pub use crate::aggregate::{AggregateResult, GroupAggregator, Reducer};
pub use crate::config::{ExecutionMode, MetricConfig, RollupConfig, RollupOptions};
pub use crate::error::{RollupError, RollupResult};
pub use crate::join::{left_outer_join, JoinMetric, JoinedRow, JoinedTable, MetricExtractor};
pub use crate::lookup::KeyedLookup;
pub use crate::pipeline::{FactSource, RollupPipeline};
pub use crate::table::{DimensionRow, FactRow, Table};
pub use crate::value::{GroupKey, Value};
