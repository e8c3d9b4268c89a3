use crate::aggregate::Reducer;
use crate::value::GroupKey;

pub type RollupResult<T> = Result<T, RollupError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RollupError {
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: GroupKey },

    #[error("{reducer:?} reduction over an empty group for key {key}")]
    EmptyGroupReduction { reducer: Reducer, key: GroupKey },

    #[error("unknown column {table}[{column}]")]
    UnknownColumn { table: String, column: String },

    #[error("schema mismatch for {table}: expected {expected} values, got {actual}")]
    SchemaMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("non-numeric value in {table}[{column}] at row {row}")]
    NonNumericValue {
        table: String,
        column: String,
        row: usize,
    },

    #[error("metric {metric} has no value for matched key {key}")]
    MissingAggregateValue { metric: String, key: GroupKey },

    #[error("duplicate metric: {metric}")]
    DuplicateMetric { metric: String },

    #[error("invalid rollup configuration: {0}")]
    InvalidConfig(String),
}
