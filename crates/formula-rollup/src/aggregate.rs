use crate::config::ExecutionMode;
use crate::error::{RollupError, RollupResult};
use crate::parallel::try_map_ordered;
use crate::table::FactRow;
use crate::value::GroupKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reduces a non-empty group of fact values to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    /// Number of rows in the group. Values (including blanks) are ignored.
    Count,
    /// Arithmetic mean of the group's non-blank values.
    Average,
    Sum,
    Min,
    Max,
}

impl Reducer {
    /// The conventional join default for a dimension row with no group: `0` for every reducer.
    ///
    /// This is the algebraic identity only for `Count` and `Sum`. `Min` and `Max` have no finite
    /// identity, so callers that must tell "no data" apart from a real `0` should configure an
    /// explicit default.
    pub fn join_default(self) -> f64 {
        0.0
    }

    /// Reduce one group's values; blanks are `None`.
    ///
    /// Groups built by [`GroupAggregator`] are never empty. Calling this directly with an empty
    /// group fails, as does `Average`/`Min`/`Max` over a group whose values are all blank.
    pub fn reduce(self, key: &GroupKey, values: &[Option<f64>]) -> RollupResult<f64> {
        let empty = || RollupError::EmptyGroupReduction {
            reducer: self,
            key: key.clone(),
        };
        if values.is_empty() {
            return Err(empty());
        }

        let numbers = values.iter().flatten().copied();
        match self {
            Reducer::Count => Ok(values.len() as f64),
            Reducer::Sum => Ok(numbers.sum()),
            Reducer::Average => {
                let (sum, count) = numbers
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                if count == 0 {
                    return Err(empty());
                }
                Ok(sum / count as f64)
            }
            Reducer::Min => numbers.reduce(f64::min).ok_or_else(empty),
            Reducer::Max => numbers.reduce(f64::max).ok_or_else(empty),
        }
    }
}

/// The reduced values for one distinct key of a fact collection.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateResult {
    pub key: GroupKey,
    /// One value per configured reducer, in reducer order.
    pub values: Vec<f64>,
}

impl AggregateResult {
    pub fn new(key: impl Into<GroupKey>, values: Vec<f64>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn value(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }
}

struct Group {
    key: GroupKey,
    values: Vec<Option<f64>>,
}

/// Partitions fact rows by key and reduces each partition.
#[derive(Clone, Debug)]
pub struct GroupAggregator {
    reducers: Vec<Reducer>,
    mode: ExecutionMode,
}

impl GroupAggregator {
    pub fn new(reducers: Vec<Reducer>) -> Self {
        Self {
            reducers,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn reducers(&self) -> &[Reducer] {
        &self.reducers
    }

    /// Produce one [`AggregateResult`] per distinct key, in first-occurrence order.
    pub fn aggregate(&self, facts: &[FactRow]) -> RollupResult<Vec<AggregateResult>> {
        let groups = partition(facts);
        log::debug!(
            "rollup: {} fact rows formed {} groups ({} reducers)",
            facts.len(),
            groups.len(),
            self.reducers.len()
        );

        try_map_ordered(self.mode, &groups, |group| {
            let values = self
                .reducers
                .iter()
                .map(|reducer| reducer.reduce(&group.key, &group.values))
                .collect::<RollupResult<Vec<f64>>>()?;
            Ok(AggregateResult {
                key: group.key.clone(),
                values,
            })
        })
    }
}

fn partition(facts: &[FactRow]) -> Vec<Group> {
    let mut index: HashMap<&GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for fact in facts {
        let slot = *index.entry(&fact.key).or_insert_with(|| {
            groups.push(Group {
                key: fact.key.clone(),
                values: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].values.push(fact.value);
    }
    groups
}
