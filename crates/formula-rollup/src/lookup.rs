use crate::aggregate::AggregateResult;
use crate::error::{RollupError, RollupResult};
use crate::value::GroupKey;
use std::collections::HashMap;

/// A read-only, key-indexed view over an aggregate result collection.
///
/// Keys must be unique: building from a collection that repeats a key fails with
/// [`RollupError::DuplicateKey`] rather than letting one entry shadow another.
#[derive(Clone, Debug)]
pub struct KeyedLookup {
    name: String,
    results: Vec<AggregateResult>,
    index: HashMap<GroupKey, usize>,
}

impl KeyedLookup {
    pub fn build(name: impl Into<String>, results: Vec<AggregateResult>) -> RollupResult<Self> {
        let name = name.into();
        let mut index = HashMap::with_capacity(results.len());
        for (pos, result) in results.iter().enumerate() {
            if index.insert(result.key.clone(), pos).is_some() {
                return Err(RollupError::DuplicateKey {
                    collection: name,
                    key: result.key.clone(),
                });
            }
        }
        log::debug!("rollup: built lookup {name} over {} keys", results.len());

        Ok(Self {
            name,
            results,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &GroupKey) -> Option<&AggregateResult> {
        let pos = *self.index.get(key)?;
        self.results.get(pos)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Keys in the order of the source collection.
    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> + '_ {
        self.results.iter().map(|r| &r.key)
    }
}
