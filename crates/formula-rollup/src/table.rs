use crate::error::{RollupError, RollupResult};
use crate::value::{GroupKey, Value};
use std::collections::HashMap;

/// A canonical entity, identified by a key that is unique within its dimension collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DimensionRow {
    pub key: GroupKey,
}

impl DimensionRow {
    pub fn new(key: impl Into<GroupKey>) -> Self {
        Self { key: key.into() }
    }
}

/// An observation recorded against a dimension key.
///
/// `value` is `None` for presence-only observations (e.g. a page access that is only ever
/// counted) and for blank measured cells.
#[derive(Clone, Debug, PartialEq)]
pub struct FactRow {
    pub key: GroupKey,
    pub value: Option<f64>,
}

impl FactRow {
    pub fn new(key: impl Into<GroupKey>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }

    pub fn marker(key: impl Into<GroupKey>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// A named, row-major in-memory table.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<impl Into<String>>) -> Self {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), idx))
            .collect();

        Self {
            name,
            columns,
            column_index,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> RollupResult<()> {
        if row.len() != self.columns.len() {
            return Err(RollupError::SchemaMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn column_idx(&self, column: &str) -> Option<usize> {
        self.column_index.get(column).copied()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_idx(column)?;
        self.rows.get(row)?.get(idx)
    }

    fn resolve_column(&self, column: &str) -> RollupResult<usize> {
        self.column_idx(column)
            .ok_or_else(|| RollupError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    fn resolve_columns(&self, columns: &[&str]) -> RollupResult<Vec<usize>> {
        columns.iter().map(|c| self.resolve_column(c)).collect()
    }

    fn key_at(&self, row: &[Value], key_idxs: &[usize]) -> GroupKey {
        GroupKey::new(key_idxs.iter().map(|&idx| row[idx].clone()).collect())
    }

    /// Project this table into a dimension collection keyed by `key_columns`.
    ///
    /// Key uniqueness is not checked here; the join rejects duplicate dimension keys.
    pub fn dimension_rows(&self, key_columns: &[&str]) -> RollupResult<Vec<DimensionRow>> {
        let key_idxs = self.resolve_columns(key_columns)?;
        Ok(self
            .rows
            .iter()
            .map(|row| DimensionRow {
                key: self.key_at(row, &key_idxs),
            })
            .collect())
    }

    /// Project this table into a fact collection keyed by `key_columns`.
    ///
    /// With `value_column = None` every fact is a presence marker. Blank measured cells become
    /// `None`; any other non-numeric measured cell is an error.
    pub fn fact_rows(
        &self,
        key_columns: &[&str],
        value_column: Option<&str>,
    ) -> RollupResult<Vec<FactRow>> {
        let key_idxs = self.resolve_columns(key_columns)?;
        let value_idx = value_column.map(|c| self.resolve_column(c)).transpose()?;

        let mut facts = Vec::with_capacity(self.rows.len());
        for (row_idx, row) in self.rows.iter().enumerate() {
            let value = match value_idx {
                None => None,
                Some(idx) => match &row[idx] {
                    Value::Blank => None,
                    Value::Number(n) => Some(n.0),
                    _ => {
                        return Err(RollupError::NonNumericValue {
                            table: self.name.clone(),
                            column: self.columns[idx].clone(),
                            row: row_idx,
                        })
                    }
                },
            };
            facts.push(FactRow {
                key: self.key_at(row, &key_idxs),
                value,
            });
        }
        Ok(facts)
    }
}
