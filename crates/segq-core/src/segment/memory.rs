//! Module: segment::memory
//! Responsibility: row-ingesting builder and in-memory `Segment` implementation.
//! Does not own: persistence or segment reload/merge.
//! Boundary: reference segment for embedders and tests.

use crate::{
    segment::{ColumnSchema, DictId, DocId, Segment},
    value::{ColumnType, Value},
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// SegmentBuildError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SegmentBuildError {
    #[error("row {row} has {found} values, schema has {expected} columns")]
    RowArity {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: column '{column}' is {column_type}, got value {value}")]
    ValueType {
        row: usize,
        column: String,
        column_type: ColumnType,
        value: Value,
    },

    #[error("dictionary seed for column '{column}' contains {value}, which is not {column_type}")]
    SeedType {
        column: String,
        column_type: ColumnType,
        value: Value,
    },

    #[error("segment exceeds addressable size: {what}")]
    TooLarge { what: &'static str },

    #[error("duplicate column '{column}'")]
    DuplicateColumn { column: String },
}

///
/// ColumnSpec
///
/// Declared column for `MemorySegmentBuilder`. Dictionary columns may be
/// seeded with extra values so the dictionary covers more than the rows hold.
///

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    name: String,
    column_type: ColumnType,
    dictionary: bool,
    seed: Vec<Value>,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            dictionary: false,
            seed: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_dictionary(mut self) -> Self {
        self.dictionary = true;
        self
    }

    #[must_use]
    pub fn with_dictionary_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.dictionary = true;
        self.seed.extend(values);
        self
    }
}

///
/// MemorySegmentBuilder
///

#[derive(Debug)]
pub struct MemorySegmentBuilder {
    name: String,
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<Value>>,
}

impl MemorySegmentBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Append one row. Int values are widened into float columns.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SegmentBuildError> {
        let row_index = self.rows.len();
        if row.len() != self.columns.len() {
            return Err(SegmentBuildError::RowArity {
                row: row_index,
                expected: self.columns.len(),
                found: row.len(),
            });
        }

        let mut coerced = Vec::with_capacity(row.len());
        for (spec, value) in self.columns.iter().zip(row) {
            let value = coerce(spec.column_type, value).map_err(|value| {
                SegmentBuildError::ValueType {
                    row: row_index,
                    column: spec.name.clone(),
                    column_type: spec.column_type,
                    value,
                }
            })?;
            coerced.push(value);
        }
        self.rows.push(coerced);

        Ok(())
    }

    /// Append many rows, stopping at the first invalid one.
    pub fn extend_rows(
        &mut self,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<(), SegmentBuildError> {
        for row in rows {
            self.push_row(row)?;
        }

        Ok(())
    }

    pub fn build(self) -> Result<MemorySegment, SegmentBuildError> {
        if DocId::try_from(self.rows.len()).is_err() {
            return Err(SegmentBuildError::TooLarge { what: "row count" });
        }

        let mut seen = BTreeSet::new();
        for spec in &self.columns {
            if !seen.insert(spec.name.as_str()) {
                return Err(SegmentBuildError::DuplicateColumn {
                    column: spec.name.clone(),
                });
            }
        }

        let mut columns = Vec::with_capacity(self.columns.len());
        for (index, spec) in self.columns.into_iter().enumerate() {
            let values: Vec<Value> = self.rows.iter().map(|row| row[index].clone()).collect();
            columns.push(MemoryColumn::build(spec, values)?);
        }

        Ok(MemorySegment {
            name: self.name,
            schema: columns.iter().map(|c| c.schema.clone()).collect(),
            columns,
            rows: self.rows.len(),
        })
    }
}

fn coerce(column_type: ColumnType, value: Value) -> Result<Value, Value> {
    match (column_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnType::Int, value @ Value::Int(_))
        | (ColumnType::Float, value @ Value::Float(_))
        | (ColumnType::Text, value @ Value::Text(_)) => Ok(value),
        (ColumnType::Float, Value::Int(v)) => {
            #[expect(clippy::cast_precision_loss)]
            let widened = v as f64;
            Ok(Value::Float(widened))
        }
        (_, value) => Err(value),
    }
}

///
/// MemoryColumn
///

#[derive(Debug)]
struct MemoryColumn {
    schema: ColumnSchema,
    values: Vec<Value>,
    dictionary: Option<Vec<Value>>,
    ids: Vec<Option<DictId>>,
}

impl MemoryColumn {
    fn build(spec: ColumnSpec, values: Vec<Value>) -> Result<Self, SegmentBuildError> {
        let schema = ColumnSchema {
            name: spec.name,
            column_type: spec.column_type,
            dictionary: spec.dictionary,
        };
        if !spec.dictionary {
            return Ok(Self {
                schema,
                values,
                dictionary: None,
                ids: Vec::new(),
            });
        }

        // Dictionaries are sorted and never contain null.
        let mut entries = BTreeSet::new();
        for seed in spec.seed {
            let seed = coerce(schema.column_type, seed).map_err(|value| {
                SegmentBuildError::SeedType {
                    column: schema.name.clone(),
                    column_type: schema.column_type,
                    value,
                }
            })?;
            if !seed.is_null() {
                entries.insert(seed);
            }
        }
        entries.extend(values.iter().filter(|v| !v.is_null()).cloned());
        let dictionary: Vec<Value> = entries.into_iter().collect();
        if DictId::try_from(dictionary.len()).is_err() {
            return Err(SegmentBuildError::TooLarge {
                what: "dictionary cardinality",
            });
        }

        let ids = values
            .iter()
            .map(|value| {
                if value.is_null() {
                    return None;
                }
                dictionary
                    .binary_search(value)
                    .ok()
                    .and_then(|pos| DictId::try_from(pos).ok())
            })
            .collect();

        Ok(Self {
            schema,
            values,
            dictionary: Some(dictionary),
            ids,
        })
    }
}

///
/// MemorySegment
///
/// Fully materialized segment. Cheap to share by reference across threads.
///

#[derive(Debug)]
pub struct MemorySegment {
    name: String,
    schema: Vec<ColumnSchema>,
    columns: Vec<MemoryColumn>,
    rows: usize,
}

impl Segment for MemorySegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    fn dictionary_size(&self, column: usize) -> Option<usize> {
        self.columns.get(column)?.dictionary.as_ref().map(Vec::len)
    }

    fn dictionary_id(&self, column: usize, doc: DocId) -> Option<DictId> {
        let column = self.columns.get(column)?;
        column.ids.get(doc as usize).copied().flatten()
    }

    fn dictionary_value(&self, column: usize, id: DictId) -> Option<Value> {
        let dictionary = self.columns.get(column)?.dictionary.as_ref()?;
        dictionary.get(id as usize).cloned()
    }

    fn raw_value(&self, column: usize, doc: DocId) -> Value {
        self.columns
            .get(column)
            .and_then(|c| c.values.get(doc as usize))
            .cloned()
            .unwrap_or(Value::Null)
    }
}
