//! Module: segment
//! Responsibility: read-only segment accessor contract and resolved column slots.
//! Does not own: on-disk layout, dictionary construction, or index structures.
//! Boundary: the only path through which operators read column data.

mod memory;

#[cfg(test)]
mod tests;

pub use memory::{ColumnSpec, MemorySegment, MemorySegmentBuilder, SegmentBuildError};

use crate::{error::ConfigurationError, value::ColumnType, value::Value};
use serde::{Deserialize, Serialize};

/// Position of one document inside a segment.
pub type DocId = u32;

/// Position of one value inside a column dictionary.
pub type DictId = u32;

///
/// ColumnSchema
///
/// Declared shape of one segment column.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,

    /// True when the column is dictionary encoded. Dictionaries are sorted, so
    /// id order matches value order.
    pub dictionary: bool,
}

///
/// Segment
///
/// Immutable columnar dataset with a fixed row count.
///
/// Implementations are shared read-only across concurrently running queries;
/// they must not change while any query holds a reference. Column arguments
/// are ordinals into `schema()`.
///

pub trait Segment: Send + Sync {
    fn name(&self) -> &str;

    fn row_count(&self) -> usize;

    fn schema(&self) -> &[ColumnSchema];

    /// Return the dictionary cardinality, or `None` when the column has no
    /// dictionary.
    fn dictionary_size(&self, column: usize) -> Option<usize>;

    /// Return the dictionary id stored for `doc`, or `None` when the value is
    /// null. Only meaningful for dictionary-encoded columns.
    fn dictionary_id(&self, column: usize, doc: DocId) -> Option<DictId>;

    /// Reverse lookup of one dictionary id.
    fn dictionary_value(&self, column: usize, id: DictId) -> Option<Value>;

    /// Decoded value stored for `doc`.
    fn raw_value(&self, column: usize, doc: DocId) -> Value;

    /// Resolve one column name into a slot, failing on unknown names.
    fn resolve_column(&self, name: &str) -> Result<ColumnSlot, ConfigurationError> {
        self.schema()
            .iter()
            .position(|column| column.name == name)
            .map(|index| ColumnSlot::new(index, &self.schema()[index]))
            .ok_or_else(|| ConfigurationError::UnknownColumn {
                segment: self.name().to_string(),
                column: name.to_string(),
            })
    }
}

///
/// ColumnSlot
///
/// One column name resolved against a concrete segment schema.
/// Slots are built once at plan time so hot loops never look up names.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnSlot {
    index: usize,
    name: String,
    column_type: ColumnType,
    dictionary: bool,
}

impl ColumnSlot {
    #[must_use]
    pub fn new(index: usize, schema: &ColumnSchema) -> Self {
        Self {
            index,
            name: schema.name.clone(),
            column_type: schema.column_type,
            dictionary: schema.dictionary,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    #[must_use]
    pub const fn has_dictionary(&self) -> bool {
        self.dictionary
    }
}
