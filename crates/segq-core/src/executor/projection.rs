//! Module: executor::projection
//! Responsibility: turn doc-id blocks into blocks of materialized column values.
//! Does not own: choosing which columns/encodings are needed (plan builder does).
//! Boundary: second pipeline stage; every downstream operator reads `Block`s only.

use crate::{
    error::QueryError,
    executor::docid::{DocIdBlock, DocIdSource},
    segment::{ColumnSlot, DictId, Segment},
    value::Value,
};

///
/// ProjectedColumn
///
/// One projected column plus the encodings downstream operators read:
/// dictionary ids, decoded values, or both.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectedColumn {
    slot: ColumnSlot,
    ids: bool,
    values: bool,
}

impl ProjectedColumn {
    #[must_use]
    pub const fn new(slot: ColumnSlot) -> Self {
        Self {
            slot,
            ids: false,
            values: false,
        }
    }

    pub(crate) const fn require_ids(&mut self) {
        self.ids = true;
    }

    pub(crate) const fn require_values(&mut self) {
        self.values = true;
    }

    #[must_use]
    pub const fn slot(&self) -> &ColumnSlot {
        &self.slot
    }

    #[must_use]
    pub const fn reads_ids(&self) -> bool {
        self.ids
    }

    #[must_use]
    pub const fn reads_values(&self) -> bool {
        self.values
    }
}

///
/// ColumnBlock
///

#[derive(Clone, Debug, Default)]
pub struct ColumnBlock {
    ids: Option<Vec<Option<DictId>>>,
    values: Option<Vec<Value>>,
}

impl ColumnBlock {
    /// Dictionary id of `row`, `None` for null. Only valid when the column was
    /// projected with ids.
    #[must_use]
    pub fn dict_id(&self, row: usize) -> Option<DictId> {
        self.ids.as_ref().and_then(|ids| ids.get(row).copied().flatten())
    }

    #[must_use]
    pub fn value(&self, row: usize) -> &Value {
        self.values
            .as_ref()
            .and_then(|values| values.get(row))
            .unwrap_or(&Value::Null)
    }

    #[must_use]
    pub const fn has_ids(&self) -> bool {
        self.ids.is_some()
    }

    #[must_use]
    pub const fn has_values(&self) -> bool {
        self.values.is_some()
    }
}

///
/// Block
///
/// One bounded batch of documents with their projected columns, in the same
/// order as the projection's column list.
///

#[derive(Clone, Debug)]
pub struct Block {
    doc_ids: DocIdBlock,
    columns: Vec<ColumnBlock>,
}

impl Block {
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Column at projection position `position`.
    #[must_use]
    pub fn column(&self, position: usize) -> &ColumnBlock {
        static EMPTY: ColumnBlock = ColumnBlock {
            ids: None,
            values: None,
        };
        self.columns.get(position).unwrap_or(&EMPTY)
    }
}

///
/// ProjectionOperator
///

pub struct ProjectionOperator<'a> {
    segment: &'a dyn Segment,
    source: Box<dyn DocIdSource + 'a>,
    columns: Vec<ProjectedColumn>,
    max_docs_per_block: usize,
}

impl<'a> ProjectionOperator<'a> {
    #[must_use]
    pub fn new(
        segment: &'a dyn Segment,
        source: Box<dyn DocIdSource + 'a>,
        columns: Vec<ProjectedColumn>,
        max_docs_per_block: usize,
    ) -> Self {
        Self {
            segment,
            source,
            columns,
            max_docs_per_block,
        }
    }

    /// Pull the next block, or `None` once the doc-id source is exhausted.
    pub fn next_block(&mut self) -> Result<Option<Block>, QueryError> {
        let Some(doc_ids) = self.source.next_block(self.max_docs_per_block)? else {
            return Ok(None);
        };

        let columns = self
            .columns
            .iter()
            .map(|column| self.materialize(column, &doc_ids))
            .collect();

        Ok(Some(Block { doc_ids, columns }))
    }

    fn materialize(&self, column: &ProjectedColumn, doc_ids: &DocIdBlock) -> ColumnBlock {
        let index = column.slot().index();
        let ids = column.reads_ids().then(|| {
            doc_ids
                .iter()
                .map(|doc| self.segment.dictionary_id(index, *doc))
                .collect()
        });
        let values = column.reads_values().then(|| {
            doc_ids
                .iter()
                .map(|doc| self.segment.raw_value(index, *doc))
                .collect()
        });

        ColumnBlock { ids, values }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::{cancel::CancellationToken, docid::ScanDocIdSource},
        test_fixtures::sales_segment,
    };

    #[test]
    fn projection_materializes_only_requested_encodings() {
        let segment = sales_segment();
        let mut city = ProjectedColumn::new(segment.resolve_column("city").expect("city"));
        city.require_ids();
        let mut amount = ProjectedColumn::new(segment.resolve_column("amount").expect("amount"));
        amount.require_values();

        let source = ScanDocIdSource::new(&segment, None, CancellationToken::new());
        let mut projection =
            ProjectionOperator::new(&segment, Box::new(source), vec![city, amount], 4);

        let block = projection.next_block().expect("pull").expect("block");
        assert_eq!(block.len(), 4);
        assert!(block.column(0).has_ids());
        assert!(!block.column(0).has_values());
        assert!(!block.column(1).has_ids());
        assert_eq!(block.column(1).value(3), &Value::Int(12));

        let tail = projection.next_block().expect("pull").expect("tail block");
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.column(0).dict_id(0), None, "null city keeps a null id");
        assert!(projection.next_block().expect("pull").is_none());
    }
}
