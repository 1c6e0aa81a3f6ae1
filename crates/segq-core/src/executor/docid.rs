//! Module: executor::docid
//! Responsibility: ordered, bounded doc-id blocks feeding the projection stage.
//! Does not own: index-backed predicate evaluation.
//! Boundary: first stage of every pipeline; the only stage that observes the filter.

use crate::{
    error::{InternalError, QueryError},
    executor::cancel::CancellationToken,
    request::BoundFilter,
    segment::{DocId, Segment},
};
use derive_more::{Deref, IntoIterator};

///
/// DocIdBlock
///
/// Ascending doc ids of one pipeline block.
///

#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
pub struct DocIdBlock(Vec<DocId>);

impl DocIdBlock {
    #[must_use]
    pub const fn new(ids: Vec<DocId>) -> Self {
        Self(ids)
    }
}

///
/// DocIdSource
///
/// Pull contract for matching document ids. `Ok(None)` marks end of stream;
/// returned blocks are never empty and never longer than `max_size`.
///

pub trait DocIdSource {
    fn next_block(&mut self, max_size: usize) -> Result<Option<DocIdBlock>, QueryError>;
}

///
/// ScanDocIdSource
///
/// Walks every document of the segment in order and keeps those matching the
/// optional filter.
///

pub struct ScanDocIdSource<'a> {
    segment: &'a dyn Segment,
    filter: Option<BoundFilter>,
    next_doc: usize,
    cancellation: CancellationToken,
}

impl<'a> ScanDocIdSource<'a> {
    #[must_use]
    pub fn new(
        segment: &'a dyn Segment,
        filter: Option<BoundFilter>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            segment,
            filter,
            next_doc: 0,
            cancellation,
        }
    }
}

impl DocIdSource for ScanDocIdSource<'_> {
    fn next_block(&mut self, max_size: usize) -> Result<Option<DocIdBlock>, QueryError> {
        if self.cancellation.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let rows = self.segment.row_count();
        let mut ids = Vec::with_capacity(max_size.min(rows.saturating_sub(self.next_doc)));
        while self.next_doc < rows && ids.len() < max_size {
            let doc = DocId::try_from(self.next_doc).map_err(|_| {
                InternalError::segment_corruption(format!(
                    "segment '{}' row {} exceeds doc id range",
                    self.segment.name(),
                    self.next_doc
                ))
            })?;
            self.next_doc += 1;

            let keep = self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(self.segment, doc));
            if keep {
                ids.push(doc);
            }
        }

        if ids.is_empty() {
            return Ok(None);
        }

        Ok(Some(DocIdBlock(ids)))
    }
}

///
/// DocIdListSource
///
/// Serves a precomputed ascending doc-id list, for example one produced by an
/// external inverted-index filter engine.
///

pub struct DocIdListSource {
    ids: Vec<DocId>,
    offset: usize,
    cancellation: CancellationToken,
}

impl DocIdListSource {
    #[must_use]
    pub const fn new(ids: Vec<DocId>, cancellation: CancellationToken) -> Self {
        Self {
            ids,
            offset: 0,
            cancellation,
        }
    }
}

impl DocIdSource for DocIdListSource {
    fn next_block(&mut self, max_size: usize) -> Result<Option<DocIdBlock>, QueryError> {
        if self.cancellation.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        if self.offset >= self.ids.len() || max_size == 0 {
            return Ok(None);
        }

        let end = self.offset.saturating_add(max_size).min(self.ids.len());
        let block = self.ids[self.offset..end].to_vec();
        self.offset = end;

        Ok(Some(DocIdBlock(block)))
    }
}

///
/// TESTS
///
