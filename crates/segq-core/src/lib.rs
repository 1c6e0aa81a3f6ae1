//! Segment-local query core for segq: compiles one aggregation/group-by
//! request against one immutable columnar segment into a pull-based block
//! pipeline and runs it to a grouped result table.
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod executor;
pub mod plan;
pub mod request;
pub mod result;
pub mod segment;
pub mod value;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use executor::{run, run_with};

///
/// CONSTANTS
///

/// Default upper bound on document ids materialized per pipeline block.
///
/// This is a batch size, not a cap on the number of rows or groups a query
/// may observe.
pub const DEFAULT_MAX_DOCS_PER_BLOCK: usize = 10_000;

///
/// Prelude
///
/// Prelude contains the request/segment vocabulary needed to run a query.
/// Errors, operators and plan internals are not re-exported here.
///

pub mod prelude {
    pub use crate::{
        executor::group::GroupKeyMode,
        request::{AggregationSpec, Filter, GroupBySpec, QueryRequest},
        result::AggregationResult,
        segment::{ColumnSchema, Segment},
        value::{ColumnType, Value},
    };
}
