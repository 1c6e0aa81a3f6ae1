//! Module: executor::aggregate
//! Responsibility: aggregation function catalogue and grouped reducer states.
//! Does not own: group key derivation or plan validation.
//! Boundary: per-function aggregators driven by the group-by orchestrator.

mod function;
mod grouped;
mod state;

#[cfg(test)]
mod tests;

pub use function::{AggregationFunction, ColumnArity};
pub use grouped::{AggregateTarget, GroupedAggregator};
pub use state::{AccumulateError, AggregateInput, AggregateState};
