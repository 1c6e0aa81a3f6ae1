//! Module: executor::aggregate::grouped
//! Responsibility: one aggregation's states across all groups of a run.
//! Does not own: group key generation or result shaping.
//! Boundary: consumes (block, group index per row) pairs from the orchestrator.

use crate::{
    error::InternalError,
    executor::{
        aggregate::{
            AggregationFunction,
            state::{AccumulateError, AggregateInput, AggregateState},
        },
        projection::Block,
    },
    segment::{ColumnSlot, DictId, Segment},
    value::{ColumnType, Value},
};

///
/// AggregateTarget
///
/// Target column of one aggregation plus its position in the projected block.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregateTarget {
    slot: ColumnSlot,
    position: usize,
}

impl AggregateTarget {
    #[must_use]
    pub const fn new(slot: ColumnSlot, position: usize) -> Self {
        Self { slot, position }
    }

    #[must_use]
    pub const fn slot(&self) -> &ColumnSlot {
        &self.slot
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

// Per-row input shape, fixed at construction.
#[derive(Clone, Copy, Debug)]
enum InputShape {
    Row,
    Value(usize),
    Id(usize),
    Ids,
    Values,
}

///
/// GroupedAggregator
///
/// Dense vector of reducer states indexed by group. States for a group are
/// created the first time a row of that group reaches this aggregator.
///

#[derive(Debug)]
pub struct GroupedAggregator {
    function: AggregationFunction,
    targets: Vec<AggregateTarget>,
    column_type: Option<ColumnType>,
    uses_ids: bool,
    shape: InputShape,
    states: Vec<AggregateState>,
    id_scratch: Vec<Option<DictId>>,
    value_scratch: Vec<Value>,
}

impl GroupedAggregator {
    #[must_use]
    pub fn new(
        function: AggregationFunction,
        targets: Vec<AggregateTarget>,
        has_dictionary: bool,
    ) -> Self {
        let uses_ids = function.uses_dictionary_ids(has_dictionary);
        let column_type = match targets.as_slice() {
            [target] => Some(target.slot().column_type()),
            _ => None,
        };
        let shape = match (function, targets.first()) {
            (AggregationFunction::Count, _) | (_, None) => InputShape::Row,
            (AggregationFunction::DistinctCount, _) if uses_ids => InputShape::Ids,
            (AggregationFunction::DistinctCount, _) => InputShape::Values,
            (_, Some(target)) if uses_ids => InputShape::Id(target.position()),
            (_, Some(target)) => InputShape::Value(target.position()),
        };

        Self {
            function,
            targets,
            column_type,
            uses_ids,
            shape,
            states: Vec::new(),
            id_scratch: Vec::new(),
            value_scratch: Vec::new(),
        }
    }

    #[must_use]
    pub const fn function(&self) -> AggregationFunction {
        self.function
    }

    #[must_use]
    pub const fn uses_ids(&self) -> bool {
        self.uses_ids
    }

    /// Fold every row of `block` into the state of its group.
    pub fn aggregate_block(
        &mut self,
        block: &Block,
        groups: &[u32],
    ) -> Result<(), AccumulateError> {
        for (row, group) in groups.iter().enumerate() {
            let group = *group as usize;
            while self.states.len() <= group {
                self.states.push(AggregateState::initialize(
                    self.function,
                    self.column_type,
                    self.uses_ids,
                ));
            }
            let state = &mut self.states[group];

            match self.shape {
                InputShape::Row => state.accumulate(AggregateInput::Row)?,
                InputShape::Value(position) => {
                    state.accumulate(AggregateInput::Value(block.column(position).value(row)))?;
                }
                InputShape::Id(position) => {
                    state.accumulate(AggregateInput::Id(block.column(position).dict_id(row)))?;
                }
                InputShape::Ids => {
                    self.id_scratch.clear();
                    self.id_scratch.extend(
                        self.targets
                            .iter()
                            .map(|target| block.column(target.position()).dict_id(row)),
                    );
                    state.accumulate(AggregateInput::Ids(&self.id_scratch))?;
                }
                InputShape::Values => {
                    self.value_scratch.clear();
                    self.value_scratch.extend(
                        self.targets
                            .iter()
                            .map(|target| block.column(target.position()).value(row).clone()),
                    );
                    state.accumulate(AggregateInput::Values(&self.value_scratch))?;
                }
            }
        }

        Ok(())
    }

    /// Number of groups with materialized state.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Finalize one value per group for `group_count` groups, in index order.
    pub fn finish(
        self,
        group_count: usize,
        segment: &dyn Segment,
    ) -> Result<Vec<Value>, InternalError> {
        let Self {
            function,
            targets,
            column_type,
            uses_ids,
            mut states,
            ..
        } = self;
        if states.len() > group_count {
            return Err(InternalError::executor_invariant(format!(
                "{function} aggregator holds {} states for {group_count} groups",
                states.len()
            )));
        }
        states.resize_with(group_count, || {
            AggregateState::initialize(function, column_type, uses_ids)
        });

        let decode = |id: DictId| -> Result<Value, InternalError> {
            let Some(target) = targets.first() else {
                return Err(InternalError::executor_invariant(format!(
                    "{function} aggregator decoded an id without a target column"
                )));
            };
            segment
                .dictionary_value(target.slot().index(), id)
                .ok_or_else(|| {
                    InternalError::segment_corruption(format!(
                        "column '{}' has no dictionary entry {id}",
                        target.slot().name()
                    ))
                })
        };

        states
            .into_iter()
            .map(|state| state.finalize(&decode))
            .collect()
    }
}
