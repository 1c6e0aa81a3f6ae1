//! Module: executor::aggregate::state
//! Responsibility: per-(group, function) reducer state transitions.
//! Does not own: group assignment or block iteration.
//! Boundary: accumulate/merge/finalize contract shared by all grouped aggregators.

use crate::{
    error::InternalError,
    executor::aggregate::AggregationFunction,
    segment::DictId,
    value::{ColumnType, Value, canonical_f64},
};
use std::collections::HashSet;
use thiserror::Error as ThisError;
use xxhash_rust::xxh3::Xxh3Builder;

///
/// AccumulateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AccumulateError {
    #[error("integer sum overflowed i64")]
    SumOverflow,

    #[error("aggregate state {state} cannot accept {input} input")]
    InputMismatch {
        state: &'static str,
        input: &'static str,
    },

    #[error("aggregate state {left} cannot merge {right}")]
    MergeMismatch {
        left: &'static str,
        right: &'static str,
    },
}

impl From<AccumulateError> for InternalError {
    fn from(err: AccumulateError) -> Self {
        match err {
            AccumulateError::SumOverflow => Self::aggregate_overflow(err.to_string()),
            AccumulateError::InputMismatch { .. } | AccumulateError::MergeMismatch { .. } => {
                Self::executor_invariant(err.to_string())
            }
        }
    }
}

///
/// AggregateInput
///
/// One row's contribution to one aggregator.
///

#[derive(Clone, Copy, Debug)]
pub enum AggregateInput<'a> {
    /// Row presence only.
    Row,
    Value(&'a Value),
    Id(Option<DictId>),
    Ids(&'a [Option<DictId>]),
    Values(&'a [Value]),
}

impl AggregateInput<'_> {
    const fn label(&self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Value(_) => "value",
            Self::Id(_) => "id",
            Self::Ids(_) => "id tuple",
            Self::Values(_) => "value tuple",
        }
    }

    const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null) | Self::Id(None))
    }
}

///
/// AggregateState
///
/// Reducer state for one group of one aggregation. Created on the first row
/// of its group and mutated only by its owning aggregator.
///

#[derive(Clone, Debug, PartialEq)]
pub enum AggregateState {
    Count(u64),
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    MinId(Option<DictId>),
    MaxId(Option<DictId>),
    MinMaxRange(Option<(f64, f64)>),
    DistinctIds(HashSet<Box<[DictId]>, Xxh3Builder>),
    DistinctValues(HashSet<Box<[Value]>, Xxh3Builder>),
}

impl AggregateState {
    /// Build the empty state for `function`.
    ///
    /// `column_type` is the type of the single target column when there is
    /// one; `uses_ids` selects the dictionary-id reducers.
    #[must_use]
    pub fn initialize(
        function: AggregationFunction,
        column_type: Option<ColumnType>,
        uses_ids: bool,
    ) -> Self {
        match function {
            AggregationFunction::Count => Self::Count(0),
            AggregationFunction::Sum => {
                if column_type == Some(ColumnType::Int) {
                    Self::SumInt(None)
                } else {
                    Self::SumFloat(None)
                }
            }
            AggregationFunction::Avg => Self::Avg { sum: 0.0, count: 0 },
            AggregationFunction::Min if uses_ids => Self::MinId(None),
            AggregationFunction::Min => Self::Min(None),
            AggregationFunction::Max if uses_ids => Self::MaxId(None),
            AggregationFunction::Max => Self::Max(None),
            AggregationFunction::MinMaxRange => Self::MinMaxRange(None),
            AggregationFunction::DistinctCount if uses_ids => {
                Self::DistinctIds(HashSet::with_hasher(Xxh3Builder::new()))
            }
            AggregationFunction::DistinctCount => {
                Self::DistinctValues(HashSet::with_hasher(Xxh3Builder::new()))
            }
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Count(_) => "count",
            Self::SumInt(_) => "sum(int)",
            Self::SumFloat(_) => "sum(float)",
            Self::Avg { .. } => "avg",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::MinId(_) => "min(id)",
            Self::MaxId(_) => "max(id)",
            Self::MinMaxRange(_) => "minmaxrange",
            Self::DistinctIds(_) => "distinctcount(id)",
            Self::DistinctValues(_) => "distinctcount",
        }
    }

    /// Fold one row into the state. Null inputs are skipped by every reducer
    /// except count.
    pub fn accumulate(&mut self, input: AggregateInput<'_>) -> Result<(), AccumulateError> {
        if let Self::Count(count) = self {
            *count = count.saturating_add(1);
            return Ok(());
        }
        if input.is_null() {
            return Ok(());
        }

        match (self, input) {
            (Self::SumInt(sum), AggregateInput::Value(Value::Int(v))) => {
                let next = sum
                    .unwrap_or(0)
                    .checked_add(*v)
                    .ok_or(AccumulateError::SumOverflow)?;
                *sum = Some(next);
            }
            (Self::SumFloat(sum), AggregateInput::Value(value)) => {
                let v = numeric(value, "sum(float)")?;
                *sum = Some(sum.unwrap_or(0.0) + v);
            }
            (Self::Avg { sum, count }, AggregateInput::Value(value)) => {
                *sum += numeric(value, "avg")?;
                *count = count.saturating_add(1);
            }
            (Self::Min(current), AggregateInput::Value(value)) => {
                if current.as_ref().is_none_or(|current| value < current) {
                    *current = Some(value.clone());
                }
            }
            (Self::Max(current), AggregateInput::Value(value)) => {
                if current.as_ref().is_none_or(|current| value > current) {
                    *current = Some(value.clone());
                }
            }
            (Self::MinId(current), AggregateInput::Id(Some(id))) => {
                *current = Some(current.map_or(id, |seen| seen.min(id)));
            }
            (Self::MaxId(current), AggregateInput::Id(Some(id))) => {
                *current = Some(current.map_or(id, |seen| seen.max(id)));
            }
            (Self::MinMaxRange(range), AggregateInput::Value(value)) => {
                let v = numeric(value, "minmaxrange")?;
                *range = Some(widen_range(*range, (v, v)));
            }
            (Self::DistinctIds(seen), AggregateInput::Ids(ids)) => {
                if ids.iter().all(Option::is_some) {
                    seen.insert(ids.iter().flatten().copied().collect());
                }
            }
            (Self::DistinctValues(seen), AggregateInput::Values(values)) => {
                if !values.iter().any(Value::is_null) {
                    seen.insert(Box::from(values));
                }
            }
            (state, input) => {
                return Err(AccumulateError::InputMismatch {
                    state: state.label(),
                    input: input.label(),
                });
            }
        }

        Ok(())
    }

    /// Fold a partial state of the same shape into `self`.
    pub fn merge(&mut self, other: Self) -> Result<(), AccumulateError> {
        match (self, other) {
            (Self::Count(left), Self::Count(right)) => *left = left.saturating_add(right),
            (Self::SumInt(left), Self::SumInt(right)) => {
                *left = match (*left, right) {
                    (Some(l), Some(r)) => {
                        Some(l.checked_add(r).ok_or(AccumulateError::SumOverflow)?)
                    }
                    (l, r) => l.or(r),
                };
            }
            (Self::SumFloat(left), Self::SumFloat(right)) => {
                *left = match (*left, right) {
                    (Some(l), Some(r)) => Some(l + r),
                    (l, r) => l.or(r),
                };
            }
            (
                Self::Avg { sum, count },
                Self::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count = count.saturating_add(other_count);
            }
            (Self::Min(left), Self::Min(Some(right))) => {
                if left.as_ref().is_none_or(|left| &right < left) {
                    *left = Some(right);
                }
            }
            (Self::Max(left), Self::Max(Some(right))) => {
                if left.as_ref().is_none_or(|left| &right > left) {
                    *left = Some(right);
                }
            }
            (Self::Min(_), Self::Min(None)) | (Self::Max(_), Self::Max(None)) => {}
            (Self::MinId(left), Self::MinId(right)) => {
                *left = match (*left, right) {
                    (Some(l), Some(r)) => Some(l.min(r)),
                    (l, r) => l.or(r),
                };
            }
            (Self::MaxId(left), Self::MaxId(right)) => {
                *left = match (*left, right) {
                    (Some(l), Some(r)) => Some(l.max(r)),
                    (l, r) => l.or(r),
                };
            }
            (Self::MinMaxRange(left), Self::MinMaxRange(right)) => {
                *left = match (*left, right) {
                    (Some(l), Some(r)) => Some(widen_range(Some(l), r)),
                    (l, r) => l.or(r),
                };
            }
            (Self::DistinctIds(left), Self::DistinctIds(right)) => left.extend(right),
            (Self::DistinctValues(left), Self::DistinctValues(right)) => left.extend(right),
            (left, right) => {
                return Err(AccumulateError::MergeMismatch {
                    left: left.label(),
                    right: right.label(),
                });
            }
        }

        Ok(())
    }

    /// Produce the final value. `decode` maps dictionary ids of the target
    /// column back to values for id-based reducers.
    pub fn finalize<F>(self, decode: F) -> Result<Value, InternalError>
    where
        F: Fn(DictId) -> Result<Value, InternalError>,
    {
        let value = match self {
            Self::Count(count) => Value::Int(saturating_i64(count)),
            Self::SumInt(sum) => sum.map_or(Value::Null, Value::Int),
            Self::SumFloat(sum) => sum.map_or(Value::Null, Value::Float),
            Self::Avg { sum, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Float(sum / count_as_f64(count))
                }
            }
            Self::Min(value) | Self::Max(value) => value.unwrap_or(Value::Null),
            Self::MinId(id) | Self::MaxId(id) => match id {
                Some(id) => decode(id)?,
                None => Value::Null,
            },
            Self::MinMaxRange(range) => {
                range.map_or(Value::Null, |(min, max)| Value::Float(max - min))
            }
            Self::DistinctIds(seen) => distinct_count(seen.len()),
            Self::DistinctValues(seen) => distinct_count(seen.len()),
        };

        Ok(value)
    }
}

fn numeric(value: &Value, state: &'static str) -> Result<f64, AccumulateError> {
    value.as_f64().ok_or(AccumulateError::InputMismatch {
        state,
        input: "non-numeric value",
    })
}

// Bounds follow the canonical float order, so NaN widens the range as the
// largest value, matching max.
fn widen_range(range: Option<(f64, f64)>, (min, max): (f64, f64)) -> (f64, f64) {
    let (min, max) = (canonical_f64(min), canonical_f64(max));
    match range {
        Some((lo, hi)) => (
            if min.total_cmp(&lo).is_lt() { min } else { lo },
            if max.total_cmp(&hi).is_gt() { max } else { hi },
        ),
        None => (min, max),
    }
}

fn saturating_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn distinct_count(len: usize) -> Value {
    Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
}

#[expect(clippy::cast_precision_loss)]
const fn count_as_f64(count: u64) -> f64 {
    count as f64
}
