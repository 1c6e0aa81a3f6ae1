//! Module: executor::aggregate::function
//! Responsibility: aggregation function catalogue and per-function capabilities.
//! Does not own: reducer state transitions.
//! Boundary: plan-time validation reads capabilities from here.

use crate::value::ColumnType;
use std::fmt;

///
/// AggregationFunction
///
/// Function selector resolved from the request's function name.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AggregationFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    MinMaxRange,
    DistinctCount,
}

///
/// ColumnArity
///
/// Number of target columns a function accepts.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnArity {
    /// Column parameter is ignored.
    Any,
    Exactly(usize),
    AtLeast(usize),
}

impl ColumnArity {
    #[must_use]
    pub const fn accepts(self, found: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(n) => found == n,
            Self::AtLeast(n) => found >= n,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Any => "any number of",
            Self::Exactly(1) => "exactly 1",
            Self::AtLeast(1) => "at least 1",
            Self::Exactly(_) | Self::AtLeast(_) => "a fixed number of",
        }
    }
}

impl AggregationFunction {
    /// Resolve one function name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        [
            Self::Count,
            Self::Sum,
            Self::Avg,
            Self::Min,
            Self::Max,
            Self::MinMaxRange,
            Self::DistinctCount,
        ]
        .into_iter()
        .find(|function| function.name().eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::MinMaxRange => "minmaxrange",
            Self::DistinctCount => "distinctcount",
        }
    }

    #[must_use]
    pub const fn arity(self) -> ColumnArity {
        match self {
            Self::Count => ColumnArity::Any,
            Self::Sum | Self::Avg | Self::Min | Self::Max | Self::MinMaxRange => {
                ColumnArity::Exactly(1)
            }
            Self::DistinctCount => ColumnArity::AtLeast(1),
        }
    }

    /// Return whether the function can consume values of `column_type`.
    #[must_use]
    pub const fn accepts(self, column_type: ColumnType) -> bool {
        match self {
            Self::Count | Self::DistinctCount => true,
            Self::Sum | Self::Avg | Self::Min | Self::Max | Self::MinMaxRange => {
                column_type.is_numeric()
            }
        }
    }

    /// Return whether the function reads dictionary ids instead of decoded
    /// values when every target column carries a sorted dictionary.
    #[must_use]
    pub const fn uses_dictionary_ids(self, has_dictionary: bool) -> bool {
        has_dictionary && matches!(self, Self::Min | Self::Max | Self::DistinctCount)
    }

    #[must_use]
    pub const fn reads_columns(self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
