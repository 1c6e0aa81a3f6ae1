use crate::{
    executor::group::{GroupError, GroupKeyMode},
    value::ColumnType,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Top-level error surface of one query: plan construction, execution and
/// result extraction all report through this enum.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),

    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),

    #[error("query cancelled before completion")]
    Cancelled,

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl QueryError {
    /// Return the coarse classification used by trace events.
    #[must_use]
    pub const fn kind(&self) -> QueryErrorKind {
        match self {
            Self::Configuration(_) => QueryErrorKind::Configuration,
            Self::TypeMismatch(_) => QueryErrorKind::TypeMismatch,
            Self::IllegalState(_) => QueryErrorKind::IllegalState,
            Self::Cancelled => QueryErrorKind::Cancelled,
            Self::Group(_) => QueryErrorKind::Group,
            Self::Internal(_) => QueryErrorKind::Internal,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

///
/// QueryErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryErrorKind {
    Configuration,
    TypeMismatch,
    IllegalState,
    Cancelled,
    Group,
    Internal,
}

///
/// ConfigurationError
///
/// Malformed or unsupported request shape. Always raised while building the
/// plan, before any document is read.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigurationError {
    #[error("unknown column '{column}' in segment '{segment}'")]
    UnknownColumn { segment: String, column: String },

    #[error("group-by clause must name at least one column")]
    EmptyGroupBy,

    #[error("group-by clause names column '{column}' more than once")]
    DuplicateGroupByColumn { column: String },

    #[error("request must carry at least one aggregation")]
    MissingAggregations,

    #[error("unknown aggregation function '{name}'")]
    UnknownFunction { name: String },

    #[error("aggregation '{function}' expects {expected} column(s), found {found}")]
    ColumnArity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("group-by column '{column}' has no dictionary; {mode} key generation requires one")]
    MissingDictionary { column: String, mode: GroupKeyMode },

    #[error("filter on column '{column}' compares a {column_type} column with literal {literal}")]
    FilterLiteralType {
        column: String,
        column_type: ColumnType,
        literal: String,
    },

    #[error("max_docs_per_block must be greater than zero")]
    ZeroBlockSize,
}

///
/// TypeMismatchError
///
/// Aggregation function applied to a column whose declared type it cannot
/// consume (for example SUM over a text column).
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("aggregation '{function}' cannot be applied to {column_type} column '{column}'")]
pub struct TypeMismatchError {
    pub function: String,
    pub column: String,
    pub column_type: ColumnType,
}

///
/// IllegalStateError
///
/// Operator API called out of order. Programming error on the caller side.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("cannot {operation} while operator is {state}")]
pub struct IllegalStateError {
    pub operation: &'static str,
    pub state: &'static str,
}

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message,
        )
    }

    /// Construct an aggregate-origin arithmetic overflow.
    pub(crate) fn aggregate_overflow(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Overflow, ErrorOrigin::Aggregate, message)
    }

    /// Construct a segment-origin corruption error.
    pub(crate) fn segment_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Segment, message)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    InvariantViolation,
    Overflow,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::InvariantViolation => "invariant_violation",
            Self::Overflow => "overflow",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Segment,
    Executor,
    Aggregate,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Segment => "segment",
            Self::Executor => "executor",
            Self::Aggregate => "aggregate",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::aggregate_overflow("sum exceeded i64");

        assert_eq!(
            err.display_with_class(),
            "aggregate:overflow: sum exceeded i64"
        );
    }

    #[test]
    fn each_constructor_carries_its_taxonomy() {
        let labels: Vec<String> = [
            InternalError::executor_invariant("x"),
            InternalError::aggregate_overflow("x"),
            InternalError::segment_corruption("x"),
        ]
        .iter()
        .map(InternalError::display_with_class)
        .collect();

        assert_eq!(
            labels,
            vec![
                "executor:invariant_violation: x",
                "aggregate:overflow: x",
                "segment:corruption: x",
            ]
        );
    }

    #[test]
    fn query_error_kind_tracks_variant() {
        assert_eq!(QueryError::Cancelled.kind(), QueryErrorKind::Cancelled);
        assert_eq!(
            QueryError::from(ConfigurationError::EmptyGroupBy).kind(),
            QueryErrorKind::Configuration,
        );
        assert!(QueryError::Cancelled.is_cancelled());
    }
}
