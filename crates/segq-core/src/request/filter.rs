//! Module: request::filter
//! Responsibility: row predicates and their binding to segment column slots.
//! Does not own: index-backed evaluation; that belongs to external doc-id sources.
//! Boundary: predicate evaluation used by the default scan doc-id source.

use crate::{
    error::ConfigurationError,
    segment::{DocId, Segment},
    value::{ColumnType, Value},
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, ops::Bound};

///
/// Filter
///
/// Row predicate over raw column values. Comparisons against null never
/// match; use `IsNull` to select null rows.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Filter {
    Eq {
        column: String,
        value: Value,
    },
    NotEq {
        column: String,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    Range {
        column: String,
        lower: Bound<Value>,
        upper: Bound<Value>,
    },
    IsNull {
        column: String,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl Filter {
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn not_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEq {
            column: column.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn range(column: impl Into<String>, lower: Bound<Value>, upper: Bound<Value>) -> Self {
        Self::Range {
            column: column.into(),
            lower,
            upper,
        }
    }

    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    #[must_use]
    #[expect(clippy::should_implement_trait)]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Resolve column names and check literal types against the segment.
    pub fn bind(&self, segment: &dyn Segment) -> Result<BoundFilter, ConfigurationError> {
        Ok(match self {
            Self::Eq { column, value } => BoundFilter::Eq {
                column: bind_column(segment, column, [value])?,
                value: value.clone(),
            },
            Self::NotEq { column, value } => BoundFilter::NotEq {
                column: bind_column(segment, column, [value])?,
                value: value.clone(),
            },
            Self::In { column, values } => BoundFilter::In {
                column: bind_column(segment, column, values)?,
                values: values.clone(),
            },
            Self::Range {
                column,
                lower,
                upper,
            } => {
                let literals = [lower, upper].into_iter().filter_map(|bound| match bound {
                    Bound::Included(value) | Bound::Excluded(value) => Some(value),
                    Bound::Unbounded => None,
                });
                BoundFilter::Range {
                    column: bind_column(segment, column, literals)?,
                    lower: lower.clone(),
                    upper: upper.clone(),
                }
            }
            Self::IsNull { column } => BoundFilter::IsNull {
                column: segment.resolve_column(column)?.index(),
            },
            Self::And(children) => BoundFilter::And(bind_all(segment, children)?),
            Self::Or(children) => BoundFilter::Or(bind_all(segment, children)?),
            Self::Not(inner) => BoundFilter::Not(Box::new(inner.bind(segment)?)),
        })
    }

    /// Column names referenced anywhere in this predicate, in first-seen order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Eq { column, .. }
            | Self::NotEq { column, .. }
            | Self::In { column, .. }
            | Self::Range { column, .. }
            | Self::IsNull { column } => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, value } => write!(f, "{column} = {value}"),
            Self::NotEq { column, value } => write!(f, "{column} != {value}"),
            Self::In { column, values } => {
                write!(f, "{column} IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Self::Range {
                column,
                lower,
                upper,
            } => {
                let lower = match lower {
                    Bound::Included(value) => format!("[{value}"),
                    Bound::Excluded(value) => format!("({value}"),
                    Bound::Unbounded => "(*".to_string(),
                };
                let upper = match upper {
                    Bound::Included(value) => format!("{value}]"),
                    Bound::Excluded(value) => format!("{value})"),
                    Bound::Unbounded => "*)".to_string(),
                };
                write!(f, "{column} IN RANGE {lower}, {upper}")
            }
            Self::IsNull { column } => write!(f, "{column} IS NULL"),
            Self::And(children) => write_joined(f, children, " AND "),
            Self::Or(children) => write_joined(f, children, " OR "),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Filter], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

fn bind_all(
    segment: &dyn Segment,
    children: &[Filter],
) -> Result<Vec<BoundFilter>, ConfigurationError> {
    children.iter().map(|child| child.bind(segment)).collect()
}

fn bind_column<'a>(
    segment: &dyn Segment,
    column: &str,
    literals: impl IntoIterator<Item = &'a Value>,
) -> Result<usize, ConfigurationError> {
    let slot = segment.resolve_column(column)?;
    for literal in literals {
        if !literal_fits(slot.column_type(), literal) {
            return Err(ConfigurationError::FilterLiteralType {
                column: column.to_string(),
                column_type: slot.column_type(),
                literal: literal.to_string(),
            });
        }
    }

    Ok(slot.index())
}

const fn literal_fits(column_type: ColumnType, literal: &Value) -> bool {
    match literal {
        Value::Null => true,
        Value::Int(_) | Value::Float(_) => column_type.is_numeric(),
        Value::Text(_) => matches!(column_type, ColumnType::Text),
    }
}

///
/// BoundFilter
///
/// Filter with column names resolved to segment ordinals.
///

#[derive(Clone, Debug)]
pub enum BoundFilter {
    Eq {
        column: usize,
        value: Value,
    },
    NotEq {
        column: usize,
        value: Value,
    },
    In {
        column: usize,
        values: Vec<Value>,
    },
    Range {
        column: usize,
        lower: Bound<Value>,
        upper: Bound<Value>,
    },
    IsNull {
        column: usize,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl BoundFilter {
    /// Evaluate this predicate against one document.
    #[must_use]
    pub fn matches(&self, segment: &dyn Segment, doc: DocId) -> bool {
        match self {
            Self::Eq { column, value } => {
                compare(&segment.raw_value(*column, doc), value) == Some(Ordering::Equal)
            }
            Self::NotEq { column, value } => compare(&segment.raw_value(*column, doc), value)
                .is_some_and(|ord| ord != Ordering::Equal),
            Self::In { column, values } => {
                let actual = segment.raw_value(*column, doc);
                values
                    .iter()
                    .any(|value| compare(&actual, value) == Some(Ordering::Equal))
            }
            Self::Range {
                column,
                lower,
                upper,
            } => {
                let actual = segment.raw_value(*column, doc);
                !actual.is_null() && above_lower(&actual, lower) && below_upper(&actual, upper)
            }
            Self::IsNull { column } => segment.raw_value(*column, doc).is_null(),
            Self::And(children) => children.iter().all(|child| child.matches(segment, doc)),
            Self::Or(children) => children.iter().any(|child| child.matches(segment, doc)),
            Self::Not(inner) => !inner.matches(segment, doc),
        }
    }
}

fn compare(actual: &Value, literal: &Value) -> Option<Ordering> {
    actual.numeric_aware_cmp(literal)
}

fn above_lower(actual: &Value, lower: &Bound<Value>) -> bool {
    match lower {
        Bound::Unbounded => true,
        Bound::Included(bound) => {
            matches!(compare(actual, bound), Some(Ordering::Greater | Ordering::Equal))
        }
        Bound::Excluded(bound) => compare(actual, bound) == Some(Ordering::Greater),
    }
}

fn below_upper(actual: &Value, upper: &Bound<Value>) -> bool {
    match upper {
        Bound::Unbounded => true,
        Bound::Included(bound) => {
            matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
        }
        Bound::Excluded(bound) => compare(actual, bound) == Some(Ordering::Less),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sales_segment;

    fn matching_docs(filter: &Filter) -> Vec<DocId> {
        let segment = sales_segment();
        let bound = filter.bind(&segment).expect("bind");
        (0..segment.row_count())
            .map(|doc| DocId::try_from(doc).expect("doc id"))
            .filter(|doc| bound.matches(&segment, *doc))
            .collect()
    }

    #[test]
    fn eq_and_in_skip_null_rows() {
        assert_eq!(matching_docs(&Filter::eq("city", "NYC")), vec![0, 2, 5]);
        assert_eq!(
            matching_docs(&Filter::is_in("city", ["SF", "LA"])),
            vec![1, 3]
        );
        assert_eq!(matching_docs(&Filter::is_null("city")), vec![4]);
    }

    #[test]
    fn range_compares_ints_against_float_literals() {
        let filter = Filter::range(
            "amount",
            Bound::Included(Value::Float(5.0)),
            Bound::Excluded(Value::Int(10)),
        );

        assert_eq!(matching_docs(&filter), vec![1, 2]);
    }

    #[test]
    fn boolean_combinators_compose() {
        let filter = Filter::And(vec![
            Filter::not(Filter::is_null("city")),
            Filter::Or(vec![Filter::eq("region", "east"), Filter::not_eq("amount", 5)]),
        ]);

        assert_eq!(matching_docs(&filter), vec![0, 2, 3]);
    }

    #[test]
    fn bind_rejects_unknown_columns_and_mistyped_literals() {
        let segment = sales_segment();

        assert!(matches!(
            Filter::eq("nope", 1).bind(&segment),
            Err(ConfigurationError::UnknownColumn { .. })
        ));
        assert!(matches!(
            Filter::eq("amount", "ten").bind(&segment),
            Err(ConfigurationError::FilterLiteralType { .. })
        ));
    }

    #[test]
    fn columns_are_reported_once_in_first_seen_order() {
        let filter = Filter::And(vec![
            Filter::eq("city", "NYC"),
            Filter::not(Filter::eq("region", "east")),
            Filter::is_null("city"),
        ]);

        assert_eq!(filter.columns(), vec!["city", "region"]);
    }

    #[test]
    fn display_renders_compact_predicate() {
        let filter = Filter::And(vec![
            Filter::eq("city", "NYC"),
            Filter::not(Filter::is_null("amount")),
            Filter::range("amount", Bound::Included(Value::Int(3)), Bound::Unbounded),
        ]);

        assert_eq!(
            filter.to_string(),
            "(city = 'NYC' AND NOT (amount IS NULL) AND amount IN RANGE [3, *))"
        );
    }
}
