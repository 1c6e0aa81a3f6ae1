//! Module: request
//! Responsibility: parsed query request vocabulary (aggregations, group-by, filter).
//! Does not own: request parsing from text or broker-side validation.
//! Boundary: immutable input handed to the plan builder.

mod filter;

pub use filter::{BoundFilter, Filter};

use serde::{Deserialize, Serialize};

///
/// AggregationSpec
///
/// One aggregation clause: a function name plus its column parameter.
/// The column parameter may list several columns separated by commas.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AggregationSpec {
    function: String,
    column: Option<String>,
}

impl AggregationSpec {
    #[must_use]
    pub fn new(function: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            column: Some(column.into()),
        }
    }

    /// Build one `count(*)` clause.
    #[must_use]
    pub fn count() -> Self {
        Self {
            function: "count".to_string(),
            column: None,
        }
    }

    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Target columns with the comma-separated form split and trimmed.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.column
            .as_deref()
            .map(|param| {
                param
                    .split(',')
                    .map(str::trim)
                    .filter(|column| !column.is_empty() && *column != "*")
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Output label, for example `sum(amount)`.
    #[must_use]
    pub fn label(&self) -> String {
        let function = self.function.trim().to_ascii_lowercase();
        let columns = self.columns();
        if columns.is_empty() {
            format!("{function}(*)")
        } else {
            format!("{function}({})", columns.join(","))
        }
    }
}

///
/// GroupBySpec
///
/// Ordered group-by columns plus an optional cap on returned groups.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupBySpec {
    columns: Vec<String>,
    top_n: Option<usize>,
}

impl GroupBySpec {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            top_n: None,
        }
    }

    #[must_use]
    pub const fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn top_n(&self) -> Option<usize> {
        self.top_n
    }
}

///
/// QueryRequest
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct QueryRequest {
    aggregations: Vec<AggregationSpec>,
    group_by: GroupBySpec,
    filter: Option<Filter>,
}

impl QueryRequest {
    #[must_use]
    pub const fn new(aggregations: Vec<AggregationSpec>, group_by: GroupBySpec) -> Self {
        Self {
            aggregations,
            group_by,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn aggregations(&self) -> &[AggregationSpec] {
        &self.aggregations
    }

    #[must_use]
    pub const fn group_by(&self) -> &GroupBySpec {
        &self.group_by
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

///
/// TESTS
///
