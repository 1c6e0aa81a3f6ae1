//! Module: result
//! Responsibility: the grouped result table produced by one query.
//! Does not own: merging results across segments.
//! Boundary: immutable once extracted from the group-by operator.

use crate::value::Value;
use std::{cmp::Ordering, collections::HashMap};

///
/// AggregationResult
///
/// Maps the decoded group-by values of each group to one finalized value per
/// aggregation, in request order. Map iteration order is unspecified; use
/// `sorted_rows` for a deterministic order.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationResult {
    group_by: Vec<String>,
    aggregations: Vec<String>,
    groups: HashMap<Vec<Value>, Vec<Value>>,
}

impl AggregationResult {
    #[must_use]
    pub const fn new(
        group_by: Vec<String>,
        aggregations: Vec<String>,
        groups: HashMap<Vec<Value>, Vec<Value>>,
    ) -> Self {
        Self {
            group_by,
            aggregations,
            groups,
        }
    }

    /// Group-by column names, in key order.
    #[must_use]
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Aggregation labels such as `sum(amount)`, in value order.
    #[must_use]
    pub fn aggregations(&self) -> &[String] {
        &self.aggregations
    }

    #[must_use]
    pub fn get(&self, key: &[Value]) -> Option<&[Value]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub const fn groups(&self) -> &HashMap<Vec<Value>, Vec<Value>> {
        &self.groups
    }

    /// Rows ordered by group key ascending.
    #[must_use]
    pub fn sorted_rows(&self) -> Vec<(&[Value], &[Value])> {
        let mut rows: Vec<_> = self
            .groups
            .iter()
            .map(|(key, values)| (key.as_slice(), values.as_slice()))
            .collect();
        rows.sort_by(|left, right| left.0.cmp(right.0));

        rows
    }

    /// Keep the `n` groups with the largest first aggregation value. Ties keep
    /// the smaller group key.
    pub(crate) fn retain_top_n(&mut self, n: usize) {
        if self.groups.len() <= n {
            return;
        }

        let mut ranked: Vec<(Vec<Value>, Vec<Value>)> = self.groups.drain().collect();
        ranked.sort_by(rank_desc);
        ranked.truncate(n);
        self.groups = ranked.into_iter().collect();
    }
}

fn rank_desc(left: &(Vec<Value>, Vec<Value>), right: &(Vec<Value>, Vec<Value>)) -> Ordering {
    let lead = |row: &(Vec<Value>, Vec<Value>)| row.1.first().cloned().unwrap_or(Value::Null);

    lead(right)
        .cmp(&lead(left))
        .then_with(|| left.0.cmp(&right.0))
}

///
/// TESTS
///
