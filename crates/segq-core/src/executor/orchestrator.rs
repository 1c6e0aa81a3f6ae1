//! Module: executor::orchestrator
//! Responsibility: drive the block pipeline into grouped aggregate state and freeze the result.
//! Does not own: plan validation or per-function reducer semantics.
//! Boundary: Created -> Running -> Done lifecycle; the only owner of group state.

use crate::{
    error::{IllegalStateError, InternalError, QueryError},
    executor::{
        aggregate::GroupedAggregator,
        cancel::CancellationToken,
        group::{GroupKeyGenerator, GroupTable, ResolvedKeyMode},
        projection::ProjectionOperator,
        trace::{PlanFingerprint, QueryTraceSink, TraceScope},
    },
    result::AggregationResult,
    segment::Segment,
    value::Value,
};
use std::{collections::HashMap, fmt, sync::Arc};

///
/// OperatorState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperatorState {
    Created,
    Running,
    Done,
    Cancelled,
    Failed,
}

impl OperatorState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// GroupByParts
///
/// Everything one operator instance needs, assembled by the plan.
///

pub(crate) struct GroupByParts<'a> {
    pub(crate) segment: &'a dyn Segment,
    pub(crate) projection: ProjectionOperator<'a>,
    pub(crate) keys: GroupKeyGenerator,
    pub(crate) table: GroupTable,
    pub(crate) aggregators: Vec<GroupedAggregator>,
    pub(crate) group_by: Vec<String>,
    pub(crate) labels: Vec<String>,
    pub(crate) top_n: Option<usize>,
    pub(crate) key_mode: ResolvedKeyMode,
    pub(crate) fingerprint: PlanFingerprint,
    pub(crate) cancellation: CancellationToken,
    pub(crate) trace: Option<Arc<dyn QueryTraceSink>>,
}

#[derive(Clone, Copy, Debug, Default)]
struct RunStats {
    blocks: u64,
    docs: u64,
}

///
/// GroupByOperator
///
/// Pulls projected blocks, assigns each row a dense group index and feeds
/// every aggregator. Results are frozen once the source is exhausted and can
/// be extracted exactly once. Cancellation and runtime errors discard all
/// partial state.
///

pub struct GroupByOperator<'a> {
    segment: &'a dyn Segment,
    projection: ProjectionOperator<'a>,
    keys: GroupKeyGenerator,
    table: GroupTable,
    aggregators: Vec<GroupedAggregator>,
    group_by: Vec<String>,
    labels: Vec<String>,
    top_n: Option<usize>,
    key_mode: ResolvedKeyMode,
    fingerprint: PlanFingerprint,
    cancellation: CancellationToken,
    trace: Option<Arc<dyn QueryTraceSink>>,
    state: OperatorState,
    result: Option<AggregationResult>,
}

impl<'a> GroupByOperator<'a> {
    pub(crate) fn new(parts: GroupByParts<'a>) -> Self {
        Self {
            segment: parts.segment,
            projection: parts.projection,
            keys: parts.keys,
            table: parts.table,
            aggregators: parts.aggregators,
            group_by: parts.group_by,
            labels: parts.labels,
            top_n: parts.top_n,
            key_mode: parts.key_mode,
            fingerprint: parts.fingerprint,
            cancellation: parts.cancellation,
            trace: parts.trace,
            state: OperatorState::Created,
            result: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> OperatorState {
        self.state
    }

    #[must_use]
    pub const fn key_mode(&self) -> ResolvedKeyMode {
        self.key_mode
    }

    #[must_use]
    pub const fn keys(&self) -> &GroupKeyGenerator {
        &self.keys
    }

    /// Consume the whole doc-id stream. Only valid once, from `Created`.
    pub fn run(&mut self) -> Result<(), QueryError> {
        if self.state != OperatorState::Created {
            return Err(IllegalStateError {
                operation: "run",
                state: self.state.label(),
            }
            .into());
        }
        self.state = OperatorState::Running;

        let trace = TraceScope::start(
            self.trace.as_ref(),
            self.fingerprint,
            self.key_mode.requested,
            self.key_mode.resolved,
        );
        let outcome = self
            .drive(trace.as_ref())
            .and_then(|stats| self.freeze().map(|groups| (stats, groups)));

        match outcome {
            Ok((stats, groups)) => {
                self.state = OperatorState::Done;
                tracing::debug!(
                    fingerprint = %self.fingerprint,
                    blocks = stats.blocks,
                    docs = stats.docs,
                    groups,
                    "group-by run finished"
                );
                if let Some(trace) = trace {
                    trace.finish(stats.blocks, stats.docs, groups);
                }

                Ok(())
            }
            Err(err) => {
                self.release();
                self.state = if err.is_cancelled() {
                    OperatorState::Cancelled
                } else {
                    OperatorState::Failed
                };
                tracing::debug!(
                    fingerprint = %self.fingerprint,
                    state = %self.state,
                    error = %err,
                    "group-by run aborted"
                );
                if let Some(trace) = trace {
                    trace.error(err.kind());
                }

                Err(err)
            }
        }
    }

    /// Hand out the frozen result. Only valid once, after `run` succeeded.
    pub fn extract(&mut self) -> Result<AggregationResult, QueryError> {
        if self.state != OperatorState::Done {
            return Err(IllegalStateError {
                operation: "extract",
                state: self.state.label(),
            }
            .into());
        }

        self.result.take().ok_or_else(|| {
            IllegalStateError {
                operation: "extract",
                state: "done (result already extracted)",
            }
            .into()
        })
    }

    /// Run to completion and extract in one step.
    pub fn execute(mut self) -> Result<AggregationResult, QueryError> {
        self.run()?;
        self.extract()
    }

    fn drive(&mut self, trace: Option<&TraceScope>) -> Result<RunStats, QueryError> {
        let mut stats = RunStats::default();
        let mut keys = Vec::new();
        let mut groups = Vec::new();

        loop {
            if self.cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            let Some(block) = self.projection.next_block()? else {
                break;
            };

            self.keys.generate(&block, &mut keys)?;
            self.table.assign(&mut keys, &mut groups)?;
            for aggregator in &mut self.aggregators {
                aggregator
                    .aggregate_block(&block, &groups)
                    .map_err(InternalError::from)?;
            }

            let docs = as_u64(block.len());
            stats.blocks += 1;
            stats.docs += docs;
            if let Some(trace) = trace {
                trace.block(stats.blocks, docs, as_u64(self.table.len()));
            }
        }

        Ok(stats)
    }

    // Decode keys, finalize states and release the group table.
    fn freeze(&mut self) -> Result<u64, QueryError> {
        let group_count = self.table.len();
        let mut columns = Vec::with_capacity(self.aggregators.len());
        for aggregator in std::mem::take(&mut self.aggregators) {
            columns.push(aggregator.finish(group_count, self.segment)?.into_iter());
        }

        let mut groups = HashMap::with_capacity(group_count);
        for key in self.table.keys() {
            let values = self.keys.decode(key, self.segment)?;
            let row: Vec<Value> = columns
                .iter_mut()
                .map(|column| column.next().unwrap_or(Value::Null))
                .collect();
            if groups.insert(values, row).is_some() {
                return Err(InternalError::executor_invariant(
                    "two group keys decoded to the same group values",
                )
                .into());
            }
        }
        self.table.clear();

        let mut result =
            AggregationResult::new(self.group_by.clone(), self.labels.clone(), groups);
        if let Some(n) = self.top_n {
            result.retain_top_n(n);
        }
        let retained = as_u64(result.len());
        self.result = Some(result);

        Ok(retained)
    }

    fn release(&mut self) {
        self.table.clear();
        self.aggregators.clear();
        self.result = None;
    }
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
