//! Module: executor
//! Responsibility: pull-based block pipeline from doc ids to grouped aggregate results.
//! Does not own: request validation or plan shape decisions.
//! Boundary: runtime half of the query core; plans are built in `plan`.

pub mod aggregate;
pub mod cancel;
pub mod docid;
pub mod group;
pub mod orchestrator;
pub mod projection;
pub mod trace;

use crate::{
    config::ExecutionConfig,
    error::QueryError,
    executor::{cancel::CancellationToken, trace::QueryTraceSink},
    plan::PlanBuilder,
    request::QueryRequest,
    result::AggregationResult,
    segment::Segment,
};
use std::sync::Arc;

///
/// QueryContext
///
/// Per-call runtime hooks: the cancellation token and an optional trace sink.
/// Neither changes query results.
///

#[derive(Clone, Default)]
pub struct QueryContext {
    cancellation: CancellationToken,
    trace: Option<Arc<dyn QueryTraceSink>>,
}

impl QueryContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, sink: Arc<dyn QueryTraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub const fn trace(&self) -> Option<&Arc<dyn QueryTraceSink>> {
        self.trace.as_ref()
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("cancellation", &self.cancellation)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

/// Run one request against one segment with default execution policy.
pub fn run(segment: &dyn Segment, request: &QueryRequest) -> Result<AggregationResult, QueryError> {
    run_with(
        segment,
        request,
        &ExecutionConfig::default(),
        &QueryContext::default(),
    )
}

/// Run one request with explicit execution policy and runtime hooks.
pub fn run_with(
    segment: &dyn Segment,
    request: &QueryRequest,
    config: &ExecutionConfig,
    ctx: &QueryContext,
) -> Result<AggregationResult, QueryError> {
    let plan = PlanBuilder::new(segment, *config).build(request, config.group_key_mode())?;
    plan.log_explain();

    plan.execute(ctx)
}
