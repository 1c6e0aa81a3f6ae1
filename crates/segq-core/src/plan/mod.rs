//! Module: plan
//! Responsibility: validate one request against one segment and compile it into an executable plan.
//! Does not own: block iteration or reducer semantics.
//! Boundary: every configuration and type error is raised here, before any row is read.

mod explain;


pub use explain::ExplainNode;

use crate::{
    config::ExecutionConfig,
    error::{ConfigurationError, QueryError, TypeMismatchError},
    executor::{
        QueryContext,
        aggregate::{AggregateTarget, AggregationFunction, GroupedAggregator},
        docid::{DocIdSource, ScanDocIdSource},
        group::{
            GroupColumn, GroupKeyGenerator, GroupKeyMode, GroupTable, ResolvedKeyMode,
            resolve_key_mode,
        },
        orchestrator::{GroupByOperator, GroupByParts},
        projection::{ProjectedColumn, ProjectionOperator},
        trace::PlanFingerprint,
    },
    request::{AggregationSpec, BoundFilter, Filter, QueryRequest},
    result::AggregationResult,
    segment::{ColumnSlot, Segment},
};

///
/// AggregationFunctionPlan
///
/// One validated aggregation: resolved function, target columns located in
/// the projected block, and whether all targets are dictionary encoded.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregationFunctionPlan {
    label: String,
    function: AggregationFunction,
    targets: Vec<AggregateTarget>,
    has_dictionary: bool,
}

impl AggregationFunctionPlan {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn function(&self) -> AggregationFunction {
        self.function
    }

    #[must_use]
    pub fn targets(&self) -> &[AggregateTarget] {
        &self.targets
    }

    #[must_use]
    pub const fn has_dictionary(&self) -> bool {
        self.has_dictionary
    }

    fn explain(&self) -> ExplainNode {
        let input = if self.function.uses_dictionary_ids(self.has_dictionary) {
            "dictionary ids"
        } else if self.function.reads_columns() {
            "values"
        } else {
            "rows"
        };

        ExplainNode::new("AggregationFunctionGroupByOperator")
            .property("Function", self.label.clone())
            .property("HasDictionary", self.has_dictionary.to_string())
            .property("Input", input)
    }
}

///
/// PlanBuilder
///

pub struct PlanBuilder<'a> {
    segment: &'a dyn Segment,
    config: ExecutionConfig,
}

impl<'a> PlanBuilder<'a> {
    #[must_use]
    pub const fn new(segment: &'a dyn Segment, config: ExecutionConfig) -> Self {
        Self { segment, config }
    }

    /// Validate `request` and compile it. `mode` overrides the configured
    /// group key mode.
    pub fn build(
        &self,
        request: &QueryRequest,
        mode: GroupKeyMode,
    ) -> Result<AggregationGroupByPlan<'a>, QueryError> {
        if request.aggregations().is_empty() {
            return Err(ConfigurationError::MissingAggregations.into());
        }
        let group_slots = self.group_slots(request)?;

        let mut projection = ProjectionBuilder::default();
        let mut aggregations = Vec::with_capacity(request.aggregations().len());
        for spec in request.aggregations() {
            aggregations.push(self.aggregation(spec, &mut projection)?);
        }

        let filter = request
            .filter()
            .map(|filter| filter.bind(self.segment))
            .transpose()?;
        self.config.validate()?;

        let key_mode = resolve_key_mode(self.segment, &group_slots, mode)?;
        let reads_ids = matches!(
            key_mode.resolved,
            GroupKeyMode::Dictionary | GroupKeyMode::DictionaryAndTrie
        );
        let group_columns = group_slots
            .into_iter()
            .map(|slot| {
                let position = projection.position(slot.clone(), reads_ids);
                GroupColumn::new(slot, position)
            })
            .collect();

        let mut plan = AggregationGroupByPlan {
            segment: self.segment,
            config: self.config,
            filter,
            filter_text: request.filter().map(Filter::to_string),
            projection: projection.columns,
            group_columns,
            aggregations,
            key_mode,
            top_n: request.group_by().top_n(),
            fingerprint: PlanFingerprint::from_bytes([0; 32]),
        };
        plan.fingerprint = PlanFingerprint::from_explain(&plan.explain());

        Ok(plan)
    }

    fn group_slots(&self, request: &QueryRequest) -> Result<Vec<ColumnSlot>, QueryError> {
        let columns = request.group_by().columns();
        if columns.is_empty() {
            return Err(ConfigurationError::EmptyGroupBy.into());
        }

        let mut slots: Vec<ColumnSlot> = Vec::with_capacity(columns.len());
        for column in columns {
            if slots.iter().any(|slot| slot.name() == column.as_str()) {
                return Err(ConfigurationError::DuplicateGroupByColumn {
                    column: column.clone(),
                }
                .into());
            }
            slots.push(self.segment.resolve_column(column)?);
        }

        Ok(slots)
    }

    fn aggregation(
        &self,
        spec: &AggregationSpec,
        projection: &mut ProjectionBuilder,
    ) -> Result<AggregationFunctionPlan, QueryError> {
        let function = AggregationFunction::parse(spec.function()).ok_or_else(|| {
            ConfigurationError::UnknownFunction {
                name: spec.function().to_string(),
            }
        })?;
        let label = spec.label();
        if !function.reads_columns() {
            // count ignores its arguments, but named ones must still exist
            for name in spec.columns() {
                self.segment.resolve_column(name)?;
            }
            return Ok(AggregationFunctionPlan {
                label,
                function,
                targets: Vec::new(),
                has_dictionary: false,
            });
        }

        let names = spec.columns();
        if !function.arity().accepts(names.len()) {
            return Err(ConfigurationError::ColumnArity {
                function: function.name().to_string(),
                expected: function.arity().label(),
                found: names.len(),
            }
            .into());
        }

        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            let slot = self.segment.resolve_column(name)?;
            if !function.accepts(slot.column_type()) {
                return Err(TypeMismatchError {
                    function: function.name().to_string(),
                    column: slot.name().to_string(),
                    column_type: slot.column_type(),
                }
                .into());
            }
            slots.push(slot);
        }

        let has_dictionary = slots.iter().all(|slot| {
            slot.has_dictionary() && self.segment.dictionary_size(slot.index()).is_some()
        });
        let reads_ids = function.uses_dictionary_ids(has_dictionary);
        let targets = slots
            .into_iter()
            .map(|slot| {
                let position = projection.position(slot.clone(), reads_ids);
                AggregateTarget::new(slot, position)
            })
            .collect();

        Ok(AggregationFunctionPlan {
            label,
            function,
            targets,
            has_dictionary,
        })
    }
}

// Projected column set in first-seen order, merging encoding needs per column.
#[derive(Default)]
struct ProjectionBuilder {
    columns: Vec<ProjectedColumn>,
}

impl ProjectionBuilder {
    fn position(&mut self, slot: ColumnSlot, ids: bool) -> usize {
        let position = self
            .columns
            .iter()
            .position(|column| column.slot().index() == slot.index())
            .unwrap_or_else(|| {
                self.columns.push(ProjectedColumn::new(slot));
                self.columns.len() - 1
            });

        let column = &mut self.columns[position];
        if ids {
            column.require_ids();
        } else {
            column.require_values();
        }

        position
    }
}

///
/// AggregationGroupByPlan
///
/// Compiled DocIdSet -> Projection -> AggregationGroupBy pipeline for one
/// request on one segment. Immutable; every `execute` builds fresh operators.
///

pub struct AggregationGroupByPlan<'a> {
    segment: &'a dyn Segment,
    config: ExecutionConfig,
    filter: Option<BoundFilter>,
    filter_text: Option<String>,
    projection: Vec<ProjectedColumn>,
    group_columns: Vec<GroupColumn>,
    aggregations: Vec<AggregationFunctionPlan>,
    key_mode: ResolvedKeyMode,
    top_n: Option<usize>,
    fingerprint: PlanFingerprint,
}

impl<'a> AggregationGroupByPlan<'a> {
    #[must_use]
    pub fn projection(&self) -> &[ProjectedColumn] {
        &self.projection
    }

    #[must_use]
    pub fn group_columns(&self) -> &[GroupColumn] {
        &self.group_columns
    }

    #[must_use]
    pub fn aggregations(&self) -> &[AggregationFunctionPlan] {
        &self.aggregations
    }

    #[must_use]
    pub const fn key_mode(&self) -> ResolvedKeyMode {
        self.key_mode
    }

    #[must_use]
    pub const fn fingerprint(&self) -> PlanFingerprint {
        self.fingerprint
    }

    /// Build a fresh operator reading doc ids from a full segment scan.
    pub fn operator(&self, ctx: &QueryContext) -> Result<GroupByOperator<'a>, QueryError> {
        let source = ScanDocIdSource::new(
            self.segment,
            self.filter.clone(),
            ctx.cancellation().clone(),
        );

        self.operator_with_source(Box::new(source), ctx)
    }

    /// Build a fresh operator over an externally produced doc-id stream. The
    /// plan's own filter is not applied to `source`.
    pub fn operator_with_source(
        &self,
        source: Box<dyn DocIdSource + 'a>,
        ctx: &QueryContext,
    ) -> Result<GroupByOperator<'a>, QueryError> {
        let projection = ProjectionOperator::new(
            self.segment,
            source,
            self.projection.clone(),
            self.config.max_docs_per_block(),
        );
        let keys = GroupKeyGenerator::new(
            self.key_mode.resolved,
            self.segment,
            self.group_columns.clone(),
        )?;
        let aggregators = self
            .aggregations
            .iter()
            .map(|plan| {
                GroupedAggregator::new(plan.function, plan.targets.clone(), plan.has_dictionary)
            })
            .collect();

        Ok(GroupByOperator::new(GroupByParts {
            segment: self.segment,
            projection,
            keys,
            table: GroupTable::new(self.config.max_groups()),
            aggregators,
            group_by: self
                .group_columns
                .iter()
                .map(|column| column.slot().name().to_string())
                .collect(),
            labels: self
                .aggregations
                .iter()
                .map(|plan| plan.label.clone())
                .collect(),
            top_n: self.top_n,
            key_mode: self.key_mode,
            fingerprint: self.fingerprint,
            cancellation: ctx.cancellation().clone(),
            trace: ctx.trace().cloned(),
        }))
    }

    /// Run the plan to completion.
    pub fn execute(&self, ctx: &QueryContext) -> Result<AggregationResult, QueryError> {
        self.operator(ctx)?.execute()
    }

    /// Explain tree, one line per stage property.
    #[must_use]
    pub fn explain(&self) -> String {
        self.explain_tree().render()
    }

    /// Emit the explain tree at debug level.
    pub fn log_explain(&self) {
        for line in self.explain().lines() {
            tracing::debug!(fingerprint = %self.fingerprint, "{line}");
        }
    }

    fn explain_tree(&self) -> ExplainNode {
        let doc_ids = ExplainNode::new("DocIdSetOperator")
            .property(
                "MaxDocsPerBlock",
                self.config.max_docs_per_block().to_string(),
            )
            .property(
                "Filter",
                self.filter_text.clone().unwrap_or_else(|| "none".to_string()),
            );

        let columns = self
            .projection
            .iter()
            .map(|column| {
                let encodings = match (column.reads_ids(), column.reads_values()) {
                    (true, true) => "ids+values",
                    (true, false) => "ids",
                    _ => "values",
                };
                format!("{}[{encodings}]", column.slot().name())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let projection = ExplainNode::new("ProjectionOperator")
            .property("Columns", columns)
            .argument("DocIdSet", doc_ids);

        let group_by = self
            .group_columns
            .iter()
            .map(|column| column.slot().name())
            .collect::<Vec<_>>()
            .join(", ");
        let key_mode = match self.key_mode.fallback {
            Some(fallback) => format!(
                "{} (requested {}; {fallback})",
                self.key_mode.resolved, self.key_mode.requested
            ),
            None => format!(
                "{} (requested {})",
                self.key_mode.resolved, self.key_mode.requested
            ),
        };

        let mut root = ExplainNode::new("AggregationGroupByOperator")
            .property("GroupBy", group_by)
            .property("KeyMode", key_mode);
        if let Some(n) = self.top_n {
            root = root.property("TopN", n.to_string());
        }
        root = root.argument("Projection", projection);
        for aggregation in &self.aggregations {
            root = root.argument("AggregationGroupBy", aggregation.explain());
        }

        root
    }
}
