use super::*;
use crate::{
    error::InternalError,
    segment::{DictId, Segment},
    test_fixtures::{project_all, sales_segment},
    value::{ColumnType, Value},
};
use proptest::prelude::*;

fn no_ids(id: DictId) -> Result<Value, InternalError> {
    Err(InternalError::executor_invariant(format!("unexpected id {id}")))
}

fn fold(
    function: AggregationFunction,
    column_type: ColumnType,
    values: &[Option<i64>],
) -> AggregateState {
    let mut state = AggregateState::initialize(function, Some(column_type), false);
    for value in values {
        let value = Value::from(*value);
        let input = match function {
            AggregationFunction::Count => AggregateInput::Row,
            AggregationFunction::DistinctCount => AggregateInput::Values(std::slice::from_ref(&value)),
            _ => AggregateInput::Value(&value),
        };
        state.accumulate(input).expect("accumulate");
    }
    state
}

fn targets(segment: &dyn Segment, names: &[&str], first_position: usize) -> Vec<AggregateTarget> {
    names
        .iter()
        .enumerate()
        .map(|(offset, name)| {
            AggregateTarget::new(
                segment.resolve_column(name).expect("column"),
                first_position + offset,
            )
        })
        .collect()
}

///
/// TESTS
///

#[test]
fn function_names_parse_case_insensitively() {
    assert_eq!(AggregationFunction::parse("SUM"), Some(AggregationFunction::Sum));
    assert_eq!(
        AggregationFunction::parse(" DistinctCount "),
        Some(AggregationFunction::DistinctCount)
    );
    assert_eq!(
        AggregationFunction::parse("MinMaxRange"),
        Some(AggregationFunction::MinMaxRange)
    );
    assert_eq!(AggregationFunction::parse("median"), None);
}

#[test]
fn capabilities_follow_function_family() {
    assert!(!AggregationFunction::Sum.accepts(ColumnType::Text));
    assert!(!AggregationFunction::Min.accepts(ColumnType::Text));
    assert!(AggregationFunction::DistinctCount.accepts(ColumnType::Text));
    assert!(AggregationFunction::Count.arity().accepts(0));
    assert!(!AggregationFunction::Avg.arity().accepts(2));
    assert!(AggregationFunction::DistinctCount.arity().accepts(3));

    assert!(AggregationFunction::Min.uses_dictionary_ids(true));
    assert!(AggregationFunction::DistinctCount.uses_dictionary_ids(true));
    assert!(!AggregationFunction::Sum.uses_dictionary_ids(true));
    assert!(!AggregationFunction::Max.uses_dictionary_ids(false));
}

#[test]
fn count_includes_null_rows() {
    let state = fold(AggregationFunction::Count, ColumnType::Int, &[Some(1), None, Some(3)]);

    assert_eq!(state.finalize(no_ids).expect("finalize"), Value::Int(3));
}

#[test]
fn reducers_skip_nulls_and_report_empty_as_null() {
    let values = [None, Some(4), None, Some(-2)];
    let cases = [
        (AggregationFunction::Sum, Value::Int(2)),
        (AggregationFunction::Avg, Value::Float(1.0)),
        (AggregationFunction::Min, Value::Int(-2)),
        (AggregationFunction::Max, Value::Int(4)),
        (AggregationFunction::MinMaxRange, Value::Float(6.0)),
        (AggregationFunction::DistinctCount, Value::Int(2)),
    ];
    for (function, expected) in cases {
        let state = fold(function, ColumnType::Int, &values);
        assert_eq!(state.finalize(no_ids).expect("finalize"), expected, "{function}");

        let empty = fold(function, ColumnType::Int, &[None, None]);
        let expected_empty = if function == AggregationFunction::DistinctCount {
            Value::Int(0)
        } else {
            Value::Null
        };
        assert_eq!(
            empty.finalize(no_ids).expect("finalize"),
            expected_empty,
            "{function} over nulls"
        );
    }
}

#[test]
fn minmaxrange_orders_nan_like_max() {
    let values = [Value::Float(f64::NAN), Value::Float(1.0), Value::Float(-0.0)];
    let mut range =
        AggregateState::initialize(AggregationFunction::MinMaxRange, Some(ColumnType::Float), false);
    let mut max = AggregateState::initialize(AggregationFunction::Max, Some(ColumnType::Float), false);
    for value in &values {
        range.accumulate(AggregateInput::Value(value)).expect("range");
        max.accumulate(AggregateInput::Value(value)).expect("max");
    }

    assert_eq!(max.finalize(no_ids).expect("max"), Value::Float(f64::NAN));
    assert_eq!(range.finalize(no_ids).expect("range"), Value::Float(f64::NAN));

    let mut split = AggregateState::initialize(
        AggregationFunction::MinMaxRange,
        Some(ColumnType::Float),
        false,
    );
    split
        .accumulate(AggregateInput::Value(&Value::Float(1.0)))
        .expect("range");
    let mut nan_only = AggregateState::initialize(
        AggregationFunction::MinMaxRange,
        Some(ColumnType::Float),
        false,
    );
    nan_only
        .accumulate(AggregateInput::Value(&Value::Float(f64::NAN)))
        .expect("range");
    split.merge(nan_only).expect("merge");
    assert_eq!(split.finalize(no_ids).expect("range"), Value::Float(f64::NAN));
}

#[test]
fn integer_sum_overflow_is_an_error() {
    let mut state = AggregateState::initialize(AggregationFunction::Sum, Some(ColumnType::Int), false);
    state
        .accumulate(AggregateInput::Value(&Value::Int(i64::MAX)))
        .expect("first value");

    assert_eq!(
        state.accumulate(AggregateInput::Value(&Value::Int(1))),
        Err(AccumulateError::SumOverflow)
    );
}

#[test]
fn float_sum_accepts_float_column_values() {
    let mut state =
        AggregateState::initialize(AggregationFunction::Sum, Some(ColumnType::Float), false);
    state
        .accumulate(AggregateInput::Value(&Value::Float(1.5)))
        .expect("accumulate");
    state
        .accumulate(AggregateInput::Value(&Value::Float(2.0)))
        .expect("accumulate");

    assert_eq!(state.finalize(no_ids).expect("finalize"), Value::Float(3.5));
}

#[test]
fn id_reducers_decode_through_dictionary() {
    let mut min = AggregateState::initialize(AggregationFunction::Min, Some(ColumnType::Text), true);
    let mut max = AggregateState::initialize(AggregationFunction::Max, Some(ColumnType::Text), true);
    for id in [Some(2), None, Some(0), Some(1)] {
        min.accumulate(AggregateInput::Id(id)).expect("min");
        max.accumulate(AggregateInput::Id(id)).expect("max");
    }
    let decode = |id: DictId| Ok(Value::Text(format!("v{id}")));

    assert_eq!(min.finalize(decode).expect("min"), Value::from("v0"));
    assert_eq!(max.finalize(decode).expect("max"), Value::from("v2"));
}

#[test]
fn multi_column_distinct_skips_tuples_with_nulls() {
    let mut state =
        AggregateState::initialize(AggregationFunction::DistinctCount, None, true);
    for ids in [
        [Some(0), Some(1)],
        [Some(0), Some(1)],
        [Some(0), None],
        [Some(1), Some(1)],
    ] {
        state.accumulate(AggregateInput::Ids(&ids)).expect("accumulate");
    }

    assert_eq!(state.finalize(no_ids).expect("finalize"), Value::Int(2));
}

#[test]
fn mismatched_input_and_merge_are_rejected() {
    let mut sum = AggregateState::initialize(AggregationFunction::Sum, Some(ColumnType::Int), false);
    assert!(matches!(
        sum.accumulate(AggregateInput::Id(Some(3))),
        Err(AccumulateError::InputMismatch { .. })
    ));

    let min = AggregateState::initialize(AggregationFunction::Min, Some(ColumnType::Int), false);
    assert!(matches!(
        sum.merge(min),
        Err(AccumulateError::MergeMismatch { .. })
    ));
}

#[test]
fn grouped_aggregator_creates_state_per_group() {
    let segment = sales_segment();
    let block = project_all(&segment, &["city", "amount"]);
    let groups = [0, 1, 0, 2, 3, 0];

    let mut sum = GroupedAggregator::new(
        AggregationFunction::Sum,
        targets(&segment, &["amount"], 1),
        false,
    );
    sum.aggregate_block(&block, &groups).expect("aggregate");
    assert_eq!(sum.state_count(), 4);
    assert_eq!(
        sum.finish(5, &segment).expect("finish"),
        vec![
            Value::Int(17),
            Value::Int(5),
            Value::Int(12),
            Value::Int(3),
            Value::Null,
        ]
    );
}

#[test]
fn grouped_min_over_dictionary_ids_matches_value_path() {
    let segment = sales_segment();
    let block = project_all(&segment, &["region", "city"]);
    let groups = [0, 1, 0, 1, 0, 2];

    let mut by_id = GroupedAggregator::new(
        AggregationFunction::Min,
        targets(&segment, &["city"], 1),
        true,
    );
    let mut by_value = GroupedAggregator::new(
        AggregationFunction::Min,
        targets(&segment, &["city"], 1),
        false,
    );
    assert!(by_id.uses_ids());
    assert!(!by_value.uses_ids());

    by_id.aggregate_block(&block, &groups).expect("aggregate");
    by_value.aggregate_block(&block, &groups).expect("aggregate");

    let expected = vec![Value::from("NYC"), Value::from("LA"), Value::from("NYC")];
    assert_eq!(by_id.finish(3, &segment).expect("finish"), expected);
    assert_eq!(by_value.finish(3, &segment).expect("finish"), expected);
}

fn arb_column() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::of(-1_000_i64..1_000), 0..40)
}

fn arb_function() -> impl Strategy<Value = AggregationFunction> {
    prop_oneof![
        Just(AggregationFunction::Count),
        Just(AggregationFunction::Sum),
        Just(AggregationFunction::Avg),
        Just(AggregationFunction::Min),
        Just(AggregationFunction::Max),
        Just(AggregationFunction::MinMaxRange),
        Just(AggregationFunction::DistinctCount),
    ]
}

proptest! {
    #[test]
    fn merging_partial_states_matches_single_pass(
        function in arb_function(),
        values in arb_column(),
        split in 0usize..40,
    ) {
        let split = split.min(values.len());
        let whole = fold(function, ColumnType::Int, &values);
        let mut left = fold(function, ColumnType::Int, &values[..split]);
        let right = fold(function, ColumnType::Int, &values[split..]);
        left.merge(right).expect("merge");

        prop_assert_eq!(
            left.finalize(no_ids).expect("finalize"),
            whole.finalize(no_ids).expect("finalize")
        );
    }

    #[test]
    fn merge_is_associative(
        function in arb_function(),
        a in arb_column(),
        b in arb_column(),
        c in arb_column(),
    ) {
        let mut left = fold(function, ColumnType::Int, &a);
        left.merge(fold(function, ColumnType::Int, &b)).expect("merge");
        left.merge(fold(function, ColumnType::Int, &c)).expect("merge");

        let mut tail = fold(function, ColumnType::Int, &b);
        tail.merge(fold(function, ColumnType::Int, &c)).expect("merge");
        let mut right = fold(function, ColumnType::Int, &a);
        right.merge(tail).expect("merge");

        prop_assert_eq!(
            left.finalize(no_ids).expect("finalize"),
            right.finalize(no_ids).expect("finalize")
        );
    }
}
