use super::*;
use crate::value::{ColumnType, Value};

fn city_segment() -> MemorySegment {
    let mut builder = MemorySegmentBuilder::new("cities")
        .column(ColumnSpec::new("city", ColumnType::Text).with_dictionary())
        .column(ColumnSpec::new("amount", ColumnType::Float));
    builder
        .extend_rows([
            vec![Value::from("SF"), Value::Int(5)],
            vec![Value::from("NYC"), Value::Float(1.5)],
            vec![Value::Null, Value::Null],
        ])
        .expect("rows");

    builder.build().expect("segment")
}

#[test]
fn dictionary_is_sorted_and_excludes_null() {
    let segment = city_segment();

    assert_eq!(segment.dictionary_size(0), Some(2));
    assert_eq!(segment.dictionary_value(0, 0), Some(Value::from("NYC")));
    assert_eq!(segment.dictionary_value(0, 1), Some(Value::from("SF")));
    assert_eq!(segment.dictionary_id(0, 0), Some(1));
    assert_eq!(segment.dictionary_id(0, 1), Some(0));
    assert_eq!(segment.dictionary_id(0, 2), None);
}

#[test]
fn int_values_widen_into_float_columns() {
    let segment = city_segment();

    assert_eq!(segment.raw_value(1, 0), Value::Float(5.0));
    assert_eq!(segment.raw_value(1, 2), Value::Null);
    assert_eq!(segment.dictionary_size(1), None);
}

#[test]
fn seeded_dictionary_covers_values_absent_from_rows() {
    let mut builder = MemorySegmentBuilder::new("seeded").column(
        ColumnSpec::new("k", ColumnType::Int).with_dictionary_values((0..100).map(Value::Int)),
    );
    builder.push_row(vec![Value::Int(42)]).expect("row");
    let segment = builder.build().expect("segment");

    assert_eq!(segment.dictionary_size(0), Some(100));
    assert_eq!(segment.dictionary_id(0, 0), Some(42));
}

#[test]
fn builder_rejects_wrong_arity_and_type() {
    let mut builder =
        MemorySegmentBuilder::new("bad").column(ColumnSpec::new("k", ColumnType::Int));

    assert!(matches!(
        builder.push_row(vec![Value::Int(1), Value::Int(2)]),
        Err(SegmentBuildError::RowArity { expected: 1, found: 2, .. })
    ));
    assert!(matches!(
        builder.push_row(vec![Value::from("x")]),
        Err(SegmentBuildError::ValueType { .. })
    ));
}

#[test]
fn builder_rejects_duplicate_columns() {
    let builder = MemorySegmentBuilder::new("dup")
        .column(ColumnSpec::new("k", ColumnType::Int))
        .column(ColumnSpec::new("k", ColumnType::Text));

    assert!(matches!(
        builder.build(),
        Err(SegmentBuildError::DuplicateColumn { .. })
    ));
}

#[test]
fn resolve_column_reports_unknown_names() {
    let segment = city_segment();

    let slot = segment.resolve_column("amount").expect("slot");
    assert_eq!(slot.index(), 1);
    assert_eq!(slot.column_type(), ColumnType::Float);
    assert!(!slot.has_dictionary());

    let err = segment.resolve_column("missing").expect_err("unknown column");
    assert!(err.to_string().contains("missing"));
}
