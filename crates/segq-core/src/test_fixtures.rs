//! Shared segment fixtures for unit tests.

use crate::{
    executor::{
        cancel::CancellationToken,
        docid::ScanDocIdSource,
        projection::{Block, ProjectedColumn, ProjectionOperator},
    },
    segment::{ColumnSpec, MemorySegment, MemorySegmentBuilder, Segment},
    value::{ColumnType, Value},
};

/// Six-row sales segment.
///
/// | doc | city | region | amount | qty  |
/// |-----|------|--------|--------|------|
/// | 0   | NYC  | east   | 10     | 1    |
/// | 1   | SF   | west   | 5      | 2    |
/// | 2   | NYC  | east   | 7      | 3    |
/// | 3   | LA   | west   | 12     | 1    |
/// | 4   | null | east   | 3      | 5    |
/// | 5   | NYC  | null   | null   | null |
pub(crate) fn sales_segment() -> MemorySegment {
    let mut builder = MemorySegmentBuilder::new("sales")
        .column(ColumnSpec::new("city", ColumnType::Text).with_dictionary())
        .column(ColumnSpec::new("region", ColumnType::Text).with_dictionary())
        .column(ColumnSpec::new("amount", ColumnType::Int))
        .column(ColumnSpec::new("qty", ColumnType::Int).with_dictionary());
    builder
        .extend_rows([
            row("NYC", "east", Some(10), Some(1)),
            row("SF", "west", Some(5), Some(2)),
            row("NYC", "east", Some(7), Some(3)),
            row("LA", "west", Some(12), Some(1)),
            vec![
                Value::Null,
                Value::from("east"),
                Value::Int(3),
                Value::Int(5),
            ],
            vec![Value::from("NYC"), Value::Null, Value::Null, Value::Null],
        ])
        .expect("fixture rows");

    builder.build().expect("fixture segment")
}

fn row(city: &str, region: &str, amount: Option<i64>, qty: Option<i64>) -> Vec<Value> {
    vec![
        Value::from(city),
        Value::from(region),
        Value::from(amount),
        Value::from(qty),
    ]
}

/// Project every row of `segment` as one block. Dictionary columns carry ids
/// and values; other columns carry values only.
pub(crate) fn project_all(segment: &dyn Segment, columns: &[&str]) -> Block {
    let projected = columns
        .iter()
        .map(|name| {
            let slot = segment.resolve_column(name).expect("fixture column");
            let dictionary = slot.has_dictionary();
            let mut column = ProjectedColumn::new(slot);
            if dictionary {
                column.require_ids();
            }
            column.require_values();
            column
        })
        .collect();
    let source = ScanDocIdSource::new(segment, None, CancellationToken::new());
    let mut projection =
        ProjectionOperator::new(segment, Box::new(source), projected, segment.row_count());

    projection
        .next_block()
        .expect("projection")
        .expect("non-empty fixture")
}
