use super::*;
use crate::{
    segment::{ColumnSpec, MemorySegmentBuilder},
    test_fixtures::{project_all, sales_segment},
    value::ColumnType,
};
use std::collections::BTreeSet;

fn group_columns(segment: &dyn Segment, names: &[&str]) -> Vec<GroupColumn> {
    names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            GroupColumn::new(segment.resolve_column(name).expect("column"), position)
        })
        .collect()
}

fn decoded_groups(mode: GroupKeyMode, names: &[&str]) -> (BTreeSet<Vec<Value>>, Vec<usize>) {
    let segment = sales_segment();
    let block = project_all(&segment, names);
    let mut generator =
        GroupKeyGenerator::new(mode, &segment, group_columns(&segment, names)).expect("generator");
    let mut keys = Vec::new();
    generator.generate(&block, &mut keys).expect("keys");
    assert_eq!(keys.len(), block.len());

    let mut table = GroupTable::new(u64::MAX);
    let mut groups = Vec::new();
    table.assign(&mut keys, &mut groups).expect("assign");

    let decoded = table
        .keys()
        .iter()
        .map(|key| generator.decode(key, &segment).expect("decode"))
        .collect();
    let rows = groups.iter().map(|group| *group as usize).collect();

    (decoded, rows)
}

///
/// TESTS
///

#[test]
fn bits_for_rounds_up_with_one_bit_minimum() {
    assert_eq!(bits_for(0), 1);
    assert_eq!(bits_for(1), 1);
    assert_eq!(bits_for(2), 1);
    assert_eq!(bits_for(3), 2);
    assert_eq!(bits_for(4), 2);
    assert_eq!(bits_for(5), 3);
    assert_eq!(bits_for(1 << 32), 32);
    assert_eq!(bits_for(u64::MAX), 64);
}

#[test]
fn layout_places_first_column_in_high_bits() {
    let layout = KeyLayout::for_cardinalities(&[4, 3, 9]).expect("layout");
    assert_eq!(layout.total_bits(), 8);

    let key = layout.pack(&[3, 1, 7]);
    assert_eq!(key, 0b1101_0111);
    assert_eq!(layout.unpack(key, 0), 3);
    assert_eq!(layout.unpack(key, 1), 1);
    assert_eq!(layout.unpack(key, 2), 7);
}

#[test]
fn layout_reports_overflow_past_sixty_four_bits() {
    let err = KeyLayout::for_cardinalities(&[1 << 33, 1 << 33]).expect_err("overflow");

    assert_eq!(
        err,
        OverflowError {
            required_bits: 66,
            available: 64,
        }
    );
}

#[test]
fn raw_encoding_is_canonical_and_self_delimiting() {
    let mut zero = Vec::new();
    let mut negative_zero = Vec::new();
    encode_value(&Value::Float(0.0), &mut zero).expect("encode");
    encode_value(&Value::Float(-0.0), &mut negative_zero).expect("encode");
    assert_eq!(zero, negative_zero);

    let mut left = Vec::new();
    encode_value(&Value::from("ab"), &mut left).expect("encode");
    encode_value(&Value::from("c"), &mut left).expect("encode");
    let mut right = Vec::new();
    encode_value(&Value::from("a"), &mut right).expect("encode");
    encode_value(&Value::from("bc"), &mut right).expect("encode");
    assert_ne!(left, right);

    let mut mixed = Vec::new();
    for value in [Value::Null, Value::Int(-4), Value::from("x")] {
        encode_value(&value, &mut mixed).expect("encode");
    }
    assert_eq!(
        decode_values(&mixed).expect("decode"),
        vec![Value::Null, Value::Int(-4), Value::from("x")]
    );
}

#[test]
fn raw_decoding_rejects_truncated_keys() {
    let mut bytes = Vec::new();
    encode_value(&Value::Int(9), &mut bytes).expect("encode");
    bytes.pop();

    assert!(decode_values(&bytes).is_err());
}

#[test]
fn trie_insert_is_idempotent() {
    let mut trie = DictionaryTrie::new();
    let first = trie.insert_path(&[1, 2, 3]).expect("insert");
    let nodes = trie.node_count();

    let again = trie.insert_path(&[1, 2, 3]).expect("insert");
    assert_eq!(first, again);
    assert_eq!(trie.node_count(), nodes);

    let sibling = trie.insert_path(&[1, 2, 4]).expect("insert");
    assert_ne!(first, sibling);
    assert_eq!(trie.node_count(), nodes + 1);

    assert_eq!(trie.lookup_path(&[1, 2, 3]), Some(first));
    assert_eq!(trie.lookup_path(&[1, 9, 3]), None);
    assert_eq!(trie.path(sibling).expect("path"), vec![1, 2, 4]);
}

#[test]
fn group_table_enforces_max_groups() {
    let mut table = GroupTable::new(2);
    assert_eq!(table.group_index(GroupKey::Packed(7)).expect("group"), 0);
    assert_eq!(table.group_index(GroupKey::Packed(9)).expect("group"), 1);
    assert_eq!(table.group_index(GroupKey::Packed(7)).expect("group"), 0);

    let err = table
        .group_index(GroupKey::Packed(11))
        .expect_err("limit");
    assert!(matches!(
        err,
        GroupError::GroupLimitExceeded {
            attempted: 3,
            limit: 2,
            ..
        }
    ));
    assert_eq!(table.len(), 2);
}

#[test]
fn auto_mode_prefers_packed_keys_when_dictionaries_fit() {
    let segment = sales_segment();
    let slots = vec![
        segment.resolve_column("city").expect("city"),
        segment.resolve_column("region").expect("region"),
    ];

    let resolved = resolve_key_mode(&segment, &slots, GroupKeyMode::Auto).expect("resolve");

    assert_eq!(resolved.resolved, GroupKeyMode::Dictionary);
    assert_eq!(resolved.fallback, None);
}

#[test]
fn columns_without_dictionary_force_raw_keys_or_reject() {
    let segment = sales_segment();
    let slots = vec![segment.resolve_column("amount").expect("amount")];

    let auto = resolve_key_mode(&segment, &slots, GroupKeyMode::Auto).expect("resolve");
    assert_eq!(auto.resolved, GroupKeyMode::NoDictionary);

    for mode in [GroupKeyMode::Dictionary, GroupKeyMode::DictionaryAndTrie] {
        let err = resolve_key_mode(&segment, &slots, mode).expect_err("missing dictionary");
        assert_eq!(
            err,
            ConfigurationError::MissingDictionary {
                column: "amount".to_string(),
                mode,
            }
        );
    }
}

#[test]
fn overflowing_layout_falls_back_by_requested_mode() {
    let mut builder = MemorySegmentBuilder::new("wide");
    let names = ["a", "b", "c", "d", "e"];
    for name in names {
        builder = builder.column(
            ColumnSpec::new(name, ColumnType::Int)
                .with_dictionary_values((0..8192).map(Value::Int)),
        );
    }
    builder
        .push_row(vec![Value::Int(1); names.len()])
        .expect("row");
    let segment = builder.build().expect("segment");
    let slots: Vec<_> = names
        .iter()
        .map(|name| segment.resolve_column(name).expect("column"))
        .collect();

    let explicit =
        resolve_key_mode(&segment, &slots, GroupKeyMode::Dictionary).expect("resolve");
    assert_eq!(explicit.resolved, GroupKeyMode::NoDictionary);
    let fallback = explicit.fallback.expect("fallback recorded");
    assert_eq!(fallback.overflow.required_bits, 70);

    let auto = resolve_key_mode(&segment, &slots, GroupKeyMode::Auto).expect("resolve");
    assert_eq!(auto.resolved, GroupKeyMode::DictionaryAndTrie);
    assert!(auto.fallback.is_some());
}

#[test]
fn every_mode_partitions_rows_identically() {
    let names = ["city", "region"];
    let expected: BTreeSet<Vec<Value>> = [
        vec![Value::from("NYC"), Value::from("east")],
        vec![Value::from("SF"), Value::from("west")],
        vec![Value::from("LA"), Value::from("west")],
        vec![Value::Null, Value::from("east")],
        vec![Value::from("NYC"), Value::Null],
    ]
    .into_iter()
    .collect();

    for mode in [
        GroupKeyMode::NoDictionary,
        GroupKeyMode::Dictionary,
        GroupKeyMode::DictionaryAndTrie,
    ] {
        let (groups, rows) = decoded_groups(mode, &names);
        assert_eq!(groups, expected, "{mode} groups");
        assert_eq!(rows, vec![0, 1, 0, 2, 3, 4], "{mode} row assignment");
    }
}

#[test]
fn auto_is_rejected_by_generator_construction() {
    let segment = sales_segment();
    let columns = group_columns(&segment, &["city"]);

    assert!(GroupKeyGenerator::new(GroupKeyMode::Auto, &segment, columns).is_err());
}
