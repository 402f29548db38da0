//! Integration tests for the core value type.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use matchwood_foundation::{Interner, Type, Value};

#[test]
fn values_key_ordered_maps() {
    let mut map = BTreeMap::new();
    map.insert(Value::Int(2), "b");
    map.insert(Value::Int(1), "a");
    map.insert(Value::from("z"), "c");

    // Deterministic key order: ints before strings, ints ascending
    let keys: Vec<_> = map.keys().cloned().collect();
    assert_eq!(keys[0], Value::Int(1));
    assert_eq!(keys[1], Value::Int(2));
    assert_eq!(keys[2], Value::from("z"));
}

#[test]
fn total_order_is_consistent_with_equality() {
    let values = [
        Value::Nil,
        Value::Bool(true),
        Value::Int(-1),
        Value::Float(0.5),
        Value::from("abc"),
    ];
    for a in &values {
        for b in &values {
            assert_eq!(a.cmp(b) == Ordering::Equal, a == b);
            assert_eq!(a.cmp(b), b.cmp(a).reverse());
        }
    }
}

#[test]
fn numeric_comparison_crosses_int_and_float() {
    assert_eq!(
        Value::Int(2).compare_numeric(&Value::Float(2.0)),
        Some(Ordering::Equal)
    );
    assert_eq!(
        Value::Float(1.5).compare_numeric(&Value::Int(2)),
        Some(Ordering::Less)
    );
}

#[test]
fn type_tags_admit_expected_values() {
    assert!(Type::Any.admits(&Value::Nil));
    assert!(Type::Int.admits(&Value::Int(0)));
    assert!(!Type::String.admits(&Value::Int(0)));
}

#[test]
fn keywords_round_trip_through_values() {
    let mut interner = Interner::new();
    let kw = interner.intern("status/open");
    let value = Value::from(kw);
    assert_eq!(value.as_keyword(), Some(kw));
    assert_eq!(interner.resolve(kw), Some("status/open"));
}
