//! Integration tests for fact payloads and schema validation.

use matchwood_foundation::{ErrorKind, Interner, Type, Value};
use matchwood_store::{Fact, FactTypeSchema, FieldSchema, TypeRegistry};

fn setup() -> (TypeRegistry, Interner) {
    let mut interner = Interner::new();
    let order = interner.intern("order");
    let amount = interner.intern("amount");
    let status = interner.intern("status");

    let mut registry = TypeRegistry::new();
    registry
        .register(
            FactTypeSchema::new(order)
                .with_field(FieldSchema::required(amount, Type::Int))
                .with_field(FieldSchema::optional(status, Type::String, Value::from("open"))),
        )
        .unwrap();
    (registry, interner)
}

#[test]
fn defaults_apply_during_validation() {
    let (registry, mut interner) = setup();
    let order = interner.intern("order");
    let amount = interner.intern("amount");
    let status = interner.intern("status");

    let fact = Fact::new(order).with_field(amount, 10i64);
    let normalized = registry.validate(&fact).unwrap();

    assert_eq!(normalized.get(status), Some(&Value::from("open")));
    assert_eq!(normalized.len(), 2);
}

#[test]
fn validation_errors_cover_the_taxonomy() {
    let (registry, mut interner) = setup();
    let order = interner.intern("order");
    let amount = interner.intern("amount");
    let ghost = interner.intern("ghost");

    // Missing required field
    let err = registry.validate(&Fact::new(order)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingField { .. }));

    // Wrong field type
    let err = registry
        .validate(&Fact::new(order).with_field(amount, "ten"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));

    // Undeclared field
    let err = registry
        .validate(
            &Fact::new(order)
                .with_field(amount, 1i64)
                .with_field(ghost, 1i64),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownField { .. }));

    // Undeclared type
    let err = registry.validate(&Fact::new(ghost)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownFactType(_)));
}

#[test]
fn normalized_facts_compare_by_payload() {
    let (registry, mut interner) = setup();
    let order = interner.intern("order");
    let amount = interner.intern("amount");
    let status = interner.intern("status");

    // Explicit default equals applied default after normalization
    let explicit = Fact::new(order)
        .with_field(amount, 10i64)
        .with_field(status, "open");
    let implicit = registry
        .validate(&Fact::new(order).with_field(amount, 10i64))
        .unwrap();

    assert_eq!(registry.validate(&explicit).unwrap(), implicit);
}
