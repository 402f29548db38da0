//! Integration tests for the error taxonomy.

use matchwood_foundation::{Error, ErrorKind, FactHandle, Interner, Type};

#[test]
fn identity_errors_carry_the_handle() {
    let handle = FactHandle::new(4, 1);
    let err = Error::stale_handle(handle);
    match err.kind {
        ErrorKind::StaleHandle(h) => assert_eq!(h, handle),
        other => panic!("expected StaleHandle, got {other:?}"),
    }
}

#[test]
fn consistency_errors_are_the_only_fatal_kind() {
    assert!(Error::consistency("memory desync").is_fatal());

    assert!(!Error::session_disposed().is_fatal());
    assert!(!Error::duplicate_fact(FactHandle::null()).is_fatal());
    assert!(!Error::type_mismatch(Type::Int, Type::String).is_fatal());
    assert!(!Error::invalid_rule_set("whatever").is_fatal());
}

#[test]
fn context_appears_in_display() {
    let err = Error::session_disposed().with_context("fire_all_rules");
    assert_eq!(format!("{err}"), "session disposed (fire_all_rules)");
}

#[test]
fn consequence_faults_name_the_rule_message() {
    let mut interner = Interner::new();
    let rule = interner.intern("rules/broken");
    let err = Error::consequence_fault(rule, "boom");
    assert!(format!("{err}").contains("boom"));
}
