//! Truth-maintenance scenarios.

use matchwood_engine::{PatternDecl, RuleDecl, RuleSet, TypeDecl};
use matchwood_foundation::ErrorKind;
use matchwood_runtime::{Effect, RuleMatch, Session, SessionConfig};
use matchwood_store::Fact;

/// a => logically b, b => logically c. Marker types with no fields.
fn cascade_ruleset() -> RuleSet {
    RuleSet::new()
        .with_type(TypeDecl::new("a"))
        .with_type(TypeDecl::new("b"))
        .with_type(TypeDecl::new("c"))
        .with_rule(RuleDecl::new("rules/derive-b").with_pattern(PatternDecl::new("a")))
        .with_rule(RuleDecl::new("rules/derive-c").with_pattern(PatternDecl::new("b")))
}

fn cascade_session() -> Session {
    let mut session = Session::build(&cascade_ruleset(), &SessionConfig::default()).unwrap();
    let b = session.interner_mut().intern("b");
    let c = session.interner_mut().intern("c");

    session
        .on_rule("rules/derive-b", move |_: &RuleMatch| {
            Ok(vec![Effect::InsertLogical(Fact::new(b))])
        })
        .unwrap();
    session
        .on_rule("rules/derive-c", move |_: &RuleMatch| {
            Ok(vec![Effect::InsertLogical(Fact::new(c))])
        })
        .unwrap();
    session
}

#[test]
fn logical_cascade_derives_transitively() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");

    session.insert(Fact::new(a)).unwrap();
    session.fire_all_rules(None).unwrap();

    // a stated, b and c derived
    assert_eq!(session.fact_count(), 3);
}

#[test]
fn retracting_the_root_unwinds_the_whole_cascade() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");

    let root = session.insert(Fact::new(a)).unwrap();
    session.fire_all_rules(None).unwrap();
    assert_eq!(session.fact_count(), 3);

    // Retracting a kills b's justification; b's retraction kills c's
    session.retract(root).unwrap();
    assert_eq!(session.fact_count(), 0);
}

#[test]
fn multiple_justifications_survive_partial_retraction() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");

    // Two independent firings justify the same logical b
    let first = session.insert(Fact::new(a)).unwrap();
    let second = session.insert(Fact::new(a)).unwrap();
    session.fire_all_rules(None).unwrap();
    // a + a + merged b + c
    assert_eq!(session.fact_count(), 4);

    session.retract(first).unwrap();
    // b keeps its second justification; the cascade survives
    assert_eq!(session.fact_count(), 3);

    session.retract(second).unwrap();
    assert_eq!(session.fact_count(), 0);
}

#[test]
fn stated_facts_are_never_auto_retracted() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");
    let c = session.interner_mut().intern("c");

    // c also exists as a stated fact
    session.insert(Fact::new(c)).unwrap();
    let root = session.insert(Fact::new(a)).unwrap();

    // derive-c would logically insert a c equal to the stated one:
    // that mode mix is rejected when the firing applies its effects
    let err = session.fire_all_rules(None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConflictingAssertionMode(_)));

    // The stated c is untouched; the logical b followed a out
    session.retract(root).unwrap();
    assert_eq!(session.fact_count(), 1);
}

#[test]
fn stating_an_existing_logical_fact_is_rejected() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");
    let b = session.interner_mut().intern("b");

    session.insert(Fact::new(a)).unwrap();
    session.fire_all_rules(None).unwrap();

    let err = session.insert(Fact::new(b)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConflictingAssertionMode(_)));
}

#[test]
fn explicit_retraction_of_a_logical_fact_is_allowed() {
    let mut session = cascade_session();
    let a = session.interner_mut().intern("a");
    let b_kw = session.interner_mut().intern("b");

    session.insert(Fact::new(a)).unwrap();
    session.fire_all_rules(None).unwrap();

    // Find the logical b: three facts were inserted in order, none
    // retracted, so the handles are (0..3) at generation 1
    let b_handle = (0..3)
        .map(|i| matchwood_foundation::FactHandle::new(i, 1))
        .find(|h| session.get(*h).is_some_and(|f| f.fact_type == b_kw))
        .unwrap();

    session.retract(b_handle).unwrap();
    // c lost its justification and followed; a remains
    assert_eq!(session.fact_count(), 1);
}
