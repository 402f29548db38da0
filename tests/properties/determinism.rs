//! Firing order must be reproducible: same rule set, same insertion
//! order, same configuration — identical firing sequence, with no
//! hidden nondeterminism leaking from hash iteration.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use matchwood_engine::{
    CmpOp, LiteralDecl, PatternDecl, RuleDecl, RuleSet, TestDecl, TypeDecl, TypeTag,
};
use matchwood_runtime::{RuleMatch, Session, SessionConfig};
use matchwood_store::Fact;

/// Two same-salience rules plus one prioritized rule over one type.
fn ruleset() -> RuleSet {
    let watch = |threshold: i64| {
        PatternDecl::new("reading").with_test(TestDecl::literal(
            "value",
            CmpOp::Gt,
            LiteralDecl::Int(threshold),
        ))
    };
    RuleSet::new()
        .with_type(TypeDecl::new("reading").with_field("value", TypeTag::Int))
        .with_rule(
            RuleDecl::new("rules/critical")
                .with_salience(10)
                .with_pattern(watch(75)),
        )
        .with_rule(RuleDecl::new("rules/warn").with_pattern(watch(50)))
        .with_rule(RuleDecl::new("rules/note").with_pattern(watch(25)))
}

/// Runs the full insert-then-fire cycle and returns the firing log as
/// (rule, value) pairs.
fn run(values: &[i64]) -> Vec<(String, i64)> {
    let mut session = Session::build(&ruleset(), &SessionConfig::default()).unwrap();
    let reading = session.interner_mut().intern("reading");
    let value = session.interner_mut().intern("value");

    let log = Rc::new(RefCell::new(Vec::new()));
    for rule in ["rules/critical", "rules/warn", "rules/note"] {
        let sink = Rc::clone(&log);
        let name = rule.to_string();
        session
            .on_rule(rule, move |context: &RuleMatch| {
                let v = context
                    .fact(0)
                    .unwrap()
                    .get(value)
                    .unwrap()
                    .as_int()
                    .unwrap();
                sink.borrow_mut().push((name.clone(), v));
                Ok(vec![])
            })
            .unwrap();
    }

    for &v in values {
        session.insert(Fact::new(reading).with_field(value, v)).unwrap();
    }
    session.fire_all_rules(None).unwrap();

    let result = log.borrow().clone();
    result
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn identical_runs_fire_identically(values in prop::collection::vec(0i64..100, 1..20)) {
        prop_assert_eq!(run(&values), run(&values));
    }

    #[test]
    fn salience_bands_are_respected(values in prop::collection::vec(0i64..100, 1..20)) {
        let log = run(&values);
        // Once a lower-salience rule has fired, the prioritized rule
        // never fires again (nothing re-activates it here)
        let first_non_critical = log.iter().position(|(rule, _)| rule != "rules/critical");
        if let Some(boundary) = first_non_critical {
            for (rule, _) in &log[boundary..] {
                prop_assert_ne!(rule.as_str(), "rules/critical");
            }
        }
    }
}
