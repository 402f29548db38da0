//! Agenda-group staging scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use matchwood_engine::{PatternDecl, RuleDecl, RuleSet, TypeDecl};
use matchwood_runtime::{Effect, RuleMatch, Session, SessionConfig};
use matchwood_store::Fact;

/// One trigger fact type; rules spread over the main group and two
/// staged groups.
fn staged_ruleset() -> RuleSet {
    RuleSet::new()
        .with_type(TypeDecl::new("request"))
        .with_rule(RuleDecl::new("rules/validate").with_group("validation").with_pattern(PatternDecl::new("request")))
        .with_rule(RuleDecl::new("rules/price").with_group("pricing").with_pattern(PatternDecl::new("request")))
        .with_rule(RuleDecl::new("rules/log").with_pattern(PatternDecl::new("request")))
}

fn record(session: &mut Session, rule: &str, log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) {
    let log = Rc::clone(log);
    session
        .on_rule(rule, move |_: &RuleMatch| {
            log.borrow_mut().push(tag);
            Ok(vec![])
        })
        .unwrap();
}

#[test]
fn only_the_focused_group_fires() {
    let mut session = Session::build(&staged_ruleset(), &SessionConfig::default()).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    record(&mut session, "rules/validate", &log, "validate");
    record(&mut session, "rules/price", &log, "price");
    record(&mut session, "rules/log", &log, "log");

    let request = session.interner_mut().intern("request");
    session.insert(Fact::new(request)).unwrap();
    assert_eq!(session.pending_activations(), 3);

    // Without focus, only the main group is active
    let outcome = session.fire_all_rules(None).unwrap();
    assert_eq!(outcome.fired, 1);
    assert_eq!(*log.borrow(), vec!["log"]);

    // Staged activations sit untouched until their group gains focus
    assert_eq!(session.pending_activations(), 2);
}

#[test]
fn focus_stack_stages_groups_in_order() {
    let mut session = Session::build(&staged_ruleset(), &SessionConfig::default()).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    record(&mut session, "rules/validate", &log, "validate");
    record(&mut session, "rules/price", &log, "price");
    record(&mut session, "rules/log", &log, "log");

    let request = session.interner_mut().intern("request");
    session.insert(Fact::new(request)).unwrap();

    // Push pricing then validation: validation is on top and fires
    // first; each exhausted group pops to the one below
    session.set_focus("pricing").unwrap();
    session.set_focus("validation").unwrap();

    let outcome = session.fire_all_rules(None).unwrap();
    assert_eq!(outcome.fired, 3);
    assert_eq!(*log.borrow(), vec!["validate", "price", "log"]);
}

#[test]
fn consequences_can_shift_focus() {
    let mut session = Session::build(&staged_ruleset(), &SessionConfig::default()).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    record(&mut session, "rules/validate", &log, "validate");
    record(&mut session, "rules/price", &log, "price");

    // The main-group rule stages validation from inside its firing
    let focus_log = Rc::clone(&log);
    session
        .on_rule("rules/log", move |_: &RuleMatch| {
            focus_log.borrow_mut().push("log");
            Ok(vec![Effect::SetFocus("validation".to_string())])
        })
        .unwrap();

    let request = session.interner_mut().intern("request");
    session.insert(Fact::new(request)).unwrap();

    let outcome = session.fire_all_rules(None).unwrap();
    // log fires from main, stages validation, which then drains before
    // main resumes (pricing was never staged)
    assert_eq!(outcome.fired, 2);
    assert_eq!(*log.borrow(), vec!["log", "validate"]);
    assert_eq!(session.pending_activations(), 1);
}
