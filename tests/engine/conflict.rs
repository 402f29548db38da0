//! Integration tests for conflict resolution over network output.

use matchwood_engine::{
    Agenda, CmpOp, ConflictConfig, LiteralDecl, MatchEvent, NetworkBuilder, PatternDecl,
    RecencyOrder, ReteNetwork, RuleDecl, RuleSet, TestDecl, TieBreak, TypeDecl, TypeTag,
};
use matchwood_foundation::Interner;
use matchwood_store::{Fact, FactStore, IdentityMode};

/// Three rules on one fact type: a high-salience one, and two
/// equal-salience ones distinguished by declaration order.
fn ruleset() -> RuleSet {
    let pattern = || {
        PatternDecl::new("ticket").with_test(TestDecl::literal(
            "severity",
            CmpOp::Ge,
            LiteralDecl::Int(1),
        ))
    };
    RuleSet::new()
        .with_type(TypeDecl::new("ticket").with_field("severity", TypeTag::Int))
        .with_rule(
            RuleDecl::new("rules/page-oncall")
                .with_salience(100)
                .with_pattern(pattern()),
        )
        .with_rule(RuleDecl::new("rules/notify").with_pattern(pattern()))
        .with_rule(RuleDecl::new("rules/archive").with_pattern(pattern()))
}

struct Harness {
    store: FactStore,
    network: ReteNetwork,
    agenda: Agenda,
    interner: Interner,
}

impl Harness {
    fn new(config: ConflictConfig) -> Self {
        let compiled = NetworkBuilder::build(&ruleset()).unwrap();
        Self {
            store: FactStore::new(compiled.registry, IdentityMode::Distinct),
            network: compiled.network,
            agenda: Agenda::new(config),
            interner: compiled.interner,
        }
    }

    fn insert_ticket(&mut self, severity: i64) {
        let ticket = self.interner.intern("ticket");
        let severity_kw = self.interner.intern("severity");
        self.store
            .insert(Fact::new(ticket).with_field(severity_kw, severity))
            .unwrap();
        self.pump();
    }

    fn pump(&mut self) {
        while let Some(event) = self.store.pop_event() {
            for match_event in self.network.handle_event(&self.store, &event).unwrap() {
                match match_event {
                    MatchEvent::Activated(activation) => self.agenda.add(activation),
                    MatchEvent::Cancelled { activation, .. } => {
                        self.agenda.cancel(activation);
                    }
                    MatchEvent::FiringUndone { .. } => {}
                }
            }
        }
    }

    fn fired_rule_names(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(activation) = self.agenda.fire_next() {
            names.push(
                self.interner
                    .resolve(activation.rule_name)
                    .unwrap()
                    .to_string(),
            );
        }
        names
    }
}

#[test]
fn salience_fires_before_declaration_order() {
    let mut harness = Harness::new(ConflictConfig::default());
    harness.insert_ticket(3);

    let names = harness.fired_rule_names();
    assert_eq!(
        names,
        vec!["rules/page-oncall", "rules/notify", "rules/archive"]
    );
}

#[test]
fn equal_salience_breaks_ties_by_declaration_by_default() {
    let mut harness = Harness::new(ConflictConfig::default());
    harness.insert_ticket(1);
    harness.insert_ticket(2);

    let names = harness.fired_rule_names();
    // Both tickets page first (salience), then notify handles both
    // (declaration), LIFO recency within each rule
    assert_eq!(
        names,
        vec![
            "rules/page-oncall",
            "rules/page-oncall",
            "rules/notify",
            "rules/notify",
            "rules/archive",
            "rules/archive",
        ]
    );
}

#[test]
fn recency_tiebreak_interleaves_rules() {
    let config = ConflictConfig::new().with_tie_break(TieBreak::Recency);
    let mut harness = Harness::new(config);
    harness.insert_ticket(1);
    harness.insert_ticket(2);

    let names = harness.fired_rule_names();
    // Salience still wins overall; below it the most recent activation
    // fires first regardless of which rule produced it
    assert_eq!(names[0], "rules/page-oncall");
    assert_eq!(names[1], "rules/page-oncall");
    // The second ticket's notify/archive activations are more recent
    // than the first ticket's
    assert_eq!(names[2], "rules/archive");
    assert_eq!(names[3], "rules/notify");
    assert_eq!(names[4], "rules/archive");
    assert_eq!(names[5], "rules/notify");
}

#[test]
fn fifo_recency_fires_oldest_first() {
    let config = ConflictConfig::new()
        .with_recency(RecencyOrder::Fifo)
        .with_tie_break(TieBreak::Recency);
    let mut harness = Harness::new(config);
    harness.insert_ticket(1);
    harness.insert_ticket(2);

    let names = harness.fired_rule_names();
    assert_eq!(names[0], "rules/page-oncall");
    assert_eq!(names[1], "rules/page-oncall");
    // Oldest activation below the salience band: first ticket's notify
    assert_eq!(names[2], "rules/notify");
    assert_eq!(names[3], "rules/archive");
}

#[test]
fn replay_is_deterministic() {
    let run = || {
        let mut harness = Harness::new(ConflictConfig::default());
        harness.insert_ticket(2);
        harness.insert_ticket(7);
        harness.insert_ticket(4);
        harness.fired_rule_names()
    };
    assert_eq!(run(), run());
}
