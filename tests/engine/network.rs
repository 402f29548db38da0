//! Integration tests for single-pattern network propagation.

use matchwood_engine::{
    CmpOp, LiteralDecl, MatchEvent, NetworkBuilder, PatternDecl, RuleDecl, RuleSet, TestDecl,
    TypeDecl, TypeTag,
};
use matchwood_foundation::{FactHandle, KeywordId};
use matchwood_store::{Fact, FactStore, IdentityMode};

fn ruleset() -> RuleSet {
    RuleSet::new()
        .with_type(TypeDecl::new("order").with_field("amount", TypeTag::Int))
        .with_rule(
            RuleDecl::new("rules/big").with_pattern(PatternDecl::new("order").with_test(
                TestDecl::literal("amount", CmpOp::Gt, LiteralDecl::Int(10)),
            )),
        )
}

struct Harness {
    store: FactStore,
    network: matchwood_engine::ReteNetwork,
    order: KeywordId,
    amount: KeywordId,
}

impl Harness {
    fn new() -> Self {
        let mut compiled = NetworkBuilder::build(&ruleset()).unwrap();
        let order = compiled.interner.intern("order");
        let amount = compiled.interner.intern("amount");
        Self {
            store: FactStore::new(compiled.registry, IdentityMode::Distinct),
            network: compiled.network,
            order,
            amount,
        }
    }

    fn insert(&mut self, amount: i64) -> (FactHandle, Vec<MatchEvent>) {
        let fact = Fact::new(self.order).with_field(self.amount, amount);
        let handle = self.store.insert(fact).unwrap();
        (handle, self.pump())
    }

    fn retract(&mut self, handle: FactHandle) -> Vec<MatchEvent> {
        self.store.retract(handle).unwrap();
        self.pump()
    }

    fn update(&mut self, handle: FactHandle, amount: i64) -> Vec<MatchEvent> {
        let fact = Fact::new(self.order).with_field(self.amount, amount);
        self.store.update(handle, fact).unwrap();
        self.pump()
    }

    fn pump(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.store.pop_event() {
            events.extend(self.network.handle_event(&self.store, &event).unwrap());
        }
        events
    }
}

#[test]
fn matching_insert_activates() {
    let mut harness = Harness::new();

    let (_, events) = harness.insert(50);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], MatchEvent::Activated(_)));
    assert_eq!(harness.network.token_count(), 1);
}

#[test]
fn non_matching_insert_is_silent() {
    let mut harness = Harness::new();

    let (_, events) = harness.insert(3);
    assert!(events.is_empty());
    assert_eq!(harness.network.token_count(), 0);
}

#[test]
fn retraction_cancels_the_pending_activation() {
    let mut harness = Harness::new();

    let (handle, events) = harness.insert(50);
    let MatchEvent::Activated(activation) = &events[0] else {
        panic!("expected activation");
    };
    let id = activation.id;

    let events = harness.retract(handle);
    assert_eq!(events.len(), 1);
    match &events[0] {
        MatchEvent::Cancelled { activation, .. } => assert_eq!(*activation, id),
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(harness.network.token_count(), 0);
}

#[test]
fn retraction_leaves_unrelated_activations() {
    let mut harness = Harness::new();

    let (h1, _) = harness.insert(50);
    let (_h2, _) = harness.insert(60);

    let events = harness.retract(h1);
    assert_eq!(events.len(), 1);
    assert_eq!(harness.network.token_count(), 1);
}

#[test]
fn update_across_the_constraint_boundary() {
    let mut harness = Harness::new();

    // Below the threshold: no activation
    let (handle, events) = harness.insert(5);
    assert!(events.is_empty());

    // Crossing up: activation appears
    let events = harness.update(handle, 50);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], MatchEvent::Activated(_)));

    // Crossing back down: it cancels
    let events = harness.update(handle, 5);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], MatchEvent::Cancelled { .. }));
}

#[test]
fn update_within_the_match_reactivates() {
    let mut harness = Harness::new();

    let (handle, _) = harness.insert(50);
    // Still matching after the update: the old activation dies and a
    // fresh one (new token) replaces it
    let events = harness.update(handle, 60);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], MatchEvent::Cancelled { .. }));
    assert!(matches!(events[1], MatchEvent::Activated(_)));
}

#[test]
fn activation_recency_is_monotonic() {
    let mut harness = Harness::new();

    let (_, first) = harness.insert(20);
    let (_, second) = harness.insert(30);

    let MatchEvent::Activated(a) = &first[0] else {
        panic!()
    };
    let MatchEvent::Activated(b) = &second[0] else {
        panic!()
    };
    assert!(b.id > a.id);
}
