//! Integration tests for beta-node joins.

use matchwood_engine::{
    CmpOp, MatchEvent, NetworkBuilder, PatternDecl, ReteNetwork, RuleDecl, RuleSet, TestDecl,
    TypeDecl, TypeTag,
};
use matchwood_foundation::{FactHandle, KeywordId};
use matchwood_store::{Fact, FactStore, IdentityMode};

fn join_ruleset(op: CmpOp) -> RuleSet {
    RuleSet::new()
        .with_type(TypeDecl::new("customer").with_field("id", TypeTag::Int))
        .with_type(
            TypeDecl::new("order")
                .with_field("customer", TypeTag::Int)
                .with_field("amount", TypeTag::Int),
        )
        .with_rule(
            RuleDecl::new("rules/pair")
                .with_pattern(PatternDecl::new("customer"))
                .with_pattern(
                    PatternDecl::new("order").with_test(TestDecl::join("customer", op, 0, "id")),
                ),
        )
}

struct Harness {
    store: FactStore,
    network: ReteNetwork,
    customer: KeywordId,
    order: KeywordId,
    id: KeywordId,
    customer_field: KeywordId,
    amount: KeywordId,
}

impl Harness {
    fn new(op: CmpOp) -> Self {
        let mut compiled = NetworkBuilder::build(&join_ruleset(op)).unwrap();
        let customer = compiled.interner.intern("customer");
        let order = compiled.interner.intern("order");
        let id = compiled.interner.intern("id");
        let customer_field = customer;
        let amount = compiled.interner.intern("amount");
        Self {
            store: FactStore::new(compiled.registry, IdentityMode::Distinct),
            network: compiled.network,
            customer,
            order,
            id,
            customer_field,
            amount,
        }
    }

    fn insert_customer(&mut self, id: i64) -> (FactHandle, Vec<MatchEvent>) {
        let fact = Fact::new(self.customer).with_field(self.id, id);
        let handle = self.store.insert(fact).unwrap();
        (handle, self.pump())
    }

    fn insert_order(&mut self, customer: i64, amount: i64) -> (FactHandle, Vec<MatchEvent>) {
        let fact = Fact::new(self.order)
            .with_field(self.customer_field, customer)
            .with_field(self.amount, amount);
        let handle = self.store.insert(fact).unwrap();
        (handle, self.pump())
    }

    fn retract(&mut self, handle: FactHandle) -> Vec<MatchEvent> {
        self.store.retract(handle).unwrap();
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

fn activations(events: &[MatchEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, MatchEvent::Activated(_)))
        .count()
}

#[test]
fn equality_join_pairs_matching_facts() {
    let mut harness = Harness::new(CmpOp::Eq);

    harness.insert_customer(1);
    let (_, events) = harness.insert_order(1, 10);
    assert_eq!(activations(&events), 1);

    // An order for an absent customer joins nothing
    let (_, events) = harness.insert_order(2, 10);
    assert_eq!(activations(&events), 0);
}

#[test]
fn join_works_from_either_arrival_order() {
    let mut harness = Harness::new(CmpOp::Eq);

    // Right side first
    let (_, events) = harness.insert_order(1, 10);
    assert_eq!(activations(&events), 0);

    // Left side arrives and finds the waiting order
    let (_, events) = harness.insert_customer(1);
    assert_eq!(activations(&events), 1);
}

#[test]
fn one_customer_pairs_with_every_matching_order() {
    let mut harness = Harness::new(CmpOp::Eq);

    harness.insert_order(1, 10);
    harness.insert_order(1, 20);
    harness.insert_order(2, 30);

    let (_, events) = harness.insert_customer(1);
    assert_eq!(activations(&events), 2);
    // One unit token for the customer plus one pair token per match
    assert_eq!(harness.network.token_count(), 3);
}

#[test]
fn retracting_the_left_fact_cancels_all_pairs() {
    let mut harness = Harness::new(CmpOp::Eq);

    let (customer, _) = harness.insert_customer(1);
    harness.insert_order(1, 10);
    harness.insert_order(1, 20);

    let events = harness.retract(customer);
    let cancelled = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::Cancelled { .. }))
        .count();
    assert_eq!(cancelled, 2);
    // The customer's whole token subtree died
    assert_eq!(harness.network.token_count(), 0);
}

#[test]
fn retracting_the_right_fact_cancels_only_its_pair() {
    let mut harness = Harness::new(CmpOp::Eq);

    harness.insert_customer(1);
    let (order, _) = harness.insert_order(1, 10);
    harness.insert_order(1, 20);

    let events = harness.retract(order);
    let cancelled = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::Cancelled { .. }))
        .count();
    assert_eq!(cancelled, 1);
}

#[test]
fn three_pattern_chains_cascade_transitively() {
    // customer -> order -> shipment, joined by equality at each step
    let ruleset = RuleSet::new()
        .with_type(TypeDecl::new("customer").with_field("id", TypeTag::Int))
        .with_type(TypeDecl::new("order").with_field("customer", TypeTag::Int))
        .with_type(TypeDecl::new("shipment").with_field("order_customer", TypeTag::Int))
        .with_rule(
            RuleDecl::new("rules/chain")
                .with_pattern(PatternDecl::new("customer"))
                .with_pattern(
                    PatternDecl::new("order").with_test(TestDecl::join(
                        "customer",
                        CmpOp::Eq,
                        0,
                        "id",
                    )),
                )
                .with_pattern(
                    PatternDecl::new("shipment").with_test(TestDecl::join(
                        "order_customer",
                        CmpOp::Eq,
                        1,
                        "customer",
                    )),
                ),
        );

    let mut compiled = NetworkBuilder::build(&ruleset).unwrap();
    let customer = compiled.interner.intern("customer");
    let order = compiled.interner.intern("order");
    let shipment = compiled.interner.intern("shipment");
    let id = compiled.interner.intern("id");
    let order_customer = compiled.interner.intern("order_customer");
    let mut store = FactStore::new(compiled.registry, IdentityMode::Distinct);

    let pump = |store: &mut FactStore, network: &mut ReteNetwork| {
        let mut events = Vec::new();
        while let Some(event) = store.pop_event() {
            events.extend(network.handle_event(store, &event).unwrap());
        }
        events
    };

    let root = store.insert(Fact::new(customer).with_field(id, 1i64)).unwrap();
    store.insert(Fact::new(order).with_field(customer, 1i64)).unwrap();
    store
        .insert(Fact::new(shipment).with_field(order_customer, 1i64))
        .unwrap();

    let events = pump(&mut store, &mut compiled.network);
    assert_eq!(activations(&events), 1);
    // unit + pair + triple
    assert_eq!(compiled.network.token_count(), 3);

    // Retracting the root fact removes every token that transitively
    // contains it, cancelling the complete match
    store.retract(root).unwrap();
    let events = pump(&mut store, &mut compiled.network);
    let cancelled = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::Cancelled { .. }))
        .count();
    assert_eq!(cancelled, 1);
    assert_eq!(compiled.network.token_count(), 0);
}

#[test]
fn ordering_joins_use_the_scan_path() {
    // customer.id < order.customer, no equality test to index on
    let mut harness = Harness::new(CmpOp::Gt);

    harness.insert_customer(5);
    let (_, events) = harness.insert_order(10, 1);
    assert_eq!(activations(&events), 1);

    let (_, events) = harness.insert_order(3, 1);
    assert_eq!(activations(&events), 0);
}
