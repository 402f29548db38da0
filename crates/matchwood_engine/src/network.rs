//! The incremental matching network.
//!
//! A directed acyclic graph of alpha, join, and terminal nodes whose
//! memories stay synchronized with working memory across inserts,
//! updates, and retracts. Propagation is depth-first in topological
//! order: all effects of one fact event complete before the next queued
//! event is processed. The network never fires anything itself — terminal
//! arrivals come back to the caller as [`MatchEvent`]s and the session
//! applies them to the agenda, so firing is always deferred to the
//! agenda's own loop.

use std::collections::HashMap;

use matchwood_foundation::{Error, FactHandle, KeywordId, Result, Value};
use matchwood_store::{Fact, FactStore, PropagationEvent};

use crate::agenda::{Activation, ActivationId};
use crate::join::JoinTest;
use crate::node::{ActivationState, Node, NodeId, Side, Successor};
use crate::tms::FiringKey;
use crate::token::{TokenArena, TokenId};

// =============================================================================
// Rules
// =============================================================================

/// Index of a rule in the network's rule table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// Returns the raw index of this rule.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Compile-time metadata for one rule.
#[derive(Clone, Debug)]
pub struct RuleInfo {
    /// Interned rule name.
    pub name: KeywordId,
    /// Priority; higher fires first.
    pub salience: i32,
    /// Agenda group membership.
    pub group: KeywordId,
    /// Position in the rule set (declaration order).
    pub declaration: u32,
    /// The rule's terminal node.
    pub terminal: NodeId,
}

// =============================================================================
// Match Events
// =============================================================================

/// Agenda-relevant outcome of a propagation, applied by the session.
#[derive(Clone, Debug)]
pub enum MatchEvent {
    /// A terminal received a complete token: queue this activation.
    Activated(Activation),
    /// A pending activation's token died: cancel it.
    Cancelled {
        /// The activation to cancel.
        activation: ActivationId,
        /// The rule it belonged to.
        rule: RuleId,
        /// The dead token.
        token: TokenId,
    },
    /// A *fired* activation's token died: withdraw the firing's logical
    /// justifications.
    FiringUndone {
        /// The firing whose support disappeared.
        key: FiringKey,
    },
}

// =============================================================================
// Network
// =============================================================================

/// Propagation work item. The explicit stack keeps traversal depth-first
/// without recursive `&mut` borrows of the node table.
#[derive(Copy, Clone, Debug)]
enum Work {
    /// A token arriving at a join's left input or a terminal.
    Token { node: NodeId, token: TokenId },
    /// A fact arriving at a join's right input.
    RightFact { node: NodeId, fact: FactHandle },
}

/// Data extracted from a token-receiving node before propagation
/// re-borrows the node table.
enum TokenReceiver {
    Join {
        tests: Vec<JoinTest>,
        indexed: Option<JoinTest>,
        right_input: NodeId,
        successors: Vec<NodeId>,
    },
    Terminal {
        rule: RuleId,
    },
}

/// The matching network: immutable topology plus mutable node memories.
#[derive(Clone, Debug, Default)]
pub struct ReteNetwork {
    /// Node table; `NodeId` indexes into it.
    nodes: Vec<Node>,
    /// Alpha nodes per fact type, in build order.
    type_dispatch: HashMap<KeywordId, Vec<NodeId>>,
    /// Live partial matches.
    tokens: TokenArena,
    /// Tokens whose own bound fact is the key. A fact's full token
    /// footprint is the union of these subtrees.
    tokens_by_fact: HashMap<FactHandle, Vec<TokenId>>,
    /// Rule table; `RuleId` indexes into it.
    rules: Vec<RuleInfo>,
    /// Next activation id; doubles as the recency stamp.
    next_activation: u64,
}

impl ReteNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction (used by the builder)
    // =========================================================================

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn push_rule(&mut self, info: RuleInfo) -> RuleId {
        #[allow(clippy::cast_possible_truncation)]
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(info);
        id
    }

    pub(crate) fn register_type(&mut self, fact_type: KeywordId, alpha: NodeId) {
        self.type_dispatch.entry(fact_type).or_default().push(alpha);
    }

    pub(crate) fn set_rule_terminal(&mut self, rule: RuleId, terminal: NodeId) -> Result<()> {
        let info = self
            .rules
            .get_mut(rule.0 as usize)
            .ok_or_else(|| Error::consistency(format!("unknown {rule:?}")))?;
        info.terminal = terminal;
        Ok(())
    }

    pub(crate) fn add_alpha_successor(&mut self, alpha: NodeId, successor: Successor) -> Result<()> {
        match self.node_mut(alpha)? {
            Node::Alpha(node) => {
                node.successors.push(successor);
                Ok(())
            }
            _ => Err(Error::consistency(format!("{alpha:?} is not an alpha node"))),
        }
    }

    pub(crate) fn add_join_successor(&mut self, join: NodeId, successor: NodeId) -> Result<()> {
        match self.node_mut(join)? {
            Node::Join(node) => {
                node.successors.push(successor);
                Ok(())
            }
            _ => Err(Error::consistency(format!("{join:?} is not a join node"))),
        }
    }

    pub(crate) fn register_alpha_index(&mut self, alpha: NodeId, field: KeywordId) -> Result<()> {
        match self.node_mut(alpha)? {
            Node::Alpha(node) => {
                node.memory.register_index(field);
                Ok(())
            }
            _ => Err(Error::consistency(format!("{alpha:?} is not an alpha node"))),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Gets a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Number of nodes in the network.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The rule table in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules
    }

    /// Gets rule metadata.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&RuleInfo> {
        self.rules.get(id.0 as usize)
    }

    /// Looks up a rule by interned name.
    #[must_use]
    pub fn rule_by_name(&self, name: KeywordId) -> Option<RuleId> {
        #[allow(clippy::cast_possible_truncation)]
        self.rules
            .iter()
            .position(|r| r.name == name)
            .map(|i| RuleId(i as u32))
    }

    /// Number of live tokens (partial and complete matches).
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// The fact chain bound by a token, first pattern first.
    ///
    /// # Errors
    /// Returns a `Consistency` error if the chain is broken.
    pub fn token_chain(&self, token: TokenId) -> Result<Vec<FactHandle>> {
        self.tokens.chain(token)
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Propagates one working-memory event through the network.
    ///
    /// All effects of the event complete before this returns; the caller
    /// applies the returned match events to the agenda before processing
    /// the next queued event.
    ///
    /// # Errors
    /// Returns a `Consistency` error if a node memory has desynchronized
    /// from working memory. Such an error is fatal for the session.
    pub fn handle_event(
        &mut self,
        store: &FactStore,
        event: &PropagationEvent,
    ) -> Result<Vec<MatchEvent>> {
        let mut events = Vec::new();
        match event {
            PropagationEvent::Inserted { handle, fact } => {
                self.insert_fact(store, *handle, fact, &mut events)?;
            }
            PropagationEvent::Retracted { handle, fact } => {
                self.retract_fact(*handle, fact, &mut events)?;
            }
            PropagationEvent::Updated { handle, old, new } => {
                // Update is retract+reinsert for matching, with identity
                // preserved by reusing the handle
                self.retract_fact(*handle, old, &mut events)?;
                self.insert_fact(store, *handle, new, &mut events)?;
            }
        }
        Ok(events)
    }

    /// Marks a popped activation as fired so later token death routes to
    /// truth maintenance instead of cancellation.
    ///
    /// # Errors
    /// Returns a `Consistency` error if the terminal does not know the
    /// activation's token, or it already fired.
    pub fn mark_fired(&mut self, activation: &Activation) -> Result<()> {
        let terminal = match self.node_mut(activation.terminal)? {
            Node::Terminal(node) => node,
            _ => {
                return Err(Error::consistency(format!(
                    "{:?} is not a terminal node",
                    activation.terminal
                )));
            }
        };
        match terminal.memory.get_mut(&activation.token) {
            Some(state @ ActivationState::Pending(_)) => {
                *state = ActivationState::Fired;
                Ok(())
            }
            Some(ActivationState::Fired) => Err(Error::consistency(format!(
                "token {:?} fired twice for rule {:?}",
                activation.token, activation.rule
            ))),
            None => Err(Error::consistency(format!(
                "fired token {:?} unknown to its terminal",
                activation.token
            ))),
        }
    }

    fn insert_fact(
        &mut self,
        store: &FactStore,
        handle: FactHandle,
        fact: &Fact,
        events: &mut Vec<MatchEvent>,
    ) -> Result<()> {
        let alphas = self
            .type_dispatch
            .get(&fact.fact_type)
            .cloned()
            .unwrap_or_default();

        let mut stack: Vec<Work> = Vec::new();
        for alpha_id in alphas {
            let successors = {
                let alpha = self.alpha_mut(alpha_id)?;
                if !alpha.matches(fact) {
                    continue;
                }
                alpha.memory.add(handle, fact);
                alpha.successors.clone()
            };

            // One unit token per alpha arrival, shared by every rule
            // chain starting at this alpha
            let unit = if successors.iter().any(|s| s.side == Side::Left) {
                Some(self.make_token(None, handle, alpha_id))
            } else {
                None
            };

            for succ in successors.iter().rev() {
                let work = match succ.side {
                    Side::Left => Work::Token {
                        node: succ.node,
                        token: unit.ok_or_else(|| {
                            Error::consistency("left edge without a unit token")
                        })?,
                    },
                    Side::Right => Work::RightFact {
                        node: succ.node,
                        fact: handle,
                    },
                };
                stack.push(work);
            }

            // Depth-first: finish this alpha's downstream effects before
            // the next alpha sees the fact
            self.drain(store, &mut stack, events)?;
        }
        Ok(())
    }

    fn retract_fact(
        &mut self,
        handle: FactHandle,
        fact: &Fact,
        events: &mut Vec<MatchEvent>,
    ) -> Result<()> {
        let alphas = self
            .type_dispatch
            .get(&fact.fact_type)
            .cloned()
            .unwrap_or_default();
        for alpha_id in alphas {
            self.alpha_mut(alpha_id)?.memory.remove(handle);
        }

        // Every token transitively containing the fact lives in the
        // subtree of some token directly bound to it
        let roots = self.tokens_by_fact.remove(&handle).unwrap_or_default();
        for root in roots {
            self.remove_token_tree(root, events)?;
        }
        Ok(())
    }

    fn drain(
        &mut self,
        store: &FactStore,
        stack: &mut Vec<Work>,
        events: &mut Vec<MatchEvent>,
    ) -> Result<()> {
        while let Some(work) = stack.pop() {
            match work {
                Work::Token { node, token } => self.deliver_token(store, node, token, stack, events)?,
                Work::RightFact { node, fact } => {
                    self.deliver_right(store, node, fact, stack)?;
                }
            }
        }
        Ok(())
    }

    /// A token arrives at a join's left input or at a terminal.
    fn deliver_token(
        &mut self,
        store: &FactStore,
        node_id: NodeId,
        token: TokenId,
        stack: &mut Vec<Work>,
        events: &mut Vec<MatchEvent>,
    ) -> Result<()> {
        // Extract what propagation needs up front; the node table is
        // re-borrowed mutably below
        let receiver = match self.node_ref(node_id)? {
            Node::Join(join) => TokenReceiver::Join {
                tests: join.tests.clone(),
                indexed: join.indexed_test().cloned(),
                right_input: join.right_input,
                successors: join.successors.clone(),
            },
            Node::Terminal(terminal) => TokenReceiver::Terminal {
                rule: terminal.rule,
            },
            Node::Alpha(_) => {
                return Err(Error::consistency(format!(
                    "token delivered to alpha node {node_id:?}"
                )));
            }
        };

        match receiver {
            TokenReceiver::Join {
                tests,
                indexed,
                right_input,
                successors,
            } => {
                // Key under the indexed test, remembered for removal
                let key = match &indexed {
                    Some(test) => Some(self.left_key(store, token, test)?),
                    None => None,
                };

                if let Node::Join(join) = self.node_mut(node_id)? {
                    join.left_memory.add(token, key.clone());
                }

                // Candidate right facts: index lookup when possible,
                // ordered scan otherwise
                let candidates: Vec<FactHandle> = {
                    let alpha = self.alpha_ref(right_input)?;
                    match (&indexed, &key) {
                        (Some(test), Some(key)) => alpha
                            .memory
                            .candidates(test.right_field, key)
                            .map_or_else(|| alpha.memory.all().to_vec(), <[FactHandle]>::to_vec),
                        _ => alpha.memory.all().to_vec(),
                    }
                };

                for right in candidates {
                    if self.join_accepts(store, &tests, token, right)? {
                        if let Some(child) = self.emit_child(token, right, node_id) {
                            for succ in successors.iter().rev() {
                                stack.push(Work::Token {
                                    node: *succ,
                                    token: child,
                                });
                            }
                        }
                    }
                }
                Ok(())
            }
            TokenReceiver::Terminal { rule } => {
                let activation = self.mint_activation(rule, node_id, token)?;
                if let Node::Terminal(terminal) = self.node_mut(node_id)? {
                    terminal
                        .memory
                        .insert(token, ActivationState::Pending(activation.id));
                }
                events.push(MatchEvent::Activated(activation));
                Ok(())
            }
        }
    }

    /// A fact arrives at a join's right input.
    fn deliver_right(
        &mut self,
        store: &FactStore,
        node_id: NodeId,
        handle: FactHandle,
        stack: &mut Vec<Work>,
    ) -> Result<()> {
        let join = match self.node_ref(node_id)? {
            Node::Join(join) => join,
            _ => {
                return Err(Error::consistency(format!(
                    "right fact delivered to non-join {node_id:?}"
                )));
            }
        };
        let tests = join.tests.clone();
        let indexed = join.indexed_test().cloned();
        let successors = join.successors.clone();

        let fact = store
            .get(handle)
            .ok_or_else(|| Error::consistency(format!("right input {handle:?} not in store")))?;

        let candidates: Vec<TokenId> = match self.node_ref(node_id)? {
            Node::Join(join) => match &indexed {
                Some(test) => {
                    let key = fact.get(test.right_field).cloned().unwrap_or(Value::Nil);
                    join.left_memory.candidates(&key).to_vec()
                }
                None => join.left_memory.all().to_vec(),
            },
            _ => unreachable!("node kind checked above"),
        };

        for token in candidates {
            if self.join_accepts(store, &tests, token, handle)? {
                if let Some(child) = self.emit_child(token, handle, node_id) {
                    for succ in successors.iter().rev() {
                        stack.push(Work::Token {
                            node: *succ,
                            token: child,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates all join tests between a left token chain and a right
    /// fact.
    fn join_accepts(
        &self,
        store: &FactStore,
        tests: &[JoinTest],
        token: TokenId,
        right: FactHandle,
    ) -> Result<bool> {
        let right_fact = store
            .get(right)
            .ok_or_else(|| Error::consistency(format!("join candidate {right:?} not in store")))?;

        for test in tests {
            let left_handle = self.tokens.fact_at(token, test.left_pattern)?;
            let left_fact = store.get(left_handle).ok_or_else(|| {
                Error::consistency(format!("token fact {left_handle:?} not in store"))
            })?;

            let lhs = left_fact.get(test.left_field).cloned().unwrap_or(Value::Nil);
            let rhs = right_fact
                .get(test.right_field)
                .cloned()
                .unwrap_or(Value::Nil);
            if !test.op.eval(&lhs, &rhs) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Extracts the left key of an indexed join test from a token chain.
    fn left_key(&self, store: &FactStore, token: TokenId, test: &JoinTest) -> Result<Value> {
        let handle = self.tokens.fact_at(token, test.left_pattern)?;
        let fact = store
            .get(handle)
            .ok_or_else(|| Error::consistency(format!("token fact {handle:?} not in store")))?;
        Ok(fact.get(test.left_field).cloned().unwrap_or(Value::Nil))
    }

    /// Creates a join child unless an identical one already exists (one
    /// fact arriving on both sides of a self-join would pair with itself
    /// twice, once per delivery side).
    fn emit_child(&mut self, parent: TokenId, fact: FactHandle, node: NodeId) -> Option<TokenId> {
        if self.tokens.has_child(parent, fact, node) {
            return None;
        }
        Some(self.make_token(Some(parent), fact, node))
    }

    fn make_token(&mut self, parent: Option<TokenId>, fact: FactHandle, node: NodeId) -> TokenId {
        let token = self.tokens.create(parent, fact, node);
        self.tokens_by_fact.entry(fact).or_default().push(token);
        token
    }

    /// Removes a token subtree, cleaning every memory that held any of
    /// its tokens and reporting terminal-level consequences.
    fn remove_token_tree(&mut self, root: TokenId, events: &mut Vec<MatchEvent>) -> Result<()> {
        let removed = self.tokens.remove_subtree(root);
        for (token_id, token) in removed {
            if let Some(list) = self.tokens_by_fact.get_mut(&token.fact) {
                list.retain(|&t| t != token_id);
                if list.is_empty() {
                    self.tokens_by_fact.remove(&token.fact);
                }
            }

            let receivers: Vec<NodeId> = match self.node_ref(token.node)? {
                Node::Alpha(alpha) => alpha
                    .successors
                    .iter()
                    .filter(|s| s.side == Side::Left)
                    .map(|s| s.node)
                    .collect(),
                Node::Join(join) => join.successors.clone(),
                Node::Terminal(_) => {
                    return Err(Error::consistency(format!(
                        "terminal node produced token {token_id:?}"
                    )));
                }
            };

            for receiver in receivers {
                match self.node_mut(receiver)? {
                    Node::Join(join) => join.left_memory.remove(token_id),
                    Node::Terminal(terminal) => {
                        let rule = terminal.rule;
                        if let Some(state) = terminal.memory.remove(&token_id) {
                            match state {
                                ActivationState::Pending(activation) => {
                                    events.push(MatchEvent::Cancelled {
                                        activation,
                                        rule,
                                        token: token_id,
                                    });
                                }
                                ActivationState::Fired => {
                                    events.push(MatchEvent::FiringUndone {
                                        key: FiringKey {
                                            rule,
                                            token: token_id,
                                        },
                                    });
                                }
                            }
                        }
                    }
                    Node::Alpha(_) => {
                        return Err(Error::consistency(format!(
                            "token routed to alpha node {receiver:?}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn mint_activation(&mut self, rule: RuleId, terminal: NodeId, token: TokenId) -> Result<Activation> {
        let info = self
            .rules
            .get(rule.0 as usize)
            .ok_or_else(|| Error::consistency(format!("terminal references unknown {rule:?}")))?;
        let id = ActivationId(self.next_activation);
        self.next_activation += 1;
        Ok(Activation {
            id,
            rule,
            rule_name: info.name,
            terminal,
            token,
            salience: info.salience,
            group: info.group,
            declaration: info.declaration,
        })
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or_else(|| Error::consistency(format!("unknown node {id:?}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::consistency(format!("unknown node {id:?}")))
    }

    fn alpha_ref(&self, id: NodeId) -> Result<&crate::alpha::AlphaNode> {
        match self.node_ref(id)? {
            Node::Alpha(alpha) => Ok(alpha),
            _ => Err(Error::consistency(format!("{id:?} is not an alpha node"))),
        }
    }

    fn alpha_mut(&mut self, id: NodeId) -> Result<&mut crate::alpha::AlphaNode> {
        match self.node_mut(id)? {
            Node::Alpha(alpha) => Ok(alpha),
            _ => Err(Error::consistency(format!("{id:?} is not an alpha node"))),
        }
    }
}
