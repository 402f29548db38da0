//! Beta (join) nodes: pairing a left token stream with a right fact
//! stream under a set of inter-pattern tests.

use std::collections::HashMap;

use matchwood_foundation::{KeywordId, Value};

use crate::alpha::CmpOp;
use crate::node::NodeId;
use crate::token::TokenId;

// =============================================================================
// Join Tests
// =============================================================================

/// A test between a field of an earlier-bound fact and a field of the
/// join's right-input fact.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinTest {
    /// Which pattern of the chain supplies the left operand (0-based).
    pub left_pattern: usize,
    /// Field of the left fact.
    pub left_field: KeywordId,
    /// The comparison operator.
    pub op: CmpOp,
    /// Field of the right fact.
    pub right_field: KeywordId,
}

// =============================================================================
// Left Memory
// =============================================================================

/// Memory of tokens that arrived on a join's left input.
///
/// Tokens are kept in arrival order; when the join has an equality test,
/// they are additionally hash-indexed by that test's left key. Keys are
/// remembered per token so removal never recomputes them against a store
/// that has already moved on.
#[derive(Clone, Debug, Default)]
pub struct LeftMemory {
    tokens: Vec<TokenId>,
    buckets: HashMap<Value, Vec<TokenId>>,
    key_of: HashMap<TokenId, Value>,
}

impl LeftMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token, indexed under `key` when the join is indexed.
    pub fn add(&mut self, token: TokenId, key: Option<Value>) {
        self.tokens.push(token);
        if let Some(key) = key {
            self.buckets.entry(key.clone()).or_default().push(token);
            self.key_of.insert(token, key);
        }
    }

    /// Removes a token. No-op if absent.
    pub fn remove(&mut self, token: TokenId) {
        self.tokens.retain(|&t| t != token);
        if let Some(key) = self.key_of.remove(&token) {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.retain(|&t| t != token);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
        }
    }

    /// Index candidates for a key.
    #[must_use]
    pub fn candidates(&self, key: &Value) -> &[TokenId] {
        self.buckets.get(key).map_or(&[], Vec::as_slice)
    }

    /// All tokens in arrival order.
    #[must_use]
    pub fn all(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Returns true if the token is present.
    #[must_use]
    pub fn contains(&self, token: TokenId) -> bool {
        self.tokens.contains(&token)
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the memory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// =============================================================================
// Join Node
// =============================================================================

/// A beta node joining partial matches with right-input facts.
///
/// The right memory lives in the right-input alpha node (shared with
/// every other join fed by it); only the left token memory is local.
#[derive(Clone, Debug)]
pub struct JoinNode {
    /// Pattern position this join binds (depth in the chain, 1-based
    /// since position 0 is the unit-token pattern).
    pub position: usize,
    /// The alpha node supplying right-input facts.
    pub right_input: NodeId,
    /// Inter-pattern tests, all of which must pass.
    pub tests: Vec<JoinTest>,
    /// Index into `tests` of the equality test backing the hash indexes,
    /// if any. Chosen by the builder (first `Eq` test wins).
    pub indexed: Option<usize>,
    /// Tokens that arrived on the left input.
    pub left_memory: LeftMemory,
    /// Downstream token receivers (joins or the terminal).
    pub successors: Vec<NodeId>,
}

impl JoinNode {
    /// Creates a join with no successors yet.
    #[must_use]
    pub fn new(position: usize, right_input: NodeId, tests: Vec<JoinTest>) -> Self {
        let indexed = tests.iter().position(|t| t.op == CmpOp::Eq);
        Self {
            position,
            right_input,
            tests,
            indexed,
            left_memory: LeftMemory::new(),
            successors: Vec::new(),
        }
    }

    /// The indexed test, if the join is hash-indexed.
    #[must_use]
    pub fn indexed_test(&self) -> Option<&JoinTest> {
        self.indexed.map(|i| &self.tests[i])
    }
}
