//! Alpha nodes: single-fact constraint tests with indexed memories.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use matchwood_foundation::{FactHandle, KeywordId, Value};
use matchwood_store::Fact;

use crate::node::Successor;

// =============================================================================
// Comparison Operators
// =============================================================================

/// Comparison operator for constraints and join tests.
///
/// `Eq`/`Ne` are exact value comparisons (this is what makes hash-index
/// candidate lookup sound). The ordering operators compare numerically
/// across `Int`/`Float` and lexicographically for strings; operands that
/// admit no ordering fail the test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CmpOp {
    /// Exact equality.
    Eq,
    /// Exact inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CmpOp {
    /// Returns the operator with its operands swapped
    /// (`a op b == b op.mirror() a`).
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    /// Evaluates the operator over two values.
    #[must_use]
    pub fn eval(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => Self::ordering(lhs, rhs).is_some_and(Ordering::is_lt),
            Self::Le => Self::ordering(lhs, rhs).is_some_and(Ordering::is_le),
            Self::Gt => Self::ordering(lhs, rhs).is_some_and(Ordering::is_gt),
            Self::Ge => Self::ordering(lhs, rhs).is_some_and(Ordering::is_ge),
        }
    }

    /// Ordering for the relational operators: numeric across
    /// `Int`/`Float`, lexicographic for string pairs, absent otherwise.
    fn ordering(lhs: &Value, rhs: &Value) -> Option<Ordering> {
        lhs.compare_numeric(rhs)
            .or_else(|| match (lhs.as_str(), rhs.as_str()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ => None,
            })
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// A literal constraint on one field of a fact.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// The field under test.
    pub field: KeywordId,
    /// The comparison operator.
    pub op: CmpOp,
    /// The literal operand.
    pub operand: Value,
}

impl Constraint {
    /// Creates a constraint.
    #[must_use]
    pub fn new(field: KeywordId, op: CmpOp, operand: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    /// Evaluates the constraint against a fact.
    ///
    /// A missing field fails every operator except `Ne`.
    #[must_use]
    pub fn satisfied_by(&self, fact: &Fact) -> bool {
        match fact.get(self.field) {
            Some(value) => self.op.eval(value, &self.operand),
            None => self.op == CmpOp::Ne,
        }
    }
}

// =============================================================================
// Alpha Memory
// =============================================================================

/// Per-field hash index over an alpha memory.
///
/// Keys are stored alongside their entries so removal after a retract
/// needs no payload lookup.
#[derive(Clone, Debug, Default)]
struct FieldIndex {
    buckets: HashMap<Value, Vec<FactHandle>>,
    key_of: HashMap<FactHandle, Value>,
}

impl FieldIndex {
    fn add(&mut self, handle: FactHandle, key: Value) {
        self.buckets.entry(key.clone()).or_default().push(handle);
        self.key_of.insert(handle, key);
    }

    fn remove(&mut self, handle: FactHandle) {
        if let Some(key) = self.key_of.remove(&handle) {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.retain(|&h| h != handle);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
        }
    }

    fn candidates(&self, key: &Value) -> &[FactHandle] {
        self.buckets.get(key).map_or(&[], Vec::as_slice)
    }
}

/// Memory of facts currently passing an alpha node's constraints.
///
/// Facts are kept in insertion order (iteration must be deterministic)
/// with optional per-field hash indexes registered by the builder for
/// every equality join key a downstream beta uses.
#[derive(Clone, Debug, Default)]
pub struct AlphaMemory {
    facts: Vec<FactHandle>,
    indexes: HashMap<KeywordId, FieldIndex>,
}

impl AlphaMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hash index on a field. Idempotent; called only at
    /// build time, before any fact enters the memory.
    pub fn register_index(&mut self, field: KeywordId) {
        self.indexes.entry(field).or_default();
    }

    /// Adds a matching fact.
    pub fn add(&mut self, handle: FactHandle, fact: &Fact) {
        self.facts.push(handle);
        for (field, index) in &mut self.indexes {
            let key = fact.get(*field).cloned().unwrap_or(Value::Nil);
            index.add(handle, key);
        }
    }

    /// Removes a fact. No-op if absent (retraction visits every alpha of
    /// the fact's type, matching or not).
    pub fn remove(&mut self, handle: FactHandle) {
        self.facts.retain(|&h| h != handle);
        for index in self.indexes.values_mut() {
            index.remove(handle);
        }
    }

    /// Returns true if the fact is in this memory.
    #[must_use]
    pub fn contains(&self, handle: FactHandle) -> bool {
        self.facts.contains(&handle)
    }

    /// All facts in insertion order.
    #[must_use]
    pub fn all(&self) -> &[FactHandle] {
        &self.facts
    }

    /// Index candidates for a field/key pair, if the field is indexed.
    ///
    /// Returns `None` when no index is registered (caller falls back to
    /// an ordered scan of [`AlphaMemory::all`]).
    #[must_use]
    pub fn candidates(&self, field: KeywordId, key: &Value) -> Option<&[FactHandle]> {
        self.indexes.get(&field).map(|idx| idx.candidates(key))
    }

    /// Number of facts in the memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if the memory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

// =============================================================================
// Alpha Node
// =============================================================================

/// A single-fact constraint test.
///
/// Alpha nodes are shared: every rule pattern with the same fact type and
/// constraint chain maps to one node, so a fact is tested once no matter
/// how many rules reuse the pattern.
#[derive(Clone, Debug)]
pub struct AlphaNode {
    /// The fact type this node accepts.
    pub fact_type: KeywordId,
    /// Literal constraints, all of which must pass.
    pub constraints: Vec<Constraint>,
    /// Facts currently passing the constraints.
    pub memory: AlphaMemory,
    /// Outgoing edges.
    pub successors: Vec<Successor>,
}

impl AlphaNode {
    /// Creates an alpha node with no successors yet.
    #[must_use]
    pub fn new(fact_type: KeywordId, constraints: Vec<Constraint>) -> Self {
        Self {
            fact_type,
            constraints,
            memory: AlphaMemory::new(),
            successors: Vec::new(),
        }
    }

    /// Evaluates the constraint chain against a fact.
    ///
    /// The type filter has already been applied by network dispatch.
    #[must_use]
    pub fn matches(&self, fact: &Fact) -> bool {
        self.constraints.iter().all(|c| c.satisfied_by(fact))
    }
}

// =============================================================================
// Tests
// =============================================================================
