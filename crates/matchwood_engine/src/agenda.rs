//! The agenda: pending activations ordered by conflict-resolution policy.
//!
//! Conflict resolution, ties broken top to bottom:
//! 1. active agenda group (top of the focus stack),
//! 2. salience, higher first,
//! 3/4. recency and rule declaration order, in the configured precedence.
//!
//! Every activation maps to one totally-ordered key, so `fire_next` is a
//! deterministic `pop_first` and the structure tolerates insertions and
//! cancellations between pops (a firing consequence runs strictly outside
//! any iteration over the sets).

use std::collections::{BTreeSet, HashMap};

use matchwood_foundation::KeywordId;

use crate::network::RuleId;
use crate::node::NodeId;
use crate::token::TokenId;

// =============================================================================
// Activations
// =============================================================================

/// Identifier of an activation. Monotonic; doubles as the recency stamp.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActivationId(pub(crate) u64);

impl ActivationId {
    /// Returns the raw id (also the activation's recency).
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

/// A terminal-node output: a rule paired with the token satisfying it.
#[derive(Clone, Debug)]
pub struct Activation {
    /// Identifier and recency stamp.
    pub id: ActivationId,
    /// The satisfied rule.
    pub rule: RuleId,
    /// The rule's interned name.
    pub rule_name: KeywordId,
    /// The terminal node that produced this activation.
    pub terminal: NodeId,
    /// The complete token.
    pub token: TokenId,
    /// Rule salience; higher fires first.
    pub salience: i32,
    /// Agenda group membership.
    pub group: KeywordId,
    /// Rule position in the rule set, for declaration-order tie-breaks.
    pub declaration: u32,
}

// =============================================================================
// Conflict Resolution Config
// =============================================================================

/// Recency ordering among equal-salience activations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RecencyOrder {
    /// Most recently activated fires first.
    #[default]
    Lifo,
    /// Oldest activation fires first.
    Fifo,
}

/// Which of declaration order and recency is consulted first below
/// salience.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Salience, then rule declaration order, then recency.
    #[default]
    Declaration,
    /// Salience, then recency, then rule declaration order.
    Recency,
}

/// Conflict-resolution configuration, fixed for a session's lifetime.
#[derive(Copy, Clone, Debug, Default)]
pub struct ConflictConfig {
    /// Recency ordering.
    pub recency: RecencyOrder,
    /// Tie-break precedence below salience.
    pub tie_break: TieBreak,
}

impl ConflictConfig {
    /// Creates the default configuration (LIFO, declaration-order first).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the recency ordering.
    #[must_use]
    pub const fn with_recency(mut self, recency: RecencyOrder) -> Self {
        self.recency = recency;
        self
    }

    /// Builder method to set the tie-break precedence.
    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

// =============================================================================
// Agenda
// =============================================================================

/// Totally-ordered sort key; smaller fires first. Field order *is* the
/// priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct AgendaKey {
    salience: i64,
    primary: u64,
    secondary: u64,
    id: u64,
}

/// Pending activations, grouped and ordered for deterministic firing.
#[derive(Clone, Debug)]
pub struct Agenda {
    /// Ordered pending keys per group.
    groups: HashMap<KeywordId, BTreeSet<AgendaKey>>,
    /// Live activations with their sort keys.
    activations: HashMap<ActivationId, (Activation, AgendaKey)>,
    /// Focus stack; `main` is the permanent bottom entry.
    focus_stack: Vec<KeywordId>,
    /// Conflict-resolution policy.
    config: ConflictConfig,
}

impl Default for Agenda {
    fn default() -> Self {
        Self::new(ConflictConfig::default())
    }
}

impl Agenda {
    /// Creates an empty agenda with the given policy.
    #[must_use]
    pub fn new(config: ConflictConfig) -> Self {
        Self {
            groups: HashMap::new(),
            activations: HashMap::new(),
            focus_stack: vec![KeywordId::MAIN],
            config,
        }
    }

    fn key_for(&self, activation: &Activation) -> AgendaKey {
        let recency = match self.config.recency {
            RecencyOrder::Lifo => u64::MAX - activation.id.0,
            RecencyOrder::Fifo => activation.id.0,
        };
        let declaration = u64::from(activation.declaration);
        let (primary, secondary) = match self.config.tie_break {
            TieBreak::Declaration => (declaration, recency),
            TieBreak::Recency => (recency, declaration),
        };
        AgendaKey {
            salience: -i64::from(activation.salience),
            primary,
            secondary,
            id: activation.id.0,
        }
    }

    /// Queues an activation into its group.
    ///
    /// The activation becomes eligible only while its group is the focus.
    pub fn add(&mut self, activation: Activation) {
        let key = self.key_for(&activation);
        self.groups
            .entry(activation.group)
            .or_default()
            .insert(key);
        self.activations.insert(activation.id, (activation, key));
    }

    /// Cancels a pending activation (its token was invalidated before it
    /// fired). Returns false as a no-op if it already fired or was never
    /// queued.
    pub fn cancel(&mut self, id: ActivationId) -> bool {
        let Some((activation, key)) = self.activations.remove(&id) else {
            return false;
        };
        if let Some(set) = self.groups.get_mut(&activation.group) {
            set.remove(&key);
        }
        true
    }

    /// The currently active group (top of the focus stack).
    #[must_use]
    pub fn focus(&self) -> KeywordId {
        self.focus_stack.last().copied().unwrap_or(KeywordId::MAIN)
    }

    /// Pushes a group onto the focus stack. Pushing the current focus is
    /// a no-op.
    pub fn set_focus(&mut self, group: KeywordId) {
        if self.focus() != group {
            self.focus_stack.push(group);
        }
    }

    /// Pops the highest-priority eligible activation.
    ///
    /// Exhausted non-`main` groups are popped off the focus stack until
    /// an eligible activation is found; returns `None` at quiescence
    /// (empty agenda across the remaining stack).
    pub fn fire_next(&mut self) -> Option<Activation> {
        loop {
            let group = self.focus();
            let popped = self
                .groups
                .get_mut(&group)
                .and_then(BTreeSet::pop_first);

            if let Some(key) = popped {
                let id = ActivationId(key.id);
                if let Some((activation, _)) = self.activations.remove(&id) {
                    return Some(activation);
                }
                // No record behind the key: stale entry, take the next
                continue;
            }

            if group == KeywordId::MAIN {
                return None;
            }
            self.focus_stack.pop();
        }
    }

    /// Returns true if `fire_next` would yield an activation: some group
    /// still on the focus stack has pending work.
    #[must_use]
    pub fn has_eligible(&self) -> bool {
        self.focus_stack
            .iter()
            .any(|group| self.pending_in(*group) > 0)
    }

    /// Number of pending activations across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.activations.len()
    }

    /// Returns true if no activations are pending anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Number of pending activations in one group.
    #[must_use]
    pub fn pending_in(&self, group: KeywordId) -> usize {
        self.groups.get(&group).map_or(0, BTreeSet::len)
    }

    /// Returns true if the given activation is still pending.
    #[must_use]
    pub fn contains(&self, id: ActivationId) -> bool {
        self.activations.contains_key(&id)
    }
}

// =============================================================================
// Tests
// =============================================================================
