//! Network vertices.
//!
//! The node graph is fixed at build time: each node carries its successor
//! list, and only the memories inside nodes mutate during propagation.
//! Node kinds are a tagged enum rather than trait objects so the hot
//! evaluation path dispatches on a discriminant.

use std::collections::HashMap;

use crate::agenda::ActivationId;
use crate::alpha::AlphaNode;
use crate::join::JoinNode;
use crate::network::RuleId;
use crate::token::TokenId;

/// Index of a node in the network's node table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw index of this node.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Which input of a join an alpha output feeds.
///
/// `Left` edges deliver a fact as a fresh unit token (the start of a rule
/// chain); `Right` edges deliver it as a join candidate. Joins and
/// terminals only ever receive tokens, so the side tag exists on alpha
/// successors alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Token input: the fact starts (or is) a partial match.
    Left,
    /// Fact input: the fact is a join candidate for existing tokens.
    Right,
}

/// An alpha node's outgoing edge.
#[derive(Copy, Clone, Debug)]
pub struct Successor {
    /// The receiving node.
    pub node: NodeId,
    /// Which input of the receiver this edge feeds.
    pub side: Side,
}

/// A network vertex.
#[derive(Clone, Debug)]
pub enum Node {
    /// Single-fact constraint test with a fact memory.
    Alpha(AlphaNode),
    /// Join of a left token stream with a right fact stream.
    Join(JoinNode),
    /// Per-rule sink that materializes activations.
    Terminal(TerminalNode),
}

impl Node {
    /// Returns the alpha node, if this is one.
    #[must_use]
    pub fn as_alpha(&self) -> Option<&AlphaNode> {
        match self {
            Self::Alpha(alpha) => Some(alpha),
            _ => None,
        }
    }

    /// Returns the join node, if this is one.
    #[must_use]
    pub fn as_join(&self) -> Option<&JoinNode> {
        match self {
            Self::Join(join) => Some(join),
            _ => None,
        }
    }

    /// Returns the terminal node, if this is one.
    #[must_use]
    pub fn as_terminal(&self) -> Option<&TerminalNode> {
        match self {
            Self::Terminal(terminal) => Some(terminal),
            _ => None,
        }
    }
}

/// State of a terminal entry for one complete token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationState {
    /// Queued in the agenda, not yet fired.
    Pending(ActivationId),
    /// Popped and executed; kept so token death can undo the firing's
    /// logical consequences.
    Fired,
}

/// One terminal node per compiled rule.
///
/// The memory maps each complete token to its activation state: pending
/// entries are cancelled when the token dies, fired entries hand their
/// firing key to truth maintenance instead.
#[derive(Clone, Debug)]
pub struct TerminalNode {
    /// The rule this terminal materializes activations for.
    pub rule: RuleId,
    /// Activation state per complete token.
    pub memory: HashMap<TokenId, ActivationState>,
}

impl TerminalNode {
    /// Creates an empty terminal for a rule.
    #[must_use]
    pub fn new(rule: RuleId) -> Self {
        Self {
            rule,
            memory: HashMap::new(),
        }
    }
}
