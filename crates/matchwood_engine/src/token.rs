//! Partial-match tokens.
//!
//! A token is an immutable chain of bound fact handles: each successful
//! join allocates a *new* token pointing at its parent rather than
//! mutating anything. Tokens live in an arena addressed by ids that are
//! never reused, so a firing key `(rule, token)` stays unique for the
//! session's lifetime even after the token dies.

use std::collections::HashMap;

use matchwood_foundation::{Error, FactHandle, Result};

use crate::node::NodeId;

/// Identifier of a token in the arena. Monotonic, never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub(crate) u64);

impl TokenId {
    /// Returns the raw id.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

/// A partial match: one bound fact extending a parent match.
#[derive(Copy, Clone, Debug)]
pub struct Token {
    /// The parent partial match; `None` for unit tokens (first pattern).
    pub parent: Option<TokenId>,
    /// The fact bound at this position.
    pub fact: FactHandle,
    /// The node that produced this token (an alpha for unit tokens, a
    /// join otherwise). Removal consults this node's successors to find
    /// the memories holding the token.
    pub node: NodeId,
}

/// Arena of live tokens with parent/child links.
#[derive(Clone, Debug, Default)]
pub struct TokenArena {
    tokens: HashMap<TokenId, Token>,
    children: HashMap<TokenId, Vec<TokenId>>,
    next_id: u64,
}

impl TokenArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new token.
    pub fn create(&mut self, parent: Option<TokenId>, fact: FactHandle, node: NodeId) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        self.tokens.insert(id, Token { parent, fact, node });
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
        id
    }

    /// Gets a live token.
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// Gets a live token, treating absence as a network defect.
    ///
    /// # Errors
    /// Returns a `Consistency` error if the token is not in the arena.
    pub fn get_checked(&self, id: TokenId) -> Result<&Token> {
        self.tokens
            .get(&id)
            .ok_or_else(|| Error::consistency(format!("token {id:?} missing from arena")))
    }

    /// Returns the fact chain of a token in pattern order (first pattern
    /// first).
    ///
    /// # Errors
    /// Returns a `Consistency` error if any link of the chain is missing.
    pub fn chain(&self, id: TokenId) -> Result<Vec<FactHandle>> {
        let mut facts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let token = self.get_checked(current)?;
            facts.push(token.fact);
            cursor = token.parent;
        }
        facts.reverse();
        Ok(facts)
    }

    /// Returns the fact bound at a pattern position of a token's chain.
    ///
    /// # Errors
    /// Returns a `Consistency` error if the chain is shorter than the
    /// position or a link is missing.
    pub fn fact_at(&self, id: TokenId, position: usize) -> Result<FactHandle> {
        let chain = self.chain(id)?;
        chain.get(position).copied().ok_or_else(|| {
            Error::consistency(format!(
                "token {id:?} chain has {} facts, wanted position {position}",
                chain.len()
            ))
        })
    }

    /// Returns true if `parent` already has a child binding `fact` at
    /// `node`.
    ///
    /// A fact whose alpha memory feeds both sides of one join (a
    /// self-join) would otherwise produce the same pair twice, once per
    /// delivery side.
    #[must_use]
    pub fn has_child(&self, parent: TokenId, fact: FactHandle, node: NodeId) -> bool {
        self.children.get(&parent).is_some_and(|kids| {
            kids.iter().any(|kid| {
                self.tokens
                    .get(kid)
                    .is_some_and(|t| t.fact == fact && t.node == node)
            })
        })
    }

    /// Removes a token and its entire descendant subtree.
    ///
    /// Returns the removed tokens in depth-first pre-order (parents
    /// before children). No-op returning empty if the root is already
    /// gone — retraction can reach the same subtree twice when one fact
    /// is bound at several positions.
    pub fn remove_subtree(&mut self, root: TokenId) -> Vec<(TokenId, Token)> {
        let mut removed = Vec::new();
        if !self.tokens.contains_key(&root) {
            return removed;
        }

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(token) = self.tokens.remove(&id) else {
                continue;
            };
            if let Some(parent) = token.parent {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|&c| c != id);
                }
            }
            if let Some(mut kids) = self.children.remove(&id) {
                // Reverse so the stack pops them in registration order
                kids.reverse();
                stack.extend(kids);
            }
            removed.push((id, token));
        }
        removed
    }

    /// Number of live tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no tokens are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
