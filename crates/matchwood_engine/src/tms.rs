//! Truth maintenance: justification tracking for logically-derived facts.
//!
//! A logical insert records a justification edge from the producing
//! firing to the produced fact. When a fired activation's token dies,
//! its justifications are withdrawn; any fact left unsupported is
//! reported for retraction, and the resulting retraction propagates
//! through the network, invalidating further firings and cascading
//! transitively.

use std::collections::{BTreeSet, HashMap};

use matchwood_foundation::FactHandle;

use crate::network::RuleId;
use crate::token::TokenId;

/// Identity of one rule firing: the rule plus the exact token it fired
/// on. Token ids are never reused, so the key stays unique even after
/// the token dies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiringKey {
    /// The fired rule.
    pub rule: RuleId,
    /// The token the rule fired on.
    pub token: TokenId,
}

/// The justification graph.
///
/// Both directions are kept: fact → supporting firings (to decide when a
/// fact becomes unsupported) and firing → justified facts (to withdraw a
/// whole firing at once). Sets are ordered so withdrawal output is
/// deterministic.
#[derive(Clone, Debug, Default)]
pub struct TruthMaintenance {
    /// Firings currently supporting each logical fact.
    support: HashMap<FactHandle, BTreeSet<FiringKey>>,
    /// Facts justified by each firing.
    justified: HashMap<FiringKey, BTreeSet<FactHandle>>,
}

impl TruthMaintenance {
    /// Creates an empty justification graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `firing` justifies `fact`.
    ///
    /// A fact justified by several firings stays alive until the last
    /// one is withdrawn.
    pub fn justify(&mut self, firing: FiringKey, fact: FactHandle) {
        self.support.entry(fact).or_default().insert(firing);
        self.justified.entry(firing).or_default().insert(fact);
    }

    /// Withdraws every justification a firing contributed.
    ///
    /// Returns the facts left with no remaining support, in handle
    /// order; the caller retracts them (which cascades through network
    /// propagation into further withdrawals).
    pub fn withdraw(&mut self, firing: FiringKey) -> Vec<FactHandle> {
        let Some(facts) = self.justified.remove(&firing) else {
            return Vec::new();
        };

        let mut unsupported = Vec::new();
        for fact in facts {
            let emptied = match self.support.get_mut(&fact) {
                Some(supporters) => {
                    supporters.remove(&firing);
                    supporters.is_empty()
                }
                None => false,
            };
            if emptied {
                self.support.remove(&fact);
                unsupported.push(fact);
            }
        }
        unsupported
    }

    /// Forgets a fact that left working memory by explicit retraction,
    /// dropping its edges from the graph. No-op for stated facts.
    pub fn forget(&mut self, fact: FactHandle) {
        let Some(supporters) = self.support.remove(&fact) else {
            return;
        };
        for firing in supporters {
            if let Some(facts) = self.justified.get_mut(&firing) {
                facts.remove(&fact);
                if facts.is_empty() {
                    self.justified.remove(&firing);
                }
            }
        }
    }

    /// Returns true if the fact currently has logical support.
    #[must_use]
    pub fn is_justified(&self, fact: FactHandle) -> bool {
        self.support.contains_key(&fact)
    }

    /// The firings currently supporting a fact.
    #[must_use]
    pub fn supporters(&self, fact: FactHandle) -> Option<&BTreeSet<FiringKey>> {
        self.support.get(&fact)
    }

    /// Number of facts with logical support.
    #[must_use]
    pub fn len(&self) -> usize {
        self.support.len()
    }

    /// Returns true if no logical facts are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }
}
