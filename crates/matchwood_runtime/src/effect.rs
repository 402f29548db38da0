//! The consequence contract: the boundary between the engine and
//! externally-supplied rule logic.
//!
//! A consequence never touches the session directly. It receives the
//! firing's bound facts and returns the mutations to apply; the session
//! applies them in order, propagating each one synchronously, strictly
//! between activation pops. This is what makes re-entrant firing safe —
//! the consequence runs logically outside any iteration over the agenda.

use matchwood_foundation::{FactHandle, KeywordId, Result};
use matchwood_store::Fact;

/// A working-memory mutation requested by a consequence.
#[derive(Clone, Debug)]
pub enum Effect {
    /// Insert a stated fact.
    Insert(Fact),
    /// Insert a fact as a logical consequence of this firing; it is
    /// retracted automatically when its last justification disappears.
    InsertLogical(Fact),
    /// Replace a fact's payload in place.
    Update(FactHandle, Fact),
    /// Retract a fact.
    Retract(FactHandle),
    /// Push an agenda group onto the focus stack.
    SetFocus(String),
    /// Stop the firing loop after this consequence's effects apply.
    Halt,
}

/// The bound facts of one firing, in pattern order.
#[derive(Clone, Debug)]
pub struct RuleMatch {
    /// The fired rule's interned name.
    pub rule: KeywordId,
    /// Handle and payload snapshot per pattern position.
    pub facts: Vec<(FactHandle, Fact)>,
}

impl RuleMatch {
    /// The handle bound at a pattern position.
    #[must_use]
    pub fn handle(&self, position: usize) -> Option<FactHandle> {
        self.facts.get(position).map(|(h, _)| *h)
    }

    /// The fact snapshot bound at a pattern position.
    #[must_use]
    pub fn fact(&self, position: usize) -> Option<&Fact> {
        self.facts.get(position).map(|(_, f)| f)
    }

    /// Number of bound patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if no facts are bound (never the case for a fired
    /// rule, but keeps the API honest).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Externally-supplied rule logic.
///
/// Implemented for plain closures; an adapter for another execution
/// model (a decision-table or model evaluator, say) implements this
/// trait and maps its outputs onto [`Effect`]s.
pub trait Consequence {
    /// Executes the consequence for one firing.
    ///
    /// # Errors
    /// Any error aborts the current firing cycle and surfaces to the
    /// caller of `fire_all_rules` as a consequence fault; effects of
    /// this firing that were already applied stay applied.
    fn fire(&self, context: &RuleMatch) -> Result<Vec<Effect>>;
}

impl<F> Consequence for F
where
    F: Fn(&RuleMatch) -> Result<Vec<Effect>>,
{
    fn fire(&self, context: &RuleMatch) -> Result<Vec<Effect>> {
        self(context)
    }
}
