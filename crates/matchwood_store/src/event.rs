//! Propagation events emitted by the store and consumed by the network.

use matchwood_foundation::{FactHandle, KeywordId};

use crate::fact::Fact;

/// A working-memory mutation, in the order it was issued.
///
/// Events carry payload snapshots (cheap, structurally shared) so the
/// network can undo index entries for a fact that is already gone from
/// the store by the time the event is processed.
#[derive(Clone, Debug)]
pub enum PropagationEvent {
    /// A fact entered working memory.
    Inserted {
        /// The new fact's handle.
        handle: FactHandle,
        /// Snapshot of the inserted payload.
        fact: Fact,
    },
    /// A fact's payload was replaced in place (same handle).
    Updated {
        /// The updated fact's handle.
        handle: FactHandle,
        /// Snapshot of the payload before the update.
        old: Fact,
        /// Snapshot of the payload after the update.
        new: Fact,
    },
    /// A fact left working memory.
    Retracted {
        /// The retracted fact's (now stale) handle.
        handle: FactHandle,
        /// Snapshot of the retracted payload.
        fact: Fact,
    },
}

impl PropagationEvent {
    /// The handle this event concerns.
    #[must_use]
    pub const fn handle(&self) -> FactHandle {
        match self {
            Self::Inserted { handle, .. }
            | Self::Updated { handle, .. }
            | Self::Retracted { handle, .. } => *handle,
        }
    }

    /// The fact type this event concerns.
    #[must_use]
    pub fn fact_type(&self) -> KeywordId {
        match self {
            Self::Inserted { fact, .. } | Self::Retracted { fact, .. } => fact.fact_type,
            Self::Updated { new, .. } => new.fact_type,
        }
    }
}
