//! Session configuration.

use matchwood_engine::{RecencyOrder, TieBreak};
use matchwood_store::IdentityMode;

/// Configuration for a session.
///
/// Fixed at build time; conflict resolution and identity behavior never
/// change mid-session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Identity behavior for stated inserts.
    pub identity: IdentityMode,
    /// Recency ordering among equal-salience activations.
    pub recency: RecencyOrder,
    /// Tie-break precedence below salience.
    pub tie_break: TieBreak,
    /// Trace ring-buffer capacity; 0 disables tracing entirely.
    pub trace_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: IdentityMode::Distinct,
            recency: RecencyOrder::Lifo,
            tie_break: TieBreak::Declaration,
            trace_capacity: 0,
        }
    }
}

impl SessionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with tracing enabled at a default
    /// capacity, for development.
    #[must_use]
    pub fn traced() -> Self {
        Self {
            trace_capacity: 10_000,
            ..Self::default()
        }
    }

    /// Builder method to set the identity mode.
    #[must_use]
    pub const fn with_identity(mut self, identity: IdentityMode) -> Self {
        self.identity = identity;
        self
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

    /// Builder method to set the trace capacity (0 disables tracing).
    #[must_use]
    pub const fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }
}
