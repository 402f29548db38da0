//! Error types for the Matchwood engine.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use thiserror::Error;

use crate::handle::FactHandle;
use crate::intern::KeywordId;
use crate::types::Type;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Matchwood operations.
#[derive(Debug)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred (rule name,
    /// operation, node).
    pub context: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a duplicate fact error (identity equality enabled and an
    /// equal fact is already live).
    #[must_use]
    pub fn duplicate_fact(existing: FactHandle) -> Self {
        Self::new(ErrorKind::DuplicateFact(existing))
    }

    /// Creates an unknown fact error (handle never allocated or slot free).
    #[must_use]
    pub fn unknown_fact(handle: FactHandle) -> Self {
        Self::new(ErrorKind::UnknownFact(handle))
    }

    /// Creates a stale handle error (generation mismatch after retract).
    #[must_use]
    pub fn stale_handle(handle: FactHandle) -> Self {
        Self::new(ErrorKind::StaleHandle(handle))
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an unknown fact type error.
    #[must_use]
    pub fn unknown_fact_type(fact_type: KeywordId) -> Self {
        Self::new(ErrorKind::UnknownFactType(fact_type))
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(fact_type: KeywordId, field: KeywordId) -> Self {
        Self::new(ErrorKind::UnknownField { fact_type, field })
    }

    /// Creates a missing required field error.
    #[must_use]
    pub fn missing_field(fact_type: KeywordId, field: KeywordId) -> Self {
        Self::new(ErrorKind::MissingField { fact_type, field })
    }

    /// Creates a conflicting assertion mode error (stated/logical mix).
    #[must_use]
    pub fn conflicting_assertion_mode(handle: FactHandle) -> Self {
        Self::new(ErrorKind::ConflictingAssertionMode(handle))
    }

    /// Creates a consistency error (network memory desynchronization).
    ///
    /// These indicate a defect, are fatal for the session, and must never
    /// be swallowed.
    #[must_use]
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Consistency(message.into()))
    }

    /// Creates a session disposed error.
    #[must_use]
    pub fn session_disposed() -> Self {
        Self::new(ErrorKind::SessionDisposed)
    }

    /// Creates a consequence fault error (external rule logic failed).
    #[must_use]
    pub fn consequence_fault(rule: KeywordId, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConsequenceFault {
            rule,
            message: message.into(),
        })
    }

    /// Creates an invalid rule set error (build-time validation).
    #[must_use]
    pub fn invalid_rule_set(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRuleSet(message.into()))
    }

    /// Returns true if this error is fatal for the session.
    ///
    /// Only consistency errors poison a session; everything else is
    /// returned to the immediate caller without corrupting state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Consistency(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Identity equality is enabled and an equal fact is already live.
    #[error("duplicate fact: equal to live {0:?}")]
    DuplicateFact(FactHandle),

    /// Fact was not found in the store.
    #[error("unknown fact: {0:?}")]
    UnknownFact(FactHandle),

    /// Fact handle is stale (generation mismatch).
    #[error("stale fact handle: {0:?}")]
    StaleHandle(FactHandle),

    /// Type mismatch during schema validation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Fact type is not declared in the registry.
    #[error("unknown fact type: {0:?}")]
    UnknownFactType(KeywordId),

    /// Field is not declared for the fact type.
    #[error("unknown field {field:?} on fact type {fact_type:?}")]
    UnknownField {
        /// The fact type that was validated.
        fact_type: KeywordId,
        /// The undeclared field.
        field: KeywordId,
    },

    /// Required field is absent from the payload.
    #[error("missing field {field:?} on fact type {fact_type:?}")]
    MissingField {
        /// The fact type that was validated.
        fact_type: KeywordId,
        /// The missing field.
        field: KeywordId,
    },

    /// A fact was asserted both as stated and as a logical consequence.
    #[error("conflicting assertion mode for {0:?}")]
    ConflictingAssertionMode(FactHandle),

    /// Network memory desynchronization (fatal, indicates a defect).
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// The session was used after disposal.
    #[error("session disposed")]
    SessionDisposed,

    /// Externally-supplied rule logic failed during firing.
    #[error("consequence fault in rule {rule:?}: {message}")]
    ConsequenceFault {
        /// The rule whose consequence faulted.
        rule: KeywordId,
        /// Description of the fault.
        message: String,
    },

    /// The rule-set description failed build-time validation.
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(String),
}
