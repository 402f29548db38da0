//! Rule-set interchange.
//!
//! The compiled rule network description is produced by an external
//! compiler and handed to the engine as bytes; MessagePack keeps the
//! encoding compact while staying self-describing (field names survive,
//! so descriptions tolerate additive evolution).

use matchwood_engine::RuleSet;
use matchwood_foundation::{Error, Result};

/// Serializes a rule set to MessagePack bytes.
///
/// # Errors
/// Returns `InvalidRuleSet` if encoding fails.
pub fn ruleset_to_bytes(ruleset: &RuleSet) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(ruleset)
        .map_err(|e| Error::invalid_rule_set(format!("encoding failed: {e}")))
}

/// Deserializes a rule set from MessagePack bytes.
///
/// # Errors
/// Returns `InvalidRuleSet` if the bytes are not a valid description.
pub fn ruleset_from_bytes(bytes: &[u8]) -> Result<RuleSet> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| Error::invalid_rule_set(format!("decoding failed: {e}")))
}
