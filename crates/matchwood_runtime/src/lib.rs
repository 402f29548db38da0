//! Session façade, firing loop, and rule-set loading for Matchwood.
//!
//! This crate provides:
//! - [`Session`] - The top-level rule engine session
//! - [`SessionConfig`] - Identity, conflict-resolution, and trace config
//! - [`Consequence`] / [`Effect`] - The external rule-logic contract
//! - [`TraceBuffer`] - Structured engine trace
//! - [`ruleset_from_bytes`] / [`ruleset_to_bytes`] - Description
//!   interchange

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod effect;
mod loader;
mod session;
mod trace;

pub use config::SessionConfig;
pub use effect::{Consequence, Effect, RuleMatch};
pub use loader::{ruleset_from_bytes, ruleset_to_bytes};
pub use session::{FireOutcome, Halt, Session, SessionState};
pub use trace::{EngineEvent, TraceBuffer, TraceRecord};
