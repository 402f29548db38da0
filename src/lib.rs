//! Matchwood - Forward-chaining production rule engine
//!
//! This crate re-exports all layers of the Matchwood system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: matchwood_runtime    — Session, firing loop, consequences, trace
//! Layer 2: matchwood_engine     — Matching network, agenda, truth maintenance
//! Layer 1: matchwood_store      — Working memory, schemas, propagation events
//! Layer 0: matchwood_foundation — Core types (Value, FactHandle, Error)
//! ```
//!
//! # Control flow
//!
//! External callers mutate working memory through the session; each
//! mutation propagates synchronously through the matching network, which
//! adds or cancels activations in the agenda. `fire_all_rules` pops
//! activations under the conflict-resolution policy and applies each
//! consequence's effects — which may mutate working memory again,
//! re-entrantly. Facts inserted logically by a firing are retracted
//! automatically once their last justification disappears.

pub use matchwood_engine as engine;
pub use matchwood_foundation as foundation;
pub use matchwood_runtime as runtime;
pub use matchwood_store as store;
