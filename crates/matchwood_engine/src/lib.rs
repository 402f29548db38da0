//! Matching network, agenda, and truth maintenance for Matchwood.
//!
//! This crate provides:
//! - [`RuleSet`] - The compiled rule network description (input)
//! - [`NetworkBuilder`] - Lowers a rule set into a shared node graph
//! - [`ReteNetwork`] - The incremental matching network
//! - [`Agenda`] - Activation queue with conflict resolution
//! - [`TruthMaintenance`] - Justification tracking for logical facts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agenda;
pub mod alpha;
pub mod compile;
pub mod join;
pub mod network;
pub mod node;
pub mod ruleset;
pub mod tms;
pub mod token;

pub use agenda::{Activation, ActivationId, Agenda, ConflictConfig, RecencyOrder, TieBreak};
pub use alpha::{AlphaNode, CmpOp, Constraint};
pub use compile::{CompiledNetwork, NetworkBuilder};
pub use join::{JoinNode, JoinTest};
pub use network::{MatchEvent, ReteNetwork, RuleId, RuleInfo};
pub use node::{Node, NodeId, Side};
pub use ruleset::{
    FieldDecl, LiteralDecl, PatternDecl, RhsDecl, RuleDecl, RuleSet, TestDecl, TypeDecl, TypeTag,
};
pub use tms::{FiringKey, TruthMaintenance};
pub use token::{Token, TokenArena, TokenId};
