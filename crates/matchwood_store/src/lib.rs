//! Working-memory fact store for Matchwood.
//!
//! This crate provides:
//! - [`Fact`] - Typed, immutable fact payloads
//! - [`FactTypeSchema`] / [`TypeRegistry`] - Declared fact types with
//!   validated fields
//! - [`FactStore`] - The generational fact arena (working memory)
//! - [`PropagationEvent`] - Mutation events consumed by the matching
//!   network

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod event;
mod fact;
mod schema;
mod store;

pub use event::PropagationEvent;
pub use fact::Fact;
pub use schema::{FactTypeSchema, FieldSchema, TypeRegistry};
pub use store::{AssertMode, FactStore, IdentityMode};
