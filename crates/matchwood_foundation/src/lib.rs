//! Core types, values, and handles for Matchwood.
//!
//! This crate provides:
//! - [`Value`] - The core value type for fact payloads
//! - [`FactHandle`] - Generational fact identifiers
//! - [`Type`] - Type descriptors for schema validation
//! - [`Error`] - Rich error types with context
//! - [`Interner`] - Keyword interning for type, field, rule, and group names

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod handle;
mod intern;
mod types;
mod value;

pub use error::{Error, ErrorKind, Result};
pub use handle::FactHandle;
pub use intern::{Interner, KeywordId};
pub use types::Type;
pub use value::Value;
