//! Typed fact payloads.

use std::fmt;
use std::hash::{Hash, Hasher};

use matchwood_foundation::{KeywordId, Value};

/// A typed, immutable fact payload.
///
/// Facts pair a type tag with a persistent field map, so cloning one for
/// a propagation-event snapshot is O(1). The store owns every live fact;
/// the network and agenda only ever hold handles.
#[derive(Clone, PartialEq, Eq)]
pub struct Fact {
    /// The fact's type tag.
    pub fact_type: KeywordId,
    /// Field values keyed by interned field name.
    pub fields: im::OrdMap<KeywordId, Value>,
}

impl Fact {
    /// Creates an empty fact of the given type.
    #[must_use]
    pub fn new(fact_type: KeywordId) -> Self {
        Self {
            fact_type,
            fields: im::OrdMap::new(),
        }
    }

    /// Returns a copy of this fact with the field set.
    #[must_use]
    pub fn with_field(mut self, field: KeywordId, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: KeywordId) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn has(&self, field: KeywordId) -> bool {
        self.fields.contains_key(&field)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the fact has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&KeywordId, &Value)> {
        self.fields.iter()
    }
}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fact_type.hash(state);
        self.fields.len().hash(state);
        // OrdMap iterates in key order, so this is deterministic
        for (k, v) in &self.fields {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({:?}", self.fact_type)?;
        for (k, v) in &self.fields {
            write!(f, " {k:?}={v:?}")?;
        }
        write!(f, ")")
    }
}
