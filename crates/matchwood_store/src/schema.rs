//! Declared fact types and payload validation.
//!
//! Every fact type the network matches against is declared up front (the
//! compiled rule set carries the declarations). Inserts are validated
//! against the registry: unknown types and fields are rejected, required
//! fields must be present, optional fields receive their defaults.

use std::collections::HashMap;

use matchwood_foundation::{Error, KeywordId, Result, Type, Value};

use crate::fact::Fact;

/// Schema for a single field of a fact type.
#[derive(Clone, Debug)]
pub struct FieldSchema {
    /// Interned field name.
    pub name: KeywordId,
    /// Declared field type.
    pub ty: Type,
    /// Default value; `None` means the field is required.
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Creates a required field.
    #[must_use]
    pub const fn required(name: KeywordId, ty: Type) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    /// Creates an optional field with a default value.
    #[must_use]
    pub const fn optional(name: KeywordId, ty: Type, default: Value) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }

    /// Returns true if the field must be present in every payload.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Schema for a fact type.
#[derive(Clone, Debug)]
pub struct FactTypeSchema {
    /// Interned type name.
    pub name: KeywordId,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldSchema>,
}

impl FactTypeSchema {
    /// Creates a schema with no fields (a marker fact type).
    #[must_use]
    pub fn new(name: KeywordId) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a field schema by name.
    #[must_use]
    pub fn field(&self, name: KeywordId) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Registry of declared fact types.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<KeywordId, FactTypeSchema>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fact type schema.
    ///
    /// # Errors
    /// Returns `InvalidRuleSet` if the type is already registered.
    pub fn register(&mut self, schema: FactTypeSchema) -> Result<()> {
        if self.types.contains_key(&schema.name) {
            return Err(Error::invalid_rule_set(format!(
                "fact type {:?} declared twice",
                schema.name
            )));
        }
        self.types.insert(schema.name, schema);
        Ok(())
    }

    /// Looks up a type schema.
    #[must_use]
    pub fn get(&self, name: KeywordId) -> Option<&FactTypeSchema> {
        self.types.get(&name)
    }

    /// Returns true if the type is declared.
    #[must_use]
    pub fn contains(&self, name: KeywordId) -> bool {
        self.types.contains_key(&name)
    }

    /// Returns the number of declared types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Validates a fact payload against its declared type and returns the
    /// normalized fact with defaults applied.
    ///
    /// # Errors
    /// Returns `UnknownFactType`, `UnknownField`, `MissingField`, or
    /// `TypeMismatch` on the first violation found.
    pub fn validate(&self, fact: &Fact) -> Result<Fact> {
        let Some(schema) = self.types.get(&fact.fact_type) else {
            return Err(Error::unknown_fact_type(fact.fact_type));
        };

        for (field, value) in fact.iter() {
            let Some(field_schema) = schema.field(*field) else {
                return Err(Error::unknown_field(fact.fact_type, *field));
            };
            if !field_schema.ty.admits(value) {
                return Err(
                    Error::type_mismatch(field_schema.ty, value.value_type())
                        .with_context(format!("field {field:?}")),
                );
            }
        }

        let mut normalized = fact.clone();
        for field_schema in &schema.fields {
            if normalized.has(field_schema.name) {
                continue;
            }
            match &field_schema.default {
                Some(default) => {
                    normalized = normalized.with_field(field_schema.name, default.clone());
                }
                None => {
                    return Err(Error::missing_field(fact.fact_type, field_schema.name));
                }
            }
        }

        Ok(normalized)
    }
}
