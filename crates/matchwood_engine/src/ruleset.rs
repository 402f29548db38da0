//! The compiled rule network description.
//!
//! This is the engine's input contract: an external compiler (out of
//! scope here) lowers rule source into these declaration types, which
//! arrive with string names and serde-friendly literals. The builder
//! interns every name and validates the description before any matching
//! happens — at runtime only interned ids and [`Value`]s exist.
//!
//! A `TestDecl` reads from the current pattern's point of view:
//! `field op rhs`, where the rhs is either a literal or a field of an
//! earlier pattern in the same rule.

use serde::{Deserialize, Serialize};

use matchwood_foundation::{Interner, Type, Value};

use crate::alpha::CmpOp;

// =============================================================================
// Literals
// =============================================================================

/// A literal operand in the description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralDecl {
    /// The nil value.
    Nil,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Keyword literal (interned at build time).
    Keyword(String),
}

impl LiteralDecl {
    /// Converts the literal to a runtime value, interning keywords.
    #[must_use]
    pub fn to_value(&self, interner: &mut Interner) -> Value {
        match self {
            Self::Nil => Value::Nil,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::Int(*n),
            Self::Float(n) => Value::Float(*n),
            Self::String(s) => Value::from(s.as_str()),
            Self::Keyword(k) => Value::Keyword(interner.intern(k)),
        }
    }
}

// =============================================================================
// Type Declarations
// =============================================================================

/// Serde-friendly type tag for field declarations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    /// Any value.
    Any,
    /// The nil value.
    Nil,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Float.
    Float,
    /// String.
    String,
    /// Keyword.
    Keyword,
    /// Reference to another fact.
    FactRef,
    /// Vector.
    Vec,
    /// Map.
    Map,
}

impl TypeTag {
    /// Converts to the runtime type descriptor.
    #[must_use]
    pub const fn to_type(self) -> Type {
        match self {
            Self::Any => Type::Any,
            Self::Nil => Type::Nil,
            Self::Bool => Type::Bool,
            Self::Int => Type::Int,
            Self::Float => Type::Float,
            Self::String => Type::String,
            Self::Keyword => Type::Keyword,
            Self::FactRef => Type::FactRef,
            Self::Vec => Type::Vec,
            Self::Map => Type::Map,
        }
    }
}

/// A field of a declared fact type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeTag,
    /// Default value; absent means the field is required.
    #[serde(default)]
    pub default: Option<LiteralDecl>,
}

/// A declared fact type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Type name.
    pub name: String,
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl TypeDecl {
    /// Creates a type declaration with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: TypeTag) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    /// Adds an optional field with a default.
    #[must_use]
    pub fn with_default_field(
        mut self,
        name: impl Into<String>,
        ty: TypeTag,
        default: LiteralDecl,
    ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            default: Some(default),
        });
        self
    }
}

// =============================================================================
// Rule Declarations
// =============================================================================

/// Right-hand side of a pattern test.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RhsDecl {
    /// Compare against a literal (becomes an alpha constraint).
    Literal(LiteralDecl),
    /// Compare against a field of an earlier pattern (becomes a beta
    /// join test).
    Field {
        /// 0-based index of the earlier pattern in the same rule.
        pattern: usize,
        /// Field of that pattern's fact.
        field: String,
    },
}

/// One test within a pattern: `field op rhs`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestDecl {
    /// Field of the current pattern's fact.
    pub field: String,
    /// Comparison operator.
    pub op: CmpOp,
    /// Literal or earlier-pattern operand.
    pub rhs: RhsDecl,
}

impl TestDecl {
    /// Creates a literal test.
    #[must_use]
    pub fn literal(field: impl Into<String>, op: CmpOp, literal: LiteralDecl) -> Self {
        Self {
            field: field.into(),
            op,
            rhs: RhsDecl::Literal(literal),
        }
    }

    /// Creates a join test against an earlier pattern's field.
    #[must_use]
    pub fn join(
        field: impl Into<String>,
        op: CmpOp,
        pattern: usize,
        peer_field: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            op,
            rhs: RhsDecl::Field {
                pattern,
                field: peer_field.into(),
            },
        }
    }
}

/// One condition of a rule: a fact type plus its tests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternDecl {
    /// The fact type to match.
    pub fact_type: String,
    /// Tests on the matched fact.
    #[serde(default)]
    pub tests: Vec<TestDecl>,
}

impl PatternDecl {
    /// Creates a pattern matching every fact of a type.
    #[must_use]
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            tests: Vec::new(),
        }
    }

    /// Adds a test.
    #[must_use]
    pub fn with_test(mut self, test: TestDecl) -> Self {
        self.tests.push(test);
        self
    }
}

const fn default_enabled() -> bool {
    true
}

/// A compiled rule declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleDecl {
    /// Rule name, unique within the set.
    pub name: String,
    /// Priority; higher fires first.
    #[serde(default)]
    pub salience: i32,
    /// Agenda group; `None` means the `main` group.
    #[serde(default)]
    pub group: Option<String>,
    /// Disabled rules are excluded from the built network.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Conditions, all of which must hold.
    pub patterns: Vec<PatternDecl>,
}

impl RuleDecl {
    /// Creates an enabled rule with default salience in the main group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            salience: 0,
            group: None,
            enabled: true,
            patterns: Vec::new(),
        }
    }

    /// Sets the salience.
    #[must_use]
    pub fn with_salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    /// Sets the agenda group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Disables the rule.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Adds a pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternDecl) -> Self {
        self.patterns.push(pattern);
        self
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// A complete rule network description: declared fact types plus rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleSet {
    /// Declared fact types.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration.
    #[must_use]
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    /// Adds a rule declaration.
    #[must_use]
    pub fn with_rule(mut self, decl: RuleDecl) -> Self {
        self.rules.push(decl);
        self
    }
}
