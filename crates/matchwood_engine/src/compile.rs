//! Lowers a rule-set description into the shared node graph.
//!
//! Sharing is what amortizes re-evaluation across rules: alpha nodes are
//! deduplicated on (fact type, constraint chain) and join nodes on
//! (left producer, right input, tests), so identical rule prefixes run
//! once per fact event no matter how many rules end in them.

use std::collections::{HashMap, HashSet};

use matchwood_foundation::{Error, Interner, KeywordId, Result, Value};
use matchwood_store::{FactTypeSchema, FieldSchema, TypeRegistry};

use crate::alpha::{AlphaNode, CmpOp, Constraint};
use crate::join::{JoinNode, JoinTest};
use crate::network::{ReteNetwork, RuleInfo};
use crate::node::{Node, NodeId, Side, Successor, TerminalNode};
use crate::ruleset::{PatternDecl, RhsDecl, RuleDecl, RuleSet};

/// Everything a session needs from a build: the network plus the interner
/// and type registry that give its ids meaning.
#[derive(Clone, Debug)]
pub struct CompiledNetwork {
    /// The ready-to-run matching network.
    pub network: ReteNetwork,
    /// Declared fact types, for working-memory validation.
    pub registry: TypeRegistry,
    /// Interner holding every type, field, rule, and group name.
    pub interner: Interner,
}

/// Alpha dedup signature: fact type plus the exact constraint chain.
type AlphaSig = (KeywordId, Vec<(KeywordId, CmpOp, Value)>);

/// Join dedup signature: left producer, right input, and tests.
type JoinSig = (NodeId, NodeId, Vec<JoinTest>);

/// Builds a [`ReteNetwork`] from a [`RuleSet`].
pub struct NetworkBuilder {
    interner: Interner,
    registry: TypeRegistry,
    network: ReteNetwork,
    alpha_cache: HashMap<AlphaSig, NodeId>,
    join_cache: HashMap<JoinSig, NodeId>,
}

impl NetworkBuilder {
    /// Builds the network, validating the description as it goes.
    ///
    /// # Errors
    /// Returns `InvalidRuleSet` on unknown types or fields, join tests
    /// referencing the current or a later pattern, rules without
    /// patterns, and duplicate type or rule names.
    pub fn build(ruleset: &RuleSet) -> Result<CompiledNetwork> {
        let mut builder = Self {
            interner: Interner::new(),
            registry: TypeRegistry::new(),
            network: ReteNetwork::new(),
            alpha_cache: HashMap::new(),
            join_cache: HashMap::new(),
        };

        builder.declare_types(ruleset)?;
        builder.compile_rules(ruleset)?;

        Ok(CompiledNetwork {
            network: builder.network,
            registry: builder.registry,
            interner: builder.interner,
        })
    }

    fn declare_types(&mut self, ruleset: &RuleSet) -> Result<()> {
        for decl in &ruleset.types {
            let name = self.interner.intern(&decl.name);
            let mut schema = FactTypeSchema::new(name);
            for field in &decl.fields {
                let field_name = self.interner.intern(&field.name);
                let ty = field.ty.to_type();
                let field_schema = match &field.default {
                    Some(default) => {
                        FieldSchema::optional(field_name, ty, default.to_value(&mut self.interner))
                    }
                    None => FieldSchema::required(field_name, ty),
                };
                schema = schema.with_field(field_schema);
            }
            self.registry
                .register(schema)
                .map_err(|_| Error::invalid_rule_set(format!("fact type '{}' declared twice", decl.name)))?;
        }
        Ok(())
    }

    fn compile_rules(&mut self, ruleset: &RuleSet) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, rule) in ruleset.rules.iter().enumerate() {
            if !seen.insert(rule.name.clone()) {
                return Err(Error::invalid_rule_set(format!(
                    "rule '{}' declared twice",
                    rule.name
                )));
            }
            if !rule.enabled {
                continue;
            }
            if rule.patterns.is_empty() {
                return Err(Error::invalid_rule_set(format!(
                    "rule '{}' has no patterns",
                    rule.name
                )));
            }

            #[allow(clippy::cast_possible_truncation)]
            self.compile_rule(rule, index as u32)?;
        }
        Ok(())
    }

    fn compile_rule(&mut self, rule: &RuleDecl, declaration: u32) -> Result<()> {
        let patterns = &rule.patterns;
        let name = self.interner.intern(&rule.name);
        let group = match &rule.group {
            Some(group) => self.interner.intern(group),
            None => KeywordId::MAIN,
        };

        // Chain head: the first pattern's alpha produces unit tokens
        let (first_alpha, _) = self.alpha_for(rule, 0, &patterns[0])?;
        let mut producer = first_alpha;

        for (position, pattern) in patterns.iter().enumerate().skip(1) {
            let (right_alpha, join_tests) = self.alpha_for(rule, position, pattern)?;
            producer = self.join_for(producer, right_alpha, join_tests, position)?;
        }

        let rule_id = self.network.push_rule(RuleInfo {
            name,
            salience: rule.salience,
            group,
            declaration,
            terminal: NodeId(u32::MAX), // patched below
        });
        let terminal = self.network.push_node(Node::Terminal(TerminalNode::new(rule_id)));
        self.network.set_rule_terminal(rule_id, terminal)?;

        if patterns.len() == 1 {
            self.network.add_alpha_successor(
                producer,
                Successor {
                    node: terminal,
                    side: Side::Left,
                },
            )?;
        } else {
            self.network.add_join_successor(producer, terminal)?;
        }
        Ok(())
    }

    /// Resolves a pattern into its (shared) alpha node and the join
    /// tests it contributes.
    fn alpha_for(
        &mut self,
        rule: &RuleDecl,
        position: usize,
        pattern: &PatternDecl,
    ) -> Result<(NodeId, Vec<JoinTest>)> {
        let fact_type = self.interner.intern(&pattern.fact_type);
        if self.registry.get(fact_type).is_none() {
            return Err(Error::invalid_rule_set(format!(
                "rule '{}': unknown fact type '{}'",
                rule.name, pattern.fact_type
            )));
        }

        let mut constraints = Vec::new();
        let mut join_tests = Vec::new();
        for test in &pattern.tests {
            let field = self.field_of(rule, &pattern.fact_type, &test.field)?;
            match &test.rhs {
                RhsDecl::Literal(literal) => {
                    let operand = literal.to_value(&mut self.interner);
                    constraints.push(Constraint::new(field, test.op, operand));
                }
                RhsDecl::Field {
                    pattern: peer,
                    field: peer_field,
                } => {
                    if *peer >= position {
                        return Err(Error::invalid_rule_set(format!(
                            "rule '{}': pattern {position} joins against pattern {peer}, \
                             which is not earlier in the rule",
                            rule.name
                        )));
                    }
                    let peer_type = &rule.patterns[*peer].fact_type;
                    let left_field = self.field_of(rule, peer_type, peer_field)?;
                    // Decl reads current-op-peer; join tests evaluate
                    // left-op-right, so the operator flips
                    join_tests.push(JoinTest {
                        left_pattern: *peer,
                        left_field,
                        op: test.op.mirror(),
                        right_field: field,
                    });
                }
            }
        }

        let sig: AlphaSig = (
            fact_type,
            constraints
                .iter()
                .map(|c| (c.field, c.op, c.operand.clone()))
                .collect(),
        );
        let alpha = if let Some(&existing) = self.alpha_cache.get(&sig) {
            existing
        } else {
            let node = self
                .network
                .push_node(Node::Alpha(AlphaNode::new(fact_type, constraints)));
            self.network.register_type(fact_type, node);
            self.alpha_cache.insert(sig, node);
            node
        };
        Ok((alpha, join_tests))
    }

    /// Resolves or creates the join of `producer` with `right_alpha`.
    fn join_for(
        &mut self,
        producer: NodeId,
        right_alpha: NodeId,
        tests: Vec<JoinTest>,
        position: usize,
    ) -> Result<NodeId> {
        let sig: JoinSig = (producer, right_alpha, tests.clone());
        if let Some(&existing) = self.join_cache.get(&sig) {
            return Ok(existing);
        }

        let join = JoinNode::new(position, right_alpha, tests);
        let indexed = join.indexed_test().cloned();
        let node = self.network.push_node(Node::Join(join));

        // Left input: unit tokens for position 1, join output otherwise
        if position == 1 {
            self.network.add_alpha_successor(
                producer,
                Successor {
                    node,
                    side: Side::Left,
                },
            )?;
        } else {
            self.network.add_join_successor(producer, node)?;
        }
        // Right input: the alpha's fact stream
        self.network.add_alpha_successor(
            right_alpha,
            Successor {
                node,
                side: Side::Right,
            },
        )?;
        // Hash-index the right memory on the equality join key
        if let Some(test) = indexed {
            self.network.register_alpha_index(right_alpha, test.right_field)?;
        }

        self.join_cache.insert(sig, node);
        Ok(node)
    }

    fn field_of(
        &mut self,
        rule: &RuleDecl,
        type_name: &str,
        field_name: &str,
    ) -> Result<KeywordId> {
        let type_kw = self.interner.intern(type_name);
        let field_kw = self.interner.intern(field_name);
        let declared = self
            .registry
            .get(type_kw)
            .is_some_and(|schema| schema.field(field_kw).is_some());
        if declared {
            Ok(field_kw)
        } else {
            Err(Error::invalid_rule_set(format!(
                "rule '{}': fact type '{type_name}' has no field '{field_name}'",
                rule.name
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
