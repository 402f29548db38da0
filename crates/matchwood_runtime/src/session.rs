//! The rule engine session: the top-level façade coordinating working
//! memory, the network, the agenda, and truth maintenance.
//!
//! One session is one logical thread of control. External mutations
//! propagate synchronously — every insert/update/retract has fully
//! updated the network and agenda before it returns — and firing is
//! driven exclusively by [`Session::fire_all_rules`], which pops
//! activations one at a time and applies each consequence's effects
//! strictly between pops.

use std::collections::HashMap;

use matchwood_engine::{
    Activation, Agenda, ConflictConfig, FiringKey, MatchEvent, NetworkBuilder, ReteNetwork,
    RuleSet, TruthMaintenance,
};
use matchwood_foundation::{Error, FactHandle, Interner, KeywordId, Result};
use matchwood_store::{AssertMode, Fact, FactStore};

use crate::config::SessionConfig;
use crate::effect::{Consequence, Effect, RuleMatch};
use crate::trace::{EngineEvent, TraceBuffer};

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting mutations; not currently firing.
    Idle,
    /// Inside `fire_all_rules`.
    Firing,
    /// Disposed by the caller; every operation fails from here on.
    Disposed,
    /// A consistency error occurred; the session must be disposed.
    Poisoned,
}

/// Why `fire_all_rules` stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Halt {
    /// No eligible activation remained in any staged group.
    Quiescent,
    /// The firing cap was reached with work still pending. Non-fatal;
    /// the session stays usable.
    IterationLimit,
    /// A consequence requested a halt.
    Halted,
}

/// Result of a `fire_all_rules` run.
#[derive(Copy, Clone, Debug)]
pub struct FireOutcome {
    /// Number of activations fired.
    pub fired: usize,
    /// Why the loop stopped.
    pub halt: Halt,
}

// =============================================================================
// Session
// =============================================================================

/// A rule engine session over one compiled rule set.
pub struct Session {
    store: FactStore,
    network: ReteNetwork,
    agenda: Agenda,
    tms: TruthMaintenance,
    interner: Interner,
    consequences: HashMap<KeywordId, Box<dyn Consequence>>,
    trace: TraceBuffer,
    state: SessionState,
    halt_requested: bool,
}

impl Session {
    /// Builds a session from a rule-set description.
    ///
    /// # Errors
    /// Returns `InvalidRuleSet` if the description fails validation.
    pub fn build(ruleset: &RuleSet, config: &SessionConfig) -> Result<Self> {
        let compiled = NetworkBuilder::build(ruleset)?;
        let conflict = ConflictConfig::new()
            .with_recency(config.recency)
            .with_tie_break(config.tie_break);

        Ok(Self {
            store: FactStore::new(compiled.registry, config.identity),
            network: compiled.network,
            agenda: Agenda::new(conflict),
            tms: TruthMaintenance::new(),
            interner: compiled.interner,
            consequences: HashMap::new(),
            trace: TraceBuffer::new(config.trace_capacity),
            state: SessionState::Idle,
            halt_requested: false,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The session's interner (type, field, rule, and group names).
    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Mutable interner access, for callers assembling fact payloads.
    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The engine trace.
    #[must_use]
    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    /// The matching network (read-only; useful for inspection).
    #[must_use]
    pub fn network(&self) -> &ReteNetwork {
        &self.network
    }

    /// Number of live facts in working memory.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.store.len()
    }

    /// Number of pending activations across all groups.
    #[must_use]
    pub fn pending_activations(&self) -> usize {
        self.agenda.len()
    }

    /// Gets a live fact's payload.
    #[must_use]
    pub fn get(&self, handle: FactHandle) -> Option<&Fact> {
        self.store.get(handle)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Registers the consequence for a rule, replacing any previous one.
    ///
    /// A rule without a consequence still activates and fires; the
    /// firing just has no effects.
    ///
    /// # Errors
    /// Returns `InvalidRuleSet` if no rule with this name exists.
    pub fn on_rule(&mut self, name: &str, consequence: impl Consequence + 'static) -> Result<()> {
        let kw = self.interner.intern(name);
        if self.network.rule_by_name(kw).is_none() {
            return Err(Error::invalid_rule_set(format!("unknown rule '{name}'")));
        }
        self.consequences.insert(kw, Box::new(consequence));
        Ok(())
    }

    /// Pushes an agenda group onto the focus stack.
    ///
    /// # Errors
    /// Returns `SessionDisposed` after disposal.
    pub fn set_focus(&mut self, group: &str) -> Result<()> {
        self.ensure_usable()?;
        let kw = self.interner.intern(group);
        self.agenda.set_focus(kw);
        self.trace.push(EngineEvent::FocusChanged { group: kw });
        Ok(())
    }

    // =========================================================================
    // Working Memory
    // =========================================================================

    /// Inserts a stated fact and synchronously propagates it.
    ///
    /// # Errors
    /// Returns schema validation errors, `DuplicateFact` under equality
    /// identity, `ConflictingAssertionMode` if an equal fact is live as
    /// a logical consequence, or `SessionDisposed` after disposal.
    pub fn insert(&mut self, fact: Fact) -> Result<FactHandle> {
        self.ensure_usable()?;
        self.insert_stated(fact)
    }

    /// Replaces a fact's payload and synchronously re-propagates it.
    ///
    /// For matching this is a retract followed by a reinsert that keeps
    /// the handle valid.
    ///
    /// # Errors
    /// Returns identity or schema errors, or `SessionDisposed`.
    pub fn update(&mut self, handle: FactHandle, fact: Fact) -> Result<()> {
        self.ensure_usable()?;
        self.store.update(handle, fact)?;
        self.trace.push(EngineEvent::FactUpdated { handle });
        self.flush()
    }

    /// Retracts a fact and synchronously propagates the removal.
    ///
    /// Every activation whose token contains the fact is cancelled (or,
    /// if already fired, has its logical consequences withdrawn).
    ///
    /// # Errors
    /// Returns `UnknownFact`/`StaleHandle` for dead handles, or
    /// `SessionDisposed`.
    pub fn retract(&mut self, handle: FactHandle) -> Result<()> {
        self.ensure_usable()?;
        self.store.retract(handle)?;
        self.tms.forget(handle);
        self.trace.push(EngineEvent::FactRetracted { handle });
        self.flush()
    }

    // =========================================================================
    // Firing
    // =========================================================================

    /// Fires eligible activations until quiescence, a halt request, or
    /// the firing cap.
    ///
    /// # Errors
    /// Returns `ConsequenceFault` if a consequence fails (the session
    /// stays usable; effects applied before the fault remain), or a
    /// fatal `Consistency` error (the session is poisoned and must be
    /// disposed).
    pub fn fire_all_rules(&mut self, max_firings: Option<usize>) -> Result<FireOutcome> {
        self.ensure_usable()?;
        self.state = SessionState::Firing;
        self.halt_requested = false;

        let mut fired = 0usize;
        let halt = loop {
            if self.halt_requested {
                break Halt::Halted;
            }
            if max_firings.is_some_and(|limit| fired >= limit) {
                break if self.agenda.has_eligible() {
                    Halt::IterationLimit
                } else {
                    Halt::Quiescent
                };
            }
            let Some(activation) = self.agenda.fire_next() else {
                break Halt::Quiescent;
            };
            match self.fire(activation) {
                Ok(()) => fired += 1,
                Err(error) => {
                    if self.state == SessionState::Firing {
                        self.state = SessionState::Idle;
                    }
                    return Err(error);
                }
            }
        };

        self.state = SessionState::Idle;
        Ok(FireOutcome { fired, halt })
    }

    /// Releases the session. Idempotent; every later operation fails
    /// with `SessionDisposed`. Memories and the justification graph are
    /// dropped wholesale, never partially.
    pub fn dispose(&mut self) {
        self.state = SessionState::Disposed;
        self.consequences.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_usable(&self) -> Result<()> {
        match self.state {
            SessionState::Disposed => Err(Error::session_disposed()),
            SessionState::Poisoned => Err(Error::session_disposed()
                .with_context("session poisoned by a consistency error")),
            SessionState::Idle | SessionState::Firing => Ok(()),
        }
    }

    /// Marks the session poisoned on fatal errors, passing the error on.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_fatal() {
                self.state = SessionState::Poisoned;
            }
        }
        result
    }

    fn insert_stated(&mut self, fact: Fact) -> Result<FactHandle> {
        let normalized = self.store.normalize(&fact)?;
        if let Some(existing) = self.store.lookup_equal(&normalized) {
            if self.store.mode(existing) == Some(AssertMode::Logical) {
                return Err(Error::conflicting_assertion_mode(existing));
            }
        }
        let fact_type = normalized.fact_type;
        let handle = self.store.insert(normalized)?;
        self.trace
            .push(EngineEvent::FactInserted { handle, fact_type });
        self.flush()?;
        Ok(handle)
    }

    fn insert_logical(&mut self, key: FiringKey, rule: KeywordId, fact: Fact) -> Result<()> {
        let normalized = self.store.normalize(&fact)?;
        if let Some(existing) = self.store.lookup_equal(&normalized) {
            return match self.store.mode(existing) {
                Some(AssertMode::Logical) => {
                    // Equal logical fact: merge justifications instead of
                    // inserting a duplicate
                    self.tms.justify(key, existing);
                    self.trace.push(EngineEvent::LogicalInserted {
                        rule,
                        handle: existing,
                    });
                    Ok(())
                }
                _ => Err(Error::conflicting_assertion_mode(existing)),
            };
        }

        let handle = self
            .store
            .insert_with_mode(normalized, AssertMode::Logical)?;
        self.tms.justify(key, handle);
        self.trace.push(EngineEvent::LogicalInserted { rule, handle });
        self.flush()
    }

    /// Fires one activation: builds the match context, runs the
    /// consequence, applies its effects in order.
    fn fire(&mut self, activation: Activation) -> Result<()> {
        let chain = {
            let result = self.network.token_chain(activation.token);
            self.guard(result)?
        };
        let mut facts = Vec::with_capacity(chain.len());
        for handle in chain {
            let fact = {
                let result = self.store.get(handle).cloned().ok_or_else(|| {
                    Error::consistency(format!("fired token references dead fact {handle:?}"))
                });
                self.guard(result)?
            };
            facts.push((handle, fact));
        }
        let context = RuleMatch {
            rule: activation.rule_name,
            facts,
        };

        {
            let result = self.network.mark_fired(&activation);
            self.guard(result)?;
        }
        self.trace.push(EngineEvent::RuleFired {
            rule: activation.rule_name,
            activation: activation.id,
        });

        let effects = match self.consequences.get(&activation.rule_name) {
            Some(consequence) => match consequence.fire(&context) {
                Ok(effects) => effects,
                Err(error) => {
                    return Err(Error::consequence_fault(
                        activation.rule_name,
                        error.to_string(),
                    ));
                }
            },
            None => Vec::new(),
        };

        let key = FiringKey {
            rule: activation.rule,
            token: activation.token,
        };
        for effect in effects {
            self.apply_effect(key, activation.rule_name, effect)?;
        }
        Ok(())
    }

    /// Applies one effect of a firing. Earlier effects of the same
    /// firing stay applied if a later one fails (no implicit
    /// transaction).
    fn apply_effect(&mut self, key: FiringKey, rule: KeywordId, effect: Effect) -> Result<()> {
        let result = match effect {
            Effect::Insert(fact) => self.insert_stated(fact).map(|_| ()),
            Effect::InsertLogical(fact) => self.insert_logical(key, rule, fact),
            Effect::Update(handle, fact) => {
                let result = self.store.update(handle, fact);
                if result.is_ok() {
                    self.trace.push(EngineEvent::FactUpdated { handle });
                }
                result.and_then(|()| self.flush())
            }
            Effect::Retract(handle) => {
                let result = self.store.retract(handle).map(|_| ());
                if result.is_ok() {
                    self.tms.forget(handle);
                    self.trace.push(EngineEvent::FactRetracted { handle });
                }
                result.and_then(|()| self.flush())
            }
            Effect::SetFocus(group) => {
                let kw = self.interner.intern(&group);
                self.agenda.set_focus(kw);
                self.trace.push(EngineEvent::FocusChanged { group: kw });
                Ok(())
            }
            Effect::Halt => {
                self.halt_requested = true;
                self.trace.push(EngineEvent::Halted);
                Ok(())
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                if error.is_fatal() {
                    self.state = SessionState::Poisoned;
                }
                // Invalid effects keep their own taxonomy (identity and
                // mode errors reach the caller undisguised); only errors
                // raised inside the consequence itself become faults
                Err(error)
            }
        }
    }

    /// Drains the store's event queue through the network, applying the
    /// resulting match events to the agenda and truth maintenance. All
    /// effects of one event complete before the next is processed.
    fn flush(&mut self) -> Result<()> {
        while let Some(event) = self.store.pop_event() {
            let match_events = {
                let result = self.network.handle_event(&self.store, &event);
                self.guard(result)?
            };
            for match_event in match_events {
                match match_event {
                    MatchEvent::Activated(activation) => {
                        self.trace.push(EngineEvent::ActivationCreated {
                            rule: activation.rule_name,
                            activation: activation.id,
                        });
                        self.agenda.add(activation);
                    }
                    MatchEvent::Cancelled {
                        activation, rule, ..
                    } => {
                        self.agenda.cancel(activation);
                        if let Some(info) = self.network.rule(rule) {
                            self.trace.push(EngineEvent::ActivationCancelled {
                                rule: info.name,
                                activation,
                            });
                        }
                    }
                    MatchEvent::FiringUndone { key } => {
                        for handle in self.tms.withdraw(key) {
                            if self.store.exists(handle) {
                                self.store.retract(handle)?;
                                self.trace.push(EngineEvent::LogicalRetracted { handle });
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
