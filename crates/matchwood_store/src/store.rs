//! The working-memory fact arena.
//!
//! Facts live in a slot arena with generational handles: an odd
//! generation is live, an even one is free, and retracting bumps the
//! generation so stale handles are detected instead of reading a reused
//! slot. Every mutation pushes a [`PropagationEvent`] consumed by the
//! matching network in issue order.

// Allow u64 to usize casts - we target 64-bit systems
#![allow(clippy::cast_possible_truncation)]

use std::collections::{HashMap, VecDeque};

use matchwood_foundation::{Error, FactHandle, Result};

use crate::event::PropagationEvent;
use crate::fact::Fact;
use crate::schema::TypeRegistry;

/// How stated-fact identity is decided at insert time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IdentityMode {
    /// Every insert allocates a new fact, equal payloads included.
    #[default]
    Distinct,
    /// Inserting a payload equal to a live fact fails with
    /// `DuplicateFact`.
    Equality,
}

/// Whether a fact was stated by a caller or derived as a logical
/// consequence of a firing.
///
/// The two modes never mix on one handle: stated facts are not subject
/// to truth maintenance, logical facts are retracted automatically when
/// their last justification disappears.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssertMode {
    /// Asserted by an external caller (or a plain insert effect).
    Stated,
    /// Asserted as a logical consequence; owned by truth maintenance.
    Logical,
}

/// One arena slot.
#[derive(Clone, Debug)]
struct Slot {
    /// Generation counter; odd = live, even = free.
    generation: u32,
    /// The payload, present while live.
    fact: Option<Fact>,
    /// Assertion mode of the current occupant.
    mode: AssertMode,
}

/// The working-memory fact store.
///
/// Owns every live fact exclusively; all other components hold handles.
#[derive(Clone, Debug)]
pub struct FactStore {
    /// Slot arena indexed by handle index.
    slots: Vec<Slot>,
    /// Free slot indices available for reuse.
    free_list: Vec<u64>,
    /// Count of live facts.
    live_count: usize,
    /// Identity behavior for stated inserts.
    identity: IdentityMode,
    /// Declared fact types; inserts are validated against this.
    registry: TypeRegistry,
    /// Live handles per payload, for equality identity and logical
    /// dedup. Insertion-ordered buckets keep lookups deterministic.
    equality_index: HashMap<Fact, Vec<FactHandle>>,
    /// Mutation events awaiting network propagation, in issue order.
    events: VecDeque<PropagationEvent>,
}

impl FactStore {
    /// Creates an empty store over the given type registry.
    #[must_use]
    pub fn new(registry: TypeRegistry, identity: IdentityMode) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
            identity,
            registry,
            equality_index: HashMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Validates a payload against the registry and applies field
    /// defaults, without inserting it.
    ///
    /// # Errors
    /// Returns schema validation errors (`UnknownFactType`,
    /// `UnknownField`, `MissingField`, `TypeMismatch`).
    pub fn normalize(&self, fact: &Fact) -> Result<Fact> {
        self.registry.validate(fact)
    }

    /// Inserts a stated fact.
    ///
    /// # Errors
    /// Returns schema validation errors, or `DuplicateFact` under
    /// `IdentityMode::Equality` when an equal fact is already live.
    pub fn insert(&mut self, fact: Fact) -> Result<FactHandle> {
        self.insert_with_mode(fact, AssertMode::Stated)
    }

    /// Inserts a fact with an explicit assertion mode.
    ///
    /// Logical dedup (justification merging) happens above the store;
    /// by the time this is called the fact is genuinely new.
    ///
    /// # Errors
    /// Returns schema validation errors, or `DuplicateFact` under
    /// `IdentityMode::Equality` when an equal fact is already live.
    pub fn insert_with_mode(&mut self, fact: Fact, mode: AssertMode) -> Result<FactHandle> {
        let fact = self.registry.validate(&fact)?;

        if self.identity == IdentityMode::Equality {
            if let Some(existing) = self.lookup_equal(&fact) {
                return Err(Error::duplicate_fact(existing));
            }
        }

        let handle = self.allocate(fact.clone(), mode);
        self.equality_index
            .entry(fact.clone())
            .or_default()
            .push(handle);
        self.events
            .push_back(PropagationEvent::Inserted { handle, fact });
        Ok(handle)
    }

    /// Replaces a live fact's payload in place, preserving its handle.
    ///
    /// Matching treats this as retract+reinsert, which is exactly how the
    /// network consumes the resulting `Updated` event.
    ///
    /// # Errors
    /// Returns `UnknownFact`/`StaleHandle` for dead handles, schema
    /// validation errors, or `DuplicateFact` under equality identity.
    pub fn update(&mut self, handle: FactHandle, fact: Fact) -> Result<()> {
        self.validate(handle)?;
        let fact = self.registry.validate(&fact)?;

        if self.identity == IdentityMode::Equality {
            if let Some(existing) = self.lookup_equal(&fact) {
                if existing != handle {
                    return Err(Error::duplicate_fact(existing));
                }
            }
        }

        let slot = &mut self.slots[handle.index as usize];
        let old = slot
            .fact
            .replace(fact.clone())
            .ok_or_else(|| Error::consistency("live slot with no payload"))?;

        self.unindex(&old, handle);
        self.equality_index
            .entry(fact.clone())
            .or_default()
            .push(handle);
        self.events.push_back(PropagationEvent::Updated {
            handle,
            old,
            new: fact,
        });
        Ok(())
    }

    /// Retracts a live fact, invalidating its handle.
    ///
    /// Returns the retracted payload.
    ///
    /// # Errors
    /// Returns `UnknownFact` for never-allocated or free slots and
    /// `StaleHandle` for generation mismatches.
    pub fn retract(&mut self, handle: FactHandle) -> Result<Fact> {
        self.validate(handle)?;

        let slot = &mut self.slots[handle.index as usize];
        // Increment generation (was odd/live, now even/free)
        slot.generation += 1;
        let fact = slot
            .fact
            .take()
            .ok_or_else(|| Error::consistency("live slot with no payload"))?;
        self.free_list.push(handle.index);
        self.live_count -= 1;

        self.unindex(&fact, handle);
        self.events
            .push_back(PropagationEvent::Retracted { handle, fact: fact.clone() });
        Ok(fact)
    }

    /// Gets a live fact's payload.
    #[must_use]
    pub fn get(&self, handle: FactHandle) -> Option<&Fact> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation == handle.generation {
            slot.fact.as_ref()
        } else {
            None
        }
    }

    /// Gets a live fact's payload, distinguishing stale from unknown.
    ///
    /// # Errors
    /// Returns `UnknownFact` or `StaleHandle`.
    pub fn get_checked(&self, handle: FactHandle) -> Result<&Fact> {
        self.validate(handle)?;
        self.slots[handle.index as usize]
            .fact
            .as_ref()
            .ok_or_else(|| Error::consistency("live slot with no payload"))
    }

    /// Returns the assertion mode of a live fact.
    #[must_use]
    pub fn mode(&self, handle: FactHandle) -> Option<AssertMode> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation == handle.generation && slot.fact.is_some() {
            Some(slot.mode)
        } else {
            None
        }
    }

    /// Checks if a handle refers to a live fact.
    #[must_use]
    pub fn exists(&self, handle: FactHandle) -> bool {
        match self.slots.get(handle.index as usize) {
            Some(slot) => slot.generation == handle.generation && handle.generation % 2 == 1,
            None => false,
        }
    }

    /// Validates that a handle is live.
    ///
    /// # Errors
    /// Returns `UnknownFact` if never allocated or the slot is free,
    /// `StaleHandle` on a generation mismatch.
    pub fn validate(&self, handle: FactHandle) -> Result<()> {
        let Some(slot) = self.slots.get(handle.index as usize) else {
            return Err(Error::unknown_fact(handle));
        };

        if slot.generation != handle.generation {
            // Generation mismatch - fact was retracted and possibly reused
            return Err(Error::stale_handle(handle));
        }

        if slot.generation % 2 == 0 {
            // Even generation means the slot is free
            return Err(Error::unknown_fact(handle));
        }

        Ok(())
    }

    /// Finds a live fact equal to the given (normalized) payload.
    ///
    /// With duplicates allowed, the earliest-inserted live one wins.
    #[must_use]
    pub fn lookup_equal(&self, fact: &Fact) -> Option<FactHandle> {
        self.equality_index
            .get(fact)
            .and_then(|bucket| bucket.first().copied())
    }

    /// Pops the oldest pending propagation event.
    pub fn pop_event(&mut self) -> Option<PropagationEvent> {
        self.events.pop_front()
    }

    /// Returns the number of pending propagation events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of live facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over all live facts in handle-index order.
    pub fn iter(&self) -> impl Iterator<Item = (FactHandle, &Fact)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.fact
                .as_ref()
                .map(|fact| (FactHandle::new(idx as u64, slot.generation), fact))
        })
    }

    /// Returns the current generation for a slot index, if allocated.
    #[must_use]
    pub fn generation(&self, index: u64) -> Option<u32> {
        self.slots.get(index as usize).map(|s| s.generation)
    }

    fn allocate(&mut self, fact: Fact, mode: AssertMode) -> FactHandle {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            // Reuse a slot from the free list
            let slot = &mut self.slots[index as usize];
            // Increment generation (was even/free, now odd/live)
            slot.generation += 1;
            slot.fact = Some(fact);
            slot.mode = mode;
            FactHandle::new(index, slot.generation)
        } else {
            // Allocate a new slot; new facts start at generation 1 (odd = live)
            let index = self.slots.len() as u64;
            self.slots.push(Slot {
                generation: 1,
                fact: Some(fact),
                mode,
            });
            FactHandle::new(index, 1)
        }
    }

    fn unindex(&mut self, fact: &Fact, handle: FactHandle) {
        if let Some(bucket) = self.equality_index.get_mut(fact) {
            bucket.retain(|&h| h != handle);
            if bucket.is_empty() {
                self.equality_index.remove(fact);
            }
        }
    }
}
