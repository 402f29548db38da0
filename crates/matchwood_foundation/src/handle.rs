//! Fact identifiers with generational indices.

use std::fmt;

/// Fact identifier with generational index for stale reference detection.
///
/// The generation counter increments when a fact slot is reused after
/// retraction, so a handle held across a retract is detected as stale
/// instead of silently reading an unrelated fact.
///
/// # Layout
/// - `index`: 64-bit index into the fact arena
/// - `generation`: 32-bit generation counter
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FactHandle {
    /// Index into the fact arena.
    pub index: u64,
    /// Generation counter for stale reference detection.
    pub generation: u32,
}

impl FactHandle {
    /// Creates a new fact handle with the given index and generation.
    #[must_use]
    pub const fn new(index: u64, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns a sentinel value representing "no fact".
    ///
    /// This uses `u64::MAX` as the index, which is never allocated.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            index: u64::MAX,
            generation: 0,
        }
    }

    /// Returns true if this is the null sentinel value.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == u64::MAX
    }
}

impl fmt::Debug for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "FactHandle(null)")
        } else {
            write!(f, "FactHandle({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Fact(null)")
        } else {
            write!(f, "Fact({})", self.index)
        }
    }
}
