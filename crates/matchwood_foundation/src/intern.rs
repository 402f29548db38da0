//! Keyword interning for type, field, rule, and group names.
//!
//! All names that cross the network boundary (fact types, field names,
//! rule names, agenda groups) are interned once at build time so the hot
//! matching path compares and hashes 32-bit ids instead of strings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interned keyword identifier.
///
/// Keywords name fact types (`order`), fields (`amount`), rules
/// (`rules/discount`), and agenda groups (`main`). They are interned for
/// fast comparison.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeywordId(pub(crate) u32);

impl KeywordId {
    /// Returns the raw index of this keyword.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    // =========================================================================
    // Reserved Keywords
    // =========================================================================
    // Always interned at startup with fixed indices.

    /// Reserved keyword for the default agenda group: `main`
    pub const MAIN: KeywordId = KeywordId(0);
}

impl fmt::Debug for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeywordId({})", self.0)
    }
}

/// Interner for keywords.
///
/// Maps strings to unique ids and back. Not thread-safe; each session
/// owns its own interner.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interner {
    /// Keyword string storage, indexed by `KeywordId`.
    keywords: Vec<Arc<str>>,
    /// Map from keyword string to `KeywordId`.
    keyword_map: HashMap<Arc<str>, KeywordId>,
}

impl Interner {
    /// Reserved keywords that are pre-interned at startup.
    const RESERVED_KEYWORDS: &'static [&'static str] = &[
        "main", // KeywordId(0) = MAIN
    ];

    /// Creates a new interner with reserved keywords pre-interned.
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self::default();

        for (i, &kw) in Self::RESERVED_KEYWORDS.iter().enumerate() {
            let id = interner.intern(kw);
            debug_assert_eq!(
                id.0 as usize, i,
                "Reserved keyword '{kw}' should have index {i}, got {}",
                id.0
            );
        }

        interner
    }

    /// Interns a keyword, returning its id.
    ///
    /// Interning the same string twice returns the same id.
    pub fn intern(&mut self, name: &str) -> KeywordId {
        if let Some(&id) = self.keyword_map.get(name) {
            return id;
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = KeywordId(self.keywords.len() as u32);
        let shared: Arc<str> = Arc::from(name);
        self.keywords.push(Arc::clone(&shared));
        self.keyword_map.insert(shared, id);
        id
    }

    /// Looks up a keyword id without interning.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<KeywordId> {
        self.keyword_map.get(name).copied()
    }

    /// Resolves a keyword id back to its string.
    #[must_use]
    pub fn resolve(&self, id: KeywordId) -> Option<&str> {
        self.keywords.get(id.0 as usize).map(AsRef::as_ref)
    }

    /// Returns the number of interned keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Returns true if no keywords beyond the reserved set are interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
