//! Shared name types and string interning.

use lasso::{Key, Spur, ThreadedRodeo};
use smol_str::SmolStr;

/// A lightweight owned dotted class/package name.
///
/// Backed by [`smol_str::SmolStr`], which stores short strings inline and
/// avoids heap allocation for the vast majority of real-world class names.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Name(SmolStr);

impl Name {
    #[inline]
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Convert a `/`-separated internal (JVM) name to the dotted public form.
    pub fn from_internal(internal: &str) -> Self {
        if internal.contains('/') {
            Self::new(internal.replace('/', "."))
        } else {
            Self::new(internal)
        }
    }
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Name").field(&self.0.as_str()).finish()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::borrow::Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// A symbolic identifier for a name stored in a [`NameInterner`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct InternedName(Spur);

impl InternedName {
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0.into_usize() as u32
    }
}

impl std::fmt::Debug for InternedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InternedName({})", self.to_raw())
    }
}

/// A concurrent string interner for class/package names.
///
/// Many scan workers resolve and intern names while the linker phase runs
/// (§5: "many readers, rare writers — a concurrent map is required"); this
/// wraps [`lasso::ThreadedRodeo`], which is safe to share across threads
/// behind a single `&` reference without external locking.
#[derive(Default)]
pub struct NameInterner {
    rodeo: ThreadedRodeo,
}

impl NameInterner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&self, text: &str) -> InternedName {
        InternedName(self.rodeo.get_or_intern(text))
    }

    #[inline]
    pub fn get(&self, text: &str) -> Option<InternedName> {
        self.rodeo.get(text).map(InternedName)
    }

    #[inline]
    pub fn resolve(&self, name: InternedName) -> &str {
        self.rodeo.resolve(&name.0)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_deduplicates() {
        let interner = NameInterner::new();
        let a = interner.intern("p.A");
        let b = interner.intern("p.B");
        let a_again = interner.intern("p.A");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "p.A");
    }

    #[test]
    fn from_internal_replaces_slashes() {
        assert_eq!(Name::from_internal("p/A").as_str(), "p.A");
        assert_eq!(Name::from_internal("NoPackage").as_str(), "NoPackage");
    }
}
