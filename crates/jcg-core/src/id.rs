//! Strongly-typed IDs used across the scan pipeline.
//!
//! Cyclic class graphs are represented as flat, id-indexed arrays rather than
//! pointer/`Rc` graphs (Design Notes: "cyclic graphs → id-indexed flat
//! arrays"). Each id below is a thin `u32` newtype so a `NodeId` can never be
//! mistaken for a `RootId` at a call site, while staying `Copy` and cheap to
//! pass around worker threads.

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub fn from_usize(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id! {
    /// Identifies a `ResourceRoot` within a scan's ordered classpath.
    RootId
}

define_id! {
    /// Identifies a `ClassFileEntry` within the flat entry table built during
    /// classpath resolution, global across all roots.
    EntryId
}

define_id! {
    /// Identifies a `ClassNode` in a `ScanResult`'s node array.
    NodeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_usize() {
        let id = NodeId::from_usize(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.raw(), 42);
    }

    #[test]
    fn distinct_id_types_are_not_interchangeable() {
        let node = NodeId::new(1);
        let root = RootId::new(1);
        assert_eq!(node.raw(), root.raw());
        assert_ne!(format!("{:?}", node), format!("{:?}", root));
    }
}
