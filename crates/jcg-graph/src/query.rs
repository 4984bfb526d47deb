use jcg_core::NodeId;

use crate::node::ClassNode;
use crate::result::ScanResult;

/// A deduplicated, sorted set of node ids. Sorting makes `union`/
/// `intersect`/`difference` simple linear merges and keeps iteration order
/// deterministic regardless of how the set was built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet(Vec<NodeId>);

impl NodeSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_sorted(ids: Vec<NodeId>) -> Self {
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        Self(ids)
    }

    pub fn from_unsorted(mut ids: Vec<NodeId>) -> Self {
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    pub fn union(&self, other: &NodeSet) -> NodeSet {
        NodeSet(merge(&self.0, &other.0, |a, b| a || b))
    }

    pub fn intersect(&self, other: &NodeSet) -> NodeSet {
        NodeSet(merge(&self.0, &other.0, |a, b| a && b))
    }

    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        NodeSet(merge(&self.0, &other.0, |a, b| a && !b))
    }
}

/// Merges two sorted id slices, keeping an id when `keep(in_a, in_b)` holds.
fn merge(a: &[NodeId], b: &[NodeId], keep: impl Fn(bool, bool) -> bool) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        match (a.get(i), b.get(j)) {
            (Some(&x), Some(&y)) if x == y => {
                if keep(true, true) {
                    out.push(x);
                }
                i += 1;
                j += 1;
            }
            (Some(&x), Some(&y)) if x < y => {
                if keep(true, false) {
                    out.push(x);
                }
                i += 1;
            }
            (Some(_), Some(_)) => {
                if keep(false, true) {
                    out.push(b[j]);
                }
                j += 1;
            }
            (Some(&x), None) => {
                if keep(true, false) {
                    out.push(x);
                }
                i += 1;
            }
            (None, Some(&y)) => {
                if keep(false, true) {
                    out.push(y);
                }
                j += 1;
            }
            (None, None) => unreachable!(),
        }
    }
    out
}

/// A predicate over a [`ClassNode`], used by [`Query::filter`]. Distinct from
/// [`crate::Filter`], which is the include/exclude rule set applied at graph
/// construction time rather than an ad hoc query-time predicate.
pub type NodePredicate<'a> = Box<dyn Fn(&ClassNode) -> bool + 'a>;

/// Entry point for building [`NodeSet`]s out of a [`ScanResult`] by name,
/// by predicate, or by reachability, then combining them with set algebra.
pub struct Query<'a> {
    result: &'a ScanResult,
}

impl<'a> Query<'a> {
    pub(crate) fn new(result: &'a ScanResult) -> Self {
        Self { result }
    }

    pub fn all(&self) -> NodeSet {
        NodeSet::from_sorted((0..self.result.nodes().len()).map(NodeId::from_usize).collect())
    }

    pub fn by_name(&self, names: impl IntoIterator<Item = &'a str>) -> NodeSet {
        let ids: Vec<NodeId> = names
            .into_iter()
            .filter_map(|n| self.result.node_by_name(n).map(|node| node.id))
            .collect();
        NodeSet::from_unsorted(ids)
    }

    pub fn filter(&self, predicate: NodePredicate<'_>) -> NodeSet {
        let ids: Vec<NodeId> = self
            .result
            .nodes()
            .iter()
            .filter(|n| predicate(n))
            .map(|n| n.id)
            .collect();
        NodeSet::from_sorted(ids)
    }

    pub fn reachable_from(&self, roots: &NodeSet) -> NodeSet {
        self.result.reachable_from(roots.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[usize]) -> NodeSet {
        NodeSet::from_unsorted(ids.iter().map(|&i| NodeId::from_usize(i)).collect())
    }

    #[test]
    fn union_intersect_difference() {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3, 4]);
        assert_eq!(a.union(&b), set(&[1, 2, 3, 4]));
        assert_eq!(a.intersect(&b), set(&[2, 3]));
        assert_eq!(a.difference(&b), set(&[1]));
        assert_eq!(b.difference(&a), set(&[4]));
    }

    #[test]
    fn contains_uses_binary_search() {
        let s = set(&[5, 10, 15]);
        assert!(s.contains(NodeId::from_usize(10)));
        assert!(!s.contains(NodeId::from_usize(11)));
    }
}
