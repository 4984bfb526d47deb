use std::collections::{HashMap, VecDeque};

use jcg_core::NodeId;

use crate::node::{ClassNode, ConstantValue, Edge, EdgeKind, FieldRecord, MethodRecord};
use crate::query::{NodeSet, Query};

/// The frozen output of a [`crate::RelationshipLinker`]: every materialized
/// class node plus its direct edges, queryable by name or by reachability.
pub struct ScanResult {
    nodes: Vec<ClassNode>,
    by_name: HashMap<String, NodeId>,
    edges: Vec<Vec<Edge>>,
}

impl ScanResult {
    pub(crate) fn new(
        nodes: Vec<ClassNode>,
        by_name: HashMap<String, NodeId>,
        edges: Vec<Vec<Edge>>,
    ) -> Self {
        Self {
            nodes,
            by_name,
            edges,
        }
    }

    pub fn nodes(&self) -> &[ClassNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &ClassNode {
        &self.nodes[id.index()]
    }

    pub fn node_by_name(&self, name: &str) -> Option<&ClassNode> {
        self.by_name.get(name).map(|&id| self.node(id))
    }

    pub fn direct_edges(&self, id: NodeId) -> &[Edge] {
        &self.edges[id.index()]
    }

    /// Every node reachable from `roots` by following direct edges,
    /// cycle-tolerant (each node visited once) and returned in a
    /// deterministic order (ascending `NodeId`) independent of BFS
    /// visitation order.
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = NodeId>) -> NodeSet {
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        for root in roots {
            if !visited[root.index()] {
                visited[root.index()] = true;
                queue.push_back(root);
            }
        }

        while let Some(current) = queue.pop_front() {
            for edge in &self.edges[current.index()] {
                if !visited[edge.to.index()] {
                    visited[edge.to.index()] = true;
                    queue.push_back(edge.to);
                }
            }
        }

        let mut ids: Vec<NodeId> = visited
            .iter()
            .enumerate()
            .filter_map(|(idx, &v)| v.then(|| NodeId::from_usize(idx)))
            .collect();
        ids.sort();
        NodeSet::from_sorted(ids)
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Direct superclass of `name`, if both are nodes and an `Extends` edge
    /// connects them. At most one element, but returned as a `Vec` to keep
    /// the class-hierarchy query surface uniform with the interface ones.
    pub fn superclasses_of(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::Extends)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// Every node with a direct `Extends` edge to `name`.
    pub fn subclasses_of(&self, name: &str) -> Vec<String> {
        let Some(target) = self.node_by_name(name).map(|n| n.id) else { return Vec::new() };
        self.nodes_with_direct_edge_to(target, EdgeKind::Extends)
    }

    /// Interfaces `name` extends: direct `Implements` edges when
    /// `reachable` is false, or the full transitive closure over
    /// `Extends`/`Implements` edges when true.
    pub fn superinterfaces_of(&self, name: &str, reachable: bool) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        if !reachable {
            return self
                .direct_edges(node.id)
                .iter()
                .filter(|e| e.kind == EdgeKind::Implements)
                .map(|e| self.node(e.to).name.clone())
                .collect();
        }
        self.reachable_of_kinds([node.id], &[EdgeKind::Extends, EdgeKind::Implements])
            .iter()
            .filter(|&id| id != node.id)
            .map(|id| self.node(id).name.clone())
            .collect()
    }

    /// Classes (not interfaces) that implement `name`: directly via an
    /// `Implements` edge when `reachable` is false, or transitively through
    /// any chain of `Extends`/`Implements` edges when true. Interfaces that
    /// merely extend `name` are not themselves "implementors" (Java spells
    /// that relationship `extends`, even though the classfile encodes both
    /// the same way).
    pub fn implementors_of(&self, name: &str, reachable: bool) -> Vec<String> {
        let Some(target) = self.node_by_name(name).map(|n| n.id) else { return Vec::new() };
        self.nodes
            .iter()
            .filter(|n| !n.is_interface)
            .filter(|n| {
                if reachable {
                    self.reachable_of_kinds([n.id], &[EdgeKind::Extends, EdgeKind::Implements])
                        .contains(target)
                } else {
                    self.direct_edges(n.id)
                        .iter()
                        .any(|e| e.kind == EdgeKind::Implements && e.to == target)
                }
            })
            .map(|n| n.name.clone())
            .collect()
    }

    /// Annotation types directly attached to `name`.
    pub fn annotations_on(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::AnnotatedBy)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// `name`'s own declared fields, in classfile order.
    pub fn fields_of(&self, name: &str) -> &[FieldRecord] {
        self.node_by_name(name).map(|n| n.fields.as_slice()).unwrap_or(&[])
    }

    /// `name`'s own declared methods, in classfile order.
    pub fn methods_of(&self, name: &str) -> &[MethodRecord] {
        self.node_by_name(name).map(|n| n.methods.as_slice()).unwrap_or(&[])
    }

    /// The resolved `static final` constant value of `name`'s field
    /// `field_name`, or `None` if either doesn't exist or the field isn't a
    /// constant (not `static final`, or lacking a `ConstantValue`
    /// attribute).
    pub fn constant_value(&self, name: &str, field_name: &str) -> Option<&ConstantValue> {
        self.fields_of(name)
            .iter()
            .find(|f| f.name == field_name)
            .and_then(|f| f.constant_value.as_ref())
    }

    /// Class types directly referenced by `name`'s fields (`field_type_uses`).
    pub fn field_type_uses_of(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::FieldTypeUses)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// Classes with at least one field of type `name`: the reverse of
    /// [`Self::field_type_uses_of`] ("has-field-of-type").
    pub fn classes_with_field_of_type(&self, name: &str) -> Vec<String> {
        let Some(target) = self.node_by_name(name).map(|n| n.id) else { return Vec::new() };
        self.nodes_with_direct_edge_to(target, EdgeKind::FieldTypeUses)
    }

    /// Class types directly referenced by `name`'s methods (`method_type_uses`):
    /// parameter and return types across every declared method.
    pub fn method_type_uses_of(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::MethodTypeUses)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// Classes with at least one method referencing type `name` in its
    /// parameters or return type: the reverse of [`Self::method_type_uses_of`]
    /// ("has-method-param-of-type").
    pub fn classes_with_method_of_type(&self, name: &str) -> Vec<String> {
        let Some(target) = self.node_by_name(name).map(|n| n.id) else { return Vec::new() };
        self.nodes_with_direct_edge_to(target, EdgeKind::MethodTypeUses)
    }

    /// Exception types any of `name`'s methods declare in a `throws` clause.
    pub fn thrown_types_of(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::Throws)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// Annotation types attached to any of `name`'s fields.
    pub fn field_annotations_on(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::FieldAnnotatedBy)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    /// Annotation types attached to any of `name`'s methods or their
    /// parameters.
    pub fn method_annotations_on(&self, name: &str) -> Vec<String> {
        let Some(node) = self.node_by_name(name) else { return Vec::new() };
        self.direct_edges(node.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::MethodAnnotatedBy)
            .map(|e| self.node(e.to).name.clone())
            .collect()
    }

    fn nodes_with_direct_edge_to(&self, target: NodeId, kind: EdgeKind) -> Vec<String> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, adj)| adj.iter().any(|e| e.kind == kind && e.to == target))
            .map(|(idx, _)| self.nodes[idx].name.clone())
            .collect()
    }

    /// Forward reachability restricted to edges of the given kinds.
    fn reachable_of_kinds(&self, roots: impl IntoIterator<Item = NodeId>, kinds: &[EdgeKind]) -> NodeSet {
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        for root in roots {
            if !visited[root.index()] {
                visited[root.index()] = true;
                queue.push_back(root);
            }
        }
        while let Some(current) = queue.pop_front() {
            for edge in &self.edges[current.index()] {
                if kinds.contains(&edge.kind) && !visited[edge.to.index()] {
                    visited[edge.to.index()] = true;
                    queue.push_back(edge.to);
                }
            }
        }
        let mut ids: Vec<NodeId> = visited
            .iter()
            .enumerate()
            .filter_map(|(idx, &v)| v.then(|| NodeId::from_usize(idx)))
            .collect();
        ids.sort();
        NodeSet::from_sorted(ids)
    }
}

#[cfg(test)]
mod tests {
    use jcg_core::{EntryId, RootId, WarningCollector};

    use crate::linker::RelationshipLinker;
    use crate::node::{ClassRecord, ConstantValue, FieldRecord};

    fn class(name: &str, superclass: Option<&str>, interfaces: &[&str], is_interface: bool) -> ClassRecord {
        ClassRecord {
            name: name.to_string(),
            root_id: RootId::from_usize(0),
            entry_id: EntryId::from_usize(0),
            is_interface,
            is_abstract: false,
            is_annotation: false,
            is_enum: false,
            superclass_name: superclass.map(str::to_string),
            interface_names: interfaces.iter().map(|s| s.to_string()).collect(),
            annotation_names: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[test]
    fn direct_subclass_scenario() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(class("p.A", Some("java.lang.Object"), &[], false));
        linker.add_class(class("p.B", Some("p.A"), &[], false));
        let result = linker.freeze(&WarningCollector::new());

        assert_eq!(result.subclasses_of("p.A"), vec!["p.B".to_string()]);
        assert_eq!(result.superclasses_of("p.B"), vec!["p.A".to_string()]);
        assert!(result.node_by_name("java.lang.Object").is_none());
    }

    #[test]
    fn interface_closure_scenario() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(class("p.I", None, &[], true));
        linker.add_class(class("p.J", None, &["p.I"], true));
        linker.add_class(class("p.K", None, &["p.J"], true));
        linker.add_class(class("p.Impl", Some("java.lang.Object"), &["p.K"], false));
        let result = linker.freeze(&WarningCollector::new());

        let mut reachable = result.implementors_of("p.I", true);
        reachable.sort();
        assert_eq!(reachable, vec!["p.Impl".to_string()]);
        assert!(result.implementors_of("p.I", false).is_empty());

        let mut superinterfaces = result.superinterfaces_of("p.K", true);
        superinterfaces.sort();
        assert_eq!(superinterfaces, vec!["p.I".to_string(), "p.J".to_string()]);
    }

    #[test]
    fn annotations_on_direct_edge() {
        let mut linker = RelationshipLinker::new();
        let mut c = class("p.C", Some("java.lang.Object"), &[], false);
        c.annotation_names = vec!["p.MyAnn".to_string()];
        linker.add_class(c);
        linker.add_class(class("p.MyAnn", None, &[], false));
        let result = linker.freeze(&WarningCollector::new());

        assert_eq!(result.annotations_on("p.C"), vec!["p.MyAnn".to_string()]);
    }

    #[test]
    fn static_final_constants_are_queryable_and_non_final_is_absent() {
        let mut linker = RelationshipLinker::new();
        let mut c = class("p.Constants", Some("java.lang.Object"), &[], false);
        c.fields = vec![
            FieldRecord {
                name: "K".to_string(),
                descriptor: "I".to_string(),
                referenced_type_names: Vec::new(),
                is_static: true,
                is_final: true,
                constant_value: Some(ConstantValue::Int(42)),
                annotation_names: Vec::new(),
            },
            FieldRecord {
                name: "S".to_string(),
                descriptor: "Ljava/lang/String;".to_string(),
                referenced_type_names: vec!["java.lang.String".to_string()],
                is_static: true,
                is_final: true,
                constant_value: Some(ConstantValue::String("hi".to_string())),
                annotation_names: Vec::new(),
            },
            FieldRecord {
                name: "D".to_string(),
                descriptor: "D".to_string(),
                referenced_type_names: Vec::new(),
                is_static: true,
                is_final: true,
                constant_value: Some(ConstantValue::Double(3.5)),
                annotation_names: Vec::new(),
            },
            FieldRecord {
                name: "N".to_string(),
                descriptor: "I".to_string(),
                referenced_type_names: Vec::new(),
                is_static: false,
                is_final: false,
                constant_value: None,
                annotation_names: Vec::new(),
            },
        ];
        linker.add_class(c);
        let result = linker.freeze(&WarningCollector::new());

        assert_eq!(
            result.constant_value("p.Constants", "K"),
            Some(&ConstantValue::Int(42))
        );
        assert_eq!(
            result.constant_value("p.Constants", "S"),
            Some(&ConstantValue::String("hi".to_string()))
        );
        assert_eq!(
            result.constant_value("p.Constants", "D"),
            Some(&ConstantValue::Double(3.5))
        );
        assert_eq!(result.constant_value("p.Constants", "N"), None);
        assert_eq!(result.fields_of("p.Constants").len(), 4);
    }
}
