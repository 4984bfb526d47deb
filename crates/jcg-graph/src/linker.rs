use std::collections::HashMap;

use jcg_core::{NodeId, Warning, WarningCollector, WarningKind};

use crate::node::{ClassNode, ClassRecord, Edge, EdgeKind};
use crate::result::ScanResult;

/// The implicit universal root of the class hierarchy. Never itself
/// materialized as a node or as an edge target (spec §4.4): a classfile
/// declaring it is dropped upstream by the scan driver, and any reference to
/// it from elsewhere (an `extends java.lang.Object` clause, most commonly)
/// is simply not wired to anything.
const JAVA_LANG_OBJECT: &str = "java.lang.Object";

/// Builds a [`ScanResult`] from a stream of [`ClassRecord`]s in four phases:
/// intern every name touched by any record, materialize one node per unique
/// class name (first root wins when a name is declared more than once),
/// wire the direct edges implied by each record, then freeze into an
/// immutable, query-ready result.
#[derive(Default)]
pub struct RelationshipLinker {
    records: Vec<ClassRecord>,
    retain_external_references: bool,
}

impl RelationshipLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, a reference to a name with no materialized node is kept
    /// as an edge to an external placeholder node instead of being dropped.
    pub fn with_retain_external_references(mut self, retain: bool) -> Self {
        self.retain_external_references = retain;
        self
    }

    /// Adds a parsed class to the pending set. Call [`Self::freeze`] once
    /// every class in the scan has been added.
    pub fn add_class(&mut self, record: ClassRecord) {
        self.records.push(record);
    }

    pub fn freeze(self, warnings: &WarningCollector) -> ScanResult {
        // Phase 1 (intern) is implicit: names live as owned Strings keyed
        // into `by_name` below rather than through a separate interning
        // pass, since the linker only ever needs name -> NodeId lookups.

        // Phase 2: materialize nodes, first root wins on a name collision.
        let mut by_name: HashMap<String, NodeId> = HashMap::with_capacity(self.records.len());
        let mut nodes: Vec<ClassNode> = Vec::with_capacity(self.records.len());
        let mut kept_records: Vec<&ClassRecord> = Vec::with_capacity(self.records.len());

        for record in &self.records {
            if record.name == JAVA_LANG_OBJECT {
                continue;
            }
            if let Some(&existing) = by_name.get(&record.name) {
                let existing_root = nodes[existing.index()].root_id;
                warnings.push(
                    Warning::new(
                        WarningKind::SuspiciousConfiguration,
                        format!(
                            "class '{}' is declared by more than one root; root {:?} wins, root {:?} is masked",
                            record.name, existing_root, record.root_id
                        ),
                    )
                    .with_class_name(record.name.clone()),
                );
                continue;
            }

            let id = NodeId::from_usize(nodes.len());
            by_name.insert(record.name.clone(), id);
            nodes.push(ClassNode {
                id,
                name: record.name.clone(),
                root_id: Some(record.root_id),
                entry_id: Some(record.entry_id),
                is_interface: record.is_interface,
                is_abstract: record.is_abstract,
                is_annotation: record.is_annotation,
                is_enum: record.is_enum,
                fields: record.fields.clone(),
                methods: record.methods.clone(),
                is_external: false,
            });
            kept_records.push(record);
        }

        // Phase 3: wire direct edges. References to names with no
        // materialized node (JDK classes outside the scanned classpath,
        // malformed classfiles that failed to parse, etc.) are dropped,
        // unless `retain_external_references` is set, in which case the
        // first such name seen gets a placeholder node so the edge has
        // somewhere to point.
        let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); nodes.len()];
        let retain_external = self.retain_external_references;

        for record in &kept_records {
            let from = by_name[&record.name];

            if let Some(super_name) = &record.superclass_name {
                if let Some(to) = resolve_or_create(super_name, retain_external, &mut by_name, &mut nodes, &mut edges) {
                    edges[from.index()].push(Edge {
                        to,
                        kind: EdgeKind::Extends,
                    });
                }
            }
            for iface in &record.interface_names {
                if let Some(to) = resolve_or_create(iface, retain_external, &mut by_name, &mut nodes, &mut edges) {
                    edges[from.index()].push(Edge {
                        to,
                        kind: EdgeKind::Implements,
                    });
                }
            }
            for annotation in &record.annotation_names {
                if let Some(to) = resolve_or_create(annotation, retain_external, &mut by_name, &mut nodes, &mut edges) {
                    edges[from.index()].push(Edge {
                        to,
                        kind: EdgeKind::AnnotatedBy,
                    });
                }
            }

            for field in &record.fields {
                for referenced in &field.referenced_type_names {
                    if referenced == &record.name {
                        continue;
                    }
                    if let Some(to) = resolve_or_create(referenced, retain_external, &mut by_name, &mut nodes, &mut edges) {
                        edges[from.index()].push(Edge {
                            to,
                            kind: EdgeKind::FieldTypeUses,
                        });
                    }
                }
                for annotation in &field.annotation_names {
                    if let Some(to) = resolve_or_create(annotation, retain_external, &mut by_name, &mut nodes, &mut edges) {
                        edges[from.index()].push(Edge {
                            to,
                            kind: EdgeKind::FieldAnnotatedBy,
                        });
                    }
                }
            }

            for method in &record.methods {
                for referenced in &method.referenced_type_names {
                    if referenced == &record.name {
                        continue;
                    }
                    if let Some(to) = resolve_or_create(referenced, retain_external, &mut by_name, &mut nodes, &mut edges) {
                        edges[from.index()].push(Edge {
                            to,
                            kind: EdgeKind::MethodTypeUses,
                        });
                    }
                }
                for thrown in &method.thrown_type_names {
                    if let Some(to) = resolve_or_create(thrown, retain_external, &mut by_name, &mut nodes, &mut edges) {
                        edges[from.index()].push(Edge {
                            to,
                            kind: EdgeKind::Throws,
                        });
                    }
                }
                let mut method_annotations: Vec<&String> = method.annotation_names.iter().collect();
                method_annotations.extend(method.parameter_annotation_names.iter().flatten());
                for annotation in method_annotations {
                    if let Some(to) = resolve_or_create(annotation, retain_external, &mut by_name, &mut nodes, &mut edges) {
                        edges[from.index()].push(Edge {
                            to,
                            kind: EdgeKind::MethodAnnotatedBy,
                        });
                    }
                }
            }
        }

        // Phase 4: freeze. Sort each adjacency list for deterministic
        // iteration order independent of classfile scan order.
        for adj in &mut edges {
            adj.sort_by(|a, b| a.to.cmp(&b.to).then(edge_kind_rank(a.kind).cmp(&edge_kind_rank(b.kind))));
            adj.dedup();
        }

        detect_extends_cycles(&nodes, &edges, warnings);

        ScanResult::new(nodes, by_name, edges)
    }
}

/// Looks up `name` in `by_name`, or — when `retain_external` is set —
/// materializes an external placeholder node and edge-list slot for it.
/// `java.lang.Object` is never resolved or created: it is the implicit
/// universal root and must not appear as an edge target.
fn resolve_or_create(
    name: &str,
    retain_external: bool,
    by_name: &mut HashMap<String, NodeId>,
    nodes: &mut Vec<ClassNode>,
    edges: &mut Vec<Vec<Edge>>,
) -> Option<NodeId> {
    if name == JAVA_LANG_OBJECT {
        return None;
    }
    if let Some(&id) = by_name.get(name) {
        return Some(id);
    }
    if !retain_external {
        return None;
    }
    let id = NodeId::from_usize(nodes.len());
    nodes.push(ClassNode {
        id,
        name: name.to_string(),
        root_id: None,
        entry_id: None,
        is_interface: false,
        is_abstract: false,
        is_annotation: false,
        is_enum: false,
        fields: Vec::new(),
        methods: Vec::new(),
        is_external: true,
    });
    edges.push(Vec::new());
    by_name.insert(name.to_string(), id);
    Some(id)
}

fn edge_kind_rank(kind: EdgeKind) -> u8 {
    match kind {
        EdgeKind::Extends => 0,
        EdgeKind::Implements => 1,
        EdgeKind::AnnotatedBy => 2,
        EdgeKind::FieldTypeUses => 3,
        EdgeKind::MethodTypeUses => 4,
        EdgeKind::FieldAnnotatedBy => 5,
        EdgeKind::MethodAnnotatedBy => 6,
        EdgeKind::Throws => 7,
    }
}

/// Invariant I3: `extends` edges form a forest rooted at the (unmaterialized)
/// `java.lang.Object`. Real `javac` output can never be cyclic, but a
/// hand-assembled or adversarial classfile set could declare `A extends B`
/// and `B extends A`; rather than looping forever or silently accepting it,
/// walk every node's `Extends` chain and warn once per node found on a
/// cycle.
fn detect_extends_cycles(nodes: &[ClassNode], edges: &[Vec<Edge>], warnings: &WarningCollector) {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        Visiting,
        Done,
    }

    let mut state = vec![State::Unvisited; nodes.len()];

    for start in 0..nodes.len() {
        if state[start] != State::Unvisited {
            continue;
        }

        let mut stack = vec![start];

        while let Some(&current) = stack.last() {
            match state[current] {
                State::Unvisited => {
                    state[current] = State::Visiting;
                    for edge in &edges[current] {
                        if edge.kind != EdgeKind::Extends {
                            continue;
                        }
                        let next = edge.to.index();
                        if state[next] == State::Visiting {
                            warnings.push(
                                Warning::new(
                                    WarningKind::CyclicExtends,
                                    format!(
                                        "'{}' extends '{}', forming a cycle",
                                        nodes[current].name, nodes[next].name
                                    ),
                                )
                                .with_class_name(nodes[current].name.clone()),
                            );
                        } else if state[next] == State::Unvisited {
                            stack.push(next);
                        }
                    }
                }
                State::Visiting => {
                    state[current] = State::Done;
                    stack.pop();
                }
                State::Done => {
                    stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FieldRecord;
    use jcg_core::{EntryId, RootId};

    /// `refs` becomes a single synthetic field's referenced types, so tests
    /// can exercise `field_type_uses` wiring without assembling a whole
    /// `FieldRecord` by hand.
    fn record(name: &str, root: u32, super_name: Option<&str>, refs: &[&str]) -> ClassRecord {
        let fields = if refs.is_empty() {
            Vec::new()
        } else {
            vec![FieldRecord {
                name: "f".to_string(),
                descriptor: String::new(),
                referenced_type_names: refs.iter().map(|s| s.to_string()).collect(),
                is_static: false,
                is_final: false,
                constant_value: None,
                annotation_names: Vec::new(),
            }]
        };
        ClassRecord {
            name: name.to_string(),
            root_id: RootId::from_usize(root as usize),
            entry_id: EntryId::from_usize(0),
            is_interface: false,
            is_abstract: false,
            is_annotation: false,
            is_enum: false,
            superclass_name: super_name.map(str::to_string),
            interface_names: Vec::new(),
            annotation_names: Vec::new(),
            fields,
            methods: Vec::new(),
        }
    }

    #[test]
    fn wires_extends_edge_between_known_classes() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(record("a.Base", 0, None, &[]));
        linker.add_class(record("a.Child", 0, Some("a.Base"), &[]));

        let warnings = WarningCollector::new();
        let result = linker.freeze(&warnings);

        let child = result.node_by_name("a.Child").unwrap();
        let base = result.node_by_name("a.Base").unwrap();
        let direct = result.direct_edges(child.id);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].to, base.id);
        assert_eq!(direct[0].kind, EdgeKind::Extends);
    }

    #[test]
    fn first_root_wins_and_warns_on_duplicate_name() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(record("a.Dup", 0, None, &[]));
        linker.add_class(record("a.Dup", 1, None, &[]));

        let warnings = WarningCollector::new();
        let result = linker.freeze(&warnings);

        assert_eq!(result.nodes().len(), 1);
        assert_eq!(
            result.node_by_name("a.Dup").unwrap().root_id,
            Some(RootId::from_usize(0))
        );
        assert_eq!(warnings.into_inner().len(), 1);
    }

    #[test]
    fn reference_to_unknown_class_is_dropped_not_an_error() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(record("a.Uses", 0, None, &["does.not.Exist"]));

        let warnings = WarningCollector::new();
        let result = linker.freeze(&warnings);

        let node = result.node_by_name("a.Uses").unwrap();
        assert!(result.direct_edges(node.id).is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn retain_external_references_materializes_placeholder_target() {
        let mut linker = RelationshipLinker::new().with_retain_external_references(true);
        linker.add_class(record("a.Uses", 0, None, &["does.not.Exist"]));

        let warnings = WarningCollector::new();
        let result = linker.freeze(&warnings);

        let node = result.node_by_name("a.Uses").unwrap();
        let direct = result.direct_edges(node.id);
        assert_eq!(direct.len(), 1);

        let external = result.node(direct[0].to);
        assert_eq!(external.name, "does.not.Exist");
        assert!(external.is_external);
        assert!(external.root_id.is_none());
    }

    #[test]
    fn java_lang_object_is_never_materialized() {
        let mut linker = RelationshipLinker::new().with_retain_external_references(true);
        linker.add_class(record("p.A", 0, Some("java.lang.Object"), &[]));
        linker.add_class(record("java.lang.Object", 0, None, &[]));

        let warnings = WarningCollector::new();
        let result = linker.freeze(&warnings);

        assert!(result.node_by_name("java.lang.Object").is_none());
        let node = result.node_by_name("p.A").unwrap();
        assert!(result.direct_edges(node.id).is_empty());
    }

    #[test]
    fn extends_cycle_is_detected_and_warned() {
        let mut linker = RelationshipLinker::new();
        linker.add_class(record("a.A", 0, Some("a.B"), &[]));
        linker.add_class(record("a.B", 0, Some("a.A"), &[]));

        let warnings = WarningCollector::new();
        let _result = linker.freeze(&warnings);

        let collected = warnings.into_inner();
        assert!(collected.iter().any(|w| w.kind == WarningKind::CyclicExtends));
    }
}
