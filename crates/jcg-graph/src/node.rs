use jcg_core::{EntryId, NodeId, RootId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Extends,
    Implements,
    AnnotatedBy,
    FieldTypeUses,
    MethodTypeUses,
    FieldAnnotatedBy,
    MethodAnnotatedBy,
    Throws,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// A coerced `static final` constant value, or any other field literal the
/// parser resolved from a `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}

/// A field as the graph cares about it: not a node of its own (§3's data
/// model holds fields on the owning `ClassNode`), just enough to answer
/// "what's this field's type" and "what did this constant resolve to".
#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub name: String,
    pub descriptor: String,
    /// Every class-typed reference in this field's descriptor and generic
    /// signature, deduped and sorted. The edge the linker wires for
    /// `field_type_uses` comes straight from here.
    pub referenced_type_names: Vec<String>,
    pub is_static: bool,
    pub is_final: bool,
    pub constant_value: Option<ConstantValue>,
    pub annotation_names: Vec<String>,
}

/// A method as the graph cares about it, mirroring [`FieldRecord`].
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub name: String,
    pub descriptor: String,
    /// Every class-typed reference in this method's descriptor and generic
    /// signature (parameter and return types); thrown types are reported
    /// separately since they carry their own edge kind.
    pub referenced_type_names: Vec<String>,
    pub annotation_names: Vec<String>,
    /// Parallel to the descriptor's parameter list: annotation type names
    /// on each parameter, in parameter order.
    pub parameter_annotation_names: Vec<Vec<String>>,
    pub thrown_type_names: Vec<String>,
}

/// The graph's own notion of a scanned class, decoupled from the classfile
/// parser's `RawClassInfo` so the linker doesn't depend on `jcg-classfile`.
/// Callers (the scan driver) map parsed classfiles into these.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub name: String,
    pub root_id: RootId,
    pub entry_id: EntryId,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_annotation: bool,
    pub is_enum: bool,
    pub superclass_name: Option<String>,
    pub interface_names: Vec<String>,
    pub annotation_names: Vec<String>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
}

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub id: NodeId,
    pub name: String,
    /// `None` for an external placeholder node (see [`ClassNode::is_external`]):
    /// a reference target that was never itself scanned as a definite class.
    pub root_id: Option<RootId>,
    pub entry_id: Option<EntryId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_annotation: bool,
    pub is_enum: bool,
    /// Always empty for an external placeholder node.
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    /// True for a dangling-reference placeholder materialized because
    /// `retain_external_references` was enabled; false for every class the
    /// scan actually parsed.
    pub is_external: bool,
}
