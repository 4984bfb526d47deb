use crate::access::AccessFlags;
use crate::annotation::Annotation;
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::type_scan::scan_referenced_type_names;

/// Which optional pieces of class-member detail a caller wants extracted.
/// Each flag trades parse cost for information the relationship graph may
/// not need for every scan (e.g. a caller building a coarse class-to-class
/// graph has no use for method bodies' thrown-exception lists).
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub enable_field_info: bool,
    pub enable_method_info: bool,
    pub enable_annotation_info: bool,
    pub enable_static_final_constants: bool,
    /// When false (the default), visible and invisible annotations are
    /// merged into a single `annotation_names` list. When true, invisible
    /// annotations are dropped entirely.
    pub visible_annotations_only: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            enable_field_info: true,
            enable_method_info: true,
            enable_annotation_info: true,
            enable_static_final_constants: true,
            visible_annotations_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassFlags(pub AccessFlags);

impl ClassFlags {
    pub fn is_interface(self) -> bool {
        self.0.is_interface()
    }
    pub fn is_annotation(self) -> bool {
        self.0.is_annotation()
    }
    pub fn is_enum(self) -> bool {
        self.0.is_enum()
    }
    pub fn is_abstract(self) -> bool {
        self.0.is_abstract()
    }
    pub fn is_public(self) -> bool {
        self.0.is_public()
    }
    pub fn is_final(self) -> bool {
        self.0.is_final()
    }
    pub fn is_synthetic(self) -> bool {
        self.0.is_synthetic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberFlags(pub AccessFlags);

impl MemberFlags {
    pub fn is_public(self) -> bool {
        self.0.is_public()
    }
    pub fn is_static(self) -> bool {
        self.0.is_static()
    }
    pub fn is_final(self) -> bool {
        self.0.is_final()
    }
    pub fn is_synthetic(self) -> bool {
        self.0.is_synthetic()
    }
    pub fn is_mandated(self) -> bool {
        self.0.is_mandated()
    }
    /// `ACC_VARARGS` on a method; meaningless on a field.
    pub fn is_varargs(self) -> bool {
        self.0.is_varargs()
    }
    /// `ACC_BRIDGE` on a method; meaningless on a field.
    pub fn is_bridge(self) -> bool {
        self.0.is_bridge()
    }
}

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

#[derive(Debug, Clone)]
pub struct RawField {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub flags: MemberFlags,
    pub constant_value: Option<ConstantValue>,
    pub annotation_names: Vec<String>,
    /// Every class-typed reference reachable from this field's descriptor
    /// and generic signature, deduped and sorted. Kept separate per field
    /// (rather than folded into one class-wide union) so the linker can
    /// wire a `field_type_uses` edge distinct from a method's.
    pub referenced_type_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawMethod {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub flags: MemberFlags,
    pub annotation_names: Vec<String>,
    /// Parallel to the descriptor's parameter list: `parameter_annotation_names[i]`
    /// holds the annotation type names on parameter `i`. Absent
    /// `RuntimeVisible/InvisibleParameterAnnotations` attributes leave this empty.
    pub parameter_annotation_names: Vec<Vec<String>>,
    pub thrown_type_names: Vec<String>,
    /// Every class-typed reference reachable from this method's descriptor
    /// and generic signature (parameter and return types), deduped and
    /// sorted. Thrown-exception types are reported separately since they
    /// carry their own edge kind.
    pub referenced_type_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawClassInfo {
    pub name: String,
    pub flags: ClassFlags,
    pub superclass_name: Option<String>,
    pub interface_names: Vec<String>,
    pub signature: Option<String>,
    pub annotation_names: Vec<String>,
    pub fields: Vec<RawField>,
    pub methods: Vec<RawMethod>,
}

pub struct ClassfileParser;

impl ClassfileParser {
    /// Parses a classfile's bytes into a [`RawClassInfo`].
    ///
    /// `expected_name` is the dotted class name implied by the entry's
    /// location (its path inside a root or archive, with `.class` and
    /// package separators converted). When present, it must match the
    /// class's own declared name.
    pub fn parse(
        bytes: &[u8],
        expected_name: Option<&str>,
        options: &ParseOptions,
    ) -> Result<RawClassInfo> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFE_BABE {
            return Err(Error::InvalidMagic(magic));
        }

        let _minor_version = reader.read_u2()?;
        let _major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = AccessFlags::new(reader.read_u2()?);
        let this_class = internal_to_dotted(&cp.get_class_name(reader.read_u2()?)?);

        if let Some(expected) = expected_name {
            if expected != this_class {
                return Err(Error::NameMismatch {
                    declared: this_class,
                    expected: expected.to_string(),
                });
            }
        }

        let super_class_idx = reader.read_u2()?;
        let superclass_name = if super_class_idx == 0 {
            if this_class != "java.lang.Object" {
                return Err(Error::Other(
                    "only java.lang.Object may be parsed without a superclass",
                ));
            }
            None
        } else {
            Some(internal_to_dotted(&cp.get_class_name(super_class_idx)?))
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interface_names = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interface_names.push(internal_to_dotted(&cp.get_class_name(reader.read_u2()?)?));
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_field(&mut reader, &cp, options)?);
        }
        if !options.enable_field_info {
            fields.clear();
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_method(&mut reader, &cp, options)?);
        }
        if !options.enable_method_info {
            methods.clear();
        }

        let class_attrs = parse_attributes(&mut reader, &cp, AttributeTarget::Class, options)?;
        reader.ensure_empty()?;

        let flags = ClassFlags(access_flags);

        Ok(RawClassInfo {
            name: this_class,
            flags,
            superclass_name,
            interface_names,
            signature: class_attrs.signature,
            annotation_names: class_attrs.annotation_names,
            fields,
            methods,
        })
    }
}

fn parse_field(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    options: &ParseOptions,
) -> Result<RawField> {
    let flags = MemberFlags(AccessFlags::new(reader.read_u2()?));
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, AttributeTarget::Member, options)?;

    let constant_value = if options.enable_static_final_constants
        && flags.is_static()
        && flags.is_final()
    {
        attrs
            .constant_value_index
            .map(|idx| coerce_constant_value(&descriptor, idx, cp))
            .transpose()?
    } else {
        None
    };

    let mut referenced_type_names = scan_referenced_type_names(&descriptor);
    if let Some(sig) = &attrs.signature {
        referenced_type_names.extend(scan_referenced_type_names(sig));
    }
    referenced_type_names.sort();
    referenced_type_names.dedup();

    Ok(RawField {
        name,
        descriptor,
        signature: attrs.signature,
        flags,
        constant_value,
        annotation_names: attrs.annotation_names,
        referenced_type_names,
    })
}

fn parse_method(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    options: &ParseOptions,
) -> Result<RawMethod> {
    let flags = MemberFlags(AccessFlags::new(reader.read_u2()?));
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, AttributeTarget::Member, options)?;

    let mut referenced_type_names = scan_referenced_type_names(&descriptor);
    if let Some(sig) = &attrs.signature {
        referenced_type_names.extend(scan_referenced_type_names(sig));
    }
    referenced_type_names.sort();
    referenced_type_names.dedup();

    Ok(RawMethod {
        name,
        descriptor,
        signature: attrs.signature,
        flags,
        annotation_names: attrs.annotation_names,
        parameter_annotation_names: attrs.parameter_annotation_names,
        thrown_type_names: attrs.thrown_type_names,
        referenced_type_names,
    })
}

/// Resolves a `ConstantValue` attribute's constant-pool index against the
/// field's own descriptor, since the attribute only stores an index and the
/// tag it points at must agree with the field's declared primitive type.
fn coerce_constant_value(descriptor: &str, index: u16, cp: &ConstantPool) -> Result<ConstantValue> {
    match descriptor {
        "B" => Ok(ConstantValue::Byte(cp.get_integer(index)? as i8)),
        "C" => char::from_u32(cp.get_integer(index)? as u32)
            .map(ConstantValue::Char)
            .ok_or(Error::MalformedAttribute("ConstantValue")),
        "S" => Ok(ConstantValue::Short(cp.get_integer(index)? as i16)),
        "Z" => Ok(ConstantValue::Boolean(cp.get_integer(index)? != 0)),
        "I" => Ok(ConstantValue::Int(cp.get_integer(index)?)),
        "J" => Ok(ConstantValue::Long(cp.get_long(index)?)),
        "F" => Ok(ConstantValue::Float(cp.get_float(index)?)),
        "D" => Ok(ConstantValue::Double(cp.get_double(index)?)),
        "Ljava/lang/String;" => Ok(ConstantValue::String(cp.get_utf8(index)?.to_string())),
        _ => Err(Error::MalformedAttribute("ConstantValue")),
    }
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    annotation_names: Vec<String>,
    parameter_annotation_names: Vec<Vec<String>>,
    constant_value_index: Option<u16>,
    thrown_type_names: Vec<String>,
}

enum AttributeTarget {
    Class,
    Member,
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    target: AttributeTarget,
    options: &ParseOptions,
) -> Result<ParsedAttributes> {
    let attributes_count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    let mut visible_annotations = Vec::new();
    let mut invisible_annotations = Vec::new();
    let mut visible_parameter_annotations: Vec<Vec<Annotation>> = Vec::new();
    let mut invisible_parameter_annotations: Vec<Vec<Annotation>> = Vec::new();

    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        let mut sub = Reader::new(info);
        match name {
            "Signature" => {
                let sig_index = sub.read_u2()?;
                parsed.signature = Some(cp.get_utf8(sig_index)?.to_string());
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" if options.enable_annotation_info => {
                visible_annotations = parse_annotation_list(&mut sub, cp)?;
                sub.ensure_empty()?;
            }
            "RuntimeInvisibleAnnotations" if options.enable_annotation_info => {
                invisible_annotations = parse_annotation_list(&mut sub, cp)?;
                sub.ensure_empty()?;
            }
            "RuntimeVisibleParameterAnnotations"
                if options.enable_annotation_info && matches!(target, AttributeTarget::Member) =>
            {
                visible_parameter_annotations = parse_parameter_annotation_list(&mut sub, cp)?;
                sub.ensure_empty()?;
            }
            "RuntimeInvisibleParameterAnnotations"
                if options.enable_annotation_info && matches!(target, AttributeTarget::Member) =>
            {
                invisible_parameter_annotations = parse_parameter_annotation_list(&mut sub, cp)?;
                sub.ensure_empty()?;
            }
            "ConstantValue" if matches!(target, AttributeTarget::Member) => {
                parsed.constant_value_index = Some(sub.read_u2()?);
                sub.ensure_empty()?;
            }
            "Exceptions" if matches!(target, AttributeTarget::Member) => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    let idx = sub.read_u2()?;
                    parsed
                        .thrown_type_names
                        .push(internal_to_dotted(&cp.get_class_name(idx)?));
                }
                sub.ensure_empty()?;
            }
            _ => {
                // Unknown or not-requested attribute: skipped by length.
            }
        }
    }

    let mut names: Vec<String> = visible_annotations
        .into_iter()
        .filter_map(|a| annotation_type_name(&a))
        .collect();
    if !options.visible_annotations_only {
        names.extend(
            invisible_annotations
                .into_iter()
                .filter_map(|a| annotation_type_name(&a)),
        );
    }
    names.sort();
    names.dedup();
    parsed.annotation_names = names;

    let param_count = visible_parameter_annotations
        .len()
        .max(invisible_parameter_annotations.len());
    let mut parameter_annotation_names = Vec::with_capacity(param_count);
    for i in 0..param_count {
        let mut param_names: Vec<String> = visible_parameter_annotations
            .get(i)
            .into_iter()
            .flatten()
            .filter_map(annotation_type_name)
            .collect();
        if !options.visible_annotations_only {
            param_names.extend(
                invisible_parameter_annotations
                    .get(i)
                    .into_iter()
                    .flatten()
                    .filter_map(annotation_type_name),
            );
        }
        param_names.sort();
        param_names.dedup();
        parameter_annotation_names.push(param_names);
    }
    parsed.parameter_annotation_names = parameter_annotation_names;

    Ok(parsed)
}

fn parse_annotation_list(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Annotation>> {
    let num = reader.read_u2()? as usize;
    let mut out = Vec::with_capacity(num);
    for _ in 0..num {
        out.push(Annotation::parse(reader, cp)?);
    }
    Ok(out)
}

/// Parses a `RuntimeVisible/InvisibleParameterAnnotations` attribute body:
/// a leading `u1 num_parameters`, then per parameter a `u2 num_annotations`
/// and that many annotations.
fn parse_parameter_annotation_list(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
) -> Result<Vec<Vec<Annotation>>> {
    let num_parameters = reader.read_u1()? as usize;
    let mut out = Vec::with_capacity(num_parameters);
    for _ in 0..num_parameters {
        out.push(parse_annotation_list(reader, cp)?);
    }
    Ok(out)
}

fn annotation_type_name(annotation: &Annotation) -> Option<String> {
    scan_referenced_type_names(&annotation.type_descriptor)
        .into_iter()
        .next()
}

fn internal_to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_object_classfile() -> Vec<u8> {
        // A hand-assembled classfile for `java.lang.Object`: magic, version,
        // a constant pool with just the one Class entry needed for
        // `this_class`, no superclass, no interfaces/fields/methods/attrs.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // minor
        bytes.extend_from_slice(&61u16.to_be_bytes()); // major
        bytes.extend_from_slice(&3u16.to_be_bytes()); // constant_pool_count (1 unused + 2 entries)
        bytes.push(7); // tag Class
        bytes.extend_from_slice(&2u16.to_be_bytes()); // name_index -> #2
        bytes.push(1); // tag Utf8
        let name = b"java/lang/Object";
        bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&0x0021u16.to_be_bytes()); // access_flags: public super
        bytes.extend_from_slice(&1u16.to_be_bytes()); // this_class -> #1
        bytes.extend_from_slice(&0u16.to_be_bytes()); // super_class: none
        bytes.extend_from_slice(&0u16.to_be_bytes()); // interfaces_count
        bytes.extend_from_slice(&0u16.to_be_bytes()); // fields_count
        bytes.extend_from_slice(&0u16.to_be_bytes()); // methods_count
        bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
        bytes
    }

    #[test]
    fn parses_object_with_no_superclass() {
        let bytes = minimal_object_classfile();
        let info =
            ClassfileParser::parse(&bytes, Some("java.lang.Object"), &ParseOptions::default())
                .unwrap();
        assert_eq!(info.name, "java.lang.Object");
        assert_eq!(info.superclass_name, None);
    }

    #[test]
    fn rejects_name_mismatch() {
        let bytes = minimal_object_classfile();
        let err = ClassfileParser::parse(&bytes, Some("com.example.Other"), &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NameMismatch { .. }));
    }

    fn classfile_with_class_name(internal_name: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&61u16.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.push(7); // tag Class
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.push(1); // tag Utf8
        bytes.extend_from_slice(&(internal_name.len() as u16).to_be_bytes());
        bytes.extend_from_slice(internal_name);
        bytes.extend_from_slice(&0x0021u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // super_class: none
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes
    }

    #[test]
    fn non_object_class_without_superclass_is_rejected() {
        let bytes = classfile_with_class_name(b"com/example/NotObject");
        let err = ClassfileParser::parse(
            &bytes,
            Some("com.example.NotObject"),
            &ParseOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
