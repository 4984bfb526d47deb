//! Shared fixture helpers for the integration tests in this directory:
//! hand-assembled classfile bytes and small jars built on the fly with
//! `tempfile` + `zip::ZipWriter`, mirroring the classfile builder already
//! used by `jcg-classfile`'s unit tests.

use std::io::Write;
use std::path::PathBuf;

/// Builds a minimal but structurally valid classfile for `internal_name`,
/// with an optional superclass and interface list (also internal names,
/// i.e. slash-separated).
pub fn classfile(internal_name: &str, superclass: Option<&str>, interfaces: &[&str]) -> Vec<u8> {
    classfile_with_flags(internal_name, superclass, interfaces, 0x0021, &[]) // public super
}

/// Builds a minimal interface classfile (`ACC_INTERFACE | ACC_ABSTRACT`),
/// always rooted at `java/lang/Object` the way `javac` emits interfaces.
pub fn classfile_interface(internal_name: &str, extends: &[&str]) -> Vec<u8> {
    classfile_with_flags(internal_name, Some("java/lang/Object"), extends, 0x0601, &[])
}

/// Builds a classfile with declared fields, rooted at `java/lang/Object`.
/// Used by the static-final-constant scenario, which needs real
/// `ConstantValue` attributes flowing through the parser and into the graph.
pub fn classfile_with_fields(internal_name: &str, fields: &[FieldSpec<'_>]) -> Vec<u8> {
    classfile_with_flags(internal_name, Some("java/lang/Object"), &[], 0x0021, fields)
}

/// One field to declare in a fixture classfile.
pub struct FieldSpec<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
    pub access_flags: u16,
    pub constant_value: Option<ConstantValueSpec>,
}

/// `static final` constant literals the fixture builder knows how to encode
/// into a `ConstantValue` attribute.
pub enum ConstantValueSpec {
    Int(i32),
    Double(f64),
    /// Per the classfile spec, a `ConstantValue` for a `String`-typed field
    /// points directly at a `Utf8` constant pool entry (not a `String` one).
    Utf8(&'static str),
}

const ACC_STATIC: u16 = 0x0008;
const ACC_FINAL: u16 = 0x0010;

/// `static final` access flags, the combination `classfile_with_fields`
/// fixtures use for every constant field.
pub const STATIC_FINAL: u16 = ACC_STATIC | ACC_FINAL;

fn classfile_with_flags(
    internal_name: &str,
    superclass: Option<&str>,
    interfaces: &[&str],
    access_flags: u16,
    fields: &[FieldSpec<'_>],
) -> Vec<u8> {
    let mut pool_entries: Vec<PoolEntry> = Vec::new();
    let this_class_idx = push_class(&mut pool_entries, internal_name);
    let super_class_idx = match superclass {
        Some(name) => push_class(&mut pool_entries, name),
        None => 0,
    };
    let interface_idxs: Vec<u16> = interfaces
        .iter()
        .map(|name| push_class(&mut pool_entries, name))
        .collect();

    struct BuiltField {
        access_flags: u16,
        name_idx: u16,
        descriptor_idx: u16,
        constant_value_idx: Option<u16>,
    }

    let constant_value_attr_name_idx = if fields.iter().any(|f| f.constant_value.is_some()) {
        Some(push_utf8(&mut pool_entries, "ConstantValue"))
    } else {
        None
    };

    let built_fields: Vec<BuiltField> = fields
        .iter()
        .map(|field| {
            let name_idx = push_utf8(&mut pool_entries, field.name);
            let descriptor_idx = push_utf8(&mut pool_entries, field.descriptor);
            let constant_value_idx = field.constant_value.as_ref().map(|value| match value {
                ConstantValueSpec::Int(v) => push_integer(&mut pool_entries, *v),
                ConstantValueSpec::Double(v) => push_double(&mut pool_entries, *v),
                ConstantValueSpec::Utf8(v) => push_utf8(&mut pool_entries, v),
            });
            BuiltField {
                access_flags: field.access_flags,
                name_idx,
                descriptor_idx,
                constant_value_idx,
            }
        })
        .collect();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&61u16.to_be_bytes());

    let constant_pool_count: u16 = pool_entries.iter().map(PoolEntry::slot_count).sum::<u16>() + 1;
    bytes.extend_from_slice(&constant_pool_count.to_be_bytes());
    for entry in &pool_entries {
        entry.write(&mut bytes);
    }

    bytes.extend_from_slice(&access_flags.to_be_bytes());
    bytes.extend_from_slice(&this_class_idx.to_be_bytes());
    bytes.extend_from_slice(&super_class_idx.to_be_bytes());

    bytes.extend_from_slice(&(interface_idxs.len() as u16).to_be_bytes());
    for idx in &interface_idxs {
        bytes.extend_from_slice(&idx.to_be_bytes());
    }

    bytes.extend_from_slice(&(built_fields.len() as u16).to_be_bytes()); // fields_count
    for field in &built_fields {
        bytes.extend_from_slice(&field.access_flags.to_be_bytes());
        bytes.extend_from_slice(&field.name_idx.to_be_bytes());
        bytes.extend_from_slice(&field.descriptor_idx.to_be_bytes());
        match field.constant_value_idx {
            Some(value_idx) => {
                bytes.extend_from_slice(&1u16.to_be_bytes()); // attributes_count
                bytes.extend_from_slice(&constant_value_attr_name_idx.unwrap().to_be_bytes());
                bytes.extend_from_slice(&2u32.to_be_bytes()); // attribute_length
                bytes.extend_from_slice(&value_idx.to_be_bytes());
            }
            None => {
                bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
            }
        }
    }

    bytes.extend_from_slice(&0u16.to_be_bytes()); // methods_count
    bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
    bytes
}

enum PoolEntry {
    Utf8(String),
    Class { name_index: u16 },
    Integer(i32),
    Double(f64),
}

impl PoolEntry {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            PoolEntry::Utf8(s) => {
                out.push(1);
                out.extend_from_slice(&(s.len() as u16).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            PoolEntry::Class { name_index } => {
                out.push(7);
                out.extend_from_slice(&name_index.to_be_bytes());
            }
            PoolEntry::Integer(v) => {
                out.push(3);
                out.extend_from_slice(&v.to_be_bytes());
            }
            PoolEntry::Double(v) => {
                out.push(6);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
        }
    }

    /// `Long`/`Double` entries occupy two constant pool slots (JVM spec
    /// §4.4.5); every other tag occupies one.
    fn slot_count(&self) -> u16 {
        match self {
            PoolEntry::Double(_) => 2,
            _ => 1,
        }
    }
}

/// The 1-based constant pool index the *next* pushed entry will occupy,
/// accounting for the double-width slots that `Long`/`Double` entries
/// consume (JVM spec §4.4.5: the index right after one is unusable).
fn next_index(pool: &[PoolEntry]) -> u16 {
    pool.iter().map(PoolEntry::slot_count).sum::<u16>() + 1
}

/// Pushes a `Utf8` entry, returning its 1-based index.
fn push_utf8(pool: &mut Vec<PoolEntry>, value: &str) -> u16 {
    let index = next_index(pool);
    pool.push(PoolEntry::Utf8(value.to_string()));
    index
}

fn push_integer(pool: &mut Vec<PoolEntry>, value: i32) -> u16 {
    let index = next_index(pool);
    pool.push(PoolEntry::Integer(value));
    index
}

fn push_double(pool: &mut Vec<PoolEntry>, value: f64) -> u16 {
    let index = next_index(pool);
    pool.push(PoolEntry::Double(value));
    index
}

/// Pushes a `Utf8` + `Class` constant pool pair for `internal_name`,
/// returning the `Class` entry's 1-based index.
fn push_class(pool: &mut Vec<PoolEntry>, internal_name: &str) -> u16 {
    let utf8_index = push_utf8(pool, internal_name);
    let index = next_index(pool);
    pool.push(PoolEntry::Class { name_index: utf8_index });
    index
}

/// Writes `entries` (relative path, already-built classfile bytes) into a
/// fresh jar in `dir`, returning the jar's path.
pub fn write_jar(dir: &std::path::Path, file_name: &str, entries: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join(file_name);
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (relative_path, bytes) in entries {
        writer.start_file(*relative_path, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
    path
}
