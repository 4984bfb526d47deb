#![forbid(unsafe_code)]

mod access;
mod annotation;
mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod reader;
mod signature;
mod type_scan;

pub use crate::access::AccessFlags;
pub use crate::annotation::{Annotation, ConstValue, ElementValue};
pub use crate::classfile::{
    ClassFlags, ClassfileParser, ConstantValue, MemberFlags, ParseOptions, RawClassInfo,
    RawField, RawMethod,
};
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
pub use crate::signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, ClassSignature,
    ClassTypeSignature, FieldTypeSignature, MethodSignature, TypeArgument, TypeParameter,
    TypeSignature,
};
pub use crate::type_scan::scan_referenced_type_names;
