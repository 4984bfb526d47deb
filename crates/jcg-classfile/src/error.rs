pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid classfile magic: 0x{0:08x}")]
    InvalidMagic(u32),

    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),

    #[error("invalid constant pool tag: {0}")]
    InvalidConstantPoolTag(u8),

    #[error("constant pool type mismatch at index {index}: expected {expected}, found {found}")]
    ConstantPoolTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid modified UTF-8 constant")]
    InvalidModifiedUtf8,

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),

    /// Declared class name doesn't match the relative path the entry was
    /// read from.
    #[error("class name '{declared}' does not match expected path-derived name '{expected}'")]
    NameMismatch { declared: String, expected: String },

    #[error("{0}")]
    Other(&'static str),
}
