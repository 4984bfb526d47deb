//! Uniform byte-range access to classpath resource roots: plain files,
//! directories, and archives nested inside other archives.

mod error;
mod nested;
mod slice;

pub use error::{ArchiveError, Result};
pub use nested::{ArchiveGuard, NestedArchiveHandler, NestedRoot};
pub use slice::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, SeqReader,
    Slice, MAX_INFLATED_SIZE,
};
