use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("slice range out of bounds: offset {offset} len {len} exceeds parent len {parent_len}")]
    OutOfRange {
        offset: u64,
        len: u64,
        parent_len: u64,
    },

    #[error("cannot slice a deflated region")]
    CannotSliceDeflated,

    #[error("inflated entry exceeded the maximum allowed size ({limit} bytes)")]
    Oversize { limit: u64 },

    #[error("unsupported compression method: {0}")]
    UnsupportedCompressionMethod(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("failed to create temp file: {0}")]
    TempFile(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
