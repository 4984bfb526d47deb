use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed archive {path}: {reason}")]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("malformed classfile {entry}: {reason}")]
    MalformedClassfile { entry: String, reason: String },

    #[error("scan cancelled")]
    Cancelled,

    #[error("invalid scan configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
