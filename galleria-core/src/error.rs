use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index {index} out of range for a gallery of {len} photos")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A chain pointer does not resolve the way the list invariants require.
    #[error("Chain invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GalleryError {
    /// I/O or backend failures, as opposed to caller or invariant errors.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::Database(_) | Self::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
