use thiserror::Error;

pub type AegisResult<T> = Result<T, AegisError>;

/// Errors surfaced by the archive engine.
///
/// Messages never carry key bytes, IVs, or plaintext. `Unauthorized` is
/// deliberately identical for "wrong secret" and "damaged authorization
/// record".
#[derive(Debug, Error)]
pub enum AegisError {
    #[error("archive is locked: unlock it before accessing its contents")]
    ArchiveLocked,

    #[error("unauthorized: the presented secret does not unlock this archive")]
    Unauthorized,

    #[error("archive corrupted: {0}")]
    ArchiveCorrupted(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("not found: {0}")]
    EntityNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AegisError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::ArchiveCorrupted(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::EntityNotFound(msg.into())
    }

    /// True for errors that indicate a bug rather than bad input or state.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
