//! Error types for the vector database

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for flatvec operations
pub type Result<T> = std::result::Result<T, VectorDbError>;

/// Error types that can occur in flatvec operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Invalid id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Vector not found: {id}")]
    VectorNotFound { id: String },

    #[error("Failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Short read from {} at offset {position}: expected {expected} bytes, got {actual}",
        .path.display()
    )]
    ShortRead {
        path: PathBuf,
        position: u64,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Vector file {} is misaligned: {len} bytes is not a multiple of dimension {dim}",
        .path.display()
    )]
    Misaligned { path: PathBuf, len: u64, dim: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Store error: {0}")]
    Store(#[from] redb::Error),
}

/// Coarse classification of a [`VectorDbError`], used by callers that need
/// to map failures onto transport-level statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; detected before any mutation.
    Validation,
    /// A key that was looked up does not exist.
    NotFound,
    /// File or key-value store failure.
    Io,
    /// Encode/decode failure of an index record or metadata blob.
    Serialization,
}

impl VectorDbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorDbError::DimensionMismatch { .. }
            | VectorDbError::LengthMismatch { .. }
            | VectorDbError::InvalidVector { .. }
            | VectorDbError::InvalidId { .. }
            | VectorDbError::InvalidConfig { .. } => ErrorKind::Validation,
            VectorDbError::VectorNotFound { .. } => ErrorKind::NotFound,
            VectorDbError::Io { .. }
            | VectorDbError::ShortRead { .. }
            | VectorDbError::Misaligned { .. }
            | VectorDbError::Store(_) => ErrorKind::Io,
            VectorDbError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for VectorDbError {
                fn from(e: $err) -> Self {
                    VectorDbError::Store(e.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Attach the failed operation and the file it touched to an I/O error.
pub(crate) trait IoContext<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| VectorDbError::Io {
            op,
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let e = VectorDbError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(e.kind(), ErrorKind::Validation);

        let e = VectorDbError::InvalidConfig {
            reason: "dim must be positive".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Validation);

        let e = VectorDbError::VectorNotFound { id: "v1".into() };
        assert!(e.is_not_found());

        let e = VectorDbError::Misaligned {
            path: PathBuf::from("shard_0.bin"),
            len: 10,
            dim: 3,
        };
        assert_eq!(e.kind(), ErrorKind::Io);

        let e = VectorDbError::SerializationError("bad".into());
        assert_eq!(e.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_io_context_message() {
        let err: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = err
            .io_context("open vector file", Path::new("/tmp/shard_0.bin"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("open vector file"));
        assert!(msg.contains("/tmp/shard_0.bin"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
