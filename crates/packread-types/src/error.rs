use std::sync::Arc;

use thiserror::Error;

use crate::blob::BlobHandle;
use crate::id::{BlobId, PackId};

pub type Result<T> = std::result::Result<T, PackreadError>;

#[derive(Debug, Error)]
pub enum PackreadError {
    #[error("overlapping blobs in pack {pack}")]
    OverlappingBlobs { pack: PackId },

    #[error("invalid blob length {length} at offset {offset} in pack {pack}")]
    InvalidBlobLength {
        pack: PackId,
        offset: u64,
        length: u32,
    },

    #[error("ciphertext verification failed for blob {handle}: {reason}")]
    CiphertextVerification {
        handle: BlobHandle,
        reason: VerifyFailure,
    },

    #[error("reading {length} bytes at offset {offset} of pack {pack} failed: {source}")]
    ReadFailed {
        pack: PackId,
        offset: u64,
        length: u64,
        #[source]
        source: Arc<LoadError>,
    },

    #[error("permanent read error on pack {pack}: {source}")]
    PermanentRead {
        pack: PackId,
        #[source]
        source: LoadError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("blob not found in any pack: {0}")]
    BlobNotFound(BlobHandle),

    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PackreadError {
    /// Structural errors in the request itself; these are never worth
    /// retrying against another pack.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            PackreadError::OverlappingBlobs { .. } | PackreadError::InvalidBlobLength { .. }
        )
    }
}

/// Why a blob record failed to verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    #[error("authentication failed")]
    Decrypt,

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("decoded size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u32, actual: usize },

    #[error("content hash mismatch, got {actual}")]
    HashMismatch { actual: BlobId },
}

/// Failure reported by a range loader or its consumer.
///
/// `retryable` is the only signal the retry policy looks at.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct LoadError {
    retryable: bool,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl LoadError {
    /// An error worth retrying with the identical range.
    pub fn transient(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            retryable: true,
            source: source.into(),
        }
    }

    /// An error that must be propagated without retry.
    pub fn permanent(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            retryable: false,
            source: source.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Kind of the underlying I/O error, if there is one.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        self.source
            .downcast_ref::<std::io::Error>()
            .map(std::io::Error::kind)
    }
}
