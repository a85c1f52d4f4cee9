use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{BlobId, PackId};

/// Size of the nonce prepended to every encrypted blob record.
pub const NONCE_LEN: usize = 16;
/// Size of the authentication tag appended to every encrypted blob record.
pub const TAG_LEN: usize = 16;
/// Smallest possible encrypted record: an empty plaintext sealed.
pub const MIN_CIPHERTEXT_LEN: u32 = (NONCE_LEN + TAG_LEN) as u32;

/// Distinguishes file-content blobs from tree (directory metadata) blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum BlobType {
    #[default]
    Data,
    Tree,
}

impl BlobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobType::Data => "data",
            BlobType::Tree => "tree",
        }
    }
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a blob. Two blobs with equal handles hold identical plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlobHandle {
    pub blob_type: BlobType,
    pub id: BlobId,
}

impl BlobHandle {
    pub fn new(blob_type: BlobType, id: BlobId) -> Self {
        Self { blob_type, id }
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}/{}>", self.blob_type, self.id)
    }
}

/// Location of one encrypted blob record inside a pack.
///
/// `offset` points at the record's nonce and `length` spans
/// nonce + ciphertext + tag. A non-zero `uncompressed_length` marks the
/// plaintext as zstd-compressed and records its decoded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Blob {
    pub handle: BlobHandle,
    pub offset: u64,
    pub length: u32,
    pub uncompressed_length: u32,
}

impl Blob {
    pub fn is_compressed(&self) -> bool {
        self.uncompressed_length != 0
    }

    /// Exclusive end of the record, `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length as u64)
    }

    /// Size of the plaintext once decrypted and decoded.
    pub fn plaintext_length(&self) -> u32 {
        if self.is_compressed() {
            self.uncompressed_length
        } else {
            self.length.saturating_sub(MIN_CIPHERTEXT_LEN)
        }
    }
}

/// A blob together with the pack it can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PackedBlob {
    pub blob: Blob,
    pub pack_id: PackId,
}
