use std::fmt;
use std::path::Path;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use packread_types::blob::NONCE_LEN;
use packread_types::error::{PackreadError, Result};
use packread_types::id::BlobId;

use crate::aes_gcm::BlobCipher;

/// Repository key: an encryption subkey for blob records and a MAC subkey
/// used to derive content IDs.
///
/// Read-only once constructed; share it across threads by reference.
/// Raw key material is zeroized on drop.
pub struct Key {
    cipher: BlobCipher,
    encryption_key: [u8; 32],
    chunk_id_key: [u8; 32],
}

impl Key {
    pub fn new(encryption_key: &[u8; 32], chunk_id_key: &[u8; 32]) -> Self {
        Self {
            cipher: BlobCipher::new(encryption_key),
            encryption_key: *encryption_key,
            chunk_id_key: *chunk_id_key,
        }
    }

    /// Generate a new random key using OS entropy.
    pub fn generate() -> Self {
        let mut encryption_key = Zeroizing::new([0u8; 32]);
        let mut chunk_id_key = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut encryption_key[..]);
        rand::rngs::OsRng.fill_bytes(&mut chunk_id_key[..]);
        Self::new(&encryption_key, &chunk_id_key)
    }

    /// The key used for computing content IDs (keyed BLAKE2b-256).
    pub fn chunk_id_key(&self) -> &[u8; 32] {
        &self.chunk_id_key
    }

    /// Content ID of `plaintext` under this key.
    pub fn blob_id(&self, plaintext: &[u8]) -> BlobId {
        BlobId::compute(&self.chunk_id_key, plaintext)
    }

    /// Seal `plaintext` as `[nonce][ciphertext][tag]` under the given nonce.
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.seal(nonce, plaintext)
    }

    /// Seal `plaintext` under a random nonce.
    pub fn seal_random(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.seal_random(plaintext)
    }

    /// Verify and decrypt a record produced by [`Key::seal`].
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.cipher.open(data)
    }

    pub fn to_key_file(&self) -> KeyFile {
        KeyFile {
            encryption_key: hex::encode(self.encryption_key),
            chunk_id_key: hex::encode(self.chunk_id_key),
        }
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.chunk_id_key.zeroize();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").finish_non_exhaustive()
    }
}

/// On-disk JSON form of a [`Key`], hex-encoded.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyFile {
    pub encryption_key: String,
    pub chunk_id_key: String,
}

impl KeyFile {
    pub fn to_key(&self) -> Result<Key> {
        let encryption_key = decode_key_hex("encryption_key", &self.encryption_key)?;
        let chunk_id_key = decode_key_hex("chunk_id_key", &self.chunk_id_key)?;
        Ok(Key::new(&encryption_key, &chunk_id_key))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PackreadError::Other(format!("serialize key file: {e}")))
    }
}

/// Parse a key from its JSON key-file form.
pub fn key_from_json(json: &str) -> Result<Key> {
    let file: KeyFile = serde_json::from_str(json)
        .map_err(|e| PackreadError::InvalidFormat(format!("invalid key file: {e}")))?;
    file.to_key()
}

/// Load a key from a JSON key file on disk.
pub fn load_key_file(path: &Path) -> Result<Key> {
    let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        PackreadError::Config(format!("cannot read key file '{}': {e}", path.display()))
    })?);
    key_from_json(&contents)
}

fn decode_key_hex(field: &str, value: &str) -> Result<Zeroizing<[u8; 32]>> {
    let bytes = Zeroizing::new(
        hex::decode(value)
            .map_err(|e| PackreadError::InvalidFormat(format!("key field {field}: {e}")))?,
    );
    if bytes.len() != 32 {
        return Err(PackreadError::InvalidFormat(format!(
            "key field {field}: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&bytes);
    Ok(out)
}
