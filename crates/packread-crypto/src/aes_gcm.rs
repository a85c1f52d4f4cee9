use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::RngCore;

use packread_types::blob::{NONCE_LEN, TAG_LEN};
use packread_types::error::{PackreadError, Result};

/// AES-256-GCM with a 128-bit nonce, matching the pack record layout.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Authenticated cipher for blob records: `[16B nonce][ciphertext][16B tag]`.
pub struct BlobCipher {
    cipher: Aes256Gcm16,
}

impl BlobCipher {
    pub fn new(encryption_key: &[u8; 32]) -> Self {
        let cipher =
            Aes256Gcm16::new_from_slice(encryption_key).expect("valid 32-byte key for AES-256-GCM");
        Self { cipher }
    }

    /// Seal `plaintext` under an explicit nonce.
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
        out.extend_from_slice(nonce);
        out.extend_from_slice(plaintext);
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(nonce), b"", &mut out[NONCE_LEN..])
            .map_err(|e| PackreadError::Other(format!("AES-GCM encrypt: {e}")))?;
        out.extend_from_slice(&tag);
        Ok(out)
    }

    /// Seal `plaintext` under a fresh random nonce.
    pub fn seal_random(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        self.seal(&nonce, plaintext)
    }

    /// Verify and decrypt a sealed record.
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.open_into(data, &mut output)?;
        Ok(output)
    }

    /// Verify and decrypt a sealed record into a caller-provided buffer.
    /// Reuses existing capacity in `output`.
    pub fn open_into(&self, data: &[u8], output: &mut Vec<u8>) -> Result<()> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(PackreadError::DecryptionFailed);
        }
        let (nonce_bytes, ct_and_tag) = data.split_at(NONCE_LEN);
        let (ciphertext, tag_bytes) = ct_and_tag.split_at(ct_and_tag.len() - TAG_LEN);
        output.clear();
        output.extend_from_slice(ciphertext);
        let result = self.cipher.decrypt_in_place_detached(
            Nonce::<U16>::from_slice(nonce_bytes),
            b"",
            output,
            Tag::from_slice(tag_bytes),
        );
        if result.is_err() {
            output.clear();
            return Err(PackreadError::DecryptionFailed);
        }
        Ok(())
    }
}
