//! Authenticated encryption for pack blob records.
//!
//! Records are laid out as `[16B nonce][ciphertext][16B tag]` and sealed with
//! AES-256-GCM. Content IDs are keyed BLAKE2b-256 over the plaintext.

pub mod aes_gcm;
pub mod key;

pub use key::{key_from_json, load_key_file, Key, KeyFile};
