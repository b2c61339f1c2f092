//! Symmetric cipher protecting the command channel (C4).
//!
//! Key = SHA-256(secret) truncated to 16 bytes (AES-128). Fixed all-zero IV:
//! secrets are single-use per instance and regenerated on every bind, so
//! nonce reuse is moot, and a stateless one-shot sender is simpler to get
//! right than one that threads state across calls.

use crate::error::{LauncherError, Result};

use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha2::{Digest, Sha256};

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

const ZERO_IV: [u8; 16] = [0u8; 16];

/// Derives the AES-128-CBC key from a secret and round-trips a self-test
/// sample on construction.
pub struct Cipher {
    key: [u8; 16],
}

impl Cipher {
    /// Build a cipher from `secret`, verifying on construction that a
    /// non-block-aligned sample round-trips. Fails with `CryptoUnavailable`
    /// if it does not.
    pub fn new(secret: &str) -> Result<Cipher> {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&digest[..16]);
        let cipher = Cipher { key };

        const SAMPLE: &[u8] = b"round-trip-check!"; // 17 bytes, not block-aligned
        let encrypted = cipher.encrypt(SAMPLE);
        let decrypted = cipher
            .decrypt(&encrypted)
            .map_err(|_| LauncherError::CryptoUnavailable("self-test round-trip failed".to_string()))?;
        if decrypted != SAMPLE {
            return Err(LauncherError::CryptoUnavailable(
                "self-test round-trip produced mismatched plaintext".to_string(),
            ));
        }

        Ok(cipher)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Encryptor::new(&self.key.into(), &ZERO_IV.into()).encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Decryptor::new(&self.key.into(), &ZERO_IV.into())
            .decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
            .map_err(|_| LauncherError::CryptoUnavailable("decryption failed".to_string()))
    }
}

/// Validate a secret: non-empty, every character code point in `[0x20, 0x80]`.
pub fn validate_secret(secret: &str) -> bool {
    !secret.is_empty() && secret.chars().all(|c| (0x20..=0x80).contains(&(c as u32)))
}

/// Generate a random UUID-shaped secret for an empty-secret construction.
pub fn generate_secret() -> String {
    uuid::Uuid::new_v4().to_string()
}
