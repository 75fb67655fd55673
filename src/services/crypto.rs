//! Credential encryption
//!
//! Seals provider secrets at rest with AES-256-GCM. The 256-bit key is
//! derived from the configured encryption key string via SHA-256, and each
//! sealed value carries its own random 96-bit nonce. The stored format is
//! base64(nonce || ciphertext).

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use anyhow::{anyhow, Context, Result};
use data_encoding::BASE64;
use sha2::{Digest, Sha256};

/// Length of the AES-GCM nonce in bytes
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts credential payloads with a key derived from
/// the server configuration.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Build a cipher from the configured key string
    pub fn new(key_material: &str) -> Self {
        let digest = Sha256::digest(key_material.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a plaintext, returning the base64 sealed form
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&sealed))
    }

    /// Decrypt a sealed value produced by [`seal`](Self::seal)
    pub fn open(&self, sealed: &str) -> Result<String> {
        let bytes = BASE64
            .decode(sealed.as_bytes())
            .context("Sealed value is not valid base64")?;

        if bytes.len() < NONCE_LEN {
            return Err(anyhow!("Sealed value is too short"));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow!("Decryption failed: wrong key or corrupted data"))?;

        String::from_utf8(plaintext).context("Decrypted payload is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let cipher = CredentialCipher::new("test-key");
        let sealed = cipher.seal(r#"{"login":"a","password":"b"}"#).expect("seal");
        let opened = cipher.open(&sealed).expect("open");
        assert_eq!(opened, r#"{"login":"a","password":"b"}"#);
    }

    #[test]
    fn test_seal_is_randomized() {
        let cipher = CredentialCipher::new("test-key");
        let a = cipher.seal("secret").expect("seal");
        let b = cipher.seal("secret").expect("seal");
        // Fresh nonce per seal
        assert_ne!(a, b);
    }

    #[test]
    fn test_sealed_value_hides_plaintext() {
        let cipher = CredentialCipher::new("test-key");
        let sealed = cipher.seal("very-secret-api-key").expect("seal");
        assert!(!sealed.contains("very-secret-api-key"));
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = CredentialCipher::new("key-one");
        let other = CredentialCipher::new("key-two");

        let sealed = cipher.seal("secret").expect("seal");
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let cipher = CredentialCipher::new("test-key");
        assert!(cipher.open("not base64!!!").is_err());
        assert!(cipher.open("c2hvcnQ=").is_err());
    }

    #[test]
    fn test_open_rejects_tampered_ciphertext() {
        let cipher = CredentialCipher::new("test-key");
        let sealed = cipher.seal("secret").expect("seal");

        let mut bytes = BASE64.decode(sealed.as_bytes()).expect("decode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = BASE64.encode(&bytes);

        assert!(cipher.open(&tampered).is_err());
    }
}
