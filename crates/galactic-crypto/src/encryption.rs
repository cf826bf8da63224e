//! AES-256-GCM encryption keyed by a passphrase

use crate::error::{CryptoError, Result};
use crate::random::generate_salt;
use aes_gcm::{aead::Aead, Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Encrypts with a key derived from a passphrase.
///
/// Output layout is `salt || nonce || ciphertext`, so every call uses a fresh
/// salt and nonce and the same passphrase can decrypt any output.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Encryptor {
    passphrase: String,
}

impl Encryptor {
    pub fn new(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(CryptoError::InvalidArgument(
                "Passphrase cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            passphrase: passphrase.to_string(),
        })
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; 32] {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(self.passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
        key
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let salt = generate_salt(SALT_SIZE);
        let nonce_bytes = generate_salt(NONCE_SIZE);

        let mut key_bytes = self.derive_key(&salt);
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        let cipher = Aes256Gcm::new(key);
        key_bytes.zeroize();

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), data)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        let mut packed = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        packed.extend_from_slice(&salt);
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&ciphertext);
        Ok(packed)
    }

    pub fn decrypt(&self, packed: &[u8]) -> Result<Vec<u8>> {
        if packed.len() < SALT_SIZE + NONCE_SIZE {
            return Err(CryptoError::DecryptionError(
                "Encrypted data is too short".to_string(),
            ));
        }
        let (salt, rest) = packed.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut key_bytes = self.derive_key(salt);
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        let cipher = Aes256Gcm::new(key);
        key_bytes.zeroize();

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::DecryptionError(e.to_string()))
    }

    /// Encrypt UTF-8 text to base64
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        let packed = self.encrypt(plaintext.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(packed))
    }

    /// Decrypt base64 produced by [`Encryptor::encrypt_string`]
    pub fn decrypt_string(&self, encoded: &str) -> Result<String> {
        let packed = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let plaintext = self.decrypt(&packed)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::EncodingError(e.to_string()))
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_cycle() {
        let encryptor = Encryptor::new("TestP@ssw0rd123").unwrap();
        let data = b"sensitive configuration";

        let packed = encryptor.encrypt(data).unwrap();
        assert_ne!(&packed[SALT_SIZE + NONCE_SIZE..], data.as_slice());

        let decrypted = encryptor.decrypt(&packed).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let packed = Encryptor::new("right").unwrap().encrypt(b"data").unwrap();
        assert!(Encryptor::new("wrong").unwrap().decrypt(&packed).is_err());
    }

    #[test]
    fn test_string_cycle() {
        let encryptor = Encryptor::new("key").unwrap();
        let encoded = encryptor.encrypt_string("Name|http://x/cal.ics|user|pass").unwrap();
        assert_eq!(
            encryptor.decrypt_string(&encoded).unwrap(),
            "Name|http://x/cal.ics|user|pass"
        );
    }

    #[test]
    fn test_fresh_salt_per_call() {
        let encryptor = Encryptor::new("key").unwrap();
        assert_ne!(
            encryptor.encrypt(b"same").unwrap(),
            encryptor.encrypt(b"same").unwrap()
        );
    }

    #[test]
    fn test_truncated_input_rejected() {
        let encryptor = Encryptor::new("key").unwrap();
        assert!(matches!(
            encryptor.decrypt(&[0u8; 10]),
            Err(CryptoError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(
            Encryptor::new(""),
            Err(CryptoError::InvalidArgument(_))
        ));
    }
}
