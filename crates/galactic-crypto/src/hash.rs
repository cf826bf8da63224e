//! Message digests

use crate::error::{CryptoError, Result};
use crate::random::generate_salt;
use base64::Engine;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;
use tracing::debug;

const DEFAULT_SALT_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashEncoding {
    Hex,
    Base64,
}

/// A salted digest; both parts are encoded with the hasher's encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedHash {
    pub salt: String,
    pub hash: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    encoding: HashEncoding,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::Sha256)
    }
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            encoding: HashEncoding::Hex,
        }
    }

    pub fn with_encoding(mut self, encoding: HashEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self.algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn hash(&self, data: &[u8]) -> String {
        self.encode(&self.digest(data))
    }

    pub fn hash_str(&self, value: &str) -> String {
        self.hash(value.as_bytes())
    }

    /// Hash `value` with a fresh random salt
    pub fn salted_hash(&self, value: &str) -> SaltedHash {
        let salt = generate_salt(DEFAULT_SALT_SIZE);
        SaltedHash {
            salt: self.encode(&salt),
            hash: self.encode(&self.digest_with_salt(value.as_bytes(), &salt)),
        }
    }

    /// Hash `value` with an encoded salt previously produced by [`Hasher::salted_hash`]
    pub fn hash_with_salt(&self, value: &str, salt: &str) -> Result<String> {
        let salt = self.decode(salt)?;
        Ok(self.encode(&self.digest_with_salt(value.as_bytes(), &salt)))
    }

    /// Compare the digest of `value` against an encoded digest in constant time
    pub fn verify(&self, value: &str, expected: &str) -> bool {
        let actual = self.digest(value.as_bytes());
        match self.decode(expected) {
            Ok(expected) => actual.ct_eq(&expected).into(),
            Err(e) => {
                debug!(error = %e, "Expected hash is not in the configured encoding");
                false
            }
        }
    }

    pub fn verify_salted(&self, value: &str, salted: &SaltedHash) -> bool {
        let salt = match self.decode(&salted.salt) {
            Ok(salt) => salt,
            Err(_) => return false,
        };
        let actual = self.digest_with_salt(value.as_bytes(), &salt);
        match self.decode(&salted.hash) {
            Ok(expected) => actual.ct_eq(&expected).into(),
            Err(e) => {
                debug!(error = %e, "Expected hash is not in the configured encoding");
                false
            }
        }
    }

    fn digest_with_salt(&self, data: &[u8], salt: &[u8]) -> Vec<u8> {
        let mut salted = Vec::with_capacity(salt.len() + data.len());
        salted.extend_from_slice(salt);
        salted.extend_from_slice(data);
        self.digest(&salted)
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            HashEncoding::Hex => hex::encode(bytes),
            HashEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        match self.encoding {
            HashEncoding::Hex => hex::decode(encoded).map_err(CryptoError::from),
            HashEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(CryptoError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        assert_eq!(
            hasher.hash_str("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha512_length() {
        let hasher = Hasher::new(HashAlgorithm::Sha512);
        assert_eq!(hasher.digest(b"abc").len(), 64);
        assert_eq!(hasher.hash_str("abc").len(), 128);
    }

    #[test]
    fn test_base64_encoding() {
        let hasher = Hasher::new(HashAlgorithm::Sha256).with_encoding(HashEncoding::Base64);
        assert_eq!(
            hasher.hash_str("abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn test_verify() {
        let hasher = Hasher::default();
        let digest = hasher.hash_str("galactic");
        assert!(hasher.verify("galactic", &digest));
        assert!(!hasher.verify("Galactic", &digest));
        assert!(!hasher.verify("galactic", "not-hex"));
    }

    #[test]
    fn test_salted_hash_roundtrip() {
        let hasher = Hasher::new(HashAlgorithm::Sha512);
        let salted = hasher.salted_hash("secret");
        assert!(hasher.verify_salted("secret", &salted));
        assert!(!hasher.verify_salted("other", &salted));

        let again = hasher.hash_with_salt("secret", &salted.salt).unwrap();
        assert_eq!(again, salted.hash);

        let other = hasher.salted_hash("secret");
        assert_ne!(other.salt, salted.salt);
    }
}
