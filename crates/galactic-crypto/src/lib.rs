pub mod encryption;
pub mod error;
pub mod hash;
pub mod password;
pub mod random;

pub use encryption::Encryptor;
pub use error::{CryptoError, Result};
pub use hash::{HashAlgorithm, HashEncoding, Hasher, SaltedHash};
pub use password::{PasswordHasher, PasswordParams};
pub use random::{generate_salt, generate_secret};
