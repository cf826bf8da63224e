use rand::rngs::OsRng;
use rand::{Rng, RngCore};

const SECRET_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                abcdefghijklmnopqrstuvwxyz\
                                0123456789\
                                !@#$%^&*";

/// Random bytes from the operating system generator
pub fn generate_salt(length: usize) -> Vec<u8> {
    let mut salt = vec![0u8; length];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Random printable secret, e.g. for generated service passwords
pub fn generate_secret(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..SECRET_CHARSET.len());
            SECRET_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_length_and_uniqueness() {
        let a = generate_salt(16);
        let b = generate_salt(16);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_secret_uses_charset() {
        let secret = generate_secret(64);
        assert_eq!(secret.len(), 64);
        assert!(secret.bytes().all(|c| SECRET_CHARSET.contains(&c)));
    }
}
