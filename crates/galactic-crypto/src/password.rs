use crate::{CryptoError, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as ArgonPasswordHasher,
    PasswordVerifier, Version,
};
use tracing::debug;

/// Argon2id cost settings for stored service credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordParams {
    /// Cheap settings for tests and interactive tooling
    pub fn light() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST.max(8 * 1024),
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.to_argon2().map(|_| ())
    }

    fn to_argon2(self) -> Result<Params> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CryptoError::InvalidArgument(format!("Argon2 parameters: {}", e)))
    }
}

/// Argon2id password hashing to PHC strings
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    params: PasswordParams,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
            params: PasswordParams::default(),
        }
    }

    pub fn with_params(params: PasswordParams) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
        Ok(Self { argon2, params })
    }

    pub fn params(&self) -> PasswordParams {
        self.params
    }

    /// PHC string for `password` with a random salt
    pub fn hash_password(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(CryptoError::InvalidArgument(
                "Password cannot be empty".to_string(),
            ));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CryptoError::PasswordHashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verifies against the costs recorded in `hash`, not the configured ones.
    /// Errors only when `hash` is not a valid PHC string.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = parse_hash(hash)?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Whether `hash` was made with another algorithm or weaker costs than
    /// the configured ones
    pub fn needs_rehash(&self, hash: &str) -> Result<bool> {
        let parsed = parse_hash(hash)?;
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return Ok(true);
        }
        let stored = Params::try_from(&parsed)
            .map_err(|e| CryptoError::PasswordHashError(e.to_string()))?;
        let outdated = stored.m_cost() < self.params.memory_kib
            || stored.t_cost() < self.params.iterations
            || stored.p_cost() < self.params.parallelism;
        if outdated {
            debug!(
                m_cost = stored.m_cost(),
                t_cost = stored.t_cost(),
                p_cost = stored.p_cost(),
                "Stored password hash is below configured cost"
            );
        }
        Ok(outdated)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_hash(hash: &str) -> Result<PasswordHash<'_>> {
    PasswordHash::new(hash).map_err(|e| CryptoError::PasswordHashError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> PasswordHasher {
        PasswordHasher::with_params(PasswordParams::light()).unwrap()
    }

    #[test]
    fn test_password_hashing() {
        let hasher = light();
        let hash = hasher.hash_password("directory-admin").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=8192,t=1,p=1"));

        assert!(hasher.verify_password("directory-admin", &hash).unwrap());
        assert!(!hasher.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hash_from_other_costs_still_verifies() {
        let hash = light().hash_password("svc-bind").unwrap();
        assert!(PasswordHasher::new().verify_password("svc-bind", &hash).unwrap());
    }

    #[test]
    fn test_needs_rehash() {
        let weak = light().hash_password("svc-bind").unwrap();
        let strong = PasswordHasher::new();
        assert!(strong.needs_rehash(&weak).unwrap());
        assert!(!light().needs_rehash(&weak).unwrap());

        let argon2i = "$argon2i$v=19$m=8192,t=1,p=1$c29tZXNhbHQ$iWh06vD8Fy27wf9npn6FXWiCX4K6pW6Ue1Bnzz07Z8A";
        assert!(light().needs_rehash(argon2i).unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = PasswordParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(params.validate().is_err());
        assert!(PasswordHasher::with_params(params).is_err());
    }

    #[test]
    fn test_invalid_hash_is_error() {
        let hasher = light();
        assert!(hasher.verify_password("x", "not-a-phc-string").is_err());
        assert!(hasher.needs_rehash("not-a-phc-string").is_err());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(light().hash_password("").is_err());
    }
}
