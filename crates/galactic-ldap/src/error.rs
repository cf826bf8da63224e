//! Error types for the LDAP provider

use galactic_identity::IdentityError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LdapError>;

#[derive(Error, Debug)]
pub enum LdapError {
    #[error("LDAP protocol error: {0}")]
    Protocol(#[from] ldap3::LdapError),

    #[error("LDAP bind failed for {bind_dn}: invalid credentials")]
    AuthenticationFailed { bind_dn: String },

    #[error("LDAP {operation} failed with code {rc}: {text}")]
    Operation {
        operation: &'static str,
        rc: u32,
        text: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid DN: {0}")]
    InvalidDn(String),

    #[error("Attribute {attribute} holds a {kind} value, which cannot be written over LDAP")]
    UnsupportedValue {
        attribute: String,
        kind: &'static str,
    },
}

impl LdapError {
    pub fn config(message: impl Into<String>) -> Self {
        LdapError::ConfigError {
            message: message.into(),
        }
    }
}

impl From<LdapError> for IdentityError {
    fn from(err: LdapError) -> Self {
        IdentityError::provider("ldap", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_display() {
        let err = LdapError::Operation {
            operation: "modify",
            rc: 50,
            text: "Insufficient access".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "LDAP modify failed with code 50: Insufficient access"
        );
    }

    #[test]
    fn test_converts_to_provider_error() {
        let err: IdentityError = LdapError::InvalidDn("cn=".to_string()).into();
        match err {
            IdentityError::Provider { provider, message } => {
                assert_eq!(provider, "ldap");
                assert!(message.contains("cn="));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
