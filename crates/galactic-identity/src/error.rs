//! Error types for the identity object model

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Attribute {attribute} expects a {expected} value")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
    },

    #[error("Attribute is read-only: {0}")]
    ReadOnlyAttribute(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Unexpected object type: expected {expected}, found {found}")]
    WrongObjectType {
        expected: &'static str,
        found: String,
    },

    #[error("Directory provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Operation not supported by {provider}: {operation}")]
    Unsupported { provider: String, operation: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl IdentityError {
    pub fn provider(provider: &str, message: impl std::fmt::Display) -> Self {
        IdentityError::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    pub fn type_mismatch(attribute: &str, expected: &'static str) -> Self {
        IdentityError::TypeMismatch {
            attribute: attribute.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IdentityError::type_mismatch("mail", "text");
        assert_eq!(err.to_string(), "Attribute mail expects a text value");

        let err = IdentityError::provider("ldap", "connection refused");
        assert_eq!(
            err.to_string(),
            "Directory provider ldap failed: connection refused"
        );
    }
}
