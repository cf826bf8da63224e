//! Error types for the Azure AD provider

use galactic_identity::IdentityError;
use galactic_rest::RestError;
use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AzureError>;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Graph API error {status} ({code}): {message}")]
    Graph {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid object id: {0:?}")]
    InvalidId(String),

    #[error("Unexpected Graph response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Rest(RestError),
}

/// OData error envelope returned by Microsoft Graph
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

impl AzureError {
    pub fn config(message: impl Into<String>) -> Self {
        AzureError::ConfigError {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AzureError::Graph { status, .. } => Some(*status),
            AzureError::Rest(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Adding a member that is already present
    pub fn is_conflict(&self) -> bool {
        match self {
            AzureError::Graph {
                status: 400,
                message,
                ..
            } => message.contains("already exist"),
            AzureError::Graph { status: 409, .. } => true,
            _ => false,
        }
    }
}

impl From<RestError> for AzureError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Status { status, body } => match serde_json::from_str::<ODataError>(&body) {
                Ok(odata) => AzureError::Graph {
                    status,
                    code: odata.error.code,
                    message: odata.error.message,
                },
                Err(_) => AzureError::Graph {
                    status,
                    code: status.to_string(),
                    message: body,
                },
            },
            other => AzureError::Rest(other),
        }
    }
}

impl From<AzureError> for IdentityError {
    fn from(err: AzureError) -> Self {
        IdentityError::provider("azure", err)
    }
}
