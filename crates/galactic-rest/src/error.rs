//! Error types for the REST client

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RestError>;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Token acquisition failed: {0}")]
    Token(String),
}

impl RestError {
    /// HTTP status for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            RestError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
