//! Error types for document stores

use galactic_identity::IdentityError;
use galactic_rest::RestError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NoSqlError>;

#[derive(Error, Debug)]
pub enum NoSqlError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Couchbase query failed ({code}): {message}")]
    Query { code: i64, message: String },

    #[error("Document {0} already exists")]
    Duplicate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Rest(RestError),
}

impl NoSqlError {
    pub fn config(message: impl Into<String>) -> Self {
        NoSqlError::ConfigError {
            message: message.into(),
        }
    }
}

/// Error entry of a N1QL response body
#[derive(Debug, serde::Deserialize)]
struct QueryErrorBody {
    errors: Vec<QueryErrorEntry>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct QueryErrorEntry {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

impl From<QueryErrorEntry> for NoSqlError {
    fn from(entry: QueryErrorEntry) -> Self {
        NoSqlError::Query {
            code: entry.code,
            message: entry.msg,
        }
    }
}

impl From<RestError> for NoSqlError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Status { status, body } => {
                match serde_json::from_str::<QueryErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.errors.into_iter().next())
                {
                    Some(entry) => entry.into(),
                    None => NoSqlError::Rest(RestError::Status { status, body }),
                }
            }
            other => NoSqlError::Rest(other),
        }
    }
}

impl From<NoSqlError> for IdentityError {
    fn from(err: NoSqlError) -> Self {
        IdentityError::provider("nosql", err)
    }
}
