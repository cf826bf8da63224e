use galactic_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unsupported database: {0}")]
    UnsupportedDriver(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SqlError {
    pub fn config(message: impl Into<String>) -> Self {
        SqlError::ConfigError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlError>;
