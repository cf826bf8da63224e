use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Invalid log configuration: {message}")]
    ConfigError { message: String },

    #[error("Failed to initialize tracing subscriber: {message}")]
    InitializationFailed { message: String },
}
