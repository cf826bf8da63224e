use galactic_config::ConfigError;
use galactic_rest::RestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid calendar configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Calendar already registered: {0}")]
    DuplicateCalendar(String),

    #[error("Unknown calendar: {0}")]
    UnknownCalendar(String),

    #[error("Not an iCalendar feed: {0}")]
    InvalidFeed(String),

    #[error("Failed to download calendar: {0}")]
    Download(#[from] RestError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
