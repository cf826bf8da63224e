//! Error types for PowerShell remoting

use galactic_rest::RestError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PowerShellError>;

#[derive(Error, Debug)]
pub enum PowerShellError {
    #[error("WS-Management fault {code}: {reason}")]
    Fault { code: String, reason: String },

    #[error("Remote command did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Malformed WS-Management response: {0}")]
    Response(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error(transparent)]
    Rest(RestError),
}

impl PowerShellError {
    pub fn config(message: impl Into<String>) -> Self {
        PowerShellError::ConfigError {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PowerShellError::Rest(e) => e.status(),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for PowerShellError {
    fn from(err: quick_xml::Error) -> Self {
        PowerShellError::Response(err.to_string())
    }
}

/// WinRM reports faults as HTTP 500 with a SOAP fault body
impl From<RestError> for PowerShellError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Status { status, body } => match crate::wsman::parse_fault(&body) {
                Some(fault) => PowerShellError::Fault {
                    code: fault.code,
                    reason: fault.reason,
                },
                None => PowerShellError::Rest(RestError::Status { status, body }),
            },
            other => PowerShellError::Rest(other),
        }
    }
}
