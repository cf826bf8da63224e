//! Remote endpoint settings

use crate::error::{PowerShellError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// WS-Management endpoint, e.g. `https://host:5986/wsman`
    pub endpoint: String,

    pub username: String,

    pub password: Option<String>,

    /// HTTP timeout per request; must exceed the operation timeout
    pub timeout_secs: u64,

    /// How long the server holds a `Receive` open waiting for output
    pub operation_timeout_secs: u64,

    /// Give up on a command that runs longer than this
    pub command_timeout_secs: u64,

    pub max_envelope_size: u32,

    pub locale: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: None,
            timeout_secs: 30,
            operation_timeout_secs: 20,
            command_timeout_secs: 600,
            max_envelope_size: 153_600,
            locale: "en-US".to_string(),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// `https://{host}:5986/wsman`
    pub fn for_host(host: &str, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(format!("https://{}:5986/wsman", host), username, password)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PowerShellError::config(format!("Failed to read config file: {}", e)))?;
        let config: RemoteConfig = toml::from_str(&content)
            .map_err(|e| PowerShellError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PowerShellError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| PowerShellError::config(format!("Failed to write config file: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| PowerShellError::config(format!("Invalid endpoint: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PowerShellError::config("endpoint must be http or https"));
        }
        if self.username.trim().is_empty() {
            return Err(PowerShellError::config("username cannot be empty"));
        }
        if self.operation_timeout_secs == 0 || self.command_timeout_secs == 0 {
            return Err(PowerShellError::config("timeouts must be at least 1 second"));
        }
        if self.timeout_secs <= self.operation_timeout_secs {
            return Err(PowerShellError::config(
                "timeout_secs must be greater than operation_timeout_secs",
            ));
        }
        if self.max_envelope_size < 8192 {
            return Err(PowerShellError::config("max_envelope_size must be at least 8192"));
        }
        Ok(())
    }
}
