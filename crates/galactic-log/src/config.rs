//! Logging configuration

use crate::error::{LogError, Result};
use serde::{Deserialize, Serialize};

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    pub level: String,

    /// Output format
    pub format: LogFormat,

    /// Whether to include the event target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            return Err(LogError::ConfigError {
                message: "Log level cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::ConfigError {
                message: format!("Unknown log format: {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Plain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_level_rejected() {
        let config = LogConfig {
            level: "  ".to_string(),
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Plain);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = LogConfig {
            format: LogFormat::Json,
            ..LogConfig::default()
        };
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("format = \"json\""));
        let deserialized: LogConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.format, LogFormat::Json);
    }
}
