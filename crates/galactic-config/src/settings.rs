//! Ambient settings shared by Galactic hosts

use crate::error::{ConfigError, Result};
use crate::item::ConfigurationItem;
use galactic_log::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_LOG_LEVEL: &str = "GALACTIC_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "GALACTIC_LOG_FORMAT";
pub const ENV_CONFIG_DIR: &str = "GALACTIC_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalacticConfig {
    /// Folder holding configuration items
    pub config_dir: PathBuf,

    pub log: LogConfig,
}

impl Default for GalacticConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            log: LogConfig::default(),
        }
    }
}

impl GalacticConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;
        Ok(())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise defaults; then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            debug!(level = %level, "Log level overridden from environment");
            self.log.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log.format = format.parse::<LogFormat>()?;
        }
        if let Some(dir) = lookup(ENV_CONFIG_DIR) {
            self.config_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.log.validate()?;
        if self.config_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("Config directory cannot be empty"));
        }
        Ok(())
    }

    /// Open a configuration item in [`GalacticConfig::config_dir`]
    pub fn item(&self, name: &str, encrypted: bool, key: Option<&str>) -> Result<ConfigurationItem> {
        ConfigurationItem::new(&self.config_dir, name, encrypted, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GalacticConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.config_dir, PathBuf::from("config"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_LOG_LEVEL, "galactic_ldap=debug"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_CONFIG_DIR, "/etc/galactic"),
        ]
        .into_iter()
        .collect();

        let mut config = GalacticConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.log.level, "galactic_ldap=debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.config_dir, PathBuf::from("/etc/galactic"));
    }

    #[test]
    fn test_bad_format_override() {
        let mut config = GalacticConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_LOG_FORMAT).then(|| "xml".to_string()));
        assert!(matches!(result, Err(ConfigError::Log(_))));
    }

    #[test]
    fn test_partial_toml() {
        let config: GalacticConfig = toml::from_str("[log]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, LogFormat::Plain);
        assert_eq!(config.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn test_empty_dir_rejected() {
        let config = GalacticConfig {
            config_dir: PathBuf::new(),
            ..GalacticConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
