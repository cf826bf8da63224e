//! SQL connection settings

use crate::error::{Result, SqlError};
use galactic_config::ConfigurationItem;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Database family, taken from the connection string scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDriver {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| SqlError::config(format!("connection string has no scheme: {}", redact(url))))?;
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(SqlDriver::Postgres),
            "mysql" | "mariadb" => Ok(SqlDriver::MySql),
            "sqlite" => Ok(SqlDriver::Sqlite),
            other => Err(SqlError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Bind marker for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDriver::Postgres => format!("${}", index),
            SqlDriver::MySql | SqlDriver::Sqlite => "?".to_string(),
        }
    }

    /// Quote an identifier, doubling any embedded quote character
    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            SqlDriver::MySql => format!("`{}`", identifier.replace('`', "``")),
            SqlDriver::Postgres | SqlDriver::Sqlite => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
        }
    }
}

/// Connection string with the password replaced, for logs and `Debug`
pub fn redact(connection: &str) -> String {
    match Url::parse(connection) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => connection.to_string(),
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Native connection string, e.g. `postgres://user:pw@db/app`
    pub url: String,

    pub max_connections: u32,

    pub connect_timeout_secs: u64,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for SqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl SqlConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Connection string stored in a (usually encrypted) configuration item.
    /// The first non-empty line is used.
    pub fn from_item(item: &ConfigurationItem) -> Result<Self> {
        let url = item
            .lines()
            .into_iter()
            .next()
            .ok_or_else(|| SqlError::config(format!("configuration item {} is empty", item.name())))?;
        let config = Self::new(url);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SqlError::config(format!("Failed to read config file: {}", e)))?;
        let config: SqlConfig = toml::from_str(&content)
            .map_err(|e| SqlError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SqlError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| SqlError::config(format!("Failed to write config file: {}", e)))
    }

    pub fn driver(&self) -> Result<SqlDriver> {
        SqlDriver::from_url(&self.url)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SqlError::config("url cannot be empty"));
        }
        self.driver()?;
        if self.max_connections == 0 {
            return Err(SqlError::config("max_connections must be at least 1"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(SqlError::config("connect_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
