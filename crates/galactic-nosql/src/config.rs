//! Document store connection settings

use crate::error::{NoSqlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Connection string with the password replaced, for logs and `Debug`
pub(crate) fn redact(connection: &str) -> String {
    match Url::parse(connection) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => connection.to_string(),
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| NoSqlError::config(format!("Failed to read config file: {}", e)))?;
    toml::from_str(&content).map_err(|e| NoSqlError::config(format!("Failed to parse config: {}", e)))
}

fn write_toml<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(value)
        .map_err(|e| NoSqlError::config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)
        .map_err(|e| NoSqlError::config(format!("Failed to write config file: {}", e)))
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// `mongodb://` or `mongodb+srv://` connection string
    pub uri: String,

    pub database: String,

    pub server_selection_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: String::new(),
            server_selection_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &redact(&self.uri))
            .field("database", &self.database)
            .field("server_selection_timeout_secs", &self.server_selection_timeout_secs)
            .finish()
    }
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        write_toml(self, path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            return Err(NoSqlError::config("uri must start with mongodb:// or mongodb+srv://"));
        }
        if self.database.trim().is_empty() {
            return Err(NoSqlError::config("database cannot be empty"));
        }
        if self.server_selection_timeout_secs == 0 {
            return Err(NoSqlError::config("server_selection_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouchbaseConfig {
    /// Query service endpoint, e.g. `http://cb.example.com:8093/`
    pub query_url: String,

    pub bucket: String,

    pub scope: String,

    pub username: String,

    pub password: Option<String>,

    pub timeout_secs: u64,
}

impl Default for CouchbaseConfig {
    fn default() -> Self {
        Self {
            query_url: "http://localhost:8093/".to_string(),
            bucket: String::new(),
            scope: "_default".to_string(),
            username: String::new(),
            password: None,
            timeout_secs: 75,
        }
    }
}

impl std::fmt::Debug for CouchbaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchbaseConfig")
            .field("query_url", &self.query_url)
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CouchbaseConfig {
    pub fn new(query_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            query_url: query_url.into(),
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = Some(password.into());
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        write_toml(self, path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.query_url)
            .map_err(|e| NoSqlError::config(format!("Invalid query_url: {}", e)))?;
        if self.bucket.trim().is_empty() {
            return Err(NoSqlError::config("bucket cannot be empty"));
        }
        if self.scope.trim().is_empty() {
            return Err(NoSqlError::config("scope cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(NoSqlError::config("timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
