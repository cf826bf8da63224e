//! Calendar registration lines

use crate::error::{CalendarError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// One `Name|URI|username|password` line; credentials are optional
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub name: String,
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CalendarConfig {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Result<Self> {
        let config = Self {
            name: name.into(),
            uri: uri.into(),
            username: None,
            password: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').map(str::trim).collect();
        if fields.len() < 2 || fields.len() > 4 {
            return Err(CalendarError::InvalidConfig(format!(
                "expected Name|URI|username|password, got {:?}",
                line
            )));
        }
        let optional = |index: usize| {
            fields
                .get(index)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
        };
        let config = Self {
            name: fields[0].to_string(),
            uri: fields[1].to_string(),
            username: optional(2),
            password: optional(3),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CalendarError::InvalidConfig(
                "calendar name cannot be empty".to_string(),
            ));
        }
        let uri = Url::parse(&self.uri).map_err(|e| {
            CalendarError::InvalidConfig(format!("{}: invalid URI {:?}: {}", self.name, self.uri, e))
        })?;
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(CalendarError::InvalidConfig(format!(
                "{}: URI must be http(s): {}",
                self.name, self.uri
            )));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(CalendarError::InvalidConfig(format!(
                "{}: password given without username",
                self.name
            )));
        }
        Ok(())
    }

    /// `(username, password)` when a username is configured
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .map(|username| (username, self.password.as_deref()))
    }

    pub fn to_line(&self) -> String {
        let mut line = format!("{}|{}", self.name, self.uri);
        if let Some(username) = &self.username {
            line.push('|');
            line.push_str(username);
            if let Some(password) = &self.password {
                line.push('|');
                line.push_str(password);
            }
        }
        line
    }
}

impl FromStr for CalendarConfig {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s)
    }
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
