//! Azure AD provider configuration

use crate::error::{AzureError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub tenant_id: String,

    /// Application (client) id of the app registration
    pub client_id: String,

    pub client_secret: String,

    pub graph_endpoint: String,

    pub login_endpoint: String,

    pub api_version: String,

    /// `$top` for list requests
    pub page_size: u32,

    pub timeout_secs: u64,

    /// Seconds before expiry at which a cached token is renewed
    pub token_grace_secs: i64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            graph_endpoint: "https://graph.microsoft.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            api_version: "v1.0".to_string(),
            page_size: 100,
            timeout_secs: 30,
            token_grace_secs: 300,
        }
    }
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("graph_endpoint", &self.graph_endpoint)
            .field("login_endpoint", &self.login_endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AzureConfig {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AzureError::config(format!("Failed to read config file: {}", e)))?;
        let config: AzureConfig = toml::from_str(&content)
            .map_err(|e| AzureError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Tenant id", &self.tenant_id),
            ("Client id", &self.client_id),
            ("Client secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(AzureError::config(format!("{} cannot be empty", name)));
            }
        }
        for (name, value) in [
            ("Graph endpoint", &self.graph_endpoint),
            ("Login endpoint", &self.login_endpoint),
        ] {
            if !(value.starts_with("https://") || value.starts_with("http://")) {
                return Err(AzureError::config(format!(
                    "{} must be an http(s) URL: {}",
                    name, value
                )));
            }
        }
        if self.page_size == 0 || self.page_size > 999 {
            return Err(AzureError::config("Page size must be between 1 and 999"));
        }
        Ok(())
    }

    /// Versioned Graph root, e.g. `https://graph.microsoft.com/v1.0`
    pub fn graph_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.graph_endpoint.trim_end_matches('/'),
            self.api_version
        )
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub fn scope(&self) -> String {
        format!("{}/.default", self.graph_endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(AzureConfig::default().validate().is_err());
        let config = AzureConfig::new("tenant", "client", "secret");
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.page_size = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_derived_urls() {
        let config = AzureConfig::new("contoso", "client", "secret");
        assert_eq!(config.graph_base_url(), "https://graph.microsoft.com/v1.0");
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(config.scope(), "https://graph.microsoft.com/.default");
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", AzureConfig::new("t", "c", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azure.toml");
        std::fs::write(
            &path,
            "tenant_id = \"t\"\nclient_id = \"c\"\nclient_secret = \"s\"\napi_version = \"beta\"\n",
        )
        .unwrap();
        let config = AzureConfig::from_file(&path).unwrap();
        assert_eq!(config.graph_base_url(), "https://graph.microsoft.com/beta");
        assert_eq!(config.page_size, 100);
    }
}
