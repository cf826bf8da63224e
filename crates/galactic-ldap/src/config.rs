//! LDAP provider configuration

use crate::error::{LdapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    /// Server URL (ldap:// or ldaps://)
    pub url: String,

    /// DN used for the service bind; anonymous when unset
    pub bind_dn: Option<String>,

    pub bind_password: Option<String>,

    /// Search base for every operation without an explicit base
    pub base_dn: String,

    /// Container new users are created in; defaults to `base_dn`
    pub user_container: Option<String>,

    /// Container new groups are created in; defaults to `base_dn`
    pub group_container: Option<String>,

    pub user_object_class: String,

    pub group_object_class: String,

    /// Naming attribute used for the RDN of created entries
    pub rdn_attribute: String,

    /// Attribute that holds the object creation time
    pub creation_time_attribute: String,

    /// Common attribute name -> LDAP attribute name. Names not listed are
    /// passed through unchanged.
    pub attribute_map: BTreeMap<String, String>,

    /// Simple paged results size; 0 disables paging
    pub page_size: i32,

    /// Server supports the in-chain matching rule (Active Directory)
    pub in_chain_matching: bool,

    pub use_starttls: bool,

    pub connection_timeout_secs: u64,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: "ldap://localhost:389".to_string(),
            bind_dn: None,
            bind_password: None,
            base_dn: String::new(),
            user_container: None,
            group_container: None,
            user_object_class: "user".to_string(),
            group_object_class: "group".to_string(),
            rdn_attribute: "cn".to_string(),
            creation_time_attribute: "whenCreated".to_string(),
            attribute_map: default_attribute_map(),
            page_size: 500,
            in_chain_matching: true,
            use_starttls: false,
            connection_timeout_secs: 10,
        }
    }
}

/// Active Directory names for the common attribute set
pub fn default_attribute_map() -> BTreeMap<String, String> {
    [
        ("surname", "sn"),
        ("businessPhones", "telephoneNumber"),
        ("mobilePhone", "mobile"),
        ("jobTitle", "title"),
        ("companyName", "company"),
        ("officeLocation", "physicalDeliveryOfficeName"),
        ("city", "l"),
        ("state", "st"),
        ("country", "c"),
        ("employeeId", "employeeID"),
        ("managerId", "manager"),
    ]
    .into_iter()
    .map(|(common, ldap)| (common.to_string(), ldap.to_string()))
    .collect()
}

impl LdapConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LdapError::config(format!("Failed to read config file: {}", e)))?;
        let config: LdapConfig = toml::from_str(&content)
            .map_err(|e| LdapError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LdapError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| LdapError::config(format!("Failed to write config file: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ldap://") || self.url.starts_with("ldaps://")) {
            return Err(LdapError::config(format!(
                "URL must start with ldap:// or ldaps://: {}",
                self.url
            )));
        }
        if self.base_dn.trim().is_empty() {
            return Err(LdapError::config("Base DN cannot be empty"));
        }
        if self.bind_dn.is_some() != self.bind_password.is_some() {
            return Err(LdapError::config(
                "Bind DN and bind password must be set together",
            ));
        }
        if self.page_size < 0 {
            return Err(LdapError::config("Page size cannot be negative"));
        }
        if self.rdn_attribute.trim().is_empty() {
            return Err(LdapError::config("RDN attribute cannot be empty"));
        }
        Ok(())
    }

    /// LDAP attribute name for a common name
    pub fn ldap_name<'a>(&'a self, common: &'a str) -> &'a str {
        self.attribute_map
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(common))
            .map(|(_, ldap)| ldap.as_str())
            .unwrap_or(common)
    }

    /// Common name for an LDAP attribute name
    pub fn common_name<'a>(&'a self, ldap: &'a str) -> &'a str {
        self.attribute_map
            .iter()
            .find(|(_, mapped)| mapped.eq_ignore_ascii_case(ldap))
            .map(|(common, _)| common.as_str())
            .unwrap_or(ldap)
    }

    pub fn user_container(&self) -> &str {
        self.user_container.as_deref().unwrap_or(&self.base_dn)
    }

    pub fn group_container(&self) -> &str {
        self.group_container.as_deref().unwrap_or(&self.base_dn)
    }
}
