//! Role-to-member mappings

use crate::error::{ConfigError, Result};
use crate::item::ConfigurationItem;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const SEPARATOR: char = '|';

/// Roles and their members, parsed from `Role|member|member...` lines.
///
/// Blank lines and lines starting with `#` are ignored. A role listed on
/// several lines collects the members of all of them. Member order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleStore {
    roles: BTreeMap<String, Vec<String>>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut store = Self::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split(SEPARATOR).map(str::trim);
            let role = fields.next().unwrap_or_default();
            if role.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "Line {}: role name cannot be empty",
                    index + 1
                )));
            }
            let members = store.roles.entry(role.to_string()).or_default();
            for member in fields.filter(|m| !m.is_empty()) {
                if !members.iter().any(|m| m == member) {
                    members.push(member.to_string());
                }
            }
        }
        debug!(roles = store.roles.len(), "Parsed role mappings");
        Ok(store)
    }

    /// Read the mappings held by a configuration item
    pub fn load(item: &ConfigurationItem) -> Result<Self> {
        Self::parse(item.value())
    }

    /// Store the mappings in a configuration item and write it
    pub fn save(&self, item: &mut ConfigurationItem) -> Result<()> {
        item.set_value(self.to_config_text());
        item.write()
    }

    pub fn roles(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    /// Members of `role`; empty for unknown roles
    pub fn members_of(&self, role: &str) -> &[String] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roles_for(&self, member: &str) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m == member))
            .map(|(role, _)| role.as_str())
            .collect()
    }

    pub fn has_role(&self, member: &str, role: &str) -> bool {
        self.members_of(role).iter().any(|m| m == member)
    }

    /// Map `member` to `role`. Returns false if the mapping already exists.
    pub fn add_mapping(&mut self, role: &str, member: &str) -> Result<bool> {
        validate_field("Role", role)?;
        validate_field("Member", member)?;
        let members = self.roles.entry(role.to_string()).or_default();
        if members.iter().any(|m| m == member) {
            return Ok(false);
        }
        members.push(member.to_string());
        Ok(true)
    }

    /// Remove one mapping; the role itself stays even when it has no members left
    pub fn remove_mapping(&mut self, role: &str, member: &str) -> bool {
        match self.roles.get_mut(role) {
            Some(members) => {
                let before = members.len();
                members.retain(|m| m != member);
                members.len() != before
            }
            None => false,
        }
    }

    pub fn remove_role(&mut self, role: &str) -> bool {
        self.roles.remove(role).is_some()
    }

    pub fn to_config_text(&self) -> String {
        self.roles
            .iter()
            .map(|(role, members)| {
                let mut line = role.clone();
                for member in members {
                    line.push(SEPARATOR);
                    line.push_str(member);
                }
                line.push('\n');
                line
            })
            .collect()
    }
}

impl FromStr for RoleStore {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RoleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_config_text())
    }
}

fn validate_field(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidArgument(format!("{} cannot be empty", kind)));
    }
    if value.contains(SEPARATOR) || value.contains('\n') || value.contains('\r') {
        return Err(ConfigError::InvalidArgument(format!(
            "{} cannot contain '|' or line breaks: {}",
            kind, value
        )));
    }
    if value.trim() != value || value.starts_with('#') {
        return Err(ConfigError::InvalidArgument(format!(
            "{} cannot start with '#' or surrounding whitespace: {}",
            kind, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "# role mappings\nAdmins|ann|bob\n\nReaders|bob|carol|\nAdmins|dave|ann\nEmpty\n";

    #[test]
    fn test_parse() {
        let store = RoleStore::parse(SAMPLE).unwrap();
        assert_eq!(store.roles(), vec!["Admins", "Empty", "Readers"]);
        assert_eq!(store.members_of("Admins"), ["ann", "bob", "dave"]);
        assert!(store.members_of("Empty").is_empty());
        assert!(store.members_of("Unknown").is_empty());
        assert_eq!(store.roles_for("bob"), vec!["Admins", "Readers"]);
        assert!(store.has_role("carol", "Readers"));
        assert!(!store.has_role("carol", "Admins"));
    }

    #[test]
    fn test_empty_role_rejected() {
        assert!(RoleStore::parse("|ann").is_err());
    }

    #[test]
    fn test_add_and_remove() {
        let mut store = RoleStore::new();
        assert!(store.add_mapping("Admins", "ann").unwrap());
        assert!(!store.add_mapping("Admins", "ann").unwrap());
        assert!(store.add_mapping("Admins", "bob").unwrap());
        assert!(store.add_mapping("Ops|x", "bob").is_err());
        assert!(store.add_mapping("Ops", " ").is_err());

        assert!(store.remove_mapping("Admins", "ann"));
        assert!(!store.remove_mapping("Admins", "ann"));
        assert!(!store.remove_mapping("Ops", "bob"));
        assert_eq!(store.to_config_text(), "Admins|bob\n");

        assert!(store.remove_role("Admins"));
        assert!(store.roles().is_empty());
    }

    #[test]
    fn test_config_text() {
        let store: RoleStore = SAMPLE.parse().unwrap();
        assert_eq!(
            store.to_config_text(),
            "Admins|ann|bob|dave\nEmpty\nReaders|bob|carol\n"
        );
    }

    proptest! {
        #[test]
        fn prop_config_text_reparses(
            mappings in proptest::collection::vec(("[A-Za-z][A-Za-z0-9]{0,8}", "[a-z][a-z0-9.]{0,8}"), 0..20)
        ) {
            let mut store = RoleStore::new();
            for (role, member) in &mappings {
                store.add_mapping(role, member).unwrap();
            }
            let reparsed = RoleStore::parse(&store.to_config_text()).unwrap();
            prop_assert_eq!(reparsed, store);
        }
    }
}
