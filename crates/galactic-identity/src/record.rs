//! Provider-native records normalized to common attribute names

use crate::attribute::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    User,
    Group,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Group => "group",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object as returned by a directory provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub unique_id: String,
    pub object_type: ObjectType,
    pub creation_time: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl DirectoryRecord {
    pub fn new(unique_id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            unique_id: unique_id.into(),
            object_type,
            creation_time: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_creation_time(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = Some(creation_time);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive attribute lookup
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttributeValue::as_text)
    }

    /// Replace (or with `Null`, remove) an attribute, keeping the stored key's casing
    pub fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        let key = self
            .attributes
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        if value.is_null() {
            self.attributes.remove(&key);
        } else {
            self.attributes.insert(key, value);
        }
    }

    /// Drop all attributes not in `names`; empty `names` keeps everything
    pub fn retain_attributes(&mut self, names: &[String]) {
        if names.is_empty() || names.iter().any(|n| n == "*") {
            return;
        }
        self.attributes
            .retain(|key, _| names.iter().any(|n| n.eq_ignore_ascii_case(key)));
    }
}
