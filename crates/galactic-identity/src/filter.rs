//! Provider-neutral search requests

use crate::attribute::AttributeValue;
use crate::record::{DirectoryRecord, ObjectType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchFilter {
    Equals { attribute: String, value: String },
    StartsWith { attribute: String, value: String },
    Present { attribute: String },
    And(Vec<SearchFilter>),
    Or(Vec<SearchFilter>),
    Not(Box<SearchFilter>),
}

impl SearchFilter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        SearchFilter::Present {
            attribute: attribute.into(),
        }
    }

    pub fn and(filters: Vec<SearchFilter>) -> Self {
        SearchFilter::And(filters)
    }

    pub fn or(filters: Vec<SearchFilter>) -> Self {
        SearchFilter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: SearchFilter) -> Self {
        SearchFilter::Not(Box::new(filter))
    }

    /// Evaluate against a normalized record. Attribute names and text
    /// comparisons are case-insensitive, as in most directories.
    pub fn matches(&self, record: &DirectoryRecord) -> bool {
        match self {
            SearchFilter::Equals { attribute, value } => record
                .attribute(attribute)
                .map(|v| v.matches_text(value))
                .unwrap_or(false),
            SearchFilter::StartsWith { attribute, value } => {
                let prefix = value.to_lowercase();
                record
                    .attribute(attribute)
                    .map(|v| {
                        v.text_values()
                            .iter()
                            .any(|s| s.to_lowercase().starts_with(&prefix))
                    })
                    .unwrap_or(false)
            }
            SearchFilter::Present { attribute } => record
                .attribute(attribute)
                .map(|v| !matches!(v, AttributeValue::Null))
                .unwrap_or(false),
            SearchFilter::And(filters) => filters.iter().all(|f| f.matches(record)),
            SearchFilter::Or(filters) => filters.iter().any(|f| f.matches(record)),
            SearchFilter::Not(filter) => !filter.matches(record),
        }
    }
}

/// How far below the base a search reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Base,
    OneLevel,
    #[default]
    Subtree,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub object_type: Option<ObjectType>,
    pub filter: Option<SearchFilter>,
    /// Attributes to return; empty means all
    pub attributes: Vec<String>,
    /// Search base; providers fall back to their configured base
    pub base: Option<String>,
    pub scope: SearchScope,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users() -> Self {
        Self {
            object_type: Some(ObjectType::User),
            ..Self::default()
        }
    }

    pub fn groups() -> Self {
        Self {
            object_type: Some(ObjectType::Group),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Type and filter check shared by providers that filter client-side
    pub fn matches(&self, record: &DirectoryRecord) -> bool {
        if let Some(object_type) = &self.object_type {
            if &record.object_type != object_type {
                return false;
            }
        }
        self.filter
            .as_ref()
            .map(|f| f.matches(record))
            .unwrap_or(true)
    }
}
