//! The document store interface

use crate::document::{Document, DocumentValue};
use crate::error::Result;
use async_trait::async_trait;
use galactic_identity::SearchFilter;

/// CRUD over collections of [`Document`]s keyed by `_id`.
///
/// `find` filters use dotted paths for nested fields. Text comparisons are
/// case-sensitive except in the in-memory store, which follows the directory
/// convention of matching case-insensitively.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs and events
    fn provider_name(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn find(&self, collection: &str, filter: Option<&SearchFilter>) -> Result<Vec<Document>>;

    /// Store a new document and return its id. A document without `_id` is
    /// given one; an existing id is a [`NoSqlError::Duplicate`].
    ///
    /// [`NoSqlError::Duplicate`]: crate::NoSqlError::Duplicate
    async fn insert(&self, collection: &str, document: Document) -> Result<String>;

    /// Replace the whole document. Returns false when `id` does not exist.
    async fn replace(&self, collection: &str, id: &str, document: Document) -> Result<bool>;

    /// Returns false when `id` does not exist
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;
}

/// Evaluate `filter` against a document, comparing text case-insensitively
pub fn document_matches(filter: &SearchFilter, document: &Document) -> bool {
    match filter {
        SearchFilter::Equals { attribute, value } => document
            .get_path(attribute)
            .map(|v| v.text_values().iter().any(|s| s.eq_ignore_ascii_case(value)))
            .unwrap_or(false),
        SearchFilter::StartsWith { attribute, value } => {
            let prefix = value.to_lowercase();
            document
                .get_path(attribute)
                .map(|v| {
                    v.text_values()
                        .iter()
                        .any(|s| s.to_lowercase().starts_with(&prefix))
                })
                .unwrap_or(false)
        }
        SearchFilter::Present { attribute } => document
            .get_path(attribute)
            .map(|v| !matches!(v, DocumentValue::Null))
            .unwrap_or(false),
        SearchFilter::And(filters) => filters.iter().all(|f| document_matches(f, document)),
        SearchFilter::Or(filters) => filters.iter().any(|f| document_matches(f, document)),
        SearchFilter::Not(filter) => !document_matches(filter, document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crew() -> Document {
        Document::new()
            .with("name", "Kara Thrace")
            .with("callsigns", vec!["Starbuck"])
            .with("rank", DocumentValue::Null)
            .with("ship", Document::new().with("name", "Galactica"))
    }

    #[test]
    fn test_matching() {
        let doc = crew();
        assert!(document_matches(&SearchFilter::eq("name", "kara thrace"), &doc));
        assert!(document_matches(&SearchFilter::eq("callsigns", "Starbuck"), &doc));
        assert!(document_matches(&SearchFilter::starts_with("ship.name", "gal"), &doc));
        assert!(!document_matches(&SearchFilter::present("rank"), &doc));
        assert!(!document_matches(&SearchFilter::present("missing"), &doc));
        assert!(document_matches(
            &SearchFilter::and(vec![
                SearchFilter::present("name"),
                SearchFilter::not(SearchFilter::eq("ship.name", "Pegasus")),
            ]),
            &doc
        ));
        assert!(!document_matches(&SearchFilter::or(vec![]), &doc));
    }
}
