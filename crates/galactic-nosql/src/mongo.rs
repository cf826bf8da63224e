//! MongoDB document store

use crate::config::{redact, MongoConfig};
use crate::document::{Document, ID_FIELD};
use crate::error::{NoSqlError, Result};
use crate::store::DocumentStore;
use async_trait::async_trait;
use galactic_identity::SearchFilter;
use galactic_log::{EventEntry, EventLog, EventSeverity};
use mongodb::bson::{self, doc, oid::ObjectId, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const EVENT_SOURCE: &str = "galactic-nosql";
const DUPLICATE_KEY: i32 = 11000;

/// Escape regular expression metacharacters for a literal prefix match
fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translate a filter into a MongoDB query document
pub fn render_filter(filter: &SearchFilter) -> bson::Document {
    match filter {
        SearchFilter::Equals { attribute, value } => doc! { attribute.as_str(): value.as_str() },
        SearchFilter::StartsWith { attribute, value } => doc! {
            attribute.as_str(): { "$regex": format!("^{}", escape_regex(value)) }
        },
        SearchFilter::Present { attribute } => doc! {
            attribute.as_str(): { "$exists": true, "$ne": Bson::Null }
        },
        SearchFilter::And(filters) if filters.is_empty() => doc! {},
        SearchFilter::And(filters) => doc! { "$and": render_all(filters) },
        SearchFilter::Or(filters) if filters.is_empty() => doc! { ID_FIELD: { "$in": [] } },
        SearchFilter::Or(filters) => doc! { "$or": render_all(filters) },
        SearchFilter::Not(filter) => doc! { "$nor": [render_filter(filter)] },
    }
}

fn render_all(filters: &[SearchFilter]) -> Vec<Bson> {
    filters.iter().map(|f| Bson::Document(render_filter(f))).collect()
}

/// Match `id` as an object id when it parses as one, and as a string always
fn id_query(id: &str) -> bson::Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { ID_FIELD: { "$in": [oid, id] } },
        Err(_) => doc! { ID_FIELD: id },
    }
}

fn id_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

pub struct MongoStore {
    database: Database,
    event_log: Option<Arc<dyn EventLog>>,
}

impl MongoStore {
    /// Build a client for `config`. The driver connects lazily, so an
    /// unreachable server surfaces on the first operation.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        config.validate()?;
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("galactic".to_string());
        options.server_selection_timeout = Some(Duration::from_secs(config.server_selection_timeout_secs));
        let client = Client::with_options(options)?;

        info!(uri = %redact(&config.uri), database = %config.database, "MongoDB client ready");
        Ok(Self {
            database: client.database(&config.database),
            event_log: None,
        })
    }

    /// Record document writes in an application event log
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    fn record_event(&self, severity: EventSeverity, message: String) {
        if let Some(log) = &self.event_log {
            log.log(EventEntry::new(severity, EVENT_SOURCE, &message));
        }
    }

    fn collection(&self, name: &str) -> Result<Collection<bson::Document>> {
        if name.is_empty() || name.contains('$') {
            return Err(NoSqlError::InvalidArgument(format!("Invalid collection name: {:?}", name)));
        }
        Ok(self.database.collection(name))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn provider_name(&self) -> &'static str {
        "mongodb"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let found = self.collection(collection)?.find_one(id_query(id), None).await?;
        Ok(found.map(Document::from))
    }

    async fn find(&self, collection: &str, filter: Option<&SearchFilter>) -> Result<Vec<Document>> {
        let query = filter.map(render_filter).unwrap_or_default();
        debug!(collection, %query, "MongoDB find");
        let mut cursor = self.collection(collection)?.find(query, None).await?;
        let mut documents = Vec::new();
        while cursor.advance().await? {
            documents.push(Document::from(cursor.deserialize_current()?));
        }
        Ok(documents)
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<String> {
        let requested = document.id();
        let result = match self
            .collection(collection)?
            .insert_one(bson::Document::from(document), None)
            .await
        {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => {
                return Err(NoSqlError::Duplicate(requested.unwrap_or_default()))
            }
            Err(e) => return Err(e.into()),
        };
        let id = id_text(&result.inserted_id);
        self.record_event(
            EventSeverity::Information,
            format!("Inserted {} into {}", id, collection),
        );
        Ok(id)
    }

    async fn replace(&self, collection: &str, id: &str, mut document: Document) -> Result<bool> {
        // The stored _id is immutable
        document.remove(ID_FIELD);
        let result = self
            .collection(collection)?
            .replace_one(id_query(id), bson::Document::from(document), None)
            .await?;
        let replaced = result.matched_count > 0;
        if replaced {
            self.record_event(
                EventSeverity::Information,
                format!("Replaced {} in {}", id, collection),
            );
        }
        Ok(replaced)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let result = self.collection(collection)?.delete_one(id_query(id), None).await?;
        let deleted = result.deleted_count > 0;
        if deleted {
            self.record_event(
                EventSeverity::Warning,
                format!("Deleted {} from {}", id, collection),
            );
        }
        Ok(deleted)
    }
}
