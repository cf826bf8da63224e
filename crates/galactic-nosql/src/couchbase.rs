//! Couchbase document store over the N1QL query service

use crate::config::CouchbaseConfig;
use crate::document::{Document, DocumentValue, ID_FIELD};
use crate::error::{NoSqlError, QueryErrorEntry, Result};
use crate::store::DocumentStore;
use async_trait::async_trait;
use galactic_identity::SearchFilter;
use galactic_log::{EventEntry, EventLog, EventSeverity};
use galactic_rest::RestClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const EVENT_SOURCE: &str = "galactic-nosql";
const QUERY_PATH: &str = "query/service";
const DUPLICATE_KEY: i64 = 12009;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryMetrics {
    #[serde(default)]
    mutation_count: u64,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    errors: Vec<QueryErrorEntry>,
    #[serde(default)]
    metrics: QueryMetrics,
}

/// Row shape of the `SELECT` statements below
#[derive(Debug, Deserialize)]
struct KeyedRow {
    id: String,
    doc: Value,
}

impl KeyedRow {
    fn into_document(self) -> Result<Document> {
        let mut document = match DocumentValue::from(self.doc) {
            DocumentValue::Document(d) => d,
            other => {
                return Err(NoSqlError::UnexpectedResponse(format!(
                    "document {} is not a JSON object: {:?}",
                    self.id, other
                )))
            }
        };
        document.set_id(self.id);
        Ok(document)
    }
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains('`') {
        return Err(NoSqlError::InvalidArgument(format!("Invalid {} name: {:?}", kind, name)));
    }
    Ok(())
}

/// `d.`a`.`b`` for the dotted path `a.b`
fn field_path(path: &str) -> String {
    let mut rendered = String::from("d");
    for part in path.split('.') {
        rendered.push_str(".`");
        rendered.push_str(&part.replace('`', "``"));
        rendered.push('`');
    }
    rendered
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render `filter` as a N1QL condition on the alias `d`, appending values to
/// `args` as positional parameters
pub fn render_filter(filter: &SearchFilter, args: &mut Vec<Value>) -> String {
    match filter {
        SearchFilter::Equals { attribute, value } => {
            args.push(Value::String(value.clone()));
            format!("{} = ${}", field_path(attribute), args.len())
        }
        SearchFilter::StartsWith { attribute, value } => {
            args.push(Value::String(format!("{}%", escape_like(value))));
            format!("{} LIKE ${}", field_path(attribute), args.len())
        }
        SearchFilter::Present { attribute } => format!("{} IS VALUED", field_path(attribute)),
        SearchFilter::And(filters) if filters.is_empty() => "TRUE".to_string(),
        SearchFilter::Or(filters) if filters.is_empty() => "FALSE".to_string(),
        SearchFilter::And(filters) => join(filters, " AND ", args),
        SearchFilter::Or(filters) => join(filters, " OR ", args),
        SearchFilter::Not(filter) => format!("NOT ({})", render_filter(filter, args)),
    }
}

fn join(filters: &[SearchFilter], separator: &str, args: &mut Vec<Value>) -> String {
    filters
        .iter()
        .map(|f| format!("({})", render_filter(f, args)))
        .collect::<Vec<_>>()
        .join(separator)
}

pub struct CouchbaseStore {
    rest: RestClient,
    bucket: String,
    scope: String,
    event_log: Option<Arc<dyn EventLog>>,
}

impl CouchbaseStore {
    pub fn new(config: &CouchbaseConfig) -> Result<Self> {
        config.validate()?;
        check_name("bucket", &config.bucket)?;
        check_name("scope", &config.scope)?;
        let rest = RestClient::builder(config.query_url.clone())
            .basic(config.username.clone(), config.password.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(url = %config.query_url, bucket = %config.bucket, "Couchbase query client ready");
        Ok(Self {
            rest,
            bucket: config.bucket.clone(),
            scope: config.scope.clone(),
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

    fn keyspace(&self, collection: &str) -> Result<String> {
        check_name("collection", collection)?;
        Ok(format!(
            "default:`{}`.`{}`.`{}`",
            self.bucket, self.scope, collection
        ))
    }

    /// Run one statement. Errors reported in a success body are errors too.
    async fn query(&self, statement: &str, args: Vec<Value>) -> Result<QueryResponse> {
        debug!(statement, args = args.len(), "N1QL query");
        let body = json!({ "statement": statement, "args": args });
        let response: QueryResponse = self.rest.post(QUERY_PATH, &body).await?;
        if response.status != "success" {
            return Err(match response.errors.into_iter().next() {
                Some(entry) => entry.into(),
                None => NoSqlError::UnexpectedResponse(format!(
                    "query finished with status {:?}",
                    response.status
                )),
            });
        }
        Ok(response)
    }

    async fn select(&self, statement: &str, args: Vec<Value>) -> Result<Vec<Document>> {
        let response = self.query(statement, args).await?;
        response
            .results
            .into_iter()
            .map(|row| {
                serde_json::from_value::<KeyedRow>(row)
                    .map_err(|e| NoSqlError::UnexpectedResponse(e.to_string()))?
                    .into_document()
            })
            .collect()
    }
}

/// The key lives in document metadata, not in the stored body
fn into_body(mut document: Document) -> Value {
    document.remove(ID_FIELD);
    Value::from(document)
}

#[async_trait]
impl DocumentStore for CouchbaseStore {
    fn provider_name(&self) -> &'static str {
        "couchbase"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let statement = format!(
            "SELECT META(d).id AS id, d AS doc FROM {} AS d USE KEYS $1",
            self.keyspace(collection)?
        );
        let documents = self.select(&statement, vec![json!(id)]).await?;
        Ok(documents.into_iter().next())
    }

    /// Non-key lookups need an index on the collection
    async fn find(&self, collection: &str, filter: Option<&SearchFilter>) -> Result<Vec<Document>> {
        let mut statement = format!(
            "SELECT META(d).id AS id, d AS doc FROM {} AS d",
            self.keyspace(collection)?
        );
        let mut args = Vec::new();
        if let Some(filter) = filter {
            statement.push_str(" WHERE ");
            statement.push_str(&render_filter(filter, &mut args));
        }
        self.select(&statement, args).await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<String> {
        let id = document.id().unwrap_or_else(|| Uuid::new_v4().to_string());
        let statement = format!(
            "INSERT INTO {} (KEY, VALUE) VALUES ($1, $2)",
            self.keyspace(collection)?
        );
        match self.query(&statement, vec![json!(id), into_body(document)]).await {
            Ok(_) => {}
            Err(NoSqlError::Query { code: DUPLICATE_KEY, .. }) => return Err(NoSqlError::Duplicate(id)),
            Err(e) => return Err(e),
        }
        self.record_event(
            EventSeverity::Information,
            format!("Inserted {} into {}", id, collection),
        );
        Ok(id)
    }

    // The existence check and the upsert are separate statements, so a
    // concurrent delete in between is overwritten.
    async fn replace(&self, collection: &str, id: &str, document: Document) -> Result<bool> {
        if self.get(collection, id).await?.is_none() {
            return Ok(false);
        }
        let statement = format!(
            "UPSERT INTO {} (KEY, VALUE) VALUES ($1, $2)",
            self.keyspace(collection)?
        );
        self.query(&statement, vec![json!(id), into_body(document)]).await?;
        self.record_event(
            EventSeverity::Information,
            format!("Replaced {} in {}", id, collection),
        );
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let statement = format!("DELETE FROM {} USE KEYS $1", self.keyspace(collection)?);
        let response = self.query(&statement, vec![json!(id)]).await?;
        let deleted = response.metrics.mutation_count > 0;
        if deleted {
            self.record_event(
                EventSeverity::Warning,
                format!("Deleted {} from {}", id, collection),
            );
        }
        Ok(deleted)
    }
}
