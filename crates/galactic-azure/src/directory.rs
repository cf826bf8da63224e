//! Azure AD directory client over Microsoft Graph

use crate::auth::TokenCache;
use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use crate::graph::{graph_path, GraphClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use galactic_identity::{
    AttributeValue, DirectoryClient, DirectoryRecord, GroupRef, ObjectType, SearchFilter,
    SearchRequest,
};
use galactic_log::{EventEntry, EventLog, EventSeverity};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const EVENT_SOURCE: &str = "galactic-azure";
const USER_TYPE: &str = "#microsoft.graph.user";
const GROUP_TYPE: &str = "#microsoft.graph.group";

/// User properties fetched by default
pub const USER_SELECT: &[&str] = &[
    "id",
    "createdDateTime",
    "userPrincipalName",
    "displayName",
    "givenName",
    "surname",
    "mail",
    "businessPhones",
    "mobilePhone",
    "jobTitle",
    "department",
    "companyName",
    "officeLocation",
    "streetAddress",
    "city",
    "state",
    "postalCode",
    "country",
    "employeeId",
    "accountEnabled",
    "lastPasswordChangeDateTime",
    "passwordPolicies",
];

/// Group properties fetched by default
pub const GROUP_SELECT: &[&str] = &[
    "id",
    "createdDateTime",
    "displayName",
    "description",
    "mail",
    "mailNickname",
    "securityEnabled",
];

fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a filter as an OData `$filter` expression
pub fn render_filter(filter: &SearchFilter) -> String {
    match filter {
        SearchFilter::Equals { attribute, value } => {
            format!("{} eq '{}'", attribute, escape_odata(value))
        }
        SearchFilter::StartsWith { attribute, value } => {
            format!("startswith({},'{}')", attribute, escape_odata(value))
        }
        SearchFilter::Present { attribute } => format!("{} ne null", attribute),
        SearchFilter::And(filters) => join_filters(filters, " and "),
        SearchFilter::Or(filters) => join_filters(filters, " or "),
        SearchFilter::Not(inner) => format!("not ({})", render_filter(inner)),
    }
}

fn join_filters(filters: &[SearchFilter], separator: &str) -> String {
    let parts: Vec<String> = filters
        .iter()
        .map(|f| format!("({})", render_filter(f)))
        .collect();
    parts.join(separator)
}

fn object_type_of(value: &Value) -> Option<ObjectType> {
    match value.get("@odata.type").and_then(Value::as_str) {
        Some(USER_TYPE) => Some(ObjectType::User),
        Some(GROUP_TYPE) => Some(ObjectType::Group),
        _ => None,
    }
}

/// Normalize a Graph object; property names are already the common names
pub fn json_to_record(value: &Value, object_type: ObjectType) -> Option<DirectoryRecord> {
    let object = value.as_object()?;
    let id = object.get("id")?.as_str()?;
    let mut record = DirectoryRecord::new(id, object_type);

    if let Some(created) = object
        .get("createdDateTime")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        record = record.with_creation_time(created.with_timezone(&Utc));
    }

    for (name, value) in object {
        if name == "id" || name == "createdDateTime" || name.starts_with('@') {
            continue;
        }
        record.set_attribute(name, AttributeValue::from(value.clone()));
    }

    if let Some(policies) = object.get("passwordPolicies").and_then(Value::as_str) {
        let never_expires = policies
            .split(',')
            .any(|p| p.trim().eq_ignore_ascii_case("DisablePasswordExpiration"));
        record.set_attribute("passwordNeverExpires", never_expires.into());
    }

    Some(record)
}

fn select_for(object_type: &ObjectType, requested: &[String]) -> String {
    let defaults = match object_type {
        ObjectType::User => USER_SELECT,
        ObjectType::Group => GROUP_SELECT,
    };
    if requested.is_empty() || requested.iter().any(|n| n == "*") {
        return defaults.join(",");
    }
    let mut fields: Vec<String> = vec!["id".to_string(), "createdDateTime".to_string()];
    for name in requested {
        let field = if name.eq_ignore_ascii_case("passwordNeverExpires") {
            "passwordPolicies"
        } else {
            name.as_str()
        };
        if !fields.iter().any(|f| f.eq_ignore_ascii_case(field)) {
            fields.push(field.to_string());
        }
    }
    fields.join(",")
}

fn collection(object_type: &ObjectType) -> &'static str {
    match object_type {
        ObjectType::User => "users",
        ObjectType::Group => "groups",
    }
}

/// Treat 404 as "absent"
fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct AzureDirectoryClient {
    graph: GraphClient,
    page_size: u32,
    event_log: Option<Arc<dyn EventLog>>,
}

impl AzureDirectoryClient {
    pub fn new(config: AzureConfig) -> Result<Self> {
        config.validate()?;
        let tokens = Arc::new(TokenCache::new(config.clone())?);
        let graph = GraphClient::new(&config, tokens)?;
        Ok(Self {
            graph,
            page_size: config.page_size,
            event_log: None,
        })
    }

    /// Also report writes to an application event log
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn graph(&self) -> &GraphClient {
        &self.graph
    }

    fn record_event(&self, severity: EventSeverity, message: String) {
        if let Some(log) = &self.event_log {
            log.log(EventEntry::new(severity, EVENT_SOURCE, &message));
        }
    }

    async fn resolve_type(&self, unique_id: &str) -> Result<Option<ObjectType>> {
        let path = self.graph.with_query(
            &graph_path(&["directoryObjects", unique_id])?,
            &[("$select", "id".to_string())],
        )?;
        Ok(found(self.graph.get::<Value>(&path).await)?.and_then(|v| object_type_of(&v)))
    }

    async fn fetch(&self, object_type: &ObjectType, unique_id: &str) -> Result<Option<DirectoryRecord>> {
        let path = self.graph.with_query(
            &graph_path(&[collection(object_type), unique_id])?,
            &[("$select", select_for(object_type, &[]))],
        )?;
        Ok(found(self.graph.get::<Value>(&path).await)?
            .and_then(|v| json_to_record(&v, object_type.clone())))
    }

    async fn list(&self, object_type: &ObjectType, request: &SearchRequest) -> Result<Vec<DirectoryRecord>> {
        let mut params = vec![
            ("$select", select_for(object_type, &request.attributes)),
            ("$top", self.page_size.to_string()),
        ];
        if let Some(filter) = &request.filter {
            params.push(("$filter", render_filter(filter)));
        }
        let path = self.graph.with_query(collection(object_type), &params)?;
        let items: Vec<Value> = self.graph.get_all(&path).await?;
        Ok(items
            .iter()
            .filter_map(|v| json_to_record(v, object_type.clone()))
            .map(|mut record| {
                record.retain_attributes(&request.attributes);
                record
            })
            .collect())
    }

    /// Typed members of a directory collection such as `memberOf`
    async fn related(&self, path: &str, select: &str) -> Result<Vec<DirectoryRecord>> {
        let path = self.graph.with_query(path, &[("$select", select.to_string())])?;
        let items: Vec<Value> = match found(self.graph.get_all(&path).await)? {
            Some(items) => items,
            None => return Ok(Vec::new()),
        };
        Ok(items
            .iter()
            .filter_map(|v| object_type_of(v).and_then(|t| json_to_record(v, t)))
            .collect())
    }

    fn directory_object_ref(&self, unique_id: &str) -> Result<Value> {
        let path = graph_path(&["directoryObjects", unique_id])?;
        Ok(json!({ "@odata.id": format!("{}/{}", self.graph.base_url(), path) }))
    }
}

#[async_trait]
impl DirectoryClient for AzureDirectoryClient {
    fn provider_name(&self) -> &str {
        "azure"
    }

    async fn get_object(&self, unique_id: &str) -> galactic_identity::Result<Option<DirectoryRecord>> {
        let Some(object_type) = self.resolve_type(unique_id).await? else {
            return Ok(None);
        };
        Ok(self.fetch(&object_type, unique_id).await?)
    }

    async fn search(&self, request: &SearchRequest) -> galactic_identity::Result<Vec<DirectoryRecord>> {
        if request.base.is_some() {
            debug!("Graph has no search base; ignoring it");
        }
        let types = match &request.object_type {
            Some(object_type) => vec![object_type.clone()],
            None => vec![ObjectType::User, ObjectType::Group],
        };
        let mut records = Vec::new();
        for object_type in &types {
            records.extend(self.list(object_type, request).await?);
        }
        info!(found = records.len(), "Graph search completed");
        Ok(records)
    }

    async fn create_object(
        &self,
        object_type: ObjectType,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> galactic_identity::Result<String> {
        let body: Map<String, Value> = attributes
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value)))
            .collect();
        let created: Value = self
            .graph
            .post(collection(&object_type), &Value::Object(body))
            .await?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AzureError::UnexpectedResponse("created object has no id".to_string()))?;
        info!(id = %id, object_type = %object_type, "Graph object created");
        self.record_event(
            EventSeverity::Information,
            format!("Created {} {}", object_type, id),
        );
        Ok(id.to_string())
    }

    async fn update_attribute(
        &self,
        unique_id: &str,
        attribute: &str,
        value: &AttributeValue,
    ) -> galactic_identity::Result<bool> {
        let Some(object_type) = self.resolve_type(unique_id).await? else {
            return Ok(false);
        };
        let mut body = Map::new();
        body.insert(attribute.to_string(), Value::from(value));
        let path = graph_path(&[collection(&object_type), unique_id])?;
        let updated = found(self.graph.patch(&path, &Value::Object(body)).await)?.is_some();
        if updated {
            self.record_event(
                EventSeverity::Information,
                format!("Updated {} on {}", attribute, unique_id),
            );
        }
        Ok(updated)
    }

    async fn delete_object(&self, unique_id: &str) -> galactic_identity::Result<bool> {
        let path = graph_path(&["directoryObjects", unique_id])?;
        let deleted = found(self.graph.delete(&path).await)?.is_some();
        if deleted {
            self.record_event(EventSeverity::Warning, format!("Deleted {}", unique_id));
        }
        Ok(deleted)
    }

    async fn member_of(&self, unique_id: &str) -> galactic_identity::Result<Vec<GroupRef>> {
        let records = self
            .related(&graph_path(&["directoryObjects", unique_id, "memberOf"])?, "id,displayName")
            .await?;
        Ok(records
            .iter()
            .filter(|r| r.object_type == ObjectType::Group)
            .map(GroupRef::from_record)
            .collect())
    }

    async fn members(&self, group_id: &str) -> galactic_identity::Result<Vec<DirectoryRecord>> {
        let mut select: Vec<&str> = USER_SELECT.to_vec();
        for field in GROUP_SELECT {
            if !select.contains(field) {
                select.push(*field);
            }
        }
        Ok(self
            .related(&graph_path(&["groups", group_id, "members"])?, &select.join(","))
            .await?)
    }

    async fn add_member(&self, group_id: &str, member_id: &str) -> galactic_identity::Result<bool> {
        let path = graph_path(&["groups", group_id, "members", "$ref"])?;
        let body = self.directory_object_ref(member_id)?;
        match self.graph.post::<_, Option<Value>>(&path, &body).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_conflict() || e.is_not_found() => {
                debug!(group = %group_id, member = %member_id, error = %e, "Member not added");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> galactic_identity::Result<bool> {
        let path = graph_path(&["groups", group_id, "members", member_id, "$ref"])?;
        Ok(found(self.graph.delete(&path).await)?.is_some())
    }

    async fn is_transitive_member(
        &self,
        member_id: &str,
        group_id: &str,
    ) -> galactic_identity::Result<bool> {
        let path = graph_path(&["directoryObjects", member_id, "checkMemberGroups"])?;
        let body = json!({ "groupIds": [group_id] });
        let response: Option<Value> = found(self.graph.post(&path, &body).await)?;
        Ok(response
            .as_ref()
            .and_then(|r| r.get("value"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().any(|id| id.as_str() == Some(group_id)))
            .unwrap_or(false))
    }
}
