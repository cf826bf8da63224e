//! Schemaless documents shared by every store

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{self, oid::ObjectId, Bson};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Field name holding a document's key
pub const ID_FIELD: &str = "_id";

/// A field value. Nested documents and arrays keep their structure.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    /// MongoDB object id as 24 hex digits
    ObjectId(String),
    Array(Vec<DocumentValue>),
    Document(Document),
}

impl DocumentValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DocumentValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocumentValue::String(s) | DocumentValue::ObjectId(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocumentValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            DocumentValue::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Text forms compared by filters; arrays yield one per scalar element
    pub fn text_values(&self) -> Vec<String> {
        match self {
            DocumentValue::Null | DocumentValue::Binary(_) | DocumentValue::Document(_) => Vec::new(),
            DocumentValue::Bool(b) => vec![b.to_string()],
            DocumentValue::Int(i) => vec![i.to_string()],
            DocumentValue::Double(f) => vec![f.to_string()],
            DocumentValue::String(s) | DocumentValue::ObjectId(s) => vec![s.clone()],
            DocumentValue::DateTime(t) => vec![t.to_rfc3339()],
            DocumentValue::Array(items) => items.iter().flat_map(|v| v.text_values()).collect(),
        }
    }
}

impl From<&str> for DocumentValue {
    fn from(value: &str) -> Self {
        DocumentValue::String(value.to_string())
    }
}

impl From<String> for DocumentValue {
    fn from(value: String) -> Self {
        DocumentValue::String(value)
    }
}

impl From<i64> for DocumentValue {
    fn from(value: i64) -> Self {
        DocumentValue::Int(value)
    }
}

impl From<i32> for DocumentValue {
    fn from(value: i32) -> Self {
        DocumentValue::Int(i64::from(value))
    }
}

impl From<f64> for DocumentValue {
    fn from(value: f64) -> Self {
        DocumentValue::Double(value)
    }
}

impl From<bool> for DocumentValue {
    fn from(value: bool) -> Self {
        DocumentValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for DocumentValue {
    fn from(value: DateTime<Utc>) -> Self {
        DocumentValue::DateTime(value)
    }
}

impl From<Document> for DocumentValue {
    fn from(value: Document) -> Self {
        DocumentValue::Document(value)
    }
}

impl<T: Into<DocumentValue>> From<Vec<T>> for DocumentValue {
    fn from(value: Vec<T>) -> Self {
        DocumentValue::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DocumentValue>> From<Option<T>> for DocumentValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DocumentValue::Null)
    }
}

impl From<Bson> for DocumentValue {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => DocumentValue::Null,
            Bson::Boolean(b) => DocumentValue::Bool(b),
            Bson::Int32(i) => DocumentValue::Int(i64::from(i)),
            Bson::Int64(i) => DocumentValue::Int(i),
            Bson::Double(f) => DocumentValue::Double(f),
            Bson::String(s) => DocumentValue::String(s),
            Bson::DateTime(t) => DateTime::from_timestamp_millis(t.timestamp_millis())
                .map(DocumentValue::DateTime)
                .unwrap_or(DocumentValue::Null),
            Bson::Binary(b) => DocumentValue::Binary(b.bytes),
            Bson::ObjectId(oid) => DocumentValue::ObjectId(oid.to_hex()),
            Bson::Array(items) => DocumentValue::Array(items.into_iter().map(Into::into).collect()),
            Bson::Document(doc) => DocumentValue::Document(doc.into()),
            other => DocumentValue::String(other.to_string()),
        }
    }
}

impl From<DocumentValue> for Bson {
    fn from(value: DocumentValue) -> Self {
        match value {
            DocumentValue::Null => Bson::Null,
            DocumentValue::Bool(b) => Bson::Boolean(b),
            DocumentValue::Int(i) => Bson::Int64(i),
            DocumentValue::Double(f) => Bson::Double(f),
            DocumentValue::String(s) => Bson::String(s),
            DocumentValue::DateTime(t) => Bson::DateTime(bson::DateTime::from_millis(t.timestamp_millis())),
            DocumentValue::Binary(bytes) => Bson::Binary(bson::Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            }),
            DocumentValue::ObjectId(hex) => match ObjectId::parse_str(&hex) {
                Ok(oid) => Bson::ObjectId(oid),
                Err(_) => Bson::String(hex),
            },
            DocumentValue::Array(items) => Bson::Array(items.into_iter().map(Into::into).collect()),
            DocumentValue::Document(doc) => Bson::Document(doc.into()),
        }
    }
}

impl From<Value> for DocumentValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DocumentValue::Null,
            Value::Bool(b) => DocumentValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DocumentValue::Int(i),
                None => n.as_f64().map(DocumentValue::Double).unwrap_or(DocumentValue::Null),
            },
            Value::String(s) => DocumentValue::String(s),
            Value::Array(items) => DocumentValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => DocumentValue::Document(map.into()),
        }
    }
}

/// JSON has no binary, date or object id type: they become base64, RFC 3339
/// and hex strings. Non-finite doubles become `null`.
impl From<DocumentValue> for Value {
    fn from(value: DocumentValue) -> Self {
        match value {
            DocumentValue::Null => Value::Null,
            DocumentValue::Bool(b) => Value::Bool(b),
            DocumentValue::Int(i) => Value::Number(i.into()),
            DocumentValue::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            DocumentValue::String(s) | DocumentValue::ObjectId(s) => Value::String(s),
            DocumentValue::DateTime(t) => Value::String(t.to_rfc3339()),
            DocumentValue::Binary(bytes) => Value::String(BASE64.encode(bytes)),
            DocumentValue::Array(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            DocumentValue::Document(doc) => doc.into(),
        }
    }
}

/// Fields of one document, ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, DocumentValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<DocumentValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<DocumentValue>) -> Option<DocumentValue> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<DocumentValue> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&DocumentValue> {
        self.fields.get(field)
    }

    /// Look up a dotted path such as `address.city` through nested documents
    pub fn get_path(&self, path: &str) -> Option<&DocumentValue> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get_path(field).and_then(DocumentValue::as_str)
    }

    /// The `_id` field in text form
    pub fn id(&self) -> Option<String> {
        match self.get(ID_FIELD)? {
            DocumentValue::String(s) | DocumentValue::ObjectId(s) => Some(s.clone()),
            DocumentValue::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.insert(ID_FIELD.to_string(), DocumentValue::String(id.into()));
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<bson::Document> for Document {
    fn from(doc: bson::Document) -> Self {
        Self {
            fields: doc.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

impl From<Document> for bson::Document {
    fn from(doc: Document) -> Self {
        doc.fields.into_iter().map(|(k, v)| (k, Bson::from(v))).collect()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }
}
