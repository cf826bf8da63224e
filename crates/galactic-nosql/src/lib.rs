//! Galactic document stores
//!
//! [`DocumentStore`] reads and writes schemaless [`Document`]s keyed by
//! `_id`. [`MongoStore`] uses the MongoDB driver, [`CouchbaseStore`] sends
//! N1QL statements to the Couchbase query service over REST and
//! [`MemoryDocumentStore`] keeps everything in process.

pub mod config;
pub mod couchbase;
pub mod document;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod store;

pub use config::{CouchbaseConfig, MongoConfig};
pub use couchbase::CouchbaseStore;
pub use document::{Document, DocumentValue, ID_FIELD};
pub use error::{NoSqlError, Result};
pub use memory::MemoryDocumentStore;
pub use mongo::MongoStore;
pub use store::{document_matches, DocumentStore};
