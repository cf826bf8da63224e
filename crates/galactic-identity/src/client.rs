//! Directory provider seam

use crate::attribute::AttributeValue;
use crate::error::Result;
use crate::filter::SearchRequest;
use crate::object::GroupRef;
use crate::record::{DirectoryRecord, ObjectType};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Operations every directory back-end provides.
///
/// Attribute names are the common names registered in the identity types'
/// attribute tables; providers translate them to their native schema.
/// "Not found" is `Ok(None)` or `Ok(false)`; transport failures are errors.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Short provider name used in logs and errors
    fn provider_name(&self) -> &str;

    async fn get_object(&self, unique_id: &str) -> Result<Option<DirectoryRecord>>;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryRecord>>;

    /// Create an object and return its unique id
    async fn create_object(
        &self,
        object_type: ObjectType,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> Result<String>;

    /// Replace one attribute; `Null` clears it
    async fn update_attribute(
        &self,
        unique_id: &str,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<bool>;

    async fn delete_object(&self, unique_id: &str) -> Result<bool>;

    /// Groups `unique_id` is a direct member of
    async fn member_of(&self, unique_id: &str) -> Result<Vec<GroupRef>>;

    /// Direct members of a group
    async fn members(&self, group_id: &str) -> Result<Vec<DirectoryRecord>>;

    async fn add_member(&self, group_id: &str, member_id: &str) -> Result<bool>;

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool>;

    /// Whether `member_id` belongs to `group_id` directly or through nested groups
    async fn is_transitive_member(&self, member_id: &str, group_id: &str) -> Result<bool>;
}
