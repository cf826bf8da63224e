//! Base identity abstraction shared by users and groups

use crate::attribute::{AttributeValue, IdentityAttribute};
use crate::client::DirectoryClient;
use crate::error::{IdentityError, Result};
use crate::group::Group;
use crate::record::{DirectoryRecord, ObjectType};
use crate::table::AttributeTable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// Lightweight reference to a group an object belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRef {
    pub unique_id: String,
    pub display_name: Option<String>,
}

impl GroupRef {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            display_name: None,
        }
    }

    pub fn from_record(record: &DirectoryRecord) -> Self {
        Self {
            unique_id: record.unique_id.clone(),
            display_name: record.text("displayName").map(str::to_string),
        }
    }
}

impl PartialEq for GroupRef {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id == other.unique_id
    }
}

impl Eq for GroupRef {}

impl Hash for GroupRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_id.hash(state);
    }
}

/// Fields every identity object carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCore {
    pub unique_id: String,
    pub object_type: ObjectType,
    pub creation_time: Option<DateTime<Utc>>,
    /// Direct memberships; `None` until first fetched
    #[serde(skip)]
    groups: Option<Vec<GroupRef>>,
}

impl IdentityCore {
    pub fn new(unique_id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            unique_id: unique_id.into(),
            object_type,
            creation_time: None,
            groups: None,
        }
    }

    pub fn from_record(record: &DirectoryRecord) -> Self {
        Self {
            unique_id: record.unique_id.clone(),
            object_type: record.object_type.clone(),
            creation_time: record.creation_time,
            groups: None,
        }
    }
}

/// A directory-backed entity with a stable unique id and an attribute set.
///
/// Objects are read views over a record. Writes go straight to the
/// [`DirectoryClient`] and are not reflected locally until [`refresh`].
///
/// [`refresh`]: IdentityObject::refresh
#[async_trait]
pub trait IdentityObject: Clone + Send + Sync + Sized + 'static {
    fn core(&self) -> &IdentityCore;

    fn core_mut(&mut self) -> &mut IdentityCore;

    fn attribute_table() -> &'static AttributeTable<Self>;

    /// Object type this implementation accepts from records
    fn expected_type() -> ObjectType;

    /// Build an empty object around `core`; attributes are loaded afterwards
    fn with_core(core: IdentityCore) -> Self;

    fn from_record(record: DirectoryRecord) -> Result<Self> {
        if record.object_type != Self::expected_type() {
            return Err(IdentityError::WrongObjectType {
                expected: Self::expected_type().as_str(),
                found: record.object_type.to_string(),
            });
        }
        let mut object = Self::with_core(IdentityCore::from_record(&record));
        Self::attribute_table().load(&mut object, &record);
        Ok(object)
    }

    fn unique_id(&self) -> &str {
        &self.core().unique_id
    }

    fn object_type(&self) -> ObjectType {
        self.core().object_type.clone()
    }

    fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.core().creation_time
    }

    /// Memberships fetched so far, without a remote call
    fn loaded_groups(&self) -> Option<&[GroupRef]> {
        self.core().groups.as_deref()
    }

    /// Identity comparison across object kinds
    fn same_identity<O: IdentityObject>(&self, other: &O) -> bool {
        self.unique_id() == other.unique_id()
    }

    fn compare_identity<O: IdentityObject>(&self, other: &O) -> Ordering {
        self.unique_id().cmp(other.unique_id())
    }

    fn get_attributes(&self, names: &[&str]) -> Result<Vec<IdentityAttribute<AttributeValue>>> {
        Self::attribute_table().read(self, names)
    }

    /// Write each known attribute to the backing store.
    ///
    /// Returns one success flag per attribute whose name is registered;
    /// unknown names produce no entry. A rejected value or failed remote
    /// write marks only that attribute as failed.
    async fn set_attributes(
        &self,
        client: &dyn DirectoryClient,
        attributes: &[IdentityAttribute<AttributeValue>],
    ) -> Result<Vec<IdentityAttribute<bool>>> {
        if attributes.iter().any(|a| a.name.trim().is_empty()) {
            return Err(IdentityError::InvalidArgument(
                "Attribute names cannot be empty".to_string(),
            ));
        }

        let table = Self::attribute_table();
        let mut scratch = self.clone();
        let mut results = Vec::with_capacity(attributes.len());

        for attribute in attributes {
            let Some(entry) = table.find(&attribute.name) else {
                debug!(attribute = %attribute.name, "Skipping unknown attribute");
                continue;
            };

            let success = match entry.set(&mut scratch, attribute.value.clone()) {
                Ok(()) => {
                    let value = entry.get(&scratch);
                    match client
                        .update_attribute(self.unique_id(), entry.name, &value)
                        .await
                    {
                        Ok(written) => written,
                        Err(e) => {
                            warn!(
                                unique_id = %self.unique_id(),
                                attribute = %entry.name,
                                error = %e,
                                "Attribute write failed"
                            );
                            false
                        }
                    }
                }
                Err(e) => {
                    debug!(attribute = %attribute.name, error = %e, "Attribute value rejected");
                    false
                }
            };

            results.push(IdentityAttribute::new(attribute.name.clone(), success));
        }

        Ok(results)
    }

    /// Direct memberships, fetched through `client` on first use
    async fn groups(&mut self, client: &dyn DirectoryClient) -> Result<Vec<GroupRef>> {
        if let Some(groups) = &self.core().groups {
            return Ok(groups.clone());
        }
        let groups = client.member_of(self.unique_id()).await?;
        self.core_mut().groups = Some(groups.clone());
        Ok(groups)
    }

    /// Membership test by the group's unique id.
    ///
    /// Non-recursive checks the direct membership list. Recursive is a single
    /// provider call that follows nested groups.
    async fn member_of_group(
        &mut self,
        client: &dyn DirectoryClient,
        group: &Group,
        recursive: bool,
    ) -> Result<bool> {
        let group_id = group.unique_id();
        if recursive {
            return client
                .is_transitive_member(self.unique_id(), group_id)
                .await;
        }
        let groups = self.groups(client).await?;
        Ok(groups.iter().any(|g| g.unique_id == group_id))
    }

    /// Reload from the backing store. Returns false if the object is gone.
    async fn refresh(&mut self, client: &dyn DirectoryClient) -> Result<bool> {
        match client.get_object(self.unique_id()).await? {
            Some(record) => {
                *self = Self::from_record(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetch one object by unique id
    async fn fetch(client: &dyn DirectoryClient, unique_id: &str) -> Result<Option<Self>> {
        if unique_id.trim().is_empty() {
            return Err(IdentityError::InvalidArgument(
                "Unique id cannot be empty".to_string(),
            ));
        }
        match client.get_object(unique_id).await? {
            Some(record) if record.object_type == Self::expected_type() => {
                Self::from_record(record).map(Some)
            }
            Some(_) | None => Ok(None),
        }
    }
}

/// Equality, hashing and ordering by unique id
macro_rules! identity_equality {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::object::IdentityObject::unique_id(self)
                    == $crate::object::IdentityObject::unique_id(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash($crate::object::IdentityObject::unique_id(self), state);
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                $crate::object::IdentityObject::unique_id(self)
                    .cmp($crate::object::IdentityObject::unique_id(other))
            }
        }
    };
}

pub(crate) use identity_equality;
