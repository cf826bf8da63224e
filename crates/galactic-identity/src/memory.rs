//! In-process directory

use crate::attribute::AttributeValue;
use crate::client::DirectoryClient;
use crate::error::{IdentityError, Result};
use crate::filter::SearchRequest;
use crate::object::GroupRef;
use crate::record::{DirectoryRecord, ObjectType};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct DirectoryState {
    objects: BTreeMap<String, DirectoryRecord>,
    /// group id -> direct member ids
    memberships: BTreeMap<String, BTreeSet<String>>,
}

impl DirectoryState {
    fn parents_of<'a>(&'a self, member_id: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.memberships
            .iter()
            .filter(move |(_, members)| members.contains(member_id))
            .map(|(group_id, _)| group_id)
    }
}

/// A [`DirectoryClient`] backed by process memory.
///
/// Useful for hosts that stage directory data locally and for tests.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub async fn insert(&self, record: DirectoryRecord) {
        let mut state = self.state.write().await;
        if record.object_type == ObjectType::Group {
            state
                .memberships
                .entry(record.unique_id.clone())
                .or_default();
        }
        state.objects.insert(record.unique_id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    fn provider_name(&self) -> &str {
        "memory"
    }

    async fn get_object(&self, unique_id: &str) -> Result<Option<DirectoryRecord>> {
        Ok(self.state.read().await.objects.get(unique_id).cloned())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryRecord>> {
        let state = self.state.read().await;
        let results: Vec<DirectoryRecord> = state
            .objects
            .values()
            .filter(|record| request.matches(record))
            .cloned()
            .map(|mut record| {
                record.retain_attributes(&request.attributes);
                record
            })
            .collect();
        debug!(found = results.len(), "Memory directory search");
        Ok(results)
    }

    async fn create_object(
        &self,
        object_type: ObjectType,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> Result<String> {
        let unique_id = Uuid::new_v4().to_string();
        let mut record =
            DirectoryRecord::new(unique_id.clone(), object_type).with_creation_time(Utc::now());
        for (name, value) in attributes {
            record.set_attribute(name, value.clone());
        }
        self.insert(record).await;
        Ok(unique_id)
    }

    async fn update_attribute(
        &self,
        unique_id: &str,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<bool> {
        if attribute.trim().is_empty() {
            return Err(IdentityError::InvalidArgument(
                "Attribute name cannot be empty".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        match state.objects.get_mut(unique_id) {
            Some(record) => {
                record.set_attribute(attribute, value.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_object(&self, unique_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.objects.remove(unique_id).is_none() {
            return Ok(false);
        }
        state.memberships.remove(unique_id);
        for members in state.memberships.values_mut() {
            members.remove(unique_id);
        }
        Ok(true)
    }

    async fn member_of(&self, unique_id: &str) -> Result<Vec<GroupRef>> {
        let state = self.state.read().await;
        Ok(state
            .parents_of(unique_id)
            .filter_map(|group_id| state.objects.get(group_id))
            .map(GroupRef::from_record)
            .collect())
    }

    async fn members(&self, group_id: &str) -> Result<Vec<DirectoryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .get(group_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| state.objects.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_member(&self, group_id: &str, member_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.objects.contains_key(member_id) {
            return Ok(false);
        }
        match state.memberships.get_mut(group_id) {
            Some(members) => Ok(members.insert(member_id.to_string())),
            None => Ok(false),
        }
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .memberships
            .get_mut(group_id)
            .map(|members| members.remove(member_id))
            .unwrap_or(false))
    }

    async fn is_transitive_member(&self, member_id: &str, group_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([member_id]);

        // Walk upwards through parent groups; the visited set ends cycles.
        while let Some(current) = queue.pop_front() {
            for parent in state.parents_of(current) {
                if parent == group_id {
                    return Ok(true);
                }
                if visited.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn seeded() -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        directory
            .insert(DirectoryRecord::new("u-1", ObjectType::User).with_attribute("mail", "a@x"))
            .await;
        directory
            .insert(DirectoryRecord::new("g-1", ObjectType::Group).with_attribute("displayName", "Inner"))
            .await;
        directory
            .insert(DirectoryRecord::new("g-2", ObjectType::Group).with_attribute("displayName", "Outer"))
            .await;
        directory.add_member("g-1", "u-1").await.unwrap();
        directory.add_member("g-2", "g-1").await.unwrap();
        directory
    }

    #[tokio::test]
    async fn test_direct_and_transitive_membership() {
        let directory = seeded().await;
        let direct = directory.member_of("u-1").await.unwrap();
        assert_eq!(direct, vec![GroupRef::new("g-1")]);
        assert_eq!(direct[0].display_name.as_deref(), Some("Inner"));

        assert!(directory.is_transitive_member("u-1", "g-2").await.unwrap());
        assert!(!directory.is_transitive_member("g-2", "g-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let directory = seeded().await;
        directory.add_member("g-1", "g-2").await.unwrap();
        directory
            .insert(DirectoryRecord::new("g-3", ObjectType::Group))
            .await;
        assert!(!directory.is_transitive_member("u-1", "g-3").await.unwrap());
        assert!(directory.is_transitive_member("g-1", "g-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_member_requires_existing_objects() {
        let directory = seeded().await;
        assert!(!directory.add_member("g-1", "missing").await.unwrap());
        assert!(!directory.add_member("missing", "u-1").await.unwrap());
        assert!(!directory.add_member("g-1", "u-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_memberships() {
        let directory = seeded().await;
        assert!(directory.delete_object("g-1").await.unwrap());
        assert!(directory.member_of("u-1").await.unwrap().is_empty());
        assert!(directory.members("g-2").await.unwrap().is_empty());
        assert!(!directory.delete_object("g-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_projects_attributes() {
        let directory = seeded().await;
        let request = SearchRequest::groups().with_attributes(["displayName"]);
        let results = directory.search(&request).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.attributes.len() == 1));
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let directory = MemoryDirectory::new();
        let mut attributes = BTreeMap::new();
        attributes.insert("displayName".to_string(), AttributeValue::from("New"));
        let id = directory
            .create_object(ObjectType::User, &attributes)
            .await
            .unwrap();

        assert!(directory
            .update_attribute(&id, "displayName", &AttributeValue::from("Renamed"))
            .await
            .unwrap());
        let record = directory.get_object(&id).await.unwrap().unwrap();
        assert_eq!(record.text("displayName"), Some("Renamed"));
        assert!(record.creation_time.is_some());
        assert!(!directory
            .update_attribute("missing", "displayName", &AttributeValue::Null)
            .await
            .unwrap());
    }

    proptest! {
        #[test]
        fn prop_nested_chain_is_transitive(depth in 1usize..12) {
            let (reachable, stray) = tokio_test::block_on(async {
                let directory = MemoryDirectory::new();
                directory.insert(DirectoryRecord::new("user", ObjectType::User)).await;
                directory.insert(DirectoryRecord::new("stray", ObjectType::Group)).await;
                let mut child = "user".to_string();
                for level in 0..depth {
                    let group = format!("g-{}", level);
                    directory.insert(DirectoryRecord::new(group.as_str(), ObjectType::Group)).await;
                    directory.add_member(&group, &child).await.unwrap();
                    child = group;
                }

                let mut reachable = Vec::new();
                for level in 0..depth {
                    let group = format!("g-{}", level);
                    reachable.push(directory.is_transitive_member("user", &group).await.unwrap());
                }
                let stray = directory.is_transitive_member("user", "stray").await.unwrap();
                (reachable, stray)
            });
            prop_assert!(reachable.iter().all(|r| *r));
            prop_assert!(!stray);
        }
    }
}
