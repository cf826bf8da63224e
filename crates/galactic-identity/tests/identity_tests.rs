//! Integration tests for the identity object model

use async_trait::async_trait;
use galactic_identity::*;
use mockall::mock;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

mock! {
    pub Directory {}

    #[async_trait]
    impl DirectoryClient for Directory {
        fn provider_name(&self) -> &str;
        async fn get_object(&self, unique_id: &str) -> Result<Option<DirectoryRecord>>;
        async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryRecord>>;
        async fn create_object(
            &self,
            object_type: ObjectType,
            attributes: &BTreeMap<String, AttributeValue>,
        ) -> Result<String>;
        async fn update_attribute(
            &self,
            unique_id: &str,
            attribute: &str,
            value: &AttributeValue,
        ) -> Result<bool>;
        async fn delete_object(&self, unique_id: &str) -> Result<bool>;
        async fn member_of(&self, unique_id: &str) -> Result<Vec<GroupRef>>;
        async fn members(&self, group_id: &str) -> Result<Vec<DirectoryRecord>>;
        async fn add_member(&self, group_id: &str, member_id: &str) -> Result<bool>;
        async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool>;
        async fn is_transitive_member(&self, member_id: &str, group_id: &str) -> Result<bool>;
    }
}

async fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    directory
        .insert(
            DirectoryRecord::new("u-1", ObjectType::User)
                .with_attribute("userPrincipalName", "grace@example.com")
                .with_attribute("displayName", "Grace Hopper")
                .with_attribute("accountEnabled", true),
        )
        .await;
    directory
        .insert(DirectoryRecord::new("u-2", ObjectType::User).with_attribute("displayName", "Alan"))
        .await;
    directory
        .insert(DirectoryRecord::new("g-eng", ObjectType::Group).with_attribute("displayName", "Engineering"))
        .await;
    directory
        .insert(DirectoryRecord::new("g-all", ObjectType::Group).with_attribute("displayName", "Everyone"))
        .await;
    directory.add_member("g-eng", "u-1").await.unwrap();
    directory.add_member("g-all", "g-eng").await.unwrap();
    directory
}

fn attr(name: &str, value: impl Into<AttributeValue>) -> IdentityAttribute<AttributeValue> {
    IdentityAttribute::new(name, value.into())
}

#[tokio::test]
async fn test_set_then_refresh_then_get() {
    let client = directory().await;
    let mut user = User::fetch(&client, "u-1").await.unwrap().unwrap();

    let results = user
        .set_attributes(
            &client,
            &[attr("jobTitle", "Rear Admiral"), attr("department", "Navy")],
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.value));

    // Local view is unchanged until refresh
    assert_eq!(user.job_title, None);

    assert!(user.refresh(&client).await.unwrap());
    let values = user.get_attributes(&["jobTitle", "department"]).unwrap();
    assert_eq!(values[0].value, AttributeValue::from("Rear Admiral"));
    assert_eq!(values[1].value, AttributeValue::from("Navy"));
}

#[tokio::test]
async fn test_unknown_attribute_produces_no_entry() {
    let client = directory().await;
    let user = User::fetch(&client, "u-1").await.unwrap().unwrap();

    let results = user
        .set_attributes(&client, &[attr("favouriteColour", "blue"), attr("city", "Arlington")])
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "city");
    assert!(results[0].value);
}

#[tokio::test]
async fn test_read_only_and_mistyped_values_fail_individually() {
    let client = directory().await;
    let user = User::fetch(&client, "u-1").await.unwrap().unwrap();

    let results = user
        .set_attributes(
            &client,
            &[
                attr("accountEnabled", false),
                attr("displayName", true),
                attr("mail", "grace@navy.mil"),
            ],
        )
        .await
        .unwrap();
    let flags: Vec<bool> = results.iter().map(|r| r.value).collect();
    assert_eq!(flags, vec![false, false, true]);
}

#[tokio::test]
async fn test_empty_attribute_name_is_rejected() {
    let client = directory().await;
    let user = User::fetch(&client, "u-1").await.unwrap().unwrap();
    let err = user
        .set_attributes(&client, &[attr("  ", "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidArgument(_)));
    assert!(user.get_attributes(&[""]).is_err());
}

#[tokio::test]
async fn test_provider_failure_marks_only_that_attribute() {
    let mut client = MockDirectory::new();
    client
        .expect_update_attribute()
        .returning(|_, attribute, _| {
            if attribute == "mobilePhone" {
                Err(IdentityError::provider("mock", "connection reset"))
            } else {
                Ok(true)
            }
        });

    let user = User::new("u-9");
    let results = user
        .set_attributes(
            &client,
            &[attr("mobilePhone", "555-0100"), attr("officeLocation", "B2")],
        )
        .await
        .unwrap();
    assert!(!results[0].value);
    assert!(results[1].value);
}

#[tokio::test]
async fn test_fetch_wrong_type_returns_none() {
    let client = directory().await;
    assert!(User::fetch(&client, "g-eng").await.unwrap().is_none());
    assert!(Group::fetch(&client, "missing").await.unwrap().is_none());
    assert!(User::fetch(&client, "").await.is_err());
}

#[tokio::test]
async fn test_member_of_group_direct_and_recursive() {
    let client = directory().await;
    let mut user = User::fetch(&client, "u-1").await.unwrap().unwrap();
    let engineering = Group::fetch(&client, "g-eng").await.unwrap().unwrap();
    let everyone = Group::fetch(&client, "g-all").await.unwrap().unwrap();

    assert!(user.member_of_group(&client, &engineering, false).await.unwrap());
    assert!(!user.member_of_group(&client, &everyone, false).await.unwrap());
    assert!(user.member_of_group(&client, &everyone, true).await.unwrap());

    let groups = user.groups(&client).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].display_name.as_deref(), Some("Engineering"));
}

#[tokio::test]
async fn test_groups_are_fetched_once() {
    let mut client = MockDirectory::new();
    client
        .expect_member_of()
        .times(1)
        .returning(|_| Ok(vec![GroupRef::new("g-1")]));

    let mut user = User::new("u-1");
    assert!(user.loaded_groups().is_none());
    assert_eq!(user.groups(&client).await.unwrap().len(), 1);
    assert_eq!(user.groups(&client).await.unwrap().len(), 1);
    assert_eq!(user.loaded_groups().map(|g| g.len()), Some(1));
}

#[tokio::test]
async fn test_group_members_and_changes() {
    let client = directory().await;
    let mut engineering = Group::fetch(&client, "g-eng").await.unwrap().unwrap();

    assert_eq!(engineering.member_count(&client).await.unwrap(), 1);

    let added = engineering
        .add_members(&client, &["u-2", "missing"])
        .await
        .unwrap();
    assert_eq!(
        added,
        vec![
            MemberResult { unique_id: "u-2".to_string(), success: true },
            MemberResult { unique_id: "missing".to_string(), success: false },
        ]
    );

    // Cached list stays as loaded; a fresh fetch sees the change
    assert_eq!(engineering.member_count(&client).await.unwrap(), 1);
    let mut reloaded = Group::fetch(&client, "g-eng").await.unwrap().unwrap();
    assert_eq!(reloaded.member_count(&client).await.unwrap(), 2);

    let removed = reloaded.remove_members(&client, &["u-1"]).await.unwrap();
    assert!(removed[0].success);
    assert!(engineering.add_members(&client, &[""]).await.is_err());
}

#[tokio::test]
async fn test_nested_group_members_are_typed() {
    let client = directory().await;
    let mut everyone = Group::fetch(&client, "g-all").await.unwrap().unwrap();
    let members = everyone.members(&client).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].object_type(), ObjectType::Group);
    assert_eq!(members[0].display_name(), Some("Engineering"));
}

#[tokio::test]
async fn test_search_with_filter() {
    let client = directory().await;
    let request = SearchRequest::users().with_filter(SearchFilter::starts_with("displayName", "gra"));
    let results = client.search(&request).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].unique_id, "u-1");
}

#[test]
fn test_user_and_group_with_same_id_share_identity() {
    let user = User::new("shared");
    let group = Group::new("shared");
    assert!(user.same_identity(&group));
    assert_eq!(user.compare_identity(&group), std::cmp::Ordering::Equal);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_equality_follows_unique_id(a in "[a-z0-9-]{1,12}", b in "[a-z0-9-]{1,12}", name in "[A-Za-z ]{0,16}") {
        let mut left = User::new(a.clone());
        left.display_name = Some(name);
        let right = User::new(b.clone());

        prop_assert_eq!(left == right, a == b);
        prop_assert_eq!(left.cmp(&right), a.cmp(&b));

        let set: HashSet<User> = [left, right].into_iter().collect();
        prop_assert_eq!(set.len(), if a == b { 1 } else { 2 });
    }
}
