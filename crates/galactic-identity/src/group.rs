use crate::attribute::AttributeValue;
use crate::client::DirectoryClient;
use crate::error::{IdentityError, Result};
use crate::object::{identity_equality, IdentityCore, IdentityObject};
use crate::record::{DirectoryRecord, ObjectType};
use crate::table::{AttributeEntry, AttributeTable};
use crate::user::User;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A direct member of a group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Member {
    User(User),
    Group(Group),
}

impl Member {
    pub fn from_record(record: DirectoryRecord) -> Result<Self> {
        match record.object_type {
            ObjectType::User => User::from_record(record).map(Member::User),
            ObjectType::Group => Group::from_record(record).map(Member::Group),
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Member::User(user) => user.unique_id(),
            Member::Group(group) => group.unique_id(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Member::User(_) => ObjectType::User,
            Member::Group(_) => ObjectType::Group,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Member::User(user) => user.display_name.as_deref(),
            Member::Group(group) => group.display_name.as_deref(),
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id() == other.unique_id()
    }
}

impl Eq for Member {}

impl std::hash::Hash for Member {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.unique_id().hash(state);
    }
}

/// Outcome of one membership change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberResult {
    pub unique_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    core: IdentityCore,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub mail: Option<String>,
    pub mail_nickname: Option<String>,
    security_enabled: Option<bool>,
    /// Direct members; `None` until first fetched
    #[serde(skip)]
    members: Option<Vec<Member>>,
}

macro_rules! text_entry {
    ($name:literal, $field:ident) => {
        AttributeEntry {
            name: $name,
            getter: |g: &Group| AttributeValue::from(g.$field.clone()),
            setter: |g: &mut Group, v: AttributeValue| {
                g.$field = v.into_text($name)?;
                Ok(())
            },
            writable: true,
        }
    };
}

static GROUP_ATTRIBUTES: &[AttributeEntry<Group>] = &[
    text_entry!("displayName", display_name),
    text_entry!("description", description),
    text_entry!("mail", mail),
    text_entry!("mailNickname", mail_nickname),
    AttributeEntry {
        name: "securityEnabled",
        getter: |g: &Group| AttributeValue::from(g.security_enabled),
        setter: |g: &mut Group, v: AttributeValue| {
            g.security_enabled = v.into_bool("securityEnabled")?;
            Ok(())
        },
        writable: false,
    },
];

static GROUP_TABLE: AttributeTable<Group> = AttributeTable::new(GROUP_ATTRIBUTES);

impl Group {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self::with_core(IdentityCore::new(unique_id, ObjectType::Group))
    }

    pub fn is_security_group(&self) -> bool {
        self.security_enabled.unwrap_or(false)
    }

    /// Members fetched so far, without a remote call
    pub fn loaded_members(&self) -> Option<&[Member]> {
        self.members.as_deref()
    }

    /// Direct members, fetched through `client` on first use
    pub async fn members(&mut self, client: &dyn DirectoryClient) -> Result<&[Member]> {
        if self.members.is_none() {
            let records = client.members(self.unique_id()).await?;
            let mut members = Vec::with_capacity(records.len());
            for record in records {
                match Member::from_record(record) {
                    Ok(member) => members.push(member),
                    Err(e) => warn!(group = %self.unique_id(), error = %e, "Skipping member"),
                }
            }
            self.members = Some(members);
        }
        Ok(self.members.as_deref().unwrap_or_default())
    }

    pub async fn member_count(&mut self, client: &dyn DirectoryClient) -> Result<usize> {
        Ok(self.members(client).await?.len())
    }

    /// Add members by unique id. The loaded member list is not updated.
    pub async fn add_members(
        &self,
        client: &dyn DirectoryClient,
        member_ids: &[&str],
    ) -> Result<Vec<MemberResult>> {
        self.change_members(client, member_ids, true).await
    }

    /// Remove members by unique id. The loaded member list is not updated.
    pub async fn remove_members(
        &self,
        client: &dyn DirectoryClient,
        member_ids: &[&str],
    ) -> Result<Vec<MemberResult>> {
        self.change_members(client, member_ids, false).await
    }

    async fn change_members(
        &self,
        client: &dyn DirectoryClient,
        member_ids: &[&str],
        add: bool,
    ) -> Result<Vec<MemberResult>> {
        if member_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(IdentityError::InvalidArgument(
                "Member ids cannot be empty".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            let outcome = if add {
                client.add_member(self.unique_id(), member_id).await
            } else {
                client.remove_member(self.unique_id(), member_id).await
            };
            let success = match outcome {
                Ok(done) => done,
                Err(e) => {
                    warn!(
                        group = %self.unique_id(),
                        member = %member_id,
                        error = %e,
                        "Membership change failed"
                    );
                    false
                }
            };
            if success {
                info!(group = %self.unique_id(), member = %member_id, add, "Membership changed");
            }
            results.push(MemberResult {
                unique_id: member_id.to_string(),
                success,
            });
        }
        Ok(results)
    }
}

impl IdentityObject for Group {
    fn core(&self) -> &IdentityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IdentityCore {
        &mut self.core
    }

    fn attribute_table() -> &'static AttributeTable<Self> {
        &GROUP_TABLE
    }

    fn expected_type() -> ObjectType {
        ObjectType::Group
    }

    fn with_core(core: IdentityCore) -> Self {
        Self {
            core,
            display_name: None,
            description: None,
            mail: None,
            mail_nickname: None,
            security_enabled: None,
            members: None,
        }
    }
}

identity_equality!(Group);
