//! LDAP directory client

use crate::config::LdapConfig;
use crate::entry::{entry_to_record, requested_attributes, value_to_strings};
use crate::error::{LdapError, Result};
use crate::filter::{direct_groups_filter, escape_dn_value, in_chain_filter, request_filter};
use async_trait::async_trait;
use galactic_identity::{
    AttributeValue, DirectoryClient, DirectoryRecord, GroupRef, IdentityError, ObjectType,
    SearchRequest, SearchScope,
};
use galactic_log::{EventEntry, EventLog, EventSeverity};
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_ATTRIBUTE: u32 = 16;
const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_DN_SYNTAX: u32 = 34;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_ALREADY_EXISTS: u32 = 68;

const EVENT_SOURCE: &str = "galactic-ldap";

fn to_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Map a write result to success, "nothing to do" or an error
fn write_outcome(operation: &'static str, result: LdapResult, benign: &[u32]) -> Result<bool> {
    match result.rc {
        RC_SUCCESS => Ok(true),
        rc if benign.contains(&rc) => Ok(false),
        rc => Err(LdapError::Operation {
            operation,
            rc,
            text: result.text,
        }),
    }
}

pub struct LdapClient {
    config: LdapConfig,
    event_log: Option<Arc<dyn EventLog>>,
}

impl LdapClient {
    pub fn new(config: LdapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            event_log: None,
        })
    }

    /// Record directory writes in an application event log
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    fn record_event(&self, severity: EventSeverity, message: String) {
        if let Some(log) = &self.event_log {
            log.log(EventEntry::new(severity, EVENT_SOURCE, &message));
        }
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        debug!(url = %self.config.url, "Connecting to LDAP server");
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url).await?;
        ldap3::drive!(conn);

        if let (Some(bind_dn), Some(bind_password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            let result = ldap.simple_bind(bind_dn, bind_password).await?;
            match result.rc {
                RC_SUCCESS => {}
                RC_INVALID_CREDENTIALS => {
                    return Err(LdapError::AuthenticationFailed {
                        bind_dn: bind_dn.clone(),
                    })
                }
                rc => {
                    return Err(LdapError::Operation {
                        operation: "bind",
                        rc,
                        text: result.text,
                    })
                }
            }
        }

        Ok(ldap)
    }

    /// Check that the server is reachable and the service bind succeeds
    pub async fn verify_connection(&self) -> Result<()> {
        let mut ldap = self.connect().await?;
        ldap.unbind().await?;
        Ok(())
    }

    async fn search_entries(
        &self,
        ldap: &mut Ldap,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<String>,
    ) -> Result<Vec<SearchEntry>> {
        debug!(base = %base, filter = %filter, "Searching LDAP");

        // Base-scoped reads are never paged
        if self.config.page_size > 0 && !matches!(scope, Scope::Base) {
            let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
                Box::new(EntriesOnly::new()),
                Box::new(PagedResults::new(self.config.page_size)),
            ];
            let mut stream = ldap
                .streaming_search_with(adapters, base, scope, filter, attrs)
                .await?;
            let mut entries = Vec::new();
            while let Some(entry) = stream.next().await? {
                entries.push(SearchEntry::construct(entry));
            }
            let result = stream.finish().await;
            if result.rc == RC_NO_SUCH_OBJECT {
                return Ok(Vec::new());
            }
            result.success()?;
            return Ok(entries);
        }

        let result = ldap.search(base, scope, filter, attrs).await?;
        if result.1.rc == RC_NO_SUCH_OBJECT || result.1.rc == RC_INVALID_DN_SYNTAX {
            return Ok(Vec::new());
        }
        let (entries, _) = result.success()?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    async fn read_entry(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        attrs: Vec<String>,
    ) -> Result<Option<SearchEntry>> {
        let entries = self
            .search_entries(ldap, dn, Scope::Base, "(objectClass=*)", attrs)
            .await?;
        Ok(entries.into_iter().next())
    }

    /// Search and normalize results to common attribute names
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryRecord>> {
        let filter = request_filter(request, &self.config);
        let base = request.base.as_deref().unwrap_or(&self.config.base_dn);
        let attrs = requested_attributes(&request.attributes, &self.config);

        let mut ldap = self.connect().await?;
        let entries = self
            .search_entries(&mut ldap, base, to_scope(request.scope), &filter, attrs)
            .await?;
        ldap.unbind().await?;

        let records: Vec<DirectoryRecord> = entries
            .into_iter()
            .map(|entry| {
                let mut record = entry_to_record(entry, &self.config);
                record.retain_attributes(&request.attributes);
                record
            })
            .collect();

        info!(found = records.len(), "LDAP search completed");
        Ok(records)
    }

    /// Read one entry by DN
    pub async fn get(&self, dn: &str) -> Result<Option<DirectoryRecord>> {
        let mut ldap = self.connect().await?;
        let entry = self
            .read_entry(&mut ldap, dn, requested_attributes(&[], &self.config))
            .await?;
        ldap.unbind().await?;
        Ok(entry.map(|e| entry_to_record(e, &self.config)))
    }

    /// Add an entry. Returns false if it already exists.
    pub async fn add(
        &self,
        dn: &str,
        object_classes: &[&str],
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> Result<bool> {
        let mut ldap_attrs: Vec<(String, HashSet<String>)> = vec![(
            "objectClass".to_string(),
            object_classes.iter().map(|c| c.to_string()).collect(),
        )];
        for (name, value) in attributes {
            let values = value_to_strings(name, value)?;
            if !values.is_empty() {
                ldap_attrs.push((
                    self.config.ldap_name(name).to_string(),
                    values.into_iter().collect(),
                ));
            }
        }

        debug!(dn = %dn, "Adding LDAP entry");
        let mut ldap = self.connect().await?;
        let result = ldap.add(dn, ldap_attrs).await?;
        ldap.unbind().await?;

        let added = write_outcome("add", result, &[RC_ALREADY_EXISTS])?;
        if added {
            info!(dn = %dn, "LDAP entry created");
            self.record_event(EventSeverity::Information, format!("Created {}", dn));
        } else {
            warn!(dn = %dn, "LDAP entry already exists");
        }
        Ok(added)
    }

    /// Replace one attribute; `Null` clears it. Returns false if the entry is missing.
    pub async fn modify(&self, dn: &str, attribute: &str, value: &AttributeValue) -> Result<bool> {
        let name = self.config.ldap_name(attribute).to_string();
        let values: HashSet<String> = value_to_strings(attribute, value)?.into_iter().collect();
        let modification = if values.is_empty() {
            Mod::Delete(name.clone(), HashSet::new())
        } else {
            Mod::Replace(name.clone(), values)
        };

        let mut ldap = self.connect().await?;
        let result = ldap.modify(dn, vec![modification]).await?;
        ldap.unbind().await?;

        // Clearing an absent attribute counts as success
        if value.is_null() && result.rc == RC_NO_SUCH_ATTRIBUTE {
            return Ok(true);
        }
        let modified = write_outcome("modify", result, &[RC_NO_SUCH_OBJECT])?;
        if modified {
            info!(dn = %dn, attribute = %name, "LDAP entry modified");
            self.record_event(
                EventSeverity::Information,
                format!("Modified {} on {}", name, dn),
            );
        }
        Ok(modified)
    }

    /// Delete an entry. Returns false if it does not exist.
    pub async fn delete(&self, dn: &str) -> Result<bool> {
        let mut ldap = self.connect().await?;
        let result = ldap.delete(dn).await?;
        ldap.unbind().await?;

        let deleted = write_outcome("delete", result, &[RC_NO_SUCH_OBJECT])?;
        if deleted {
            info!(dn = %dn, "LDAP entry deleted");
            self.record_event(EventSeverity::Warning, format!("Deleted {}", dn));
        }
        Ok(deleted)
    }

    async fn change_member(&self, group_dn: &str, member_dn: &str, add: bool) -> Result<bool> {
        let values: HashSet<String> = [member_dn.to_string()].into_iter().collect();
        let (modification, operation, benign) = if add {
            (
                Mod::Add("member".to_string(), values),
                "add member",
                [RC_ATTRIBUTE_OR_VALUE_EXISTS, RC_NO_SUCH_OBJECT],
            )
        } else {
            (
                Mod::Delete("member".to_string(), values),
                "remove member",
                [RC_NO_SUCH_ATTRIBUTE, RC_NO_SUCH_OBJECT],
            )
        };

        let mut ldap = self.connect().await?;
        let result = ldap.modify(group_dn, vec![modification]).await?;
        ldap.unbind().await?;

        let changed = write_outcome(operation, result, &benign)?;
        if changed {
            self.record_event(
                EventSeverity::Information,
                format!("{} {} in {}", operation, member_dn, group_dn),
            );
        }
        Ok(changed)
    }

    fn has_naming_attribute(&self, attributes: &BTreeMap<String, AttributeValue>) -> bool {
        attributes.keys().any(|name| {
            self.config
                .ldap_name(name)
                .eq_ignore_ascii_case(&self.config.rdn_attribute)
        })
    }

    /// Value of the naming attribute, falling back to the display name
    fn naming_value<'a>(&self, attributes: &'a BTreeMap<String, AttributeValue>) -> Result<&'a str> {
        let rdn = &self.config.rdn_attribute;
        attributes
            .iter()
            .find(|(name, _)| self.config.ldap_name(name).eq_ignore_ascii_case(rdn))
            .or_else(|| {
                attributes
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("displayName"))
            })
            .and_then(|(_, value)| value.as_text())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| LdapError::InvalidDn(format!("no value for naming attribute {}", rdn)))
    }

    /// DN for a new entry in the container configured for its type
    pub fn new_entry_dn(
        &self,
        object_type: &ObjectType,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> Result<String> {
        let value = self.naming_value(attributes)?;
        let container = match object_type {
            ObjectType::User => self.config.user_container(),
            ObjectType::Group => self.config.group_container(),
        };
        Ok(format!(
            "{}={},{}",
            self.config.rdn_attribute,
            escape_dn_value(value),
            container
        ))
    }

    async fn direct_groups(&self, ldap: &mut Ldap, member_dn: &str) -> Result<Vec<DirectoryRecord>> {
        let filter = direct_groups_filter(member_dn, &self.config);
        let attrs = vec!["objectClass".to_string(), "displayName".to_string()];
        let entries = self
            .search_entries(ldap, &self.config.base_dn, Scope::Subtree, &filter, attrs)
            .await?;
        Ok(entries
            .into_iter()
            .map(|e| entry_to_record(e, &self.config))
            .collect())
    }
}

impl std::fmt::Debug for LdapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapClient")
            .field("url", &self.config.url)
            .field("base_dn", &self.config.base_dn)
            .field("bind_dn", &self.config.bind_dn)
            .finish()
    }
}

#[async_trait]
impl DirectoryClient for LdapClient {
    fn provider_name(&self) -> &str {
        "ldap"
    }

    async fn get_object(&self, unique_id: &str) -> galactic_identity::Result<Option<DirectoryRecord>> {
        Ok(self.get(unique_id).await?)
    }

    async fn search(&self, request: &SearchRequest) -> galactic_identity::Result<Vec<DirectoryRecord>> {
        Ok(LdapClient::search(self, request).await?)
    }

    async fn create_object(
        &self,
        object_type: ObjectType,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> galactic_identity::Result<String> {
        let dn = self.new_entry_dn(&object_type, attributes)?;
        let classes: Vec<&str> = match object_type {
            ObjectType::User => vec![
                "top",
                "person",
                "organizationalPerson",
                self.config.user_object_class.as_str(),
            ],
            ObjectType::Group => vec!["top", self.config.group_object_class.as_str()],
        };

        let mut attributes = attributes.clone();
        if !self.has_naming_attribute(&attributes) {
            let naming = AttributeValue::from(self.naming_value(&attributes)?);
            attributes.insert(self.config.rdn_attribute.clone(), naming);
        }

        if self.add(&dn, &classes, &attributes).await? {
            Ok(dn)
        } else {
            Err(IdentityError::provider("ldap", format!("entry already exists: {}", dn)))
        }
    }

    async fn update_attribute(
        &self,
        unique_id: &str,
        attribute: &str,
        value: &AttributeValue,
    ) -> galactic_identity::Result<bool> {
        Ok(self.modify(unique_id, attribute, value).await?)
    }

    async fn delete_object(&self, unique_id: &str) -> galactic_identity::Result<bool> {
        Ok(self.delete(unique_id).await?)
    }

    async fn member_of(&self, unique_id: &str) -> galactic_identity::Result<Vec<GroupRef>> {
        let mut ldap = self.connect().await?;
        let groups = self.direct_groups(&mut ldap, unique_id).await?;
        ldap.unbind().await.map_err(LdapError::from)?;
        Ok(groups.iter().map(GroupRef::from_record).collect())
    }

    async fn members(&self, group_id: &str) -> galactic_identity::Result<Vec<DirectoryRecord>> {
        let mut ldap = self.connect().await?;
        let Some(group) = self
            .read_entry(&mut ldap, group_id, vec!["member".to_string()])
            .await?
        else {
            ldap.unbind().await.map_err(LdapError::from)?;
            return Ok(Vec::new());
        };

        let member_dns = group
            .attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("member"))
            .map(|(_, values)| values.clone())
            .unwrap_or_default();

        let attrs = requested_attributes(&[], &self.config);
        let mut members = Vec::with_capacity(member_dns.len());
        for dn in member_dns {
            match self.read_entry(&mut ldap, &dn, attrs.clone()).await? {
                Some(entry) => members.push(entry_to_record(entry, &self.config)),
                None => debug!(group = %group_id, member = %dn, "Dangling member reference"),
            }
        }
        ldap.unbind().await.map_err(LdapError::from)?;
        Ok(members)
    }

    async fn add_member(&self, group_id: &str, member_id: &str) -> galactic_identity::Result<bool> {
        Ok(self.change_member(group_id, member_id, true).await?)
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> galactic_identity::Result<bool> {
        Ok(self.change_member(group_id, member_id, false).await?)
    }

    async fn is_transitive_member(
        &self,
        member_id: &str,
        group_id: &str,
    ) -> galactic_identity::Result<bool> {
        let mut ldap = self.connect().await?;

        if self.config.in_chain_matching {
            let entries = self
                .search_entries(
                    &mut ldap,
                    group_id,
                    Scope::Base,
                    &in_chain_filter(member_id),
                    vec!["1.1".to_string()],
                )
                .await?;
            ldap.unbind().await.map_err(LdapError::from)?;
            return Ok(!entries.is_empty());
        }

        // No in-chain rule: walk parent groups breadth-first
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([member_id.to_string()]);
        let mut found = false;
        while let Some(current) = queue.pop_front() {
            for parent in self.direct_groups(&mut ldap, &current).await? {
                if parent.unique_id.eq_ignore_ascii_case(group_id) {
                    found = true;
                    break;
                }
                if visited.insert(parent.unique_id.to_ascii_lowercase()) {
                    queue.push_back(parent.unique_id);
                }
            }
            if found {
                break;
            }
        }
        ldap.unbind().await.map_err(LdapError::from)?;
        Ok(found)
    }
}
