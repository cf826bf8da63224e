//! Static attribute registration tables
//!
//! Every identity type registers one [`AttributeTable`] listing the
//! backing-store attribute names it understands together with typed accessor
//! functions. Lookups by name replace runtime reflection.

use crate::attribute::{AttributeValue, IdentityAttribute};
use crate::error::{IdentityError, Result};
use crate::record::DirectoryRecord;

pub type Getter<T> = fn(&T) -> AttributeValue;
pub type Setter<T> = fn(&mut T, AttributeValue) -> Result<()>;

pub struct AttributeEntry<T: 'static> {
    /// Backing-store attribute name
    pub name: &'static str,
    pub getter: Getter<T>,
    pub setter: Setter<T>,
    /// Read-only entries are populated from records but never written back
    pub writable: bool,
}

impl<T> AttributeEntry<T> {
    pub fn get(&self, object: &T) -> AttributeValue {
        (self.getter)(object)
    }

    pub fn set(&self, object: &mut T, value: AttributeValue) -> Result<()> {
        if !self.writable {
            return Err(IdentityError::ReadOnlyAttribute(self.name.to_string()));
        }
        (self.setter)(object, value)
    }
}

pub struct AttributeTable<T: 'static> {
    entries: &'static [AttributeEntry<T>],
}

impl<T> AttributeTable<T> {
    pub const fn new(entries: &'static [AttributeEntry<T>]) -> Self {
        Self { entries }
    }

    /// ASCII case-insensitive lookup
    pub fn find(&self, name: &str) -> Option<&'static AttributeEntry<T>> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn writable_names(&self) -> impl Iterator<Item = &'static str> {
        self.entries
            .iter()
            .filter(|entry| entry.writable)
            .map(|entry| entry.name)
    }

    /// One entry per matched name, in request order; unknown names are skipped
    pub fn read(&self, object: &T, names: &[&str]) -> Result<Vec<IdentityAttribute<AttributeValue>>> {
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            if name.trim().is_empty() {
                return Err(IdentityError::InvalidArgument(
                    "Attribute names cannot be empty".to_string(),
                ));
            }
            match self.find(name) {
                Some(entry) => values.push(IdentityAttribute::new(*name, entry.get(object))),
                None => tracing::debug!(attribute = %name, "Unknown attribute requested"),
            }
        }
        Ok(values)
    }

    /// Every registered attribute with a non-null value
    pub fn read_all(&self, object: &T) -> Vec<IdentityAttribute<AttributeValue>> {
        self.entries
            .iter()
            .map(|entry| IdentityAttribute::new(entry.name, entry.get(object)))
            .filter(|attribute| !attribute.value.is_null())
            .collect()
    }

    /// Populate `object` from a record, including read-only entries.
    /// Values the setter rejects are logged and skipped.
    pub fn load(&self, object: &mut T, record: &DirectoryRecord) {
        for (name, value) in &record.attributes {
            if let Some(entry) = self.find(name) {
                if let Err(e) = (entry.setter)(object, value.clone()) {
                    tracing::warn!(
                        unique_id = %record.unique_id,
                        attribute = %name,
                        error = %e,
                        "Ignoring unreadable attribute"
                    );
                }
            }
        }
    }
}
