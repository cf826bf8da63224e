use crate::attribute::AttributeValue;
use crate::object::{identity_equality, IdentityCore, IdentityObject};
use crate::record::ObjectType;
use crate::table::{AttributeEntry, AttributeTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directory user.
///
/// Contact and organisation fields are optional. Password-state flags are
/// derived by the provider and cannot be written through `set_attributes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    core: IdentityCore,
    pub login: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub telephone_numbers: Vec<String>,
    pub mobile_phone: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub company_name: Option<String>,
    pub office_location: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub employee_id: Option<String>,
    pub manager_id: Option<String>,
    pub description: Option<String>,
    enabled: Option<bool>,
    locked_out: Option<bool>,
    password_expired: Option<bool>,
    password_never_expires: Option<bool>,
    password_last_set: Option<DateTime<Utc>>,
}

macro_rules! text_entry {
    ($name:literal, $field:ident) => {
        AttributeEntry {
            name: $name,
            getter: |u: &User| AttributeValue::from(u.$field.clone()),
            setter: |u: &mut User, v: AttributeValue| {
                u.$field = v.into_text($name)?;
                Ok(())
            },
            writable: true,
        }
    };
}

macro_rules! flag_entry {
    ($name:literal, $field:ident) => {
        AttributeEntry {
            name: $name,
            getter: |u: &User| AttributeValue::from(u.$field),
            setter: |u: &mut User, v: AttributeValue| {
                u.$field = v.into_bool($name)?;
                Ok(())
            },
            writable: false,
        }
    };
}

static USER_ATTRIBUTES: &[AttributeEntry<User>] = &[
    text_entry!("userPrincipalName", login),
    text_entry!("displayName", display_name),
    text_entry!("givenName", given_name),
    text_entry!("surname", surname),
    text_entry!("mail", mail),
    AttributeEntry {
        name: "businessPhones",
        getter: |u: &User| AttributeValue::from(u.telephone_numbers.clone()),
        setter: |u: &mut User, v: AttributeValue| {
            u.telephone_numbers = v.into_text_list("businessPhones")?;
            Ok(())
        },
        writable: true,
    },
    text_entry!("mobilePhone", mobile_phone),
    text_entry!("jobTitle", job_title),
    text_entry!("department", department),
    text_entry!("companyName", company_name),
    text_entry!("officeLocation", office_location),
    text_entry!("streetAddress", street_address),
    text_entry!("city", city),
    text_entry!("state", state),
    text_entry!("postalCode", postal_code),
    text_entry!("country", country),
    text_entry!("employeeId", employee_id),
    text_entry!("managerId", manager_id),
    text_entry!("description", description),
    flag_entry!("accountEnabled", enabled),
    flag_entry!("lockedOut", locked_out),
    flag_entry!("passwordExpired", password_expired),
    flag_entry!("passwordNeverExpires", password_never_expires),
    AttributeEntry {
        name: "lastPasswordChangeDateTime",
        getter: |u: &User| AttributeValue::from(u.password_last_set),
        setter: |u: &mut User, v: AttributeValue| {
            u.password_last_set = v.into_time("lastPasswordChangeDateTime")?;
            Ok(())
        },
        writable: false,
    },
];

static USER_TABLE: AttributeTable<User> = AttributeTable::new(USER_ATTRIBUTES);

impl User {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self::with_core(IdentityCore::new(unique_id, ObjectType::User))
    }

    /// Account is enabled in the backing store; unknown counts as enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_locked_out(&self) -> bool {
        self.locked_out.unwrap_or(false)
    }

    pub fn is_password_expired(&self) -> bool {
        self.password_expired.unwrap_or(false)
    }

    pub fn password_never_expires(&self) -> bool {
        self.password_never_expires.unwrap_or(false)
    }

    pub fn password_last_set(&self) -> Option<DateTime<Utc>> {
        self.password_last_set
    }

    /// "Given Surname", falling back to the display name or login
    pub fn full_name(&self) -> Option<String> {
        match (&self.given_name, &self.surname) {
            (Some(given), Some(surname)) => Some(format!("{} {}", given, surname)),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => self.display_name.clone().or_else(|| self.login.clone()),
        }
    }
}

impl IdentityObject for User {
    fn core(&self) -> &IdentityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IdentityCore {
        &mut self.core
    }

    fn attribute_table() -> &'static AttributeTable<Self> {
        &USER_TABLE
    }

    fn expected_type() -> ObjectType {
        ObjectType::User
    }

    fn with_core(core: IdentityCore) -> Self {
        Self {
            core,
            login: None,
            display_name: None,
            given_name: None,
            surname: None,
            mail: None,
            telephone_numbers: Vec::new(),
            mobile_phone: None,
            job_title: None,
            department: None,
            company_name: None,
            office_location: None,
            street_address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            employee_id: None,
            manager_id: None,
            description: None,
            enabled: None,
            locked_out: None,
            password_expired: None,
            password_never_expires: None,
            password_last_set: None,
        }
    }
}

identity_equality!(User);
