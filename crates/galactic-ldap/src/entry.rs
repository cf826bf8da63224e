//! Conversion between LDAP entries and directory records

use crate::config::LdapConfig;
use crate::error::{LdapError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use galactic_identity::{AttributeValue, DirectoryRecord, ObjectType};
use ldap3::SearchEntry;
use std::collections::HashMap;

/// userAccountControl: account disabled
pub const UAC_ACCOUNT_DISABLE: i64 = 0x0002;
/// userAccountControl: password does not expire
pub const UAC_DONT_EXPIRE_PASSWORD: i64 = 0x1_0000;
/// userAccountControl / msDS-User-Account-Control-Computed: password expired
pub const UAC_PASSWORD_EXPIRED: i64 = 0x80_0000;
/// msDS-User-Account-Control-Computed: locked out
pub const UAC_LOCKOUT: i64 = 0x0010;
/// groupType: security group
pub const GROUP_TYPE_SECURITY: i64 = 0x8000_0000;

const COMPUTED_UAC: &str = "msDS-User-Account-Control-Computed";

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;

/// Derived common attributes and the LDAP attributes they are computed from
pub const DERIVED_SOURCES: &[(&str, &[&str])] = &[
    ("accountEnabled", &["userAccountControl"]),
    ("passwordNeverExpires", &["userAccountControl"]),
    ("passwordExpired", &["userAccountControl", COMPUTED_UAC]),
    ("lockedOut", &["lockoutTime", COMPUTED_UAC]),
    ("lastPasswordChangeDateTime", &["pwdLastSet"]),
    ("securityEnabled", &["groupType"]),
];

/// Parse an LDAP GeneralizedTime such as `20230501080000.0Z` or
/// `20230501100000+0200`.
pub fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.len() < 14 || !value.is_char_boundary(14) {
        return None;
    }
    let (stamp, rest) = value.split_at(14);
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;

    let rest = match rest.strip_prefix(['.', ',']) {
        Some(fraction) => fraction.trim_start_matches(|c: char| c.is_ascii_digit()),
        None => rest,
    };

    let offset_secs = match rest {
        "" | "Z" => 0,
        zone => {
            let (sign, digits) = match zone.as_bytes() {
                [b'+', digits @ ..] => (1, digits),
                [b'-', digits @ ..] => (-1, digits),
                _ => return None,
            };
            let [h1, h2, m1, m2] = digits else {
                return None;
            };
            if !digits.iter().all(u8::is_ascii_digit) {
                return None;
            }
            let hours = i64::from((h1 - b'0') * 10 + (h2 - b'0'));
            let minutes = i64::from((m1 - b'0') * 10 + (m2 - b'0'));
            sign * (hours * 3600 + minutes * 60)
        }
    };

    let utc = Utc.from_utc_datetime(&naive);
    Some(utc - chrono::Duration::seconds(offset_secs))
}

pub fn format_generalized_time(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S.0Z").to_string()
}

/// Convert a Windows FILETIME (100ns ticks since 1601). Zero and the
/// "never" sentinel yield `None`.
pub fn filetime_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    if ticks <= 0 || ticks == i64::MAX {
        return None;
    }
    let secs = ticks / 10_000_000 - FILETIME_EPOCH_OFFSET;
    let nanos = ((ticks % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn first_integer(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<i64> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .and_then(|value| value.trim().parse().ok())
}

fn has_class(attrs: &HashMap<String, Vec<String>>, class: &str) -> bool {
    attrs
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case("objectClass"))
        .flat_map(|(_, values)| values.iter())
        .any(|value| value.eq_ignore_ascii_case(class))
}

/// Build a normalized record from a search entry. The DN is the unique id.
pub fn entry_to_record(entry: SearchEntry, config: &LdapConfig) -> DirectoryRecord {
    let object_type = if has_class(&entry.attrs, &config.group_object_class) {
        ObjectType::Group
    } else {
        ObjectType::User
    };

    let mut record = DirectoryRecord::new(entry.dn, object_type.clone());

    if let Some(created) = entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(&config.creation_time_attribute))
        .and_then(|(_, values)| values.first())
        .and_then(|value| parse_generalized_time(value))
    {
        record = record.with_creation_time(created);
    }

    for (name, values) in &entry.attrs {
        let value = match values.len() {
            0 => continue,
            1 => AttributeValue::Text(values[0].clone()),
            _ => AttributeValue::List(values.iter().cloned().map(AttributeValue::Text).collect()),
        };
        record.set_attribute(config.common_name(name), value);
    }

    for (name, values) in entry.bin_attrs {
        if let Some(bytes) = values.into_iter().next() {
            record.set_attribute(config.common_name(&name), AttributeValue::Binary(bytes));
        }
    }

    apply_derived(&mut record, &entry.attrs, &object_type);
    record
}

fn apply_derived(
    record: &mut DirectoryRecord,
    attrs: &HashMap<String, Vec<String>>,
    object_type: &ObjectType,
) {
    match object_type {
        ObjectType::User => {
            let computed = first_integer(attrs, COMPUTED_UAC);
            if let Some(uac) = first_integer(attrs, "userAccountControl") {
                record.set_attribute("accountEnabled", (uac & UAC_ACCOUNT_DISABLE == 0).into());
                record.set_attribute(
                    "passwordNeverExpires",
                    (uac & UAC_DONT_EXPIRE_PASSWORD != 0).into(),
                );
                let expired = uac & UAC_PASSWORD_EXPIRED != 0
                    || computed.map(|c| c & UAC_PASSWORD_EXPIRED != 0).unwrap_or(false);
                record.set_attribute("passwordExpired", expired.into());
            }
            let locked = computed
                .map(|c| c & UAC_LOCKOUT != 0)
                .or_else(|| first_integer(attrs, "lockoutTime").map(|t| t > 0));
            if let Some(locked) = locked {
                record.set_attribute("lockedOut", locked.into());
            }
            if let Some(changed) = first_integer(attrs, "pwdLastSet").and_then(filetime_to_datetime) {
                record.set_attribute("lastPasswordChangeDateTime", changed.into());
            }
        }
        ObjectType::Group => {
            if let Some(group_type) = first_integer(attrs, "groupType") {
                record.set_attribute(
                    "securityEnabled",
                    (group_type & GROUP_TYPE_SECURITY != 0).into(),
                );
            }
        }
    }
}

/// LDAP attribute list for a request naming common attributes.
/// Empty means all user attributes.
pub fn requested_attributes(names: &[String], config: &LdapConfig) -> Vec<String> {
    let mut attrs = vec!["objectClass".to_string(), config.creation_time_attribute.clone()];
    if names.is_empty() || names.iter().any(|n| n == "*") {
        attrs.push("*".to_string());
        for (_, sources) in DERIVED_SOURCES {
            attrs.extend(sources.iter().map(|s| s.to_string()));
        }
    } else {
        for name in names {
            match DERIVED_SOURCES
                .iter()
                .find(|(derived, _)| derived.eq_ignore_ascii_case(name))
            {
                Some((_, sources)) => attrs.extend(sources.iter().map(|s| s.to_string())),
                None => attrs.push(config.ldap_name(name).to_string()),
            }
        }
    }
    attrs.sort_by_key(|a| a.to_ascii_lowercase());
    attrs.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    attrs
}

/// String values for an add or modify operation
pub fn value_to_strings(attribute: &str, value: &AttributeValue) -> Result<Vec<String>> {
    match value {
        AttributeValue::Null => Ok(Vec::new()),
        AttributeValue::Bool(b) => Ok(vec![if *b { "TRUE" } else { "FALSE" }.to_string()]),
        AttributeValue::Integer(i) => Ok(vec![i.to_string()]),
        AttributeValue::Text(s) => Ok(vec![s.clone()]),
        AttributeValue::Time(t) => Ok(vec![format_generalized_time(t)]),
        AttributeValue::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.extend(value_to_strings(attribute, item)?);
            }
            Ok(values)
        }
        AttributeValue::Binary(_) => Err(LdapError::UnsupportedValue {
            attribute: attribute.to_string(),
            kind: value.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig {
            base_dn: "dc=example,dc=com".to_string(),
            ..LdapConfig::default()
        }
    }

    fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> SearchEntry {
        SearchEntry {
            dn: dn.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_parse_generalized_time() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_generalized_time("20230501080000.0Z"), Some(expected));
        assert_eq!(parse_generalized_time("20230501080000Z"), Some(expected));
        assert_eq!(parse_generalized_time("20230501100000+0200"), Some(expected));
        assert_eq!(parse_generalized_time("20230501030000-0500"), Some(expected));
        assert_eq!(parse_generalized_time("2023"), None);
        assert_eq!(parse_generalized_time("20231301080000Z"), None);
    }

    #[test]
    fn test_malformed_zone_is_rejected() {
        assert_eq!(parse_generalized_time("20230501080000+0é0"), None);
        assert_eq!(parse_generalized_time("20230501080000+02"), None);
        assert_eq!(parse_generalized_time("20230501080000+02a0"), None);
        assert_eq!(parse_generalized_time("20230501080000*0200"), None);
        assert_eq!(parse_generalized_time("20230501080000.5+ü"), None);
    }

    #[test]
    fn test_format_generalized_time() {
        let time = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap();
        let formatted = format_generalized_time(&time);
        assert_eq!(formatted, "20240229235901.0Z");
        assert_eq!(parse_generalized_time(&formatted), Some(time));
    }

    #[test]
    fn test_filetime_conversion() {
        // 2021-01-01T00:00:00Z
        let ticks = (1_609_459_200 + FILETIME_EPOCH_OFFSET) * 10_000_000;
        assert_eq!(
            filetime_to_datetime(ticks),
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(filetime_to_datetime(0), None);
        assert_eq!(filetime_to_datetime(i64::MAX), None);
    }

    #[test]
    fn test_user_entry_to_record() {
        let record = entry_to_record(
            entry(
                "CN=Ann Lee,OU=People,DC=example,DC=com",
                &[
                    ("objectClass", &["top", "person", "user"]),
                    ("whenCreated", &["20230501080000.0Z"]),
                    ("sn", &["Lee"]),
                    ("telephoneNumber", &["1", "2"]),
                    ("userAccountControl", &["66050"]),
                    ("lockoutTime", &["0"]),
                ],
            ),
            &config(),
        );

        assert_eq!(record.unique_id, "CN=Ann Lee,OU=People,DC=example,DC=com");
        assert_eq!(record.object_type, ObjectType::User);
        assert!(record.creation_time.is_some());
        assert_eq!(record.text("surname"), Some("Lee"));
        assert_eq!(
            record.attribute("businessPhones").map(AttributeValue::text_values),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        // 66050 = NORMAL_ACCOUNT | DONT_EXPIRE_PASSWORD | ACCOUNTDISABLE
        assert_eq!(record.attribute("accountEnabled"), Some(&AttributeValue::Bool(false)));
        assert_eq!(
            record.attribute("passwordNeverExpires"),
            Some(&AttributeValue::Bool(true))
        );
        assert_eq!(record.attribute("lockedOut"), Some(&AttributeValue::Bool(false)));
    }

    #[test]
    fn test_group_entry_to_record() {
        let record = entry_to_record(
            entry(
                "CN=Ops,DC=example,DC=com",
                &[
                    ("objectClass", &["top", "group"]),
                    ("groupType", &["-2147483646"]),
                ],
            ),
            &config(),
        );
        assert_eq!(record.object_type, ObjectType::Group);
        assert_eq!(record.attribute("securityEnabled"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_requested_attributes() {
        let config = config();
        let attrs = requested_attributes(
            &["surname".to_string(), "accountEnabled".to_string()],
            &config,
        );
        assert_eq!(attrs, vec!["objectClass", "sn", "userAccountControl", "whenCreated"]);
        assert!(requested_attributes(&[], &config).contains(&"*".to_string()));
    }

    #[test]
    fn test_value_to_strings() {
        assert_eq!(
            value_to_strings("a", &AttributeValue::Bool(true)).unwrap(),
            vec!["TRUE"]
        );
        assert_eq!(
            value_to_strings("a", &AttributeValue::from(vec!["x".to_string(), "y".to_string()]))
                .unwrap(),
            vec!["x", "y"]
        );
        assert!(value_to_strings("a", &AttributeValue::Null).unwrap().is_empty());
        assert!(value_to_strings("a", &AttributeValue::Binary(vec![1])).is_err());
    }
}
