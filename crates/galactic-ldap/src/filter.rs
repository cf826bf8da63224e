//! LDAP filter and DN rendering

use crate::config::LdapConfig;
use galactic_identity::{ObjectType, SearchFilter, SearchRequest};

/// OID of LDAP_MATCHING_RULE_IN_CHAIN
pub const IN_CHAIN_RULE: &str = "1.2.840.113556.1.4.1941";

/// Escape a filter assertion value (RFC 4515)
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape an attribute value for use inside a DN (RFC 4514)
pub fn escape_dn_value(value: &str) -> String {
    let count = value.chars().count();
    let mut escaped = String::with_capacity(value.len() * 2);
    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\0' => escaped.push_str("\\00"),
            ' ' if i == 0 || i + 1 == count => escaped.push_str("\\20"),
            '#' if i == 0 => escaped.push_str("\\23"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render a filter with common attribute names mapped to LDAP names
pub fn render_filter(filter: &SearchFilter, config: &LdapConfig) -> String {
    match filter {
        SearchFilter::Equals { attribute, value } => format!(
            "({}={})",
            config.ldap_name(attribute),
            escape_filter_value(value)
        ),
        SearchFilter::StartsWith { attribute, value } => format!(
            "({}={}*)",
            config.ldap_name(attribute),
            escape_filter_value(value)
        ),
        SearchFilter::Present { attribute } => format!("({}=*)", config.ldap_name(attribute)),
        SearchFilter::And(filters) => format!("(&{})", render_all(filters, config)),
        SearchFilter::Or(filters) => format!("(|{})", render_all(filters, config)),
        SearchFilter::Not(inner) => format!("(!{})", render_filter(inner, config)),
    }
}

fn render_all(filters: &[SearchFilter], config: &LdapConfig) -> String {
    filters.iter().map(|f| render_filter(f, config)).collect()
}

pub fn object_class_filter(object_type: &ObjectType, config: &LdapConfig) -> String {
    let class = match object_type {
        ObjectType::User => &config.user_object_class,
        ObjectType::Group => &config.group_object_class,
    };
    format!("(objectClass={})", escape_filter_value(class))
}

/// Full filter for a search request, scoped to its object type
pub fn request_filter(request: &SearchRequest, config: &LdapConfig) -> String {
    let class = request
        .object_type
        .as_ref()
        .map(|t| object_class_filter(t, config));
    let body = request.filter.as_ref().map(|f| render_filter(f, config));
    match (class, body) {
        (Some(class), Some(body)) => format!("(&{}{})", class, body),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => "(objectClass=*)".to_string(),
    }
}

/// Groups whose `member` attribute holds `member_dn`
pub fn direct_groups_filter(member_dn: &str, config: &LdapConfig) -> String {
    format!(
        "(&{}(member={}))",
        object_class_filter(&ObjectType::Group, config),
        escape_filter_value(member_dn)
    )
}

/// Matches a group that contains `member_dn` at any nesting depth
pub fn in_chain_filter(member_dn: &str) -> String {
    format!("(member:{}:={})", IN_CHAIN_RULE, escape_filter_value(member_dn))
}
