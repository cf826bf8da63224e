//! LDAP provider for Galactic identity objects
//!
//! [`LdapClient`] implements [`galactic_identity::DirectoryClient`] against
//! any LDAPv3 server, with Active Directory conventions by default: entries
//! are identified by DN, common attribute names are translated through
//! [`LdapConfig::attribute_map`], and account flags are derived from
//! `userAccountControl`, `lockoutTime` and `pwdLastSet`.

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;

pub use client::LdapClient;
pub use config::LdapConfig;
pub use error::{LdapError, Result};
pub use filter::{escape_dn_value, escape_filter_value};
