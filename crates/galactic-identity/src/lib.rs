//! Galactic identity model
//!
//! Users and groups as directory-neutral objects. Each object is a read view
//! over a [`DirectoryRecord`]; attribute reads and writes go through a static
//! [`AttributeTable`] keyed by common attribute names, and every remote
//! operation is delegated to a [`DirectoryClient`] implementation.

pub mod attribute;
pub mod client;
pub mod error;
pub mod filter;
pub mod group;
pub mod memory;
pub mod object;
pub mod record;
pub mod table;
pub mod user;

pub use attribute::{AttributeValue, IdentityAttribute};
pub use client::DirectoryClient;
pub use error::{IdentityError, Result};
pub use filter::{SearchFilter, SearchRequest, SearchScope};
pub use group::{Group, Member, MemberResult};
pub use memory::MemoryDirectory;
pub use object::{GroupRef, IdentityCore, IdentityObject};
pub use record::{DirectoryRecord, ObjectType};
pub use table::{AttributeEntry, AttributeTable};
pub use user::User;
