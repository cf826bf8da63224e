//! Galactic configuration
//!
//! [`ConfigurationItem`] is a named text file in a configuration folder,
//! optionally encrypted with a passphrase. [`RoleStore`] keeps role mappings
//! in such an item, and [`GalacticConfig`] holds the host-wide settings.

pub mod error;
pub mod item;
pub mod roles;
pub mod settings;

pub use error::{ConfigError, Result};
pub use item::ConfigurationItem;
pub use roles::RoleStore;
pub use settings::GalacticConfig;
