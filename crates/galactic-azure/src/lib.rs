//! Azure AD provider for Galactic identity objects
//!
//! [`AzureDirectoryClient`] implements [`galactic_identity::DirectoryClient`]
//! on Microsoft Graph. Tokens come from the client-credentials flow and are
//! cached by [`TokenCache`]; collections are paged through `@odata.nextLink`.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod graph;

pub use auth::TokenCache;
pub use config::AzureConfig;
pub use directory::{render_filter, AzureDirectoryClient};
pub use error::{AzureError, Result};
pub use graph::{graph_path, GraphClient};
