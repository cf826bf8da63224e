//! Galactic PowerShell remoting
//!
//! [`PowerShellClient`] runs scripts on Windows hosts over WS-Management
//! (WinRM) with HTTP Basic authentication. Output streams are collected
//! into a [`PowerShellOutput`].

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod wsman;

pub use client::PowerShellClient;
pub use config::RemoteConfig;
pub use error::{PowerShellError, Result};
pub use output::{clean_error_stream, PowerShellOutput};
