//! Galactic logging
//!
//! Structured logging for every Galactic component. Library code emits
//! `tracing` events directly; hosts that want an application event log can
//! inject an [`EventLog`] into the clients that accept one.

pub mod config;
pub mod error;
pub mod event_log;
pub mod subscriber;

pub use config::{LogConfig, LogFormat};
pub use error::{LogError, Result};
pub use event_log::{EventEntry, EventLog, EventSeverity, MemoryEventLog, TracingEventLog};
pub use subscriber::init_tracing;
