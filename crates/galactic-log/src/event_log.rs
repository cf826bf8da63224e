//! Opt-in application event log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub severity: EventSeverity,
    pub source: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl EventEntry {
    pub fn new(severity: EventSeverity, source: &str, message: &str) -> Self {
        Self {
            severity,
            source: source.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for application events.
///
/// Clients that swallow remote failures report them here when one is
/// injected; otherwise they only emit `tracing` events.
pub trait EventLog: Send + Sync {
    fn log(&self, entry: EventEntry);

    fn information(&self, source: &str, message: &str) {
        self.log(EventEntry::new(EventSeverity::Information, source, message));
    }

    fn warning(&self, source: &str, message: &str) {
        self.log(EventEntry::new(EventSeverity::Warning, source, message));
    }

    fn error(&self, source: &str, message: &str) {
        self.log(EventEntry::new(EventSeverity::Error, source, message));
    }
}

/// Forwards events to the global tracing subscriber
#[derive(Debug, Clone, Default)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn log(&self, entry: EventEntry) {
        match entry.severity {
            EventSeverity::Information => {
                tracing::info!(source = %entry.source, "{}", entry.message)
            }
            EventSeverity::Warning => {
                tracing::warn!(source = %entry.source, "{}", entry.message)
            }
            EventSeverity::Error => {
                tracing::error!(source = %entry.source, "{}", entry.message)
            }
        }
    }
}

/// Keeps events in memory, mostly for hosts that display recent activity
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    entries: Mutex<Vec<EventEntry>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<EventEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn entries_with(&self, severity: EventSeverity) -> Vec<EventEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl EventLog for MemoryEventLog {
    fn log(&self, entry: EventEntry) {
        tracing::trace!(source = %entry.source, severity = ?entry.severity, "Event recorded");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}
