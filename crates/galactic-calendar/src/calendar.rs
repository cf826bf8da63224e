//! Registered calendars and their cached events

use crate::config::CalendarConfig;
use crate::ical::CalendarEvent;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Calendar {
    config: CalendarConfig,
    events: Vec<CalendarEvent>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Calendar {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            refreshed_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.config.credentials()
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// Events from the last refresh, ordered by start time
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// `None` until the first successful refresh
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn set_events(&mut self, mut events: Vec<CalendarEvent>) {
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
        self.events = events;
        self.refreshed_at = Some(Utc::now());
    }

    /// Cached events overlapping `[start, end)`
    pub fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&CalendarEvent> {
        self.events
            .iter()
            .filter(|event| event.overlaps(start, end))
            .collect()
    }
}
