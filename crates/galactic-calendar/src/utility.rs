//! Calendar registry with feed download

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::error::{CalendarError, Result};
use crate::ical::{parse_calendar, CalendarEvent};
use chrono::{DateTime, Utc};
use galactic_config::ConfigurationItem;
use galactic_rest::RestClient;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Calendars registered by name from `Name|URI|username|password` lines
#[derive(Debug, Default)]
pub struct CalendarUtility {
    calendars: BTreeMap<String, Calendar>,
    timeout: Option<Duration>,
}

impl CalendarUtility {
    /// Register one calendar per line. Blank lines and `#` comments are skipped;
    /// a malformed line or a repeated name is an error.
    pub fn new<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut utility = Self::default();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            utility.register(CalendarConfig::parse_line(line)?)?;
        }
        debug!(calendars = utility.calendars.len(), "Calendars registered");
        Ok(utility)
    }

    /// Register the calendars listed in a configuration item
    pub fn from_item(item: &ConfigurationItem) -> Result<Self> {
        Self::new(item.lines())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn register(&mut self, config: CalendarConfig) -> Result<()> {
        config.validate()?;
        if self.calendars.contains_key(&config.name) {
            return Err(CalendarError::DuplicateCalendar(config.name));
        }
        self.calendars.insert(config.name.clone(), Calendar::new(config));
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.calendars.keys().map(String::as_str).collect()
    }

    pub fn calendar(&self, name: &str) -> Option<&Calendar> {
        self.calendars.get(name)
    }

    fn calendar_mut(&mut self, name: &str) -> Result<&mut Calendar> {
        self.calendars
            .get_mut(name)
            .ok_or_else(|| CalendarError::UnknownCalendar(name.to_string()))
    }

    /// Download and parse the feed, replacing the cached events.
    /// Returns the number of events read.
    pub async fn refresh(&mut self, name: &str) -> Result<usize> {
        let timeout = self.timeout;
        let calendar = self.calendar_mut(name)?;

        let mut builder = RestClient::builder(calendar.uri());
        if let Some((username, password)) = calendar.credentials() {
            builder = builder.basic(username, password.map(str::to_string));
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        debug!(calendar = %name, uri = %calendar.uri(), "Downloading calendar");
        let text = client.get_text(calendar.uri()).await?;
        let events = parse_calendar(&text)?;
        let count = events.len();
        calendar.set_events(events);
        info!(calendar = %name, events = count, "Calendar refreshed");
        Ok(count)
    }

    /// Refresh every calendar, stopping at the first failure
    pub async fn refresh_all(&mut self) -> Result<usize> {
        let names: Vec<String> = self.calendars.keys().cloned().collect();
        let mut total = 0;
        for name in &names {
            total += self.refresh(name).await?;
        }
        Ok(total)
    }

    /// Cached events of `name` overlapping `[start, end)`
    pub fn events_between(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<&CalendarEvent>> {
        if end < start {
            return Err(CalendarError::InvalidArgument(format!(
                "range end {} is before start {}",
                end, start
            )));
        }
        let calendar = self
            .calendar(name)
            .ok_or_else(|| CalendarError::UnknownCalendar(name.to_string()))?;
        Ok(calendar.events_between(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_by_name() {
        let utility = CalendarUtility::new(["Name|http://x/cal.ics|user|pass"]).unwrap();
        let calendar = utility.calendar("Name").unwrap();
        assert_eq!(calendar.uri(), "http://x/cal.ics");
        assert_eq!(calendar.credentials(), Some(("user", Some("pass"))));
        assert!(calendar.events().is_empty());
        assert!(calendar.refreshed_at().is_none());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let lines = "# feeds\n\nTeam|https://cal.example.com/team.ics\nHolidays|https://cal.example.com/h.ics|svc|pw\n";
        let utility = CalendarUtility::new(lines.lines()).unwrap();
        assert_eq!(utility.names(), vec!["Holidays", "Team"]);
    }

    #[test]
    fn test_malformed_line_rejected() {
        assert!(matches!(
            CalendarUtility::new(["Team"]),
            Err(CalendarError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = CalendarUtility::new([
            "Team|https://cal.example.com/a.ics",
            "Team|https://cal.example.com/b.ics",
        ]);
        assert!(matches!(result, Err(CalendarError::DuplicateCalendar(name)) if name == "Team"));
    }

    #[test]
    fn test_unknown_calendar() {
        let utility = CalendarUtility::new(Vec::<String>::new()).unwrap();
        let now = Utc::now();
        assert!(matches!(
            utility.events_between("Nope", now, now),
            Err(CalendarError::UnknownCalendar(_))
        ));
    }
}
