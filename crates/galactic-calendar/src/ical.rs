//! iCalendar (RFC 5545) event parsing

use crate::error::{CalendarError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use icalendar::parser::{read_calendar, unfold, Component, Property};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One `VEVENT`. Floating and `TZID` times are read as UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    /// Exclusive end; all-day events without `DTEND` last one day
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl CalendarEvent {
    /// Whether the event overlaps `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.start >= end {
            return false;
        }
        self.end > start || self.start >= start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Undo TEXT escaping (`\n`, `\,`, `\;`, `\\`)
pub fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

/// Parse a `DATE` or `DATE-TIME` value. The flag is true for date-only values.
pub fn parse_date_time(value: &str, value_type: Option<&str>) -> Option<(DateTime<Utc>, bool)> {
    let value = value.trim();
    let date_only = value_type.is_some_and(|t| t.eq_ignore_ascii_case("DATE")) || value.len() == 8;
    if date_only {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some((Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?), true));
    }
    let (local, utc) = match value.strip_suffix('Z') {
        Some(local) => (local, true),
        None => (value, false),
    };
    let naive = NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S").ok()?;
    if !utc {
        debug!(value, "Reading floating time as UTC");
    }
    Some((Utc.from_utc_datetime(&naive), false))
}

#[derive(Default)]
struct EventBuilder {
    uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<(DateTime<Utc>, bool)>,
    end: Option<DateTime<Utc>>,
}

fn param<'a>(property: &'a Property<'_>, name: &str) -> Option<&'a str> {
    property
        .params
        .iter()
        .find(|p| p.key.as_str().eq_ignore_ascii_case(name))
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_str().trim_matches('"'))
}

impl EventBuilder {
    fn apply(&mut self, property: &Property<'_>) {
        let value = property.val.as_str();
        let name = property.name.as_str().to_ascii_uppercase();
        match name.as_str() {
            "UID" => self.uid = Some(unescape(value)),
            "SUMMARY" => self.summary = Some(unescape(value)),
            "DESCRIPTION" => self.description = Some(unescape(value)),
            "LOCATION" => self.location = Some(unescape(value)),
            "DTSTART" => {
                self.start = parse_date_time(value, param(property, "VALUE"));
                if self.start.is_none() {
                    warn!(value, "Unreadable DTSTART");
                }
            }
            "DTEND" => {
                self.end = parse_date_time(value, param(property, "VALUE")).map(|(t, _)| t);
            }
            _ => {}
        }
    }

    fn build(self) -> Option<CalendarEvent> {
        let (start, all_day) = self.start?;
        let end = match self.end {
            Some(end) if end >= start => end,
            _ if all_day => start + Duration::days(1),
            _ => start,
        };
        Some(CalendarEvent {
            uid: self.uid,
            summary: self.summary,
            description: self.description,
            location: self.location,
            start,
            end,
            all_day,
        })
    }
}

fn is_named(component: &Component<'_>, name: &str) -> bool {
    component.name.as_str().eq_ignore_ascii_case(name)
}

/// Collect events depth-first. Components nested in an event (such as
/// `VALARM`) are not visited.
fn collect_events(components: &[Component<'_>], events: &mut Vec<CalendarEvent>) {
    for component in components {
        if !is_named(component, "VEVENT") {
            collect_events(&component.components, events);
            continue;
        }
        let mut builder = EventBuilder::default();
        for property in &component.properties {
            builder.apply(property);
        }
        let uid = builder.uid.clone();
        match builder.build() {
            Some(event) => events.push(event),
            None => warn!(uid = ?uid, "Skipping event without DTSTART"),
        }
    }
}

/// Parse every `VEVENT` of a calendar.
///
/// Events without a readable `DTSTART` are dropped with a warning.
pub fn parse_calendar(text: &str) -> Result<Vec<CalendarEvent>> {
    let is_calendar = text
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR"));
    if !is_calendar {
        return Err(CalendarError::InvalidFeed(
            "missing BEGIN:VCALENDAR".to_string(),
        ));
    }

    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded).map_err(CalendarError::InvalidFeed)?;

    let mut events = Vec::new();
    collect_events(&calendar.components, &mut events);
    debug!(events = events.len(), "Parsed calendar");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example//EN\r\n\
BEGIN:VEVENT\r\n\
UID:launch-1@example.com\r\n\
DTSTART:20240305T090000Z\r\n\
DTEND:20240305T103000Z\r\n\
SUMMARY:Launch review\\, phase 2\r\n\
DESCRIPTION:Agenda:\\nGo/no-go\\; weather\r\n\x20 and fuel\r\n\
LOCATION:Pad 39A\r\n\
BEGIN:VALARM\r\n\
DESCRIPTION:Reminder\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday\r\n\
DTSTART;VALUE=DATE:20240306\r\n\
SUMMARY:Holiday\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:floating\r\n\
DTSTART;TZID=\"Europe/Berlin\":20240307T140000\r\n\
SUMMARY:Local meeting\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:broken\r\n\
SUMMARY:No start\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let events = parse_calendar(FEED).unwrap();
        assert_eq!(events.len(), 3);

        let launch = &events[0];
        assert_eq!(launch.uid.as_deref(), Some("launch-1@example.com"));
        assert_eq!(launch.summary.as_deref(), Some("Launch review, phase 2"));
        assert_eq!(
            launch.description.as_deref(),
            Some("Agenda:\nGo/no-go; weather and fuel")
        );
        assert_eq!(launch.location.as_deref(), Some("Pad 39A"));
        assert_eq!(launch.start, at(2024, 3, 5, 9, 0));
        assert_eq!(launch.duration(), Duration::minutes(90));
        assert!(!launch.all_day);

        let holiday = &events[1];
        assert!(holiday.all_day);
        assert_eq!(holiday.start, at(2024, 3, 6, 0, 0));
        assert_eq!(holiday.end, at(2024, 3, 7, 0, 0));

        let floating = &events[2];
        assert_eq!(floating.start, at(2024, 3, 7, 14, 0));
        assert_eq!(floating.end, floating.start);
    }

    #[test]
    fn test_not_a_calendar() {
        assert!(matches!(
            parse_calendar("<html>login</html>"),
            Err(CalendarError::InvalidFeed(_))
        ));
    }

    #[test]
    fn test_quoted_parameter_with_colon() {
        let feed = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
ORGANIZER;CN=\"Doe: Jane\":mailto:jane@example.com\r\n\
DTSTART;VALUE=DATE:20240601\r\n\
DTEND;VALUE=DATE:20240603\r\n\
SUMMARY:Offsite\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let events = parse_calendar(feed).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].all_day);
        assert_eq!(events[0].duration(), Duration::days(2));
    }

    #[test]
    fn test_events_outside_vevent_are_ignored() {
        let feed = "BEGIN:VCALENDAR\n\
BEGIN:VTODO\n\
UID:todo-1\n\
DTSTART:20240601T080000Z\n\
END:VTODO\n\
END:VCALENDAR\n";
        assert!(parse_calendar(feed).unwrap().is_empty());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\,b\;c\\d\Ne"), "a,b;c\\d\ne");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_overlaps() {
        let event = CalendarEvent {
            uid: None,
            summary: None,
            description: None,
            location: None,
            start: at(2024, 1, 1, 10, 0),
            end: at(2024, 1, 1, 11, 0),
            all_day: false,
        };
        assert!(event.overlaps(at(2024, 1, 1, 0, 0), at(2024, 1, 2, 0, 0)));
        assert!(event.overlaps(at(2024, 1, 1, 10, 30), at(2024, 1, 1, 10, 45)));
        assert!(!event.overlaps(at(2024, 1, 1, 11, 0), at(2024, 1, 1, 12, 0)));
        assert!(!event.overlaps(at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0)));

        let instant = CalendarEvent {
            end: event.start,
            ..event
        };
        assert!(instant.overlaps(at(2024, 1, 1, 10, 0), at(2024, 1, 1, 10, 1)));
        assert!(!instant.overlaps(at(2024, 1, 1, 10, 1), at(2024, 1, 1, 10, 2)));
    }
}
