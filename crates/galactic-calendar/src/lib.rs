//! Galactic calendars
//!
//! [`CalendarUtility`] registers iCalendar feeds from
//! `Name|URI|username|password` lines, downloads them with basic
//! authentication and answers range queries from the cached events.

pub mod calendar;
pub mod config;
pub mod error;
pub mod ical;
pub mod utility;

pub use calendar::Calendar;
pub use config::CalendarConfig;
pub use error::{CalendarError, Result};
pub use ical::{parse_calendar, CalendarEvent};
pub use utility::CalendarUtility;
