//! Feed download and range queries against a wiremock server

use chrono::{TimeZone, Utc};
use galactic_calendar::{CalendarError, CalendarUtility};
use galactic_config::ConfigurationItem;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:standup-1\r
DTSTART:20240311T090000Z\r
DTEND:20240311T091500Z\r
SUMMARY:Standup\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:offsite\r
DTSTART;VALUE=DATE:20240313\r
DTEND;VALUE=DATE:20240315\r
SUMMARY:Offsite\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:standup-2\r
DTSTART:20240318T090000Z\r
DTEND:20240318T091500Z\r
SUMMARY:Standup\r
END:VEVENT\r
END:VCALENDAR\r
";

#[tokio::test]
async fn test_refresh_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/team.ics"))
        .and(header("authorization", "Basic YW5uOnB3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let line = format!("Team|{}/team.ics|ann|pw", server.uri());
    let mut utility = CalendarUtility::new([line]).unwrap();
    assert_eq!(utility.refresh("Team").await.unwrap(), 3);

    let calendar = utility.calendar("Team").unwrap();
    assert!(calendar.refreshed_at().is_some());

    let week = utility
        .events_between(
            "Team",
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap(),
        )
        .unwrap();
    let uids: Vec<&str> = week.iter().filter_map(|e| e.uid.as_deref()).collect();
    assert_eq!(uids, vec!["standup-1", "offsite"]);
    assert!(week[1].all_day);
}

#[tokio::test]
async fn test_refresh_failure_keeps_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/team.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/team.ics"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut utility = CalendarUtility::new([format!("Team|{}/team.ics", server.uri())]).unwrap();
    utility.refresh("Team").await.unwrap();

    let err = utility.refresh("Team").await.unwrap_err();
    assert!(matches!(err, CalendarError::Download(_)));
    assert_eq!(utility.calendar("Team").unwrap().events().len(), 3);
}

#[tokio::test]
async fn test_html_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
        .mount(&server)
        .await;

    let mut utility = CalendarUtility::new([format!("Team|{}/login", server.uri())]).unwrap();
    assert!(matches!(
        utility.refresh("Team").await,
        Err(CalendarError::InvalidFeed(_))
    ));
}

#[tokio::test]
async fn test_unknown_calendar_refresh() {
    let mut utility = CalendarUtility::new(Vec::<String>::new()).unwrap();
    assert!(matches!(
        utility.refresh("Missing").await,
        Err(CalendarError::UnknownCalendar(_))
    ));
}

#[test]
fn test_calendars_from_configuration_item() {
    let dir = TempDir::new().unwrap();
    let mut item = ConfigurationItem::new(dir.path(), "calendars", true, Some("key")).unwrap();
    item.set_value("Name|http://x/cal.ics|user|pass\nOther|https://example.com/o.ics\n");
    item.write().unwrap();

    let item = ConfigurationItem::new(dir.path(), "calendars", true, Some("key")).unwrap();
    let utility = CalendarUtility::from_item(&item).unwrap();
    assert_eq!(utility.names(), vec!["Name", "Other"]);
    assert_eq!(
        utility.calendar("Name").unwrap().credentials(),
        Some(("user", Some("pass")))
    );
}
