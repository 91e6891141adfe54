// tests/providers_calendar.rs
mod common;

use std::sync::Arc;

use gold_intel::config::sources::CalendarCfg;
use gold_intel::ingest::http::{FixtureFetch, HttpResponse};
use gold_intel::ingest::providers::calendar::CalendarClient;
use gold_intel::ingest::types::{ErrorKind, Normalize, SourceClient};
use gold_intel::snapshot::{CalendarEvent, SourcePayload};

fn events_of(payload: SourcePayload) -> Vec<CalendarEvent> {
    match payload {
        SourcePayload::Calendar(events) => events,
        other => panic!("expected calendar, got {other:?}"),
    }
}

#[tokio::test]
async fn calendar_fixture_renders_values_and_sentinels() {
    let http = Arc::new(common::calendar_ok());
    let client = CalendarClient::new(&CalendarCfg::default(), http.clone(), common::clock());

    let events = events_of(client.fetch().await.expect("calendar ok").normalize());
    assert_eq!(events.len(), 3);

    assert_eq!(events[0].country, "US");
    assert_eq!(events[0].title, "Inflation Rate YoY");
    assert_eq!(events[0].actual, "-");
    assert_eq!(events[0].forecast, "2.9");
    assert_eq!(events[0].previous, "2.9");

    assert_eq!(events[1].forecast, "2.15%");

    assert_eq!(events[2].country, "??");
    assert_eq!(events[2].title, "Kein Titel");
    assert_eq!(events[2].actual, "4.8");
    assert_eq!(events[2].forecast, "-");

    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["time_utc"], "15.10. 12:30");
}

#[tokio::test]
async fn request_window_follows_the_clock() {
    let http = Arc::new(common::calendar_ok());
    let client = CalendarClient::new(&CalendarCfg::default(), http.clone(), common::clock());
    client.fetch().await.unwrap();

    let calls = http.recorded();
    assert_eq!(calls.len(), 1);
    let req = &calls[0];
    assert_eq!(req.url, common::CALENDAR_URL);
    assert_eq!(req.query_value("from"), Some("2025-10-14T00:00:00.000Z"));
    assert_eq!(req.query_value("to"), Some("2025-10-21T23:59:59.000Z"));
    assert_eq!(req.query_value("countries"), Some("US,CN,EU,DE,IN,GB,JP"));
    assert_eq!(req.query_value("importance"), Some("1"));
    assert_eq!(req.header_value("Origin"), Some("https://www.tradingview.com"));
}

#[tokio::test]
async fn empty_result_is_an_empty_calendar() {
    let http = FixtureFetch::new().route(
        common::CALENDAR_URL,
        HttpResponse::ok(r#"{"status":"ok","result":[]}"#),
    );
    let client = CalendarClient::new(&CalendarCfg::default(), Arc::new(http), common::clock());
    assert!(events_of(client.fetch().await.unwrap().normalize()).is_empty());
}

#[tokio::test]
async fn html_error_page_is_a_parse_error() {
    let http = FixtureFetch::new().route(
        common::CALENDAR_URL,
        HttpResponse::ok("<html>Just a moment...</html>"),
    );
    let client = CalendarClient::new(&CalendarCfg::default(), Arc::new(http), common::clock());
    assert_eq!(client.fetch().await.unwrap_err().kind, ErrorKind::Parse);
}
