// src/ingest/providers/calendar.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::sources::CalendarCfg;
use crate::ingest::http::{HttpFetch, HttpRequest};
use crate::ingest::types::{Clock, Normalize, SourceClient, SourceError, SourceKind};
use crate::snapshot::{CalendarEvent, SourcePayload, MISSING_VALUE};

const MISSING_COUNTRY: &str = "??";
const MISSING_TITLE: &str = "Kein Titel";

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    #[serde(default)]
    result: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    date: String,
    country: Option<String>,
    title: Option<String>,
    #[serde(default)]
    actual: Value,
    #[serde(default)]
    forecast: Value,
    #[serde(default)]
    previous: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCalendarEvent {
    pub time_utc: DateTime<Utc>,
    pub country: Option<String>,
    pub title: Option<String>,
    pub actual: Value,
    pub forecast: Value,
    pub previous: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCalendar {
    pub events: Vec<RawCalendarEvent>,
}

/// API values arrive as strings, numbers or null.
fn render_value(v: &Value) -> String {
    match v {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(s) if s.trim().is_empty() => MISSING_VALUE.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn non_empty(s: Option<String>, fallback: &str) -> String {
    s.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl Normalize for RawCalendar {
    fn normalize(self) -> SourcePayload {
        let events = self
            .events
            .into_iter()
            .map(|e| CalendarEvent {
                time_utc: e.time_utc,
                country: non_empty(e.country, MISSING_COUNTRY),
                title: non_empty(e.title, MISSING_TITLE),
                actual: render_value(&e.actual),
                forecast: render_value(&e.forecast),
                previous: render_value(&e.previous),
            })
            .collect();
        SourcePayload::Calendar(events)
    }
}

/// Decode the `{ "result": [...] }` envelope. Any event with an unreadable
/// date fails the whole response.
pub fn parse_calendar(body: &str) -> Result<RawCalendar, SourceError> {
    let resp: CalendarResponse =
        serde_json::from_str(body).map_err(|e| SourceError::parse(format!("calendar json: {e}")))?;
    let events = resp
        .result
        .into_iter()
        .map(|w| {
            let time_utc = DateTime::parse_from_rfc3339(&w.date)
                .map_err(|e| SourceError::parse(format!("calendar date {:?}: {e}", w.date)))?
                .with_timezone(&Utc);
            Ok(RawCalendarEvent {
                time_utc,
                country: w.country,
                title: w.title,
                actual: w.actual,
                forecast: w.forecast,
                previous: w.previous,
            })
        })
        .collect::<Result<Vec<_>, SourceError>>()?;
    Ok(RawCalendar { events })
}

pub struct CalendarClient {
    cfg: CalendarCfg,
    http: Arc<dyn HttpFetch>,
    clock: Clock,
}

impl CalendarClient {
    pub fn new(cfg: &CalendarCfg, http: Arc<dyn HttpFetch>, clock: Clock) -> Self {
        Self {
            cfg: cfg.clone(),
            http,
            clock,
        }
    }

    fn request(&self, now: DateTime<Utc>) -> HttpRequest {
        let to = now + Duration::days(i64::from(self.cfg.days_ahead));
        HttpRequest::get(&self.cfg.url)
            .header("User-Agent", "Mozilla/5.0")
            .header("Origin", &self.cfg.origin)
            .header("Referer", format!("{}/", self.cfg.origin.trim_end_matches('/')))
            .query("from", now.format("%Y-%m-%dT00:00:00.000Z").to_string())
            .query("to", to.format("%Y-%m-%dT23:59:59.000Z").to_string())
            .query("countries", self.cfg.countries.join(","))
            .query("importance", self.cfg.importance.to_string())
    }
}

#[async_trait]
impl SourceClient for CalendarClient {
    type Raw = RawCalendar;

    async fn fetch(&self) -> Result<RawCalendar, SourceError> {
        let req = self.request((self.clock)());
        let resp = self.http.get(req).await?;
        if !resp.is_success() {
            return Err(SourceError::transport(format!(
                "calendar answered status {}",
                resp.status
            )));
        }
        parse_calendar(&resp.body)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Calendar
    }
}
