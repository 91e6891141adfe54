//! Canonical records and the frozen per-run `Snapshot`.
//!
//! Everything here is built once and never mutated. Rendering formats for
//! timestamps (`dd.mm.yy | HH:MM` for news, `dd.mm. HH:MM` for calendar
//! events) are part of the serialized form, so the prompt and the raw JSON
//! dump agree.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::ingest::types::{ErrorKind, SourceError, SourceKind};

pub const PRICE_NOT_FOUND: &str = "Nicht gefunden";
pub const PUBLISHED_UNKNOWN: &str = "Heute";
pub const MISSING_VALUE: &str = "-";

/// Scraped price text. Kept opaque; the page decides its formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Quoted(String),
    NotFound,
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Quoted(s) => f.write_str(s),
            Price::NotFound => f.write_str(PRICE_NOT_FOUND),
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub instrument: String,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
    pub source: String,
}

impl Quote {
    /// Numeric reading of the price text, e.g. `"4,012.30"` -> `4012.3`.
    pub fn price_value(&self) -> Option<f64> {
        match &self.price {
            Price::Quoted(s) => s.replace(',', "").trim().parse::<f64>().ok(),
            Price::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageQuote {
    pub quote: Quote,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    At(DateTime<Utc>),
    Unknown,
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Published::At(ts) => write!(f, "{}", ts.format("%d.%m.%y | %H:%M")),
            Published::Unknown => f.write_str(PUBLISHED_UNKNOWN),
        }
    }
}

impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub published_at: Published,
    pub link: String,
    pub source: String,
}

fn serialize_calendar_time<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format("%d.%m. %H:%M"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    #[serde(serialize_with = "serialize_calendar_time")]
    pub time_utc: DateTime<Utc>,
    pub country: String,
    pub title: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub gold: f64,
    pub usd_index: f64,
    pub vix: f64,
    pub gold_return_pct: f64,
    pub vix_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourcePayload {
    PageQuote(PageQuote),
    News(Vec<NewsItem>),
    Calendar(Vec<CalendarEvent>),
    Series(Vec<SeriesPoint>),
}

impl SourcePayload {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            SourcePayload::PageQuote(_) => SourceKind::PageQuote,
            SourcePayload::News(_) => SourceKind::NewsFeed,
            SourcePayload::Calendar(_) => SourceKind::Calendar,
            SourcePayload::Series(_) => SourceKind::Series,
        }
    }

    /// Number of canonical records carried (1 for a page quote).
    pub fn item_count(&self) -> usize {
        match self {
            SourcePayload::PageQuote(_) => 1,
            SourcePayload::News(v) => v.len(),
            SourcePayload::Calendar(v) => v.len(),
            SourcePayload::Series(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
}

/// Result of one source's fetch-and-normalize step.
///
/// Constructed only through [`SourceOutcome::succeeded`] and
/// [`SourceOutcome::failed`], so a failed outcome never carries a payload and
/// always carries an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    source: SourceKind,
    status: Status,
    error: Option<SourceError>,
    payload: Option<SourcePayload>,
}

impl SourceOutcome {
    pub fn succeeded(payload: SourcePayload) -> Self {
        Self {
            source: payload.source_kind(),
            status: Status::Success,
            error: None,
            payload: Some(payload),
        }
    }

    pub fn failed(source: SourceKind, error: SourceError) -> Self {
        Self {
            source,
            status: Status::Failed,
            error: Some(error),
            payload: None,
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn source_name(&self) -> &'static str {
        self.source.as_str()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn error(&self) -> Option<&SourceError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn payload(&self) -> Option<&SourcePayload> {
        self.payload.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    collected_at: DateTime<Utc>,
    outcomes: [SourceOutcome; 4],
}

impl Snapshot {
    /// Freeze a snapshot from whatever outcomes were recorded.
    ///
    /// Slots follow `SourceKind::ORDER`. The first outcome per source wins;
    /// a source with no outcome at all is recorded as a timeout.
    pub fn assemble(
        collected_at: DateTime<Utc>,
        outcomes: impl IntoIterator<Item = SourceOutcome>,
    ) -> Self {
        let mut slots: [Option<SourceOutcome>; 4] = [None, None, None, None];
        for outcome in outcomes {
            let idx = slot_index(outcome.source);
            if slots[idx].is_none() {
                slots[idx] = Some(outcome);
            }
        }
        let outcomes = SourceKind::ORDER.map(|kind| {
            slots[slot_index(kind)].take().unwrap_or_else(|| {
                SourceOutcome::failed(kind, SourceError::timeout("no outcome recorded"))
            })
        });
        Self {
            collected_at,
            outcomes,
        }
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    pub fn outcomes(&self) -> &[SourceOutcome; 4] {
        &self.outcomes
    }

    pub fn outcome(&self, kind: SourceKind) -> &SourceOutcome {
        &self.outcomes[slot_index(kind)]
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn page_quote(&self) -> Option<&PageQuote> {
        match self.outcome(SourceKind::PageQuote).payload() {
            Some(SourcePayload::PageQuote(p)) => Some(p),
            _ => None,
        }
    }

    pub fn headlines(&self) -> &[String] {
        self.page_quote().map(|p| p.headlines.as_slice()).unwrap_or(&[])
    }

    /// News items; a degraded feed reads as an empty list.
    pub fn news(&self) -> &[NewsItem] {
        match self.outcome(SourceKind::NewsFeed).payload() {
            Some(SourcePayload::News(v)) => v,
            _ => &[],
        }
    }

    pub fn calendar(&self) -> &[CalendarEvent] {
        match self.outcome(SourceKind::Calendar).payload() {
            Some(SourcePayload::Calendar(v)) => v,
            _ => &[],
        }
    }

    pub fn series(&self) -> &[SeriesPoint] {
        match self.outcome(SourceKind::Series).payload() {
            Some(SourcePayload::Series(v)) => v,
            _ => &[],
        }
    }
}

fn slot_index(kind: SourceKind) -> usize {
    match kind {
        SourceKind::PageQuote => 0,
        SourceKind::NewsFeed => 1,
        SourceKind::Calendar => 2,
        SourceKind::Series => 3,
    }
}
