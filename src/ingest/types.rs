// src/ingest/types.rs
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::SourcePayload;

/// The four sources of one snapshot, in snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    PageQuote,
    NewsFeed,
    Calendar,
    Series,
}

impl SourceKind {
    pub const ORDER: [SourceKind; 4] = [
        SourceKind::PageQuote,
        SourceKind::NewsFeed,
        SourceKind::Calendar,
        SourceKind::Series,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::PageQuote => "page_quote",
            SourceKind::NewsFeed => "news_feed",
            SourceKind::Calendar => "calendar",
            SourceKind::Series => "series",
        }
    }

    /// Human heading used in the rendered prompt.
    pub fn title(self) -> &'static str {
        match self {
            SourceKind::PageQuote => "Quote page",
            SourceKind::NewsFeed => "News feed",
            SourceKind::Calendar => "Economic calendar",
            SourceKind::Series => "Price series (gold, USD index, VIX)",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Transport,
    Blocked,
    Parse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Blocked => "blocked",
            ErrorKind::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source failure. Captured inside a `SourceOutcome`, never propagated
/// past the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn blocked(status: u16) -> Self {
        Self::new(ErrorKind::Blocked, format!("source refused request (status {status})"))
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }
}

/// Converts a raw, source-specific fetch result into canonical entities.
/// Implementations are pure and never fail; gaps become sentinels.
pub trait Normalize {
    fn normalize(self) -> SourcePayload;
}

/// One network-backed source. `fetch` returns failures as values.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    type Raw: Normalize + Send + 'static;

    async fn fetch(&self) -> Result<Self::Raw, SourceError>;
    fn kind(&self) -> SourceKind;
}

/// Wall clock used for `observedAt`, `collectedAt` and calendar ranges.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_page_feed_calendar_series() {
        let names: Vec<_> = SourceKind::ORDER.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["page_quote", "news_feed", "calendar", "series"]);
    }

    #[test]
    fn source_error_display_has_kind_prefix() {
        let e = SourceError::blocked(403);
        assert_eq!(e.kind, ErrorKind::Blocked);
        assert_eq!(e.to_string(), "blocked: source refused request (status 403)");
    }
}
