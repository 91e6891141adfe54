// src/config/sources.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionCfg {
    /// Overall collection deadline; sources still pending are recorded as timeouts.
    pub deadline_secs: u64,
    /// Per-source fetch timeout.
    pub source_timeout_secs: u64,
}

impl Default for CollectionCfg {
    fn default() -> Self {
        Self {
            deadline_secs: 15,
            source_timeout_secs: 10,
        }
    }
}

impl CollectionCfg {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageQuoteCfg {
    pub url: String,
    pub symbol: String,
    pub price_field: String,
    pub label: String,
    /// Heading texts must be longer than this to count as headlines.
    pub headline_min_chars: usize,
}

impl Default for PageQuoteCfg {
    fn default() -> Self {
        Self {
            url: "https://finance.yahoo.com/quote/GC=F/".into(),
            symbol: "GC=F".into(),
            price_field: "regularMarketPrice".into(),
            label: "Yahoo Finance".into(),
            headline_min_chars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsFeedCfg {
    pub url: String,
    pub label: String,
}

impl Default for NewsFeedCfg {
    fn default() -> Self {
        Self {
            url: "https://www.finanzen.ch/rss/news".into(),
            label: "finanzen.ch".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarCfg {
    pub url: String,
    pub origin: String,
    pub countries: Vec<String>,
    pub importance: i32,
    pub days_ahead: u32,
}

impl Default for CalendarCfg {
    fn default() -> Self {
        Self {
            url: "https://economic-calendar.tradingview.com/events".into(),
            origin: "https://www.tradingview.com".into(),
            countries: ["US", "CN", "EU", "DE", "IN", "GB", "JP"]
                .into_iter()
                .map(String::from)
                .collect(),
            importance: 1,
            days_ahead: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesCfg {
    pub base_url: String,
    pub gold_symbol: String,
    pub usd_index_symbol: String,
    pub vix_symbol: String,
    pub range: String,
    pub interval: String,
}

impl Default for SeriesCfg {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".into(),
            gold_symbol: "GC=F".into(),
            usd_index_symbol: "DX-Y.NYB".into(),
            vix_symbol: "^VIX".into(),
            range: "5d".into(),
            interval: "1h".into(),
        }
    }
}
