// tests/common/mod.rs
// Shared wiring for the integration tests: fixture bodies, fixed clock,
// and an aggregator built over fixture transports.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use gold_intel::config::PipelineConfig;
use gold_intel::ingest::http::{FixtureFetch, HttpFetch, HttpResponse};
use gold_intel::ingest::types::{fixed_clock, Clock};
use gold_intel::Aggregator;

pub const QUOTE_PAGE: &str = include_str!("../fixtures/quote_page.html");
pub const RSS_FEED: &str = include_str!("../fixtures/finanzen_rss.xml");
pub const ATOM_FEED: &str = include_str!("../fixtures/atom_feed.xml");
pub const CALENDAR: &str = include_str!("../fixtures/calendar.json");
pub const CHART_GOLD: &str = include_str!("../fixtures/chart_gold.json");
pub const CHART_DXY: &str = include_str!("../fixtures/chart_dxy.json");
pub const CHART_VIX: &str = include_str!("../fixtures/chart_vix.json");

pub const QUOTE_URL: &str = "https://finance.yahoo.com/quote/GC=F/";
pub const FEED_URL: &str = "https://www.finanzen.ch/rss/news";
pub const CALENDAR_URL: &str = "https://economic-calendar.tradingview.com/events";
pub const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap()
}

pub fn clock() -> Clock {
    fixed_clock(t0())
}

pub fn page_ok() -> FixtureFetch {
    FixtureFetch::new().route(QUOTE_URL, HttpResponse::ok(QUOTE_PAGE))
}

pub fn feed_ok() -> FixtureFetch {
    FixtureFetch::new().route(FEED_URL, HttpResponse::ok(RSS_FEED))
}

pub fn calendar_ok() -> FixtureFetch {
    FixtureFetch::new().route(CALENDAR_URL, HttpResponse::ok(CALENDAR))
}

pub fn series_ok() -> FixtureFetch {
    FixtureFetch::new()
        .route(&format!("{CHART_URL}/GC=F"), HttpResponse::ok(CHART_GOLD))
        .route(&format!("{CHART_URL}/DX-Y.NYB"), HttpResponse::ok(CHART_DXY))
        .route(&format!("{CHART_URL}/%5EVIX"), HttpResponse::ok(CHART_VIX))
}

/// Aggregator over the given transports (page, feed, calendar, series).
pub fn aggregator(
    page: FixtureFetch,
    feed: FixtureFetch,
    calendar: FixtureFetch,
    series: FixtureFetch,
) -> Aggregator {
    let transports: [Arc<dyn HttpFetch>; 4] = [
        Arc::new(page),
        Arc::new(feed),
        Arc::new(calendar),
        Arc::new(series),
    ];
    Aggregator::with_transports(&PipelineConfig::default(), transports, clock())
        .with_timeouts(Duration::from_secs(10), Duration::from_secs(15))
}

pub fn healthy_aggregator() -> Aggregator {
    aggregator(page_ok(), feed_ok(), calendar_ok(), series_ok())
}
