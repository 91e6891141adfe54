// src/ingest/providers/series.rs
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::config::sources::SeriesCfg;
use crate::ingest::http::{HttpFetch, HttpRequest, BROWSER_USER_AGENT};
use crate::ingest::types::{Normalize, SourceClient, SourceError, SourceKind};
use crate::snapshot::{SeriesPoint, SourcePayload};

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Close prices keyed by unix seconds; `None` marks a bucket without a close.
pub type CloseSeries = Vec<(i64, Option<f64>)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    pub gold: CloseSeries,
    pub usd_index: CloseSeries,
    pub vix: CloseSeries,
}

/// Decode one chart response into `(timestamp, close)` pairs.
pub fn parse_chart(body: &str) -> Result<CloseSeries, SourceError> {
    let env: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::parse(format!("chart json: {e}")))?;
    let result = match (env.chart.result, env.chart.error) {
        (Some(mut r), _) if !r.is_empty() => r.swap_remove(0),
        (_, Some(err)) => {
            return Err(SourceError::parse(format!(
                "chart error {}: {}",
                err.code.unwrap_or_default(),
                err.description.unwrap_or_default()
            )))
        }
        _ => return Err(SourceError::parse("chart response without result")),
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    Ok(result
        .timestamp
        .into_iter()
        .enumerate()
        .map(|(i, ts)| (ts, closes.get(i).copied().flatten()))
        .collect())
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round_ties_even() / 1000.0
}

fn index(series: &CloseSeries) -> BTreeMap<i64, f64> {
    series
        .iter()
        .filter_map(|(ts, v)| v.filter(|x| x.is_finite()).map(|x| (*ts, x)))
        .collect()
}

impl Normalize for RawSeries {
    /// Align on the union of timestamps, forward-fill each instrument, derive
    /// gold % change and VIX delta, then drop incomplete rows.
    fn normalize(self) -> SourcePayload {
        let columns = [index(&self.gold), index(&self.usd_index), index(&self.vix)];
        let stamps: BTreeSet<i64> = [&self.gold, &self.usd_index, &self.vix]
            .into_iter()
            .flat_map(|s| s.iter().map(|(ts, _)| *ts))
            .collect();

        let mut last: [Option<f64>; 3] = [None; 3];
        let mut prev: Option<[Option<f64>; 3]> = None;
        let mut points = Vec::new();

        for ts in stamps {
            for (slot, column) in last.iter_mut().zip(columns.iter()) {
                if let Some(v) = column.get(&ts) {
                    *slot = Some(*v);
                }
            }
            let row = last;

            if let (
                Some([Some(prev_gold), _, Some(prev_vix)]),
                [Some(gold), Some(usd), Some(vix)],
            ) = (prev, row)
            {
                let ret = (gold / prev_gold - 1.0) * 100.0;
                let delta = vix - prev_vix;
                let timestamp = DateTime::from_timestamp(ts, 0);
                if let (Some(timestamp), true) = (timestamp, ret.is_finite() && delta.is_finite()) {
                    points.push(SeriesPoint {
                        timestamp,
                        gold: round3(gold),
                        usd_index: round3(usd),
                        vix: round3(vix),
                        gold_return_pct: round3(ret),
                        vix_delta: round3(delta),
                    });
                }
            }
            prev = Some(row);
        }

        SourcePayload::Series(points)
    }
}

/// Percent-encode a ticker for use as a URL path segment (`^VIX` -> `%5EVIX`).
fn encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for b in symbol.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'=') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

pub struct SeriesClient {
    cfg: SeriesCfg,
    http: Arc<dyn HttpFetch>,
}

impl SeriesClient {
    pub fn new(cfg: &SeriesCfg, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            cfg: cfg.clone(),
            http,
        }
    }

    async fn fetch_symbol(&self, symbol: &str) -> Result<CloseSeries, SourceError> {
        let url = format!(
            "{}/{}",
            self.cfg.base_url.trim_end_matches('/'),
            encode_symbol(symbol)
        );
        let req = HttpRequest::get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .query("range", &self.cfg.range)
            .query("interval", &self.cfg.interval);
        let resp = self.http.get(req).await?;
        if !resp.is_success() {
            return Err(SourceError::blocked(resp.status));
        }
        parse_chart(&resp.body)
    }
}

#[async_trait]
impl SourceClient for SeriesClient {
    type Raw = RawSeries;

    async fn fetch(&self) -> Result<RawSeries, SourceError> {
        let (gold, usd_index, vix) = tokio::try_join!(
            self.fetch_symbol(&self.cfg.gold_symbol),
            self.fetch_symbol(&self.cfg.usd_index_symbol),
            self.fetch_symbol(&self.cfg.vix_symbol),
        )?;
        Ok(RawSeries {
            gold,
            usd_index,
            vix,
        })
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: RawSeries) -> Vec<SeriesPoint> {
        match raw.normalize() {
            SourcePayload::Series(p) => p,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn rounding_matches_half_to_even() {
        assert_eq!(round3(2.0625), 2.062);
        assert_eq!(round3(0.1875), 0.188);
        assert_eq!(round3(2.34567), 2.346);
        assert_eq!(round3(-0.0004), -0.0);
    }

    #[test]
    fn symbols_are_path_encoded() {
        assert_eq!(encode_symbol("^VIX"), "%5EVIX");
        assert_eq!(encode_symbol("DX-Y.NYB"), "DX-Y.NYB");
        assert_eq!(encode_symbol("GC=F"), "GC=F");
    }

    #[test]
    fn first_row_and_leading_gaps_are_dropped() {
        let raw = RawSeries {
            gold: vec![(0, Some(2000.0)), (3600, Some(2010.0)), (7200, Some(2020.1))],
            usd_index: vec![(0, None), (3600, Some(104.0)), (7200, Some(104.5))],
            vix: vec![(0, Some(15.0)), (3600, Some(15.5)), (7200, Some(15.25))],
        };
        let pts = points(raw);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].timestamp.timestamp(), 3600);
        assert_eq!(pts[0].gold_return_pct, 0.5);
        assert_eq!(pts[0].vix_delta, 0.5);
        assert_eq!(pts[1].vix_delta, -0.25);
    }

    #[test]
    fn buckets_missing_from_one_symbol_are_filled() {
        // VIX has no 7200 bucket at all; the union still carries it.
        let raw = RawSeries {
            gold: vec![(0, Some(2000.0)), (3600, Some(2000.0)), (7200, Some(2000.0))],
            usd_index: vec![(0, Some(104.0)), (3600, Some(104.0)), (7200, Some(104.0))],
            vix: vec![(0, Some(15.0)), (3600, Some(16.0))],
        };
        let pts = points(raw);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].vix, 16.0);
        assert_eq!(pts[1].vix_delta, 0.0);
    }

    #[test]
    fn chart_error_envelope_is_a_parse_failure() {
        let body = r#"{"chart":{"result":null,"error":{
            "code":"Not Found",
            "description":"No data found, symbol may be delisted"
        }}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(err.message.contains("delisted"));
    }
}
