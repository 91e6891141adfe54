// tests/providers_series.rs
mod common;

use std::sync::Arc;

use chrono::DateTime;
use gold_intel::config::sources::SeriesCfg;
use gold_intel::ingest::http::{FixtureFetch, HttpResponse};
use gold_intel::ingest::providers::series::{parse_chart, SeriesClient};
use gold_intel::ingest::types::{ErrorKind, Normalize, SourceClient};
use gold_intel::snapshot::{SeriesPoint, SourcePayload};

fn points_of(payload: SourcePayload) -> Vec<SeriesPoint> {
    match payload {
        SourcePayload::Series(p) => p,
        other => panic!("expected series, got {other:?}"),
    }
}

#[tokio::test]
async fn three_charts_align_with_forward_fill() {
    let http = Arc::new(common::series_ok());
    let client = SeriesClient::new(&SeriesCfg::default(), http.clone());

    let points = points_of(client.fetch().await.expect("series ok").normalize());
    // first row has nothing to diff against
    assert_eq!(points.len(), 3);

    let p1 = &points[0];
    assert_eq!(p1.timestamp, DateTime::from_timestamp(1_760_432_400, 0).unwrap());
    assert_eq!(p1.gold, 4020.0);
    assert_eq!(p1.usd_index, 98.6);
    assert_eq!(p1.gold_return_pct, 0.249);
    assert_eq!(p1.vix_delta, 0.5);

    // VIX had no close at this hour; the previous one carries over
    let p2 = &points[1];
    assert_eq!(p2.vix, 16.5);
    assert_eq!(p2.vix_delta, 0.0);
    assert_eq!(p2.gold_return_pct, 0.261);

    let p3 = &points[2];
    assert_eq!(p3.gold, 4025.25);
    assert_eq!(p3.gold_return_pct, -0.13);
    assert_eq!(p3.vix, 17.25);
    assert_eq!(p3.vix_delta, 0.75);

    let calls = http.recorded();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().any(|c| c.url.ends_with("/%5EVIX")));
    assert!(calls
        .iter()
        .all(|c| c.query_value("range") == Some("5d") && c.query_value("interval") == Some("1h")));
}

#[tokio::test]
async fn one_refused_symbol_fails_the_whole_series() {
    let http = FixtureFetch::new()
        .route(&format!("{}/GC=F", common::CHART_URL), HttpResponse::ok(common::CHART_GOLD))
        .route(&format!("{}/DX-Y.NYB", common::CHART_URL), HttpResponse::ok(common::CHART_DXY))
        .route(&format!("{}/%5EVIX", common::CHART_URL), HttpResponse::status(429));
    let client = SeriesClient::new(&SeriesCfg::default(), Arc::new(http));

    let err = client.fetch().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Blocked);
}

#[test]
fn chart_error_envelope_is_a_parse_error() {
    let body = r#"{"chart":{"result":null,"error":{
        "code":"Not Found",
        "description":"No data found, symbol may be delisted"
    }}}"#;
    let err = parse_chart(body).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.contains("delisted"));
}

#[test]
fn fixture_chart_keeps_null_closes_as_gaps() {
    let vix = parse_chart(common::CHART_VIX).unwrap();
    assert_eq!(vix.len(), 4);
    assert_eq!(vix[2], (1_760_436_000, None));
    assert_eq!(vix[3], (1_760_439_600, Some(17.25)));
}
