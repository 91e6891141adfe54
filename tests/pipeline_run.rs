// tests/pipeline_run.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use gold_intel::config::ai::ReasoningConfig;
use gold_intel::ingest::http::FixtureFetch;
use gold_intel::reasoning::{build_gateway_from_config, MockGateway, ENV_TEST_MODE};
use gold_intel::{Pipeline, ReasoningError, ReasoningGateway as _};

#[tokio::test(start_paused = true)]
async fn narrative_and_snapshot_are_returned_together() {
    let gateway = Arc::new(MockGateway::ok("## Gold\n* 1 day: [BULLISH]"));
    let pipeline = Pipeline::new(
        common::healthy_aggregator(),
        gateway.clone(),
        Duration::from_secs(60),
    );

    let run = pipeline.run().await;
    assert_eq!(
        run.narrative.as_ref().map(|n| n.as_str()),
        Ok("## Gold\n* 1 day: [BULLISH]")
    );
    assert_eq!(run.snapshot().failed_count(), 0);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn gateway_failure_keeps_the_snapshot() {
    let gateway = Arc::new(MockGateway::failing(ReasoningError::Status {
        status: 503,
        body: "overloaded".into(),
    }));
    let pipeline = Pipeline::new(common::healthy_aggregator(), gateway, Duration::from_secs(60));

    let run = pipeline.run().await;
    assert!(matches!(run.narrative, Err(ReasoningError::Status { status: 503, .. })));
    assert_eq!(run.snapshot().series().len(), 3);
    assert_eq!(run.request.rubric, gold_intel::RUBRIC);
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_times_out() {
    let gateway = Arc::new(MockGateway::ok("late").with_delay(Duration::from_secs(90)));
    let pipeline = Pipeline::new(common::healthy_aggregator(), gateway, Duration::from_secs(60));

    let run = pipeline.run().await;
    assert_eq!(run.narrative, Err(ReasoningError::Timeout(60)));
    assert_eq!(run.snapshot().news().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn degraded_collection_still_reaches_the_gateway() {
    let gateway = Arc::new(MockGateway::ok("mostly neutral"));
    let agg = common::aggregator(
        FixtureFetch::new(),
        FixtureFetch::new(),
        FixtureFetch::new(),
        FixtureFetch::new(),
    );
    let pipeline = Pipeline::new(agg, gateway.clone(), Duration::from_secs(60));

    let run = pipeline.run().await;
    assert_eq!(run.snapshot().failed_count(), 4);
    assert!(run.narrative.is_ok());
    assert_eq!(gateway.calls(), 1);
}

#[serial_test::serial]
#[tokio::test]
async fn test_mode_env_swaps_in_the_mock_gateway() {
    std::env::set_var(ENV_TEST_MODE, "mock");
    let gateway = build_gateway_from_config(&ReasoningConfig::default()).unwrap();
    std::env::remove_var(ENV_TEST_MODE);

    assert_eq!(gateway.provider_name(), "mock");
    let pipeline = Pipeline::new(common::healthy_aggregator(), gateway, Duration::from_secs(5));
    let run = pipeline.run().await;
    assert!(run.narrative.is_ok());
}

#[serial_test::serial]
#[tokio::test]
async fn disabled_reasoning_reports_disabled() {
    std::env::remove_var(ENV_TEST_MODE);
    let cfg = ReasoningConfig {
        enabled: false,
        ..ReasoningConfig::default()
    };
    let gateway = build_gateway_from_config(&cfg).unwrap();
    let pipeline = Pipeline::new(common::healthy_aggregator(), gateway, Duration::from_secs(5));

    let run = pipeline.run().await;
    assert_eq!(run.narrative, Err(ReasoningError::Disabled));
    assert_eq!(run.snapshot().failed_count(), 0);
}
