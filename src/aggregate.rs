//! Fan-out/fan-in over the four sources.
//!
//! Each source runs in its own task under the per-source timeout. The
//! aggregator then awaits the tasks in snapshot order against one shared
//! deadline; whatever is still running at the deadline is aborted and
//! recorded as a timeout. Completion order never affects outcome order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::{counter, gauge, histogram};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::ingest::ensure_metrics_described;
use crate::ingest::http::{HttpFetch, ReqwestFetch};
use crate::ingest::providers::calendar::{CalendarClient, RawCalendar};
use crate::ingest::providers::feed::{FeedClient, RawFeed};
use crate::ingest::providers::page_quote::{PageQuoteClient, RawPage};
use crate::ingest::providers::series::{RawSeries, SeriesClient};
use crate::ingest::types::{
    system_clock, Clock, Normalize, SourceClient, SourceError, SourceKind,
};
use crate::snapshot::{Snapshot, SourceOutcome};

pub struct Aggregator {
    page: Arc<dyn SourceClient<Raw = RawPage>>,
    feed: Arc<dyn SourceClient<Raw = RawFeed>>,
    calendar: Arc<dyn SourceClient<Raw = RawCalendar>>,
    series: Arc<dyn SourceClient<Raw = RawSeries>>,
    source_timeout: Duration,
    deadline: Duration,
    clock: Clock,
}

impl Aggregator {
    pub fn new(
        page: Arc<dyn SourceClient<Raw = RawPage>>,
        feed: Arc<dyn SourceClient<Raw = RawFeed>>,
        calendar: Arc<dyn SourceClient<Raw = RawCalendar>>,
        series: Arc<dyn SourceClient<Raw = RawSeries>>,
    ) -> Self {
        Self {
            page,
            feed,
            calendar,
            series,
            source_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(15),
            clock: system_clock(),
        }
    }

    /// Production wiring: each client gets its own reqwest transport.
    /// Fails only if a transport cannot be built.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let timeout = cfg.collection.source_timeout();
        let transport = || -> Result<Arc<dyn HttpFetch>> {
            let fetch: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::new(timeout)?);
            Ok(fetch)
        };
        let transports = [transport()?, transport()?, transport()?, transport()?];
        Ok(Self::with_transports(cfg, transports, system_clock()))
    }

    /// Wiring with explicit transports (page, feed, calendar, series) and clock.
    pub fn with_transports(
        cfg: &PipelineConfig,
        transports: [Arc<dyn HttpFetch>; 4],
        clock: Clock,
    ) -> Self {
        let [page_http, feed_http, calendar_http, series_http] = transports;
        Self::new(
            Arc::new(PageQuoteClient::new(&cfg.page_quote, page_http, clock.clone())),
            Arc::new(FeedClient::new(&cfg.news_feed, feed_http)),
            Arc::new(CalendarClient::new(&cfg.calendar, calendar_http, clock.clone())),
            Arc::new(SeriesClient::new(&cfg.series, series_http)),
        )
        .with_timeouts(cfg.collection.source_timeout(), cfg.collection.deadline())
        .with_clock(clock)
    }

    pub fn with_timeouts(mut self, source_timeout: Duration, deadline: Duration) -> Self {
        self.source_timeout = source_timeout;
        self.deadline = deadline;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run all sources and freeze a snapshot. Never fails.
    pub async fn collect(&self) -> Snapshot {
        ensure_metrics_described();
        let deadline = tokio::time::Instant::now() + self.deadline;

        let handles = [
            spawn_source(self.page.clone(), self.source_timeout),
            spawn_source(self.feed.clone(), self.source_timeout),
            spawn_source(self.calendar.clone(), self.source_timeout),
            spawn_source(self.series.clone(), self.source_timeout),
        ];

        let mut outcomes = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            outcomes.push(join_before(deadline, kind, handle).await);
        }

        let collected_at = (self.clock)();
        let snapshot = Snapshot::assemble(collected_at, outcomes);
        gauge!("pipeline_last_run_ts").set(collected_at.timestamp().max(0) as f64);
        info!(
            target: "ingest",
            failed = snapshot.failed_count(),
            collected_at = %collected_at,
            "snapshot frozen"
        );
        snapshot
    }
}

fn spawn_source<R>(
    client: Arc<dyn SourceClient<Raw = R>>,
    timeout: Duration,
) -> (SourceKind, JoinHandle<SourceOutcome>)
where
    R: Normalize + Send + 'static,
{
    let kind = client.kind();
    let handle = tokio::spawn(async move {
        let t0 = Instant::now();
        let outcome = match tokio::time::timeout(timeout, client.fetch()).await {
            Ok(Ok(raw)) => SourceOutcome::succeeded(raw.normalize()),
            Ok(Err(e)) => SourceOutcome::failed(kind, e),
            Err(_) => SourceOutcome::failed(
                kind,
                SourceError::timeout(format!("no response within {}s", timeout.as_secs_f32())),
            ),
        };
        record(&outcome, Some(t0.elapsed().as_secs_f64() * 1_000.0));
        outcome
    });
    (kind, handle)
}

async fn join_before(
    deadline: tokio::time::Instant,
    kind: SourceKind,
    mut handle: JoinHandle<SourceOutcome>,
) -> SourceOutcome {
    let joined = tokio::time::timeout_at(deadline, &mut handle).await;
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => {
            warn!(target: "ingest", source = kind.as_str(), error = %join_err, "source task died");
            let err = SourceError::transport(format!("source task died: {join_err}"));
            let outcome = SourceOutcome::failed(kind, err);
            record(&outcome, None);
            outcome
        }
        Err(_) => {
            handle.abort();
            warn!(
                target: "ingest",
                source = kind.as_str(),
                "source cancelled at collection deadline"
            );
            let err = SourceError::timeout("collection deadline elapsed");
            let outcome = SourceOutcome::failed(kind, err);
            record(&outcome, None);
            outcome
        }
    }
}

fn record(outcome: &SourceOutcome, elapsed_ms: Option<f64>) {
    let source = outcome.source_name();
    let status = outcome.error_kind().map_or("ok", |k| k.as_str());
    counter!("source_fetch_total", "source" => source, "status" => status).increment(1);
    if let Some(ms) = elapsed_ms {
        histogram!("source_fetch_ms", "source" => source).record(ms);
    }
    match (outcome.payload(), outcome.error()) {
        (Some(p), _) => {
            counter!("source_items_total", "source" => source).increment(p.item_count() as u64);
            info!(
                target: "ingest",
                source,
                status,
                items = p.item_count(),
                elapsed_ms = ?elapsed_ms,
                "source done"
            );
        }
        (None, Some(e)) => {
            warn!(
                target: "ingest",
                source,
                status,
                error = %e.message,
                elapsed_ms = ?elapsed_ms,
                "source degraded"
            );
        }
        (None, None) => {}
    }
}
