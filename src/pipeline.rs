//! One pipeline run: collect → assemble → analyze.

use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::config::PipelineConfig;
use crate::payload::{self, AnalysisRequest};
use crate::reasoning::{build_gateway_from_config, DynGateway, Narrative, ReasoningError};
use crate::snapshot::Snapshot;

/// What a caller gets back. The snapshot is always present; the narrative
/// may have failed on its own.
#[derive(Debug)]
pub struct PipelineRun {
    pub request: AnalysisRequest,
    pub narrative: Result<Narrative, ReasoningError>,
}

impl PipelineRun {
    pub fn snapshot(&self) -> &Snapshot {
        &self.request.snapshot
    }
}

pub struct Pipeline {
    aggregator: Aggregator,
    gateway: DynGateway,
    reasoning_timeout: Duration,
}

impl Pipeline {
    pub fn new(aggregator: Aggregator, gateway: DynGateway, reasoning_timeout: Duration) -> Self {
        Self {
            aggregator,
            gateway,
            reasoning_timeout,
        }
    }

    /// Build the production pipeline. Errors here are construction errors
    /// (unbuildable HTTP client, unusable gateway config).
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let aggregator = Aggregator::from_config(cfg).context("building source clients")?;
        let gateway =
            build_gateway_from_config(&cfg.reasoning).context("building reasoning gateway")?;
        Ok(Self::new(aggregator, gateway, cfg.reasoning.timeout()))
    }

    pub async fn run(&self) -> PipelineRun {
        let snapshot = self.aggregator.collect().await;
        let request = payload::assemble(snapshot);
        let fingerprint = request.fingerprint();

        let narrative = match tokio::time::timeout(
            self.reasoning_timeout,
            self.gateway.analyze(&request),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(ReasoningError::Timeout(self.reasoning_timeout.as_secs())),
        };

        let provider = self.gateway.provider_name();
        match &narrative {
            Ok(n) => {
                counter!("reasoning_calls_total", "status" => "ok").increment(1);
                info!(
                    target: "pipeline",
                    %fingerprint,
                    provider,
                    narrative_len = n.as_str().len(),
                    "analysis done"
                );
            }
            Err(e) => {
                counter!("reasoning_calls_total", "status" => "error").increment(1);
                warn!(
                    target: "pipeline",
                    %fingerprint,
                    provider,
                    error = %e,
                    "analysis failed; snapshot kept"
                );
            }
        }

        PipelineRun { request, narrative }
    }

    /// Blocking variant for callers without a runtime.
    pub fn run_blocking(&self) -> Result<PipelineRun> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        Ok(rt.block_on(self.run()))
    }
}

/// Load config the default way, build the pipeline, run it once.
pub fn run_pipeline() -> Result<PipelineRun> {
    let cfg = PipelineConfig::load_default()?;
    Pipeline::from_config(&cfg)?.run_blocking()
}
