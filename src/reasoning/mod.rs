//! Reasoning gateway: the boundary to the external model that turns an
//! `AnalysisRequest` into narrative text.

pub mod gemini;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::ai::{test_mode_is_mock, ReasoningConfig};
use crate::payload::AnalysisRequest;

pub use crate::config::ai::ENV_TEST_MODE;
pub use gemini::GeminiGateway;

/// Model output, passed through verbatim. Never parsed or branched on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Narrative(String);

impl Narrative {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning is disabled in config")]
    Disabled,
    #[error("no reply within {0}s")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider reply: {0}")]
    Decode(String),
    #[error("provider returned no text")]
    EmptyResponse,
}

pub type GatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Narrative, ReasoningError>> + Send + 'a>>;

pub trait ReasoningGateway: Send + Sync {
    fn analyze<'a>(&'a self, request: &'a AnalysisRequest) -> GatewayFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynGateway = Arc<dyn ReasoningGateway>;

/// Always fails with `Disabled`; used when `reasoning.enabled = false`.
pub struct DisabledGateway;

impl ReasoningGateway for DisabledGateway {
    fn analyze<'a>(&'a self, _request: &'a AnalysisRequest) -> GatewayFuture<'a> {
        Box::pin(async { Err(ReasoningError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic gateway for tests and offline runs.
pub struct MockGateway {
    reply: Result<Narrative, ReasoningError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGateway {
    pub fn ok(text: &str) -> Self {
        Self {
            reply: Ok(Narrative::new(text)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: ReasoningError) -> Self {
        Self {
            reply: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReasoningGateway for MockGateway {
    fn analyze<'a>(&'a self, _request: &'a AnalysisRequest) -> GatewayFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.reply.clone()
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build a gateway according to config and environment.
///
/// * `REASONING_TEST_MODE=mock` returns a mock gateway.
/// * `enabled == false` returns a disabled gateway.
/// * otherwise the configured provider.
pub fn build_gateway_from_config(cfg: &ReasoningConfig) -> anyhow::Result<DynGateway> {
    if test_mode_is_mock() {
        return Ok(Arc::new(MockGateway::ok("Neutral outlook (mock)")));
    }

    if !cfg.enabled {
        return Ok(Arc::new(DisabledGateway));
    }

    match cfg.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGateway::new(cfg)?)),
        "mock" => Ok(Arc::new(MockGateway::ok("Neutral outlook (mock)"))),
        other => anyhow::bail!("Unsupported reasoning provider: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_is_passed_through_verbatim() {
        let text = "## Outlook\n* 1 day: up\n";
        let n = Narrative::new(text);
        assert_eq!(n.as_str(), text);
        assert_eq!(serde_json::to_string(&n).unwrap(), serde_json::to_string(text).unwrap());
    }

    #[serial_test::serial]
    #[test]
    fn disabled_config_builds_disabled_gateway() {
        std::env::remove_var(ENV_TEST_MODE);
        let cfg = ReasoningConfig {
            enabled: false,
            ..ReasoningConfig::default()
        };
        let gw = build_gateway_from_config(&cfg).unwrap();
        assert_eq!(gw.provider_name(), "disabled");
    }
}
