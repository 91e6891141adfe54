// src/reasoning/gemini.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{GatewayFuture, Narrative, ReasoningError, ReasoningGateway};
use crate::config::ai::ReasoningConfig;
use crate::payload::AnalysisRequest;

/// Used when the model listing works but offers no matching model.
pub const FALLBACK_MODEL: &str = "gemini-2.0-flash";
/// Used when the model listing itself fails.
pub const LISTING_FAILED_MODEL: &str = "gemini-1.5-flash";

const MAX_ERROR_BODY: usize = 300;

/// One API request. A body means POST with a JSON payload, otherwise GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Wire access for the gateway; authentication lives here.
#[async_trait]
pub trait GeminiTransport: Send + Sync {
    async fn send(&self, call: ApiCall) -> Result<ApiReply, ReasoningError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    api_key: String,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new(cfg: &ReasoningConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gold-intel/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.timeout())
            .build()
            .context("building gemini http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            timeout_secs: cfg.timeout_secs,
        })
    }

    fn map_err(&self, e: reqwest::Error) -> ReasoningError {
        if e.is_timeout() {
            ReasoningError::Timeout(self.timeout_secs)
        } else {
            ReasoningError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl GeminiTransport for ReqwestTransport {
    async fn send(&self, call: ApiCall) -> Result<ApiReply, ReasoningError> {
        let builder = match call.body {
            Some(body) => self
                .http
                .post(&call.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
            None => self.http.get(&call.url),
        };
        let resp = builder
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| self.map_err(e))?;
        Ok(ApiReply { status, body })
    }
}

/// Google Gemini `generateContent` gateway.
pub struct GeminiGateway {
    transport: Arc<dyn GeminiTransport>,
    base_url: String,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

#[derive(Serialize)]
struct GenerateReq<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// First model whose name mentions both `gemini-3` and `flash`, without the
/// `models/` prefix.
pub fn pick_model(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|n| {
            let lower = n.to_lowercase();
            lower.contains("gemini-3") && lower.contains("flash")
        })
        .map(|n| n.trim_start_matches("models/").to_string())
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(body: &str) -> Result<Narrative, ReasoningError> {
    let resp: GenerateResp =
        serde_json::from_str(body).map_err(|e| ReasoningError::Decode(e.to_string()))?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ReasoningError::EmptyResponse);
    }
    Ok(Narrative::new(text))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl GeminiGateway {
    pub fn new(cfg: &ReasoningConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(cfg)?;
        Ok(Self::with_transport(cfg, Arc::new(transport)))
    }

    pub fn with_transport(cfg: &ReasoningConfig, transport: Arc<dyn GeminiTransport>) -> Self {
        Self {
            transport,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        }
    }

    async fn call(&self, call: ApiCall) -> Result<String, ReasoningError> {
        let reply = self.transport.send(call).await?;
        if !reply.is_success() {
            return Err(ReasoningError::Status {
                status: reply.status,
                body: truncate(&reply.body, MAX_ERROR_BODY),
            });
        }
        Ok(reply.body)
    }

    async fn list_models(&self) -> Result<Vec<String>, ReasoningError> {
        let body = self
            .call(ApiCall {
                url: format!("{}/models", self.base_url),
                body: None,
            })
            .await?;
        let list: ModelList =
            serde_json::from_str(&body).map_err(|e| ReasoningError::Decode(e.to_string()))?;
        Ok(list.models.into_iter().map(|m| m.name).collect())
    }

    async fn resolve_model(&self) -> String {
        if let Some(m) = &self.model {
            return m.clone();
        }
        match self.list_models().await {
            Ok(names) => pick_model(&names).unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            Err(e) => {
                warn!(target: "reasoning", error = %e, "model listing failed; using fallback");
                LISTING_FAILED_MODEL.to_string()
            }
        }
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<Narrative, ReasoningError> {
        let req = GenerateReq {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        let payload = serde_json::to_string(&req)
            .map_err(|e| ReasoningError::Transport(format!("encoding request: {e}")))?;
        let body = self
            .call(ApiCall {
                url: format!("{}/models/{}:generateContent", self.base_url, model),
                body: Some(payload),
            })
            .await?;
        extract_text(&body)
    }
}

impl ReasoningGateway for GeminiGateway {
    fn analyze<'a>(&'a self, request: &'a AnalysisRequest) -> GatewayFuture<'a> {
        Box::pin(async move {
            let model = self.resolve_model().await;
            let prompt = request.prompt();
            info!(target: "reasoning", %model, prompt_len = prompt.len(), "calling gemini");
            self.generate(&model, &prompt).await
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
