// src/ingest/http.rs
//! Transport seam for source clients. Production uses `ReqwestFetch`; tests
//! route URLs to canned bodies through `FixtureFetch`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::ingest::types::SourceError;

pub const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/120.0.0.0 Safari/537.36"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, SourceError>;
}

/// reqwest-backed transport. One instance per source client.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gold-intel/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, SourceError> {
        let mut rb = self.client.get(&req.url);
        if !req.query.is_empty() {
            rb = rb.query(&req.query);
        }
        for (k, v) in &req.headers {
            rb = rb.header(k.as_str(), v.as_str());
        }

        let resp = rb.send().await.map_err(|e| classify(&e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| classify(&e))?;
        Ok(HttpResponse { status, body })
    }
}

fn classify(e: &reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::timeout(e.to_string())
    } else if e.is_decode() {
        SourceError::parse(e.to_string())
    } else {
        SourceError::transport(e.to_string())
    }
}

/// Canned transport: the first route whose prefix matches the request URL answers.
pub struct FixtureFetch {
    routes: Vec<Route>,
    pub calls: Mutex<Vec<HttpRequest>>,
}

struct Route {
    prefix: String,
    delay: Option<Duration>,
    reply: Result<HttpResponse, SourceError>,
}

impl Default for FixtureFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureFetch {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(self, prefix: &str, resp: HttpResponse) -> Self {
        self.push(prefix, None, Ok(resp))
    }

    pub fn route_err(self, prefix: &str, err: SourceError) -> Self {
        self.push(prefix, None, Err(err))
    }

    /// Answer only after `delay` (tokio time, so paused-clock tests stay fast).
    pub fn route_delayed(self, prefix: &str, delay: Duration, resp: HttpResponse) -> Self {
        self.push(prefix, Some(delay), Ok(resp))
    }

    fn push(
        mut self,
        prefix: &str,
        delay: Option<Duration>,
        reply: Result<HttpResponse, SourceError>,
    ) -> Self {
        self.routes.push(Route {
            prefix: prefix.to_string(),
            delay,
            reply,
        });
        self
    }

    pub fn recorded(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl HttpFetch for FixtureFetch {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, SourceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());
        let Some(route) = self.routes.iter().find(|r| req.url.starts_with(&r.prefix)) else {
            return Err(SourceError::transport(format!("no fixture for {}", req.url)));
        };
        if let Some(d) = route.delay {
            tokio::time::sleep(d).await;
        }
        route.reply.clone()
    }
}
