// src/ingest/providers/page_quote.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::sources::PageQuoteCfg;
use crate::ingest::http::{HttpFetch, HttpRequest, BROWSER_USER_AGENT};
use crate::ingest::types::{Clock, Normalize, SourceClient, SourceError, SourceKind};
use crate::ingest::{collapse_whitespace, strip_html};
use crate::snapshot::{PageQuote, Price, Quote, SourcePayload};

/// Which heading texts count as news rather than page furniture.
///
/// The length rule is a heuristic and has not been validated against real
/// pages; it is kept tunable via `page_quote.headline_min_chars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlinePolicy {
    /// A headline must be strictly longer than this many characters.
    pub min_chars: usize,
}

impl Default for HeadlinePolicy {
    fn default() -> Self {
        Self { min_chars: 20 }
    }
}

impl HeadlinePolicy {
    pub fn accepts(&self, text: &str) -> bool {
        text.chars().count() > self.min_chars
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub price: Option<String>,
    pub headlines: Vec<String>,
}

/// Structural extraction from a quote page. Selector drift stays behind this trait.
pub trait RawPageParser: Send + Sync {
    fn parse(&self, html: &str) -> ParsedPage;
}

/// Reads `<fin-streamer data-field=".." data-symbol="..">` for the price and
/// `<h3>` elements for headline candidates.
pub struct FinStreamerParser {
    symbol: String,
    field: String,
    policy: HeadlinePolicy,
}

impl FinStreamerParser {
    pub fn new(
        symbol: impl Into<String>,
        field: impl Into<String>,
        policy: HeadlinePolicy,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            field: field.into(),
            policy,
        }
    }
}

fn re_streamer() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<fin-streamer\b([^>]*)>(.*?)</fin-streamer>").unwrap())
}

fn re_attr() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
    })
}

fn re_h3() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>").unwrap())
}

fn attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    re_attr().captures_iter(attrs).find_map(|c| {
        let key = c.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        c.get(2).or_else(|| c.get(3)).map(|m| m.as_str())
    })
}

impl RawPageParser for FinStreamerParser {
    fn parse(&self, html: &str) -> ParsedPage {
        let price = re_streamer().captures_iter(html).find_map(|c| {
            let attrs = c.get(1)?.as_str();
            let hit = attr(attrs, "data-field") == Some(self.field.as_str())
                && attr(attrs, "data-symbol") == Some(self.symbol.as_str());
            hit.then(|| strip_html(c.get(2).map(|m| m.as_str()).unwrap_or_default()))
        });

        let headlines = re_h3()
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| collapse_whitespace(&strip_html(m.as_str())))
            .filter(|t| self.policy.accepts(t))
            .collect();

        ParsedPage { price, headlines }
    }
}

/// Raw page result: parser output plus fetch context.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub instrument: String,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub parsed: ParsedPage,
}

impl Normalize for RawPage {
    fn normalize(self) -> SourcePayload {
        let price = match self.parsed.price {
            Some(p) if !p.is_empty() => Price::Quoted(p),
            _ => Price::NotFound,
        };
        SourcePayload::PageQuote(PageQuote {
            quote: Quote {
                instrument: self.instrument,
                price,
                observed_at: self.fetched_at,
                source: self.source,
            },
            headlines: self.parsed.headlines,
        })
    }
}

pub struct PageQuoteClient {
    url: String,
    symbol: String,
    label: String,
    http: Arc<dyn HttpFetch>,
    parser: Box<dyn RawPageParser>,
    clock: Clock,
}

impl PageQuoteClient {
    pub fn new(cfg: &PageQuoteCfg, http: Arc<dyn HttpFetch>, clock: Clock) -> Self {
        let policy = HeadlinePolicy {
            min_chars: cfg.headline_min_chars,
        };
        Self {
            url: cfg.url.clone(),
            symbol: cfg.symbol.clone(),
            label: cfg.label.clone(),
            http,
            parser: Box::new(FinStreamerParser::new(&cfg.symbol, &cfg.price_field, policy)),
            clock,
        }
    }

    /// Swap the page parser (e.g. after the site changes its markup).
    pub fn with_parser(mut self, parser: Box<dyn RawPageParser>) -> Self {
        self.parser = parser;
        self
    }
}

#[async_trait]
impl SourceClient for PageQuoteClient {
    type Raw = RawPage;

    async fn fetch(&self) -> Result<RawPage, SourceError> {
        let req = HttpRequest::get(&self.url).header("User-Agent", BROWSER_USER_AGENT);
        let resp = self.http.get(req).await?;
        if resp.status != 200 {
            tracing::warn!(
                target: "ingest",
                source = "page_quote",
                status = resp.status,
                "quote page refused request"
            );
            return Err(SourceError::blocked(resp.status));
        }
        let fetched_at = (self.clock)();
        Ok(RawPage {
            instrument: self.symbol.clone(),
            source: self.label.clone(),
            fetched_at,
            parsed: self.parser.parse(&resp.body),
        })
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PageQuote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <fin-streamer data-symbol="SI=F" data-field="regularMarketPrice">31.20</fin-streamer>
          <fin-streamer class="livePrice" data-field='regularMarketPrice' data-symbol='GC=F' active>
            <span>4,012.30</span>
          </fin-streamer>
          <h3>News</h3>
          <h3 class="clamp"><a href="/x">Gold climbs as dollar slips after <b>Fed</b> remarks</a></h3>
          <h3>Exactly twenty chars</h3>
        </body></html>"#;

    fn parser() -> FinStreamerParser {
        FinStreamerParser::new("GC=F", "regularMarketPrice", HeadlinePolicy::default())
    }

    #[test]
    fn picks_price_for_configured_symbol_only() {
        let parsed = parser().parse(PAGE);
        assert_eq!(parsed.price.as_deref(), Some("4,012.30"));
    }

    #[test]
    fn headlines_need_more_than_twenty_chars() {
        let parsed = parser().parse(PAGE);
        assert_eq!(
            parsed.headlines,
            vec!["Gold climbs as dollar slips after Fed remarks".to_string()]
        );
    }

    #[test]
    fn headline_threshold_is_tunable() {
        let loose =
            FinStreamerParser::new("GC=F", "regularMarketPrice", HeadlinePolicy { min_chars: 3 });
        assert_eq!(loose.parse(PAGE).headlines.len(), 3);
    }

    #[test]
    fn missing_price_normalizes_to_sentinel() {
        let raw = RawPage {
            instrument: "GC=F".into(),
            source: "Yahoo Finance".into(),
            fetched_at: Utc::now(),
            parsed: parser().parse("<html><h3>short</h3></html>"),
        };
        match raw.normalize() {
            SourcePayload::PageQuote(p) => {
                assert_eq!(p.quote.price, Price::NotFound);
                assert!(p.headlines.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
