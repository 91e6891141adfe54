// src/ingest/providers/feed.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::config::sources::NewsFeedCfg;
use crate::ingest::http::{HttpFetch, HttpRequest};
use crate::ingest::types::{Normalize, SourceClient, SourceError, SourceKind};
use crate::ingest::{collapse_whitespace, scrub_html_entities_for_xml, strip_html};
use crate::snapshot::{NewsItem, Published, SourcePayload};

const FEED_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const MISSING_TITLE: &str = "Kein Titel";
const MISSING_LINK: &str = "#";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

/// Atom text construct. Only the direct text is kept; `type="xhtml"` bodies
/// carry child elements, which are skipped.
#[derive(Debug, Default, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// One feed entry before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFeed {
    pub source: String,
    pub entries: Vec<RawFeedEntry>,
}

impl Normalize for RawFeed {
    fn normalize(self) -> SourcePayload {
        let source = self.source;
        let items = self
            .entries
            .into_iter()
            .map(|e| NewsItem {
                title: e
                    .title
                    .map(|t| strip_html(&t))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| MISSING_TITLE.to_string())
                    .to_uppercase(),
                description: e.description.as_deref().map(strip_html).unwrap_or_default(),
                published_at: e.published.map_or(Published::Unknown, Published::At),
                link: e
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| MISSING_LINK.to_string()),
                source: source.clone(),
            })
            .collect();
        SourcePayload::News(items)
    }
}

fn to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0)
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822).ok().and_then(to_utc)
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339).ok().and_then(to_utc)
}

/// Name of the document element, skipping prolog, comments and whitespace.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Ok(Event::Text(t)) if !t.iter().all(u8::is_ascii_whitespace) => return None,
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse an RSS 2.0 or Atom document into raw entries.
pub fn parse_feed(source: &str, xml: &str) -> Result<RawFeed, SourceError> {
    let xml = scrub_html_entities_for_xml(xml);
    let root = root_element(&xml).ok_or_else(|| SourceError::parse("body is not an XML feed"))?;

    let entries = match root.as_str() {
        "rss" => {
            let rss: Rss = from_str(&xml).map_err(|e| SourceError::parse(format!("rss: {e}")))?;
            rss.channel
                .item
                .into_iter()
                .map(|it| RawFeedEntry {
                    title: it.title,
                    description: it.description,
                    published: it.pub_date.as_deref().and_then(parse_rfc2822),
                    link: it.link,
                })
                .collect()
        }
        "feed" => {
            let atom: AtomFeed =
                from_str(&xml).map_err(|e| SourceError::parse(format!("atom: {e}")))?;
            atom.entry
                .into_iter()
                .map(|en| {
                    let link = en
                        .link
                        .iter()
                        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                        .or_else(|| en.link.first())
                        .and_then(|l| l.href.clone());
                    RawFeedEntry {
                        title: en.title.and_then(|t| t.text),
                        description: en
                            .summary
                            .and_then(|t| t.text)
                            .or_else(|| en.content.and_then(|t| t.text)),
                        published: en
                            .published
                            .as_deref()
                            .or(en.updated.as_deref())
                            .and_then(parse_rfc3339),
                        link,
                    }
                })
                .collect()
        }
        other => {
            return Err(SourceError::parse(format!(
                "unsupported feed root <{}>",
                collapse_whitespace(other)
            )))
        }
    };

    Ok(RawFeed {
        source: source.to_string(),
        entries,
    })
}

pub struct FeedClient {
    url: String,
    label: String,
    http: Arc<dyn HttpFetch>,
}

impl FeedClient {
    pub fn new(cfg: &NewsFeedCfg, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            url: cfg.url.clone(),
            label: cfg.label.clone(),
            http,
        }
    }
}

#[async_trait]
impl SourceClient for FeedClient {
    type Raw = RawFeed;

    async fn fetch(&self) -> Result<RawFeed, SourceError> {
        let req = HttpRequest::get(&self.url).header("User-Agent", FEED_USER_AGENT);
        let resp = self.http.get(req).await?;
        if !resp.is_success() {
            return Err(SourceError::transport(format!("feed answered status {}", resp.status)));
        }
        parse_feed(&self.label, &resp.body)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::NewsFeed
    }
}
