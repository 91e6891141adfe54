// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

/// One-time metrics registration (so series carry descriptions once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_fetch_total",
            "Source fetches by source and final status."
        );
        describe_counter!(
            "source_items_total",
            "Canonical records produced per source."
        );
        describe_histogram!("source_fetch_ms", "Fetch + normalize time in milliseconds.");
        describe_counter!(
            "reasoning_calls_total",
            "Reasoning gateway calls by status."
        );
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last froze a snapshot."
        );
    });
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<!--.*?-->|</?[a-z!][^>]*>").unwrap())
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Collapse runs of whitespace (including NBSP) to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    let s = s.replace('\u{00A0}', " ");
    re_ws().replace_all(&s, " ").trim().to_string()
}

/// HTML fragment to plain text: tags become spaces, entities are decoded,
/// whitespace is collapsed.
pub fn strip_html(s: &str) -> String {
    let no_tags = re_tags().replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    collapse_whitespace(&decoded)
}

fn re_named_entity() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{1,31});").unwrap())
}

const XML_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// Rewrite HTML named entities (`&uuml;`, `&euro;`, ...) as numeric character
/// references so the XML deserializer accepts the body. Names HTML does not
/// know are escaped to literal text.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    re_named_entity()
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if XML_ENTITIES.contains(&name) {
                return caps[0].to_string();
            }
            let decoded = html_escape::decode_html_entities(&caps[0]);
            if decoded == caps[0] {
                return format!("&amp;{name};");
            }
            decoded.chars().map(|c| format!("&#x{:X};", c as u32)).collect()
        })
        .into_owned()
}
