// src/config/mod.rs
//! Pipeline configuration: one TOML file, every section optional.

pub mod ai;
pub mod sources;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use self::ai::ReasoningConfig;
use self::sources::{CalendarCfg, CollectionCfg, NewsFeedCfg, PageQuoteCfg, SeriesCfg};

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_DEADLINE_SECS: &str = "PIPELINE_DEADLINE_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub collection: CollectionCfg,
    #[serde(default)]
    pub page_quote: PageQuoteCfg,
    #[serde(default)]
    pub news_feed: NewsFeedCfg,
    #[serde(default)]
    pub calendar: CalendarCfg,
    #[serde(default)]
    pub series: SeriesCfg,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

// positive integer seconds from env; anything else is ignored
fn parse_secs_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config toml")?;
        cfg.finish()
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks:
    /// 1) $PIPELINE_CONFIG_PATH (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Self::default().finish()
    }

    fn finish(mut self) -> Result<Self> {
        let defaults = CollectionCfg::default();
        if self.collection.source_timeout_secs == 0 {
            self.collection.source_timeout_secs = defaults.source_timeout_secs;
        }
        if let Some(secs) = parse_secs_env(std::env::var(ENV_DEADLINE_SECS).ok()) {
            self.collection.deadline_secs = secs;
        }
        if self.collection.deadline_secs == 0 {
            self.collection.deadline_secs = defaults.deadline_secs;
        }
        self.reasoning.resolve()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_env_accepts_only_positive_integers() {
        assert_eq!(parse_secs_env(Some(" 12 ".into())), Some(12));
        assert_eq!(parse_secs_env(Some("0".into())), None);
        assert_eq!(parse_secs_env(Some("abc".into())), None);
        assert_eq!(parse_secs_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes_zeros() {
        std::env::remove_var(ENV_DEADLINE_SECS);
        let cfg = PipelineConfig::from_toml_str(
            r#"
[collection]
deadline_secs = 0
source_timeout_secs = 4

[page_quote]
headline_min_chars = 30

[reasoning]
provider = "mock"
"#,
        )
        .unwrap();
        assert_eq!(cfg.collection.deadline_secs, 15);
        assert_eq!(cfg.collection.source_timeout_secs, 4);
        assert_eq!(cfg.page_quote.headline_min_chars, 30);
        assert_eq!(cfg.page_quote.symbol, "GC=F");
        assert_eq!(cfg.series.vix_symbol, "^VIX");
        assert_eq!(cfg.calendar.countries.len(), 7);
    }
}
