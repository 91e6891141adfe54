// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// `REASONING_TEST_MODE=mock` swaps in the mock gateway; no key is needed then.
pub const ENV_TEST_MODE: &str = "REASONING_TEST_MODE";

pub fn test_mode_is_mock() -> bool {
    env::var(ENV_TEST_MODE).map(|v| v == "mock").unwrap_or(false)
}

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "gemini" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from GEMINI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Fixed model name; when absent the gateway discovers one.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            api_key: default_api_key(),
            model: None,
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

// Keep the key out of debug output.
impl std::fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("key_len", &self.api_key.len())
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Normalize provider, resolve an "ENV" key, sanitize the timeout.
    pub fn resolve(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.trim().to_lowercase();

        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            self.model = None;
        }

        if !self.enabled || test_mode_is_mock() {
            return Ok(());
        }

        match self.provider.as_str() {
            "gemini" => {
                if self.api_key.trim().eq_ignore_ascii_case("env") {
                    self.api_key = env::var(ENV_GEMINI_API_KEY).map_err(|_| {
                        anyhow::anyhow!("Missing {ENV_GEMINI_API_KEY} env var")
                    })?;
                }
                if self.api_key.trim().is_empty() {
                    anyhow::bail!("Empty API key for provider gemini");
                }
            }
            "mock" => {}
            other => anyhow::bail!("Unsupported reasoning provider in config: {other}"),
        }
        Ok(())
    }
}
