use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Upstream scraping provider settings. The candidate request shapes are
/// fixed in code; endpoints, credentials, and bounds live here.
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Submission endpoint (`POST`).
    pub endpoint: String,
    /// Ordered status-endpoint URL templates; `{token}` is substituted.
    pub status_endpoints: Vec<String>,
    /// Name of the environment variable holding the provider API key.
    #[serde(default = "default_scraper_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_submit_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_rounds")]
    pub poll_rounds: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_scraper_key_env() -> String {
    "SCRAPER_API_KEY".to_string()
}
fn default_submit_timeout() -> u64 {
    60
}
fn default_poll_rounds() -> u32 {
    20
}
fn default_poll_interval() -> u64 {
    3
}
fn default_max_pages() -> u32 {
    5
}
fn default_max_depth() -> u32 {
    2
}

/// Direct-fetch fallback settings.
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_timeout")]
    pub timeout_secs: u64,
    /// Extracted text is truncated to this many characters.
    #[serde(default = "default_fallback_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fallback_timeout(),
            max_chars: default_fallback_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fallback_timeout() -> u64 {
    30
}
fn default_fallback_max_chars() -> usize {
    8000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

/// Remote inference settings for the summarizer's first tier.
#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    /// Inference endpoint (`POST`). May contain a `{model}` placeholder.
    pub endpoint: String,
    /// Ordered list of candidate model identifiers.
    pub models: Vec<String>,
    #[serde(default = "default_inference_key_env")]
    pub api_key_env: String,
    /// Input text is truncated to this many characters before prompting.
    #[serde(default = "default_prompt_budget")]
    pub prompt_budget_chars: usize,
    /// Minimum generated length for a reply to count as useful.
    #[serde(default = "default_min_summary_chars")]
    pub min_chars: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

fn default_inference_key_env() -> String {
    "INFERENCE_API_KEY".to_string()
}
fn default_prompt_budget() -> usize {
    12000
}
fn default_min_summary_chars() -> usize {
    100
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_inference_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./summaries")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate scraper
    if config.scraper.endpoint.is_empty() {
        anyhow::bail!("scraper.endpoint must not be empty");
    }
    if config.scraper.status_endpoints.is_empty() {
        anyhow::bail!("scraper.status_endpoints must list at least one URL template");
    }
    if config.scraper.poll_rounds < 1 {
        anyhow::bail!("scraper.poll_rounds must be >= 1");
    }
    if config.scraper.max_pages == 0 {
        anyhow::bail!("scraper.max_pages must be > 0");
    }

    // Validate fallback
    if config.fallback.max_chars == 0 {
        anyhow::bail!("fallback.max_chars must be > 0");
    }

    // Validate summarizer
    if config.summarizer.models.is_empty() {
        anyhow::bail!("summarizer.models must list at least one model identifier");
    }
    if config.summarizer.prompt_budget_chars == 0 {
        anyhow::bail!("summarizer.prompt_budget_chars must be > 0");
    }
    if !(0.0..=2.0).contains(&config.summarizer.temperature) {
        anyhow::bail!("summarizer.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("distill.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    const MINIMAL: &str = r#"
[db]
path = "./data/distill.sqlite"

[server]
bind = "127.0.0.1:8000"

[scraper]
endpoint = "https://provider.example/api/v1/search/live"
status_endpoints = ["https://provider.example/api/v1/search/{token}"]

[summarizer]
endpoint = "https://inference.example/v1/chat/completions"
models = ["gpt-4o-mini"]
"#;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.scraper.timeout_secs, 60);
        assert_eq!(cfg.scraper.poll_rounds, 20);
        assert_eq!(cfg.scraper.poll_interval_secs, 3);
        assert_eq!(cfg.scraper.max_pages, 5);
        assert_eq!(cfg.scraper.max_depth, 2);
        assert_eq!(cfg.fallback.timeout_secs, 30);
        assert_eq!(cfg.fallback.max_chars, 8000);
        assert_eq!(cfg.summarizer.prompt_budget_chars, 12000);
        assert_eq!(cfg.summarizer.min_chars, 100);
        assert_eq!(cfg.summarizer.max_tokens, 1500);
        assert_eq!(cfg.artifacts.dir, PathBuf::from("./summaries"));
    }

    #[test]
    fn test_empty_status_endpoints_rejected() {
        let bad = MINIMAL.replace(
            r#"status_endpoints = ["https://provider.example/api/v1/search/{token}"]"#,
            "status_endpoints = []",
        );
        let (_tmp, path) = write_config(&bad);
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("status_endpoints"));
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let bad = MINIMAL.replace(r#"models = ["gpt-4o-mini"]"#, "models = []");
        let (_tmp, path) = write_config(&bad);
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("models"));
    }
}
