//! Application configuration for PaperAtlas.
//!
//! User config lives at `~/.paperatlas/paperatlas.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PaperAtlasError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "paperatlas.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".paperatlas";

// ---------------------------------------------------------------------------
// Config structs (matching paperatlas.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Enrichment engine settings.
    #[serde(default)]
    pub enrichment: EnrichmentSettings,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    /// Worker pool size for paper enrichment.
    #[serde(default = "default_paper_workers")]
    pub paper_workers: usize,

    /// Worker pool size for author enrichment. Smaller by default: author
    /// lookups hit web search and are more rate-limit-sensitive.
    #[serde(default = "default_author_workers")]
    pub author_workers: usize,

    /// Per-item attempt budget.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay before the first retry, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-call timeout for paper annotation, in seconds.
    #[serde(default = "default_paper_timeout_secs")]
    pub paper_timeout_secs: u64,

    /// Per-call timeout for author annotation, in seconds.
    #[serde(default = "default_author_timeout_secs")]
    pub author_timeout_secs: u64,

    /// Papers scoring at or above this are "highly relevant"; an author
    /// qualifies as key with at least one such paper.
    #[serde(default = "default_highly_relevant_threshold")]
    pub highly_relevant_threshold: f64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            paper_workers: default_paper_workers(),
            author_workers: default_author_workers(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            paper_timeout_secs: default_paper_timeout_secs(),
            author_timeout_secs: default_author_timeout_secs(),
            highly_relevant_threshold: default_highly_relevant_threshold(),
        }
    }
}

fn default_paper_workers() -> usize {
    30
}
fn default_author_workers() -> usize {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_paper_timeout_secs() -> u64 {
    300
}
fn default_author_timeout_secs() -> u64 {
    30
}
fn default_highly_relevant_threshold() -> f64 {
    85.0
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model for paper enrichment (long-context, PDF-heavy prompts).
    #[serde(default = "default_paper_model")]
    pub paper_model: String,

    /// Model for author enrichment (web-search lookups).
    #[serde(default = "default_author_model")]
    pub author_model: String,

    /// `HTTP-Referer` header value sent with requests.
    #[serde(default = "default_http_referer")]
    pub http_referer: String,

    /// `X-Title` header value sent with requests.
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            paper_model: default_paper_model(),
            author_model: default_author_model(),
            http_referer: default_http_referer(),
            app_title: default_app_title(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_paper_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_author_model() -> String {
    "openai/gpt-5-mini".into()
}
fn default_http_referer() -> String {
    "https://github.com/paperatlas/paperatlas".into()
}
fn default_app_title() -> String {
    "PaperAtlas".into()
}

// ---------------------------------------------------------------------------
// Engine config (runtime, per pipeline)
// ---------------------------------------------------------------------------

/// Runtime engine configuration — one slice of the app config per pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed worker pool size.
    pub workers: usize,
    /// Per-item attempt budget.
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    pub backoff_base_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl EngineConfig {
    /// Engine settings for the paper pipeline.
    pub fn for_papers(config: &AppConfig) -> Self {
        Self {
            workers: config.enrichment.paper_workers.max(1),
            max_attempts: config.enrichment.max_attempts.max(1),
            backoff_base_ms: config.enrichment.backoff_base_ms,
            backoff_multiplier: config.enrichment.backoff_multiplier,
        }
    }

    /// Engine settings for the author pipeline.
    pub fn for_authors(config: &AppConfig) -> Self {
        Self {
            workers: config.enrichment.author_workers.max(1),
            max_attempts: config.enrichment.max_attempts.max(1),
            backoff_base_ms: config.enrichment.backoff_base_ms,
            backoff_multiplier: config.enrichment.backoff_multiplier,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.paperatlas/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PaperAtlasError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.paperatlas/paperatlas.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PaperAtlasError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PaperAtlasError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PaperAtlasError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PaperAtlasError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PaperAtlasError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(PaperAtlasError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
