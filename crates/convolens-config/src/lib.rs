//! # Convolens Config
//!
//! Unified single-file configuration. One `convolens.yaml` configures the
//! server, the chat-completion backend, both LLM scenarios and the taxonomy
//! source. Every field has a default so a missing file section degrades to
//! a runnable development setup.

mod loader;

pub use loader::{load_config, ConfigError};

use serde::Deserialize;

/// Top-level configuration schema.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvolensConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for ConvolensConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            classification: ClassificationConfig::default(),
            summary: SummaryConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_env(),
        }
    }
}

fn default_app_name() -> String {
    "convolens".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8008
}

/// Chat-completion backend (OpenAI-compatible).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Inline key; takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when no inline key is set.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Full chat-completions endpoint derived from the API base.
    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Inline key, or the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Classification scenario settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    /// Total attempts per level before the deterministic fallback.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_classification_max_tokens")]
    pub max_tokens: u32,
    /// Level-2 category names that require a third classification level.
    #[serde(default = "default_level3_parents")]
    pub level3_parents: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_attempts: default_max_attempts(),
            max_tokens: default_classification_max_tokens(),
            level3_parents: default_level3_parents(),
        }
    }
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_classification_max_tokens() -> u32 {
    128
}

fn default_level3_parents() -> Vec<String> {
    vec![
        "飞享会员".to_string(),
        "提额卡".to_string(),
        "新提额卡".to_string(),
    ]
}

/// Summary scenario settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_summary_temperature")]
    pub temperature: f32,
    #[serde(default = "default_summary_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_summary_temperature(),
            max_tokens: default_summary_max_tokens(),
        }
    }
}

fn default_summary_temperature() -> f32 {
    0.3
}

fn default_summary_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

fn default_csv_path() -> String {
    "data/categories.csv".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
