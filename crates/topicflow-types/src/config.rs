//! Configuration loading for topicflow.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! Config file lives at ~/.config/topicflow/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TopicFlowError;
use crate::similarity::SimilarityConfig;

const APP_NAME: &str = "topicflow";

/// Environment variable prefix (`TOPICFLOW_DB_PATH`, `TOPICFLOW_FLOW__BATCH_SIZE`, ...)
pub const ENV_PREFIX: &str = "TOPICFLOW";

/// Text-completion collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Provider name ("openai", "anthropic", "mock", "none")
    #[serde(default = "default_completion_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini", "claude-3-haiku")
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// API key (usually supplied through the environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_completion_provider() -> String {
    "openai".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1500
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            model: default_completion_model(),
            api_key: None,
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl CompletionSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("temperature must be 0.0-2.0, got {}", self.temperature));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }
        Ok(())
    }
}

/// Topic extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Per-batch completion timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Triples below this confidence are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum triples kept per batch (highest confidence first)
    #[serde(default = "default_max_triples_per_batch")]
    pub max_triples_per_batch: usize,

    /// Keyword cap applied when merging similar triples in a batch
    #[serde(default = "default_merged_keyword_cap")]
    pub merged_keyword_cap: usize,

    /// Generic terms that may not make up a whole label
    #[serde(default = "default_banned_terms")]
    pub banned_terms: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_confidence() -> f64 {
    0.7
}

fn default_max_triples_per_batch() -> usize {
    15
}

fn default_merged_keyword_cap() -> usize {
    10
}

/// Default generic meta-topic terms.
pub fn default_banned_terms() -> Vec<String> {
    [
        "discussion",
        "analysis",
        "learning",
        "study",
        "knowledge",
        "information",
        "data",
        "details",
        "general",
        "various",
        "other",
        "miscellaneous",
        "stuff",
        "things",
        "items",
        "conversation",
        "topic",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            min_confidence: default_min_confidence(),
            max_triples_per_batch: default_max_triples_per_batch(),
            merged_keyword_cap: default_merged_keyword_cap(),
            banned_terms: default_banned_terms(),
        }
    }
}

impl ExtractionSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be 0.0-1.0, got {}",
                self.min_confidence
            ));
        }
        if self.max_triples_per_batch == 0 {
            return Err("max_triples_per_batch must be > 0".to_string());
        }
        Ok(())
    }
}

/// How the cursor advances past batches that failed extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPolicy {
    /// Advance to the highest fetched id; failed batches are not retried
    #[default]
    SkipFailed,
    /// Stop the run at the first failed batch and hold the cursor before it;
    /// the failed and later batches are fetched again by the next run
    HoldAtFailure,
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSettings {
    /// Messages per extraction batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of batches (current included) whose topics co-occur
    #[serde(default = "default_co_occurrence_window")]
    pub co_occurrence_window: usize,

    #[serde(default)]
    pub cursor_policy: CursorPolicy,
}

fn default_batch_size() -> usize {
    10
}

fn default_co_occurrence_window() -> usize {
    1
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            co_occurrence_window: default_co_occurrence_window(),
            cursor_policy: CursorPolicy::default(),
        }
    }
}

impl FlowSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.co_occurrence_window == 0 {
            return Err("co_occurrence_window must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Topic store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Keyword cap per stored record
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

fn default_max_keywords() -> usize {
    15
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_keywords: default_max_keywords(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub completion: CompletionSettings,

    #[serde(default)]
    pub extraction: ExtractionSettings,

    #[serde(default)]
    pub flow: FlowSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub similarity: SimilarityConfig,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8085
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            completion: CompletionSettings::default(),
            extraction: ExtractionSettings::default(),
            flow: FlowSettings::default(),
            store: StoreSettings::default(),
            similarity: SimilarityConfig::default(),
        }
    }
}

/// Build the layered configuration source:
/// 1. Built-in defaults (serde defaults on the target type)
/// 2. Config file (~/.config/topicflow/config.toml)
/// 3. CLI-specified config file (optional)
/// 4. Environment variables (TOPICFLOW_*, nested sections split on `__`)
///
/// CLI flags should be applied by the caller after this returns.
pub fn load_layered<T: DeserializeOwned>(cli_config_path: Option<&str>) -> Result<T, TopicFlowError> {
    let config_dir = ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let default_config_path = config_dir.join("config");

    let mut builder = Config::builder()
        .set_default("db_path", default_db_path())
        .map_err(|e| TopicFlowError::Config(e.to_string()))?
        .set_default("http_host", default_http_host())
        .map_err(|e| TopicFlowError::Config(e.to_string()))?
        .set_default("http_port", default_http_port() as i64)
        .map_err(|e| TopicFlowError::Config(e.to_string()))?
        .set_default("log_level", default_log_level())
        .map_err(|e| TopicFlowError::Config(e.to_string()))?
        .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

    if let Some(path) = cli_config_path {
        builder = builder.add_source(File::with_name(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TopicFlowError::Config(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| TopicFlowError::Config(e.to_string()))
}

impl Settings {
    /// Load settings with layered precedence (see [`load_layered`]) and
    /// validate every section.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TopicFlowError> {
        let settings: Settings = load_layered(cli_config_path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), TopicFlowError> {
        self.completion
            .validate()
            .and_then(|_| self.extraction.validate())
            .and_then(|_| self.flow.validate())
            .and_then(|_| self.similarity.validate())
            .map_err(TopicFlowError::Config)?;
        if self.store.max_keywords == 0 {
            return Err(TopicFlowError::Config("store.max_keywords must be > 0".to_string()));
        }
        Ok(())
    }

    /// Socket address for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}
