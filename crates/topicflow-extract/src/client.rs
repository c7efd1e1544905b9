//! Text-completion collaborator trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use topicflow_types::CompletionSettings;
use tracing::info;

use crate::api::{ApiCompletionClient, ApiCompletionConfig};
use crate::error::CompletionError;
use crate::mock::MockCompletionClient;

/// One completion call: a system prompt plus a user prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Pluggable text-completion collaborator.
///
/// Implementations may be slow or fail; callers bound every call with a
/// timeout.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the raw completion text for a request.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Collaborator that refuses every call.
///
/// Used when no provider is configured; every batch then reports a remote
/// failure instead of silently producing nothing.
#[derive(Debug, Default, Clone)]
pub struct NoOpCompletionClient;

#[async_trait]
impl CompletionClient for NoOpCompletionClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Build the configured collaborator.
///
/// Providers: `openai`, `anthropic`, `mock` (offline heuristic), `none`.
/// API keys fall back to `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`.
pub fn build_client(settings: &CompletionSettings) -> Result<Arc<dyn CompletionClient>, CompletionError> {
    let provider = settings.provider.trim().to_ascii_lowercase();
    info!(provider = %provider, model = %settings.model, "Building completion client");

    match provider.as_str() {
        "openai" | "anthropic" => {
            let env_var = if provider == "anthropic" {
                "ANTHROPIC_API_KEY"
            } else {
                "OPENAI_API_KEY"
            };
            let api_key = settings
                .api_key
                .clone()
                .or_else(|| std::env::var(env_var).ok())
                .ok_or_else(|| {
                    CompletionError::ConfigError(format!(
                        "no API key for provider {} (set completion.api_key or {})",
                        provider, env_var
                    ))
                })?;

            let mut config = if provider == "anthropic" {
                ApiCompletionConfig::claude(api_key, settings.model.clone())
            } else {
                ApiCompletionConfig::openai(api_key, settings.model.clone())
            };
            if let Some(base_url) = &settings.api_base_url {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
            Ok(Arc::new(ApiCompletionClient::new(config)?))
        }
        "mock" => Ok(Arc::new(MockCompletionClient::heuristic())),
        "none" | "" => Ok(Arc::new(NoOpCompletionClient)),
        other => Err(CompletionError::ConfigError(format!(
            "unknown completion provider: {}",
            other
        ))),
    }
}
