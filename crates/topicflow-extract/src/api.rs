//! API-based completion client for OpenAI-compatible and Anthropic endpoints.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::CompletionError;

/// Configuration for the API completion client.
#[derive(Debug, Clone)]
pub struct ApiCompletionConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini", "claude-3-haiku-20240307")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Per-request HTTP timeout
    pub timeout: Duration,

    /// Maximum attempts when rate limited
    pub max_retries: u32,
}

impl ApiCompletionConfig {
    /// Create config for OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Create config for Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    fn is_anthropic(&self) -> bool {
        self.base_url.contains("anthropic")
    }
}

/// Completion client over HTTP.
pub struct ApiCompletionClient {
    client: Client,
    config: ApiCompletionConfig,
}

impl ApiCompletionClient {
    /// Create a new API client.
    pub fn new(config: ApiCompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Call the API, retrying rate-limited requests with exponential backoff.
    ///
    /// The caller's batch timeout bounds the total time spent here.
    async fn call_api(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Calling completion API");

            let result = if self.config.is_anthropic() {
                self.make_anthropic_request(request).await
            } else {
                self.make_openai_request(request).await
            };

            match result {
                Err(CompletionError::RateLimitExceeded) => {
                    if attempts >= self.config.max_retries {
                        error!("Rate limited, max retries exceeded");
                        return Err(CompletionError::RateLimitExceeded);
                    }
                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(retry_in_ms = duration.as_millis(), "Rate limited, retrying");
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!("Backoff exhausted");
                            return Err(CompletionError::RateLimitExceeded);
                        }
                    }
                }
                other => return other,
            }
        }
    }

    /// Make OpenAI-compatible API request.
    async fn make_openai_request(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            temperature: f32,
            max_tokens: u32,
            response_format: OpenAIResponseFormat,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct OpenAIResponseFormat {
            #[serde(rename = "type")]
            format_type: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        let body = OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: OpenAIResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::ApiError(e.to_string()))?;

        if response.status() == 429 {
            return Err(CompletionError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::ParseError(e.to_string()))?;

        response_body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| CompletionError::ParseError("No choices in response".to_string()))
    }

    /// Make Anthropic API request.
    async fn make_anthropic_request(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            temperature: f32,
            system: String,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let body = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::ApiError(e.to_string()))?;

        if response.status() == 429 {
            return Err(CompletionError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::ParseError(e.to_string()))?;

        response_body
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| CompletionError::ParseError("No content in response".to_string()))
    }
}

#[async_trait]
impl CompletionClient for ApiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.call_api(request).await
    }

    fn name(&self) -> &str {
        "api"
    }
}
