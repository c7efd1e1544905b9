//! Extractor configuration.

use serde::{Deserialize, Serialize};
use topicflow_types::{ExtractionSettings, Settings, SimilarityConfig};

/// Everything the extractor needs, gathered from the layered settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub extraction: ExtractionSettings,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1500
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionSettings::default(),
            similarity: SimilarityConfig::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            extraction: settings.extraction.clone(),
            similarity: settings.similarity.clone(),
            temperature: settings.completion.temperature,
            max_tokens: settings.completion.max_tokens,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.extraction.validate()?;
        self.similarity.validate()
    }
}
