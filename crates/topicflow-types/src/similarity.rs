//! Topic similarity metrics.
//!
//! Shared by in-batch deduplication (extractor) and color reuse
//! (visualizer). Every metric is symmetric, bounded to [0, 1] and returns
//! 1.0 for identical signatures.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What a similarity metric compares: a label plus keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicSignature {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TopicSignature {
    pub fn new<S: Into<String>>(label: impl Into<String>, keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    fn label_words(&self) -> BTreeSet<String> {
        words(&self.label)
    }

    fn keyword_set(&self) -> BTreeSet<String> {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Available similarity metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Weighted Jaccard over label words and keywords
    #[default]
    Overlap,
    /// Normalized edit distance over lower-cased labels
    Levenshtein,
}

/// Similarity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default)]
    pub metric: SimilarityMetric,

    /// Weight of the label-word component (overlap metric)
    #[serde(default = "default_label_weight")]
    pub label_weight: f64,

    /// Weight of the keyword component (overlap metric)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Triples at or above this similarity are merged within a batch
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,
}

fn default_label_weight() -> f64 {
    0.6
}

fn default_keyword_weight() -> f64 {
    0.4
}

fn default_merge_threshold() -> f64 {
    0.7
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::default(),
            label_weight: default_label_weight(),
            keyword_weight: default_keyword_weight(),
            merge_threshold: default_merge_threshold(),
        }
    }
}

impl SimilarityConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.label_weight < 0.0 || self.keyword_weight < 0.0 {
            return Err("similarity weights must be >= 0".to_string());
        }
        if self.label_weight + self.keyword_weight <= 0.0 {
            return Err("similarity weights must not both be zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(format!(
                "merge_threshold must be 0.0-1.0, got {}",
                self.merge_threshold
            ));
        }
        Ok(())
    }

    /// Score two signatures with the configured metric.
    pub fn similarity(&self, a: &TopicSignature, b: &TopicSignature) -> f64 {
        similarity(a, b, self)
    }
}

/// Split text into lower-cased alphanumeric words.
pub fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard index of two sets. Two empty sets score 1.0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Similarity of two signatures in [0, 1].
pub fn similarity(a: &TopicSignature, b: &TopicSignature, config: &SimilarityConfig) -> f64 {
    let score = match config.metric {
        SimilarityMetric::Overlap => overlap(a, b, config),
        SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(
            &a.label.trim().to_lowercase(),
            &b.label.trim().to_lowercase(),
        ),
    };
    score.clamp(0.0, 1.0)
}

fn overlap(a: &TopicSignature, b: &TopicSignature, config: &SimilarityConfig) -> f64 {
    let (words_a, words_b) = (a.label_words(), b.label_words());
    let (kw_a, kw_b) = (a.keyword_set(), b.keyword_set());

    if words_a == words_b && kw_a == kw_b {
        return 1.0;
    }

    let labels_empty = words_a.is_empty() && words_b.is_empty();
    let keywords_empty = kw_a.is_empty() && kw_b.is_empty();

    match (labels_empty, keywords_empty) {
        (true, _) => jaccard(&kw_a, &kw_b),
        (_, true) => jaccard(&words_a, &words_b),
        _ => {
            let total = config.label_weight + config.keyword_weight;
            if total <= 0.0 {
                return 0.0;
            }
            (config.label_weight * jaccard(&words_a, &words_b)
                + config.keyword_weight * jaccard(&kw_a, &kw_b))
                / total
        }
    }
}
