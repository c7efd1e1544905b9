//! Quality filter for parsed triples.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use topicflow_types::similarity::words;
use topicflow_types::TopicTriple;

/// Counts of dropped triples by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub kept: usize,
    pub empty_level: usize,
    pub invalid_confidence: usize,
    pub low_confidence: usize,
    pub generic_label: usize,
}

/// Drops empty levels, bad or low confidence, and generic labels.
#[derive(Debug, Clone)]
pub struct TripleFilter {
    min_confidence: f64,
    banned: HashSet<String>,
}

impl TripleFilter {
    pub fn new(min_confidence: f64, banned_terms: &[String]) -> Self {
        Self {
            min_confidence,
            banned: banned_terms.iter().map(|t| t.trim().to_lowercase()).collect(),
        }
    }

    /// A label is generic when every word in it is a banned term.
    pub fn is_generic(&self, label: &str) -> bool {
        let label_words = words(label);
        !label_words.is_empty() && label_words.iter().all(|w| self.banned.contains(w))
    }

    /// Filter triples, trimming labels of the survivors.
    pub fn apply(&self, triples: Vec<TopicTriple>) -> (Vec<TopicTriple>, FilterReport) {
        let mut report = FilterReport::default();
        let mut kept = Vec::with_capacity(triples.len());

        for mut triple in triples {
            triple.topic_label = triple.topic_label.trim().to_string();
            triple.subtopic_label = triple.subtopic_label.trim().to_string();
            triple.subsubtopic_label = triple.subsubtopic_label.trim().to_string();

            let labels = [
                &triple.topic_label,
                &triple.subtopic_label,
                &triple.subsubtopic_label,
            ];

            if labels.iter().any(|l| l.is_empty()) {
                report.empty_level += 1;
                continue;
            }
            if !triple.confidence.is_finite() || !(0.0..=1.0).contains(&triple.confidence) {
                report.invalid_confidence += 1;
                continue;
            }
            if triple.confidence < self.min_confidence {
                report.low_confidence += 1;
                continue;
            }
            if labels.iter().any(|l| self.is_generic(l)) {
                report.generic_label += 1;
                continue;
            }
            kept.push(triple);
        }

        report.kept = kept.len();
        (kept, report)
    }
}
