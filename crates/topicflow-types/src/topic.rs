//! Topic triples and persisted topic records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::owner::OwnerId;

/// A unique, deterministic identifier for a topic record.
pub type TopicId = String;

/// Separator between the owner and label segments of a topic id.
pub const TOPIC_ID_SEPARATOR: &str = "::";

/// Normalize a label for use inside ids: lower-case, trimmed, whitespace
/// runs collapsed to `-`.
///
/// `%` and `:` are percent-encoded so a normalized label never contains the
/// id separator, which keeps ids injective over label triples.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for (i, word) in label.split_whitespace().enumerate() {
        if i > 0 {
            out.push('-');
        }
        for c in word.chars().flat_map(char::to_lowercase) {
            match c {
                '%' => out.push_str("%25"),
                ':' => out.push_str("%3A"),
                c => out.push(c),
            }
        }
    }
    out
}

/// Derive the topic id for an owner and a label triple.
///
/// Format: `{owner}::{topic}::{subtopic}::{subsubtopic}`.
pub fn topic_id(owner: &OwnerId, topic: &str, subtopic: &str, subsubtopic: &str) -> TopicId {
    format!(
        "{owner}{sep}{t}{sep}{st}{sep}{sst}",
        owner = owner,
        sep = TOPIC_ID_SEPARATOR,
        t = normalize_label(topic),
        st = normalize_label(subtopic),
        sst = normalize_label(subsubtopic),
    )
}

/// Extract the owner segment of a topic id.
///
/// Owner ids and normalized labels never contain `:`, so the first segment
/// is always the owner.
pub fn owner_of_topic_id(topic_id: &str) -> Option<&str> {
    topic_id.split(TOPIC_ID_SEPARATOR).next().filter(|s| !s.is_empty())
}

/// Append keywords to `into`, keeping insertion order, dropping
/// case-insensitive duplicates and blanks, and stopping at `cap`.
pub fn merge_keywords<'a, I>(into: &mut Vec<String>, incoming: I, cap: usize)
where
    I: IntoIterator<Item = &'a String>,
{
    for keyword in incoming {
        if into.len() >= cap {
            break;
        }
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            continue;
        }
        if into.iter().any(|k| k.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        into.push(trimmed.to_string());
    }
}

/// A (topic, subtopic, subsubtopic) label combination with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTriple {
    /// Main domain (e.g. "Trust Calibration System")
    pub topic_label: String,
    /// Functional subdivision (e.g. "Uncertainty Metrics")
    pub subtopic_label: String,
    /// Concrete detail (e.g. "entropy calculation")
    pub subsubtopic_label: String,
    /// Relevance score in [0, 1]
    pub confidence: f64,
    /// Representative keywords
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TopicTriple {
    /// Create a new triple.
    pub fn new(
        topic_label: impl Into<String>,
        subtopic_label: impl Into<String>,
        subsubtopic_label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            topic_label: topic_label.into(),
            subtopic_label: subtopic_label.into(),
            subsubtopic_label: subsubtopic_label.into(),
            confidence,
            keywords: Vec::new(),
        }
    }

    /// Builder-style keyword setter.
    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The three labels joined with spaces, used for similarity scoring.
    pub fn joined_labels(&self) -> String {
        format!(
            "{} {} {}",
            self.topic_label, self.subtopic_label, self.subsubtopic_label
        )
    }

    /// Topic id of this triple under the given owner.
    pub fn topic_id(&self, owner: &OwnerId) -> TopicId {
        topic_id(
            owner,
            &self.topic_label,
            &self.subtopic_label,
            &self.subsubtopic_label,
        )
    }
}

/// A triple that survived extraction, stamped with the message range of the
/// batch it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTopic {
    /// The extracted labels
    pub triple: TopicTriple,
    /// First message id of the source batch
    pub first_message_id: u64,
    /// Last message id of the source batch
    pub last_message_id: u64,
    /// Number of raw triples merged into this one during deduplication
    pub mentions: u32,
}

fn default_mentions() -> u64 {
    1
}

/// One re-observation of a topic, ready to be applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicObservation {
    /// The observed labels
    pub triple: TopicTriple,
    /// First message id of the observation window
    pub first_message_id: u64,
    /// Last message id of the observation window
    pub last_message_id: u64,
    /// Topic ids observed alongside this one
    pub co_occurring: Vec<TopicId>,
    /// Raw triples this observation stands for (>= 1)
    pub mentions: u32,
}

impl TopicObservation {
    /// Build an observation from an extracted topic.
    pub fn from_extracted(extracted: &ExtractedTopic, co_occurring: Vec<TopicId>) -> Self {
        Self {
            triple: extracted.triple.clone(),
            first_message_id: extracted.first_message_id,
            last_message_id: extracted.last_message_id,
            co_occurring,
            mentions: extracted.mentions.max(1),
        }
    }

    /// Fold another observation of the same topic id from the same window
    /// into this one. The result still counts as a single observation:
    /// ranges widen, keywords and co-occurring ids are unioned, the higher
    /// confidence wins and mentions add up.
    pub fn absorb(&mut self, other: &TopicObservation) {
        self.first_message_id = self.first_message_id.min(other.first_message_id);
        self.last_message_id = self.last_message_id.max(other.last_message_id);
        if other.triple.confidence > self.triple.confidence {
            self.triple.confidence = other.triple.confidence;
        }
        merge_keywords(&mut self.triple.keywords, &other.triple.keywords, usize::MAX);
        for id in &other.co_occurring {
            if !self.co_occurring.contains(id) {
                self.co_occurring.push(id.clone());
            }
        }
        self.mentions = self.mentions.saturating_add(other.mentions);
    }
}

/// Collapse observations that resolve to the same topic id under `owner`,
/// keeping first-appearance order.
pub fn collapse_observations(
    owner: &OwnerId,
    observations: &[TopicObservation],
) -> Vec<(TopicId, TopicObservation)> {
    let mut collapsed: Vec<(TopicId, TopicObservation)> = Vec::with_capacity(observations.len());
    for observation in observations {
        let topic_id = observation.triple.topic_id(owner);
        match collapsed.iter_mut().find(|(id, _)| *id == topic_id) {
            Some((_, existing)) => existing.absorb(observation),
            None => collapsed.push((topic_id, observation.clone())),
        }
    }
    collapsed
}

/// A persisted, owner-scoped topic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Deterministic id derived from owner + labels
    pub topic_id: TopicId,
    /// Owning tenant
    pub owner_id: OwnerId,
    /// Main domain label
    pub topic_label: String,
    /// Subdivision label
    pub subtopic_label: String,
    /// Concrete detail label
    pub subsubtopic_label: String,
    /// First message where the triple appeared
    pub first_seen_message_id: u64,
    /// Most recent message where the triple appeared
    pub last_seen_message_id: u64,
    /// Number of observations (>= 1), at most one per extraction batch
    pub frequency: u64,
    /// Raw extracted triples folded into those observations (>= frequency)
    #[serde(default = "default_mentions")]
    pub mentions: u64,
    /// Relevance of the latest observation, in [0, 1]
    pub confidence: f64,
    /// Insertion-ordered, deduplicated keywords
    pub keywords: Vec<String>,
    /// Co-occurring topic id -> number of shared observation windows
    #[serde(default)]
    pub co_occurrence: BTreeMap<TopicId, u32>,
    /// First insertion
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl TopicRecord {
    /// Create a record from its first observation.
    pub fn first_observed(
        owner: &OwnerId,
        observation: &TopicObservation,
        max_keywords: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let triple = &observation.triple;
        let topic_id = triple.topic_id(owner);
        let mut keywords = Vec::new();
        merge_keywords(&mut keywords, &triple.keywords, max_keywords);

        let mut record = Self {
            topic_id,
            owner_id: owner.clone(),
            topic_label: triple.topic_label.trim().to_string(),
            subtopic_label: triple.subtopic_label.trim().to_string(),
            subsubtopic_label: triple.subsubtopic_label.trim().to_string(),
            first_seen_message_id: observation.first_message_id,
            last_seen_message_id: observation.last_message_id,
            frequency: 1,
            mentions: u64::from(observation.mentions.max(1)),
            confidence: triple.confidence.clamp(0.0, 1.0),
            keywords,
            co_occurrence: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        record.add_co_occurrences(&observation.co_occurring);
        record
    }

    /// Apply a re-observation: frequency++, range extension, keyword and
    /// co-occurrence merge.
    pub fn observe(&mut self, observation: &TopicObservation, max_keywords: usize, now: DateTime<Utc>) {
        self.frequency = self.frequency.saturating_add(1);
        self.mentions = self.mentions.saturating_add(u64::from(observation.mentions.max(1)));
        self.first_seen_message_id = self.first_seen_message_id.min(observation.first_message_id);
        self.last_seen_message_id = self.last_seen_message_id.max(observation.last_message_id);
        self.confidence = observation.triple.confidence.clamp(0.0, 1.0);
        merge_keywords(&mut self.keywords, &observation.triple.keywords, max_keywords);
        self.add_co_occurrences(&observation.co_occurring);
        self.updated_at = now;
    }

    /// Count one more shared window with `other` without re-observing this
    /// record. Self-links are ignored.
    pub fn link_with(&mut self, other: &str, now: DateTime<Utc>) {
        if other == self.topic_id {
            return;
        }
        let count = self.co_occurrence.entry(other.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.updated_at = now;
    }

    fn add_co_occurrences(&mut self, ids: &[TopicId]) {
        let distinct: BTreeSet<&TopicId> = ids.iter().collect();
        for id in distinct {
            if *id == self.topic_id {
                continue;
            }
            let count = self.co_occurrence.entry(id.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    /// Normalized node id of this record's topic level.
    pub fn topic_node_id(&self) -> String {
        normalize_label(&self.topic_label)
    }

    /// Normalized node id of this record's subtopic level.
    pub fn subtopic_node_id(&self) -> String {
        format!(
            "{}{}{}",
            self.topic_node_id(),
            TOPIC_ID_SEPARATOR,
            normalize_label(&self.subtopic_label)
        )
    }
}
