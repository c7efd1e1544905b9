//! Topic color assignment.
//!
//! Colors are a pure function of the ordered topic list, the previous color
//! map and the configuration. Callers keep the returned [`ColorMap`] and
//! feed it back on the next render so colors stay stable across updates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use topicflow_types::{GraphProjection, NodeLevel, TopicSignature};
use tracing::debug;

use crate::config::ColorConfig;

/// Tolerance on the reuse threshold so that scores landing exactly on it
/// still reuse despite floating-point rounding.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// A topic that already owns a color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoredTopic {
    pub id: String,
    pub signature: TopicSignature,
    pub color: String,
}

/// Topic id -> color, in coloring order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    entries: Vec<ColoredTopic>,
    /// Palette allocations made so far (drives cycling)
    allocations: usize,
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.color.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn entries(&self) -> &[ColoredTopic] {
        &self.entries
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A topic asking for a color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRequest {
    pub id: String,
    /// Temporal order among topics (0 = oldest)
    pub position: usize,
    pub signature: TopicSignature,
}

/// Topic-level nodes of a graph as color requests, positioned by first
/// appearance (ties broken by id).
pub fn topic_requests(graph: &GraphProjection) -> Vec<ColorRequest> {
    let mut topics: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.level == NodeLevel::Topic)
        .collect();
    topics.sort_by(|a, b| {
        a.first_seen_message_id
            .cmp(&b.first_seen_message_id)
            .then_with(|| a.id.cmp(&b.id))
    });
    topics
        .into_iter()
        .enumerate()
        .map(|(position, node)| ColorRequest {
            id: node.id.clone(),
            position,
            signature: TopicSignature::new(node.label.clone(), node.keywords.iter().cloned()),
        })
        .collect()
}

fn allocate(map: &mut ColorMap, config: &ColorConfig) -> String {
    let used: HashSet<&str> = map.entries.iter().map(|e| e.color.as_str()).collect();
    let color = config
        .palette
        .iter()
        .find(|c| !used.contains(c.as_str()))
        .or_else(|| config.palette.get(map.allocations % config.palette.len().max(1)))
        .cloned()
        .unwrap_or_else(|| config.fallback_color.clone());
    map.allocations += 1;
    color
}

/// Assign colors to `new_topics` on top of `existing`.
///
/// Topics are handled in position order. A topic that already has a color
/// keeps it. Otherwise it inherits the color of the most similar colored
/// topic (earliest wins ties) when that similarity reaches the reuse
/// threshold, and draws the next palette color when it does not.
pub fn assign_colors(new_topics: &[ColorRequest], existing: &ColorMap, config: &ColorConfig) -> ColorMap {
    let mut map = existing.clone();
    let mut ordered: Vec<&ColorRequest> = new_topics.iter().collect();
    ordered.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

    for request in ordered {
        if map.contains(&request.id) {
            continue;
        }

        let mut best: Option<(f64, &ColoredTopic)> = None;
        for colored in &map.entries {
            let score = config.similarity.similarity(&request.signature, &colored.signature);
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, colored));
            }
        }

        let color = match best {
            Some((score, colored)) if score >= config.reuse_threshold - THRESHOLD_EPSILON => {
                debug!(topic = %request.id, like = %colored.id, score, "Reusing color");
                colored.color.clone()
            }
            _ => allocate(&mut map, config),
        };

        map.entries.push(ColoredTopic {
            id: request.id.clone(),
            signature: request.signature.clone(),
            color,
        });
    }

    map
}
