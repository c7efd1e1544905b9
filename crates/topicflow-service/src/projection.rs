//! Graph projection of stored topic records.
//!
//! Records become three node levels joined by synthesized hierarchy edges;
//! stored co-occurrence counts become co-occurrence edges, one per
//! unordered pair. The projection is recomputed on every read.

use std::collections::{BTreeSet, HashMap};

use topicflow_types::{
    merge_keywords, normalize_label, round2, Edge, EdgeKind, GraphProjection, GraphStats, Node,
    NodeLevel, TopicRecord,
};

/// Size multiplier applied to `frequency * confidence`.
pub const SIZE_SCALE: f64 = 10.0;

/// Extra size for topic-level nodes.
pub const TOPIC_SIZE_BONUS: f64 = 20.0;

/// Extra size for subtopic-level nodes.
pub const SUBTOPIC_SIZE_BONUS: f64 = 10.0;

/// Keyword cap on aggregated topic and subtopic nodes.
const AGGREGATE_KEYWORD_CAP: usize = 15;

fn node_size(frequency: u64, confidence: f64, level: NodeLevel) -> f64 {
    let base = frequency as f64 * confidence * SIZE_SCALE;
    match level {
        NodeLevel::Topic => base + TOPIC_SIZE_BONUS,
        NodeLevel::Subtopic => base + SUBTOPIC_SIZE_BONUS,
        NodeLevel::Subsubtopic => base,
    }
}

/// Fold a record into an aggregate topic or subtopic node.
fn absorb(node: &mut Node, record: &TopicRecord) {
    node.frequency = node.frequency.saturating_add(record.frequency);
    node.mentions = node.mentions.saturating_add(record.mentions);
    node.confidence = node.confidence.max(record.confidence);
    node.first_seen_message_id = node.first_seen_message_id.min(record.first_seen_message_id);
    node.last_seen_message_id = node.last_seen_message_id.max(record.last_seen_message_id);
    merge_keywords(&mut node.keywords, &record.keywords, AGGREGATE_KEYWORD_CAP);
}

fn seed_node(id: String, label: &str, level: NodeLevel, record: &TopicRecord) -> Node {
    let mut keywords = Vec::new();
    let cap = match level {
        NodeLevel::Subsubtopic => usize::MAX,
        _ => AGGREGATE_KEYWORD_CAP,
    };
    merge_keywords(&mut keywords, &record.keywords, cap);
    Node {
        id,
        label: label.to_string(),
        level,
        size: 0.0,
        frequency: record.frequency,
        mentions: record.mentions,
        confidence: record.confidence,
        keywords,
        first_seen_message_id: record.first_seen_message_id,
        last_seen_message_id: record.last_seen_message_id,
    }
}

/// Project records (in store order) into nodes and links.
///
/// Node order follows first appearance; links list hierarchy edges first,
/// then co-occurrence edges.
pub fn project(records: &[TopicRecord]) -> GraphProjection {
    let mut nodes: Vec<Node> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut hierarchy: Vec<(String, String)> = Vec::new();
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();

    for record in records {
        let topic_id = record.topic_node_id();
        let subtopic_id = record.subtopic_node_id();

        match index.get(&topic_id) {
            Some(&i) => absorb(&mut nodes[i], record),
            None => {
                index.insert(topic_id.clone(), nodes.len());
                nodes.push(seed_node(topic_id.clone(), &record.topic_label, NodeLevel::Topic, record));
            }
        }
        match index.get(&subtopic_id) {
            Some(&i) => absorb(&mut nodes[i], record),
            None => {
                index.insert(subtopic_id.clone(), nodes.len());
                nodes.push(seed_node(
                    subtopic_id.clone(),
                    &record.subtopic_label,
                    NodeLevel::Subtopic,
                    record,
                ));
            }
        }
        if !index.contains_key(&record.topic_id) {
            index.insert(record.topic_id.clone(), nodes.len());
            nodes.push(seed_node(
                record.topic_id.clone(),
                &record.subsubtopic_label,
                NodeLevel::Subsubtopic,
                record,
            ));
        }

        for pair in [
            (topic_id.clone(), subtopic_id.clone()),
            (subtopic_id, record.topic_id.clone()),
        ] {
            if seen_pairs.insert(pair.clone()) {
                hierarchy.push(pair);
            }
        }
    }

    for node in &mut nodes {
        node.size = node_size(node.frequency, node.confidence, node.level);
    }

    let mut links: Vec<Edge> = hierarchy
        .into_iter()
        .map(|(source, target)| {
            let weight = index
                .get(&target)
                .map(|&i| nodes[i].frequency as f64)
                .unwrap_or(1.0);
            Edge {
                source,
                target,
                kind: EdgeKind::Hierarchy,
                weight,
            }
        })
        .collect();

    for record in records {
        for (other, count) in &record.co_occurrence {
            if record.topic_id < *other && index.contains_key(other) {
                links.push(Edge {
                    source: record.topic_id.clone(),
                    target: other.clone(),
                    kind: EdgeKind::Cooccurrence,
                    weight: f64::from(*count),
                });
            }
        }
    }

    GraphProjection { nodes, links }
}

/// Aggregate statistics over one owner's records.
///
/// Unique counts are over normalized labels per level.
pub fn compute_stats(records: &[TopicRecord]) -> GraphStats {
    if records.is_empty() {
        return GraphStats::default();
    }

    let topics: BTreeSet<String> = records.iter().map(|r| normalize_label(&r.topic_label)).collect();
    let subtopics: BTreeSet<String> = records
        .iter()
        .map(|r| normalize_label(&r.subtopic_label))
        .collect();
    let subsubtopics: BTreeSet<String> = records
        .iter()
        .map(|r| normalize_label(&r.subsubtopic_label))
        .collect();

    let count = records.len() as f64;
    let total_frequency: f64 = records.iter().map(|r| r.frequency as f64).sum();
    let total_confidence: f64 = records.iter().map(|r| r.confidence).sum();

    GraphStats {
        total_triples: records.len(),
        unique_topics: topics.len(),
        unique_subtopics: subtopics.len(),
        unique_subsubtopics: subsubtopics.len(),
        avg_frequency: round2(total_frequency / count),
        avg_confidence: round2(total_confidence / count),
    }
}
