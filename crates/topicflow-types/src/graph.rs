//! Graph projection types.
//!
//! The projection is derived from stored topic records on demand and is
//! never persisted. Field names follow the JSON shape served over HTTP
//! (`{nodes, links, stats}`).

use serde::{Deserialize, Serialize};

/// Hierarchy level of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLevel {
    Topic,
    Subtopic,
    Subsubtopic,
}

impl NodeLevel {
    /// Depth below the topic level (topic = 0).
    pub fn depth(&self) -> usize {
        match self {
            NodeLevel::Topic => 0,
            NodeLevel::Subtopic => 1,
            NodeLevel::Subsubtopic => 2,
        }
    }
}

impl std::fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeLevel::Topic => write!(f, "topic"),
            NodeLevel::Subtopic => write!(f, "subtopic"),
            NodeLevel::Subsubtopic => write!(f, "subsubtopic"),
        }
    }
}

/// A node of the projected topic graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub level: NodeLevel,
    /// Display size hint derived from frequency and confidence
    pub size: f64,
    pub frequency: u64,
    /// Raw extracted triples behind this node (>= frequency)
    #[serde(default)]
    pub mentions: u64,
    pub confidence: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub first_seen_message_id: u64,
    pub last_seen_message_id: u64,
}

/// Kind of graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Structural parent -> child link
    Hierarchy,
    /// Symmetric link between topics observed in the same window
    Cooccurrence,
}

/// An edge of the projected topic graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub weight: f64,
}

/// Nodes and links of a projected graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    pub nodes: Vec<Node>,
    pub links: Vec<Edge>,
}

impl GraphProjection {
    /// True when the projection holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Aggregate statistics over one owner's records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_triples: usize,
    pub unique_topics: usize,
    pub unique_subtopics: usize,
    pub unique_subsubtopics: usize,
    /// Rounded to two decimals
    pub avg_frequency: f64,
    /// Rounded to two decimals
    pub avg_confidence: f64,
}

/// Current graph plus stats, as returned by read-only queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(flatten)]
    pub graph: GraphProjection,
    pub stats: GraphStats,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
