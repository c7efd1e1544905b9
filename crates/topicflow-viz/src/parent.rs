//! Child -> parent index and inherited node colors.

use std::collections::HashMap;

use topicflow_types::{EdgeKind, GraphProjection, NodeLevel};
use tracing::warn;

use crate::colors::ColorMap;
use crate::config::ColorConfig;
use crate::palette::lighten_hex;

/// Parent lookup built once per graph from its hierarchy edges.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<String, String>,
    levels: HashMap<String, NodeLevel>,
}

impl ParentIndex {
    /// Single pass over nodes and edges.
    pub fn build(graph: &GraphProjection) -> Self {
        let levels: HashMap<String, NodeLevel> = graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.level))
            .collect();

        let mut parents = HashMap::new();
        for edge in &graph.links {
            if edge.kind != EdgeKind::Hierarchy {
                continue;
            }
            if let Some(previous) = parents.insert(edge.target.clone(), edge.source.clone()) {
                if previous != edge.source {
                    warn!(child = %edge.target, "Node has more than one parent, keeping the last");
                }
            }
        }

        Self { parents, levels }
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    pub fn level(&self, id: &str) -> Option<NodeLevel> {
        self.levels.get(id).copied()
    }

    /// Nearest topic-level ancestor (the node itself if it is a topic).
    pub fn topic_ancestor<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        let mut current = id;
        // hierarchy depth is at most two, anything longer is a cycle
        for _ in 0..=NodeLevel::Subsubtopic.depth() {
            if self.level(current) == Some(NodeLevel::Topic) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
        None
    }
}

/// Resolve the display color of every node.
///
/// Topic nodes take their assigned color; lower levels take their topic
/// ancestor's color lightened per level. Nodes without a colored ancestor
/// fall back to the neutral color.
pub fn node_colors(
    graph: &GraphProjection,
    index: &ParentIndex,
    colors: &ColorMap,
    config: &ColorConfig,
) -> HashMap<String, String> {
    graph
        .nodes
        .iter()
        .map(|node| {
            let base = index
                .topic_ancestor(&node.id)
                .and_then(|topic| colors.get(topic));
            let color = match base {
                Some(hex) => lighten_hex(hex, config.lighten_for(node.level))
                    .unwrap_or_else(|_| config.fallback_color.clone()),
                None => config.fallback_color.clone(),
            };
            (node.id.clone(), color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{assign_colors, topic_requests};
    use topicflow_types::{Edge, Node};

    fn node(id: &str, level: NodeLevel, first_seen: u64) -> Node {
        Node {
            id: id.to_string(),
            label: id.to_string(),
            level,
            size: 1.0,
            frequency: 1,
            mentions: 1,
            confidence: 0.9,
            keywords: Vec::new(),
            first_seen_message_id: first_seen,
            last_seen_message_id: first_seen,
        }
    }

    fn edge(source: &str, target: &str, kind: EdgeKind) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            weight: 1.0,
        }
    }

    fn graph() -> GraphProjection {
        GraphProjection {
            nodes: vec![
                node("rust", NodeLevel::Topic, 1),
                node("rust::ownership", NodeLevel::Subtopic, 1),
                node("u::rust::ownership::borrowing", NodeLevel::Subsubtopic, 1),
                node("orphan", NodeLevel::Subtopic, 2),
            ],
            links: vec![
                edge("rust", "rust::ownership", EdgeKind::Hierarchy),
                edge("rust::ownership", "u::rust::ownership::borrowing", EdgeKind::Hierarchy),
                edge("rust", "orphan", EdgeKind::Cooccurrence),
            ],
        }
    }

    #[test]
    fn test_topic_ancestor() {
        let index = ParentIndex::build(&graph());
        assert_eq!(index.topic_ancestor("rust"), Some("rust"));
        assert_eq!(index.topic_ancestor("rust::ownership"), Some("rust"));
        assert_eq!(index.topic_ancestor("u::rust::ownership::borrowing"), Some("rust"));
        assert_eq!(index.topic_ancestor("orphan"), None);
        assert_eq!(index.topic_ancestor("missing"), None);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = GraphProjection {
            nodes: vec![node("a", NodeLevel::Subtopic, 1), node("b", NodeLevel::Subtopic, 1)],
            links: vec![
                edge("a", "b", EdgeKind::Hierarchy),
                edge("b", "a", EdgeKind::Hierarchy),
            ],
        };
        let index = ParentIndex::build(&graph);
        assert_eq!(index.topic_ancestor("a"), None);
    }

    #[test]
    fn test_inherited_shades() {
        let graph = graph();
        let config = ColorConfig {
            palette: vec!["#000000".into()],
            ..Default::default()
        };
        let map = assign_colors(&topic_requests(&graph), &ColorMap::new(), &config);
        let index = ParentIndex::build(&graph);
        let colors = node_colors(&graph, &index, &map, &config);

        assert_eq!(colors["rust"], "#000000");
        // 255 * 0.3 = 76.5 -> 77 = 0x4d
        assert_eq!(colors["rust::ownership"], "#4d4d4d");
        // 255 * 0.55 = 140.25 -> 140 = 0x8c
        assert_eq!(colors["u::rust::ownership::borrowing"], "#8c8c8c");
        assert_eq!(colors["orphan"], config.fallback_color);
    }
}
