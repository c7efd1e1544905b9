//! A laid-out, colored graph ready for interaction and rendering.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use topicflow_types::{Edge, EdgeKind, GraphProjection, Node, NodeLevel};
use tracing::{debug, warn};

use crate::colors::{assign_colors, topic_requests, ColorMap};
use crate::config::VizConfig;
use crate::layout::{phyllotaxis, radius_for, topic_position, FrequencySpan};
use crate::parent::{node_colors, ParentIndex};
use crate::simulation::{NodeKind, RunStatus, SimLink, SimNode, Simulation};

/// What was filtered out of the input graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropReport {
    /// Nodes with an empty id or label, or non-finite metrics
    pub invalid_nodes: usize,
    /// Repeated node ids (first occurrence kept)
    pub duplicate_nodes: usize,
    /// Edges whose source or target is missing, or self-loops
    pub dangling_edges: usize,
}

impl DropReport {
    pub fn is_clean(&self) -> bool {
        self.invalid_nodes == 0 && self.duplicate_nodes == 0 && self.dangling_edges == 0
    }
}

/// Remove nodes and edges that cannot be drawn.
pub fn sanitize(graph: &GraphProjection) -> (GraphProjection, DropReport) {
    let mut report = DropReport::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        if node.id.trim().is_empty()
            || node.label.trim().is_empty()
            || !node.size.is_finite()
            || !node.confidence.is_finite()
        {
            warn!(id = %node.id, "Dropping invalid node");
            report.invalid_nodes += 1;
            continue;
        }
        if !seen.insert(node.id.as_str()) {
            warn!(id = %node.id, "Dropping duplicate node");
            report.duplicate_nodes += 1;
            continue;
        }
        nodes.push(node.clone());
    }

    let links = graph
        .links
        .iter()
        .filter(|edge| {
            let ok = edge.source != edge.target
                && seen.contains(edge.source.as_str())
                && seen.contains(edge.target.as_str());
            if !ok {
                warn!(source = %edge.source, target = %edge.target, "Dropping dangling edge");
                report.dangling_edges += 1;
            }
            ok
        })
        .cloned()
        .collect();

    (GraphProjection { nodes, links }, report)
}

/// One drawable node.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub node: Node,
    pub kind: NodeKind,
    /// Temporal order, topic-level nodes only
    pub position: Option<usize>,
    pub color: String,
    pub radius: f64,
}

/// Graph, colors and simulation state of one render.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    neighbors: HashMap<String, BTreeSet<String>>,
    parents: ParentIndex,
    colors: ColorMap,
    simulation: Simulation,
    config: VizConfig,
    dropped: DropReport,
}

impl Scene {
    /// Sanitize the graph, assign colors on top of `existing`, place pinned
    /// topics and seed the simulation for free nodes.
    pub fn build(graph: &GraphProjection, existing: &ColorMap, config: &VizConfig) -> Self {
        let (graph, dropped) = sanitize(graph);

        let requests = topic_requests(&graph);
        let colors = assign_colors(&requests, existing, &config.colors);
        let parents = ParentIndex::build(&graph);
        let fills = node_colors(&graph, &parents, &colors, &config.colors);
        let positions: HashMap<&str, usize> = requests
            .iter()
            .map(|r| (r.id.as_str(), r.position))
            .collect();
        let total_topics = requests.len();

        let mut spans: HashMap<NodeLevel, FrequencySpan> = HashMap::new();
        for level in [NodeLevel::Topic, NodeLevel::Subtopic, NodeLevel::Subsubtopic] {
            let frequencies = graph
                .nodes
                .iter()
                .filter(|n| n.level == level)
                .map(|n| n.frequency);
            if let Some(span) = FrequencySpan::of(frequencies) {
                spans.insert(level, span);
            }
        }

        // parents are placed before their children
        let mut order: Vec<usize> = (0..graph.nodes.len()).collect();
        order.sort_by_key(|&i| (graph.nodes[i].level, i));

        let center = config.canvas.center();
        let mut placed: HashMap<String, (f64, f64)> = HashMap::new();
        let mut children: HashMap<String, usize> = HashMap::new();
        let mut orphans = 0usize;
        let mut slots: Vec<Option<(SceneNode, SimNode)>> = vec![None; graph.nodes.len()];

        for i in order {
            let node = &graph.nodes[i];
            let radius = radius_for(
                node.frequency,
                node.level,
                spans.get(&node.level).copied(),
                &config.radius,
            );
            let color = fills
                .get(&node.id)
                .cloned()
                .unwrap_or_else(|| config.colors.fallback_color.clone());

            let (kind, position, xy) = match positions.get(node.id.as_str()) {
                Some(&position) => (
                    NodeKind::Pinned,
                    Some(position),
                    topic_position(position, total_topics, &config.canvas, &config.layout),
                ),
                None => {
                    let anchor = parents
                        .parent(&node.id)
                        .and_then(|p| placed.get(p).copied().map(|xy| (p.to_string(), xy)));
                    let xy = match anchor {
                        Some((parent, xy)) => {
                            let k = children.entry(parent).or_insert(0);
                            let spread = config.simulation.hierarchy_distance / 2.0;
                            let out = phyllotaxis(xy, *k, spread);
                            *k += 1;
                            out
                        }
                        None => {
                            let out = phyllotaxis(center, orphans, config.layout.spacing / 2.0);
                            orphans += 1;
                            out
                        }
                    };
                    (NodeKind::Free, None, xy)
                }
            };
            placed.insert(node.id.clone(), xy);

            let sim_node = match kind {
                NodeKind::Pinned => SimNode::pinned(node.id.clone(), node.level, xy, radius),
                NodeKind::Free => SimNode::free(node.id.clone(), node.level, xy, radius),
            };
            slots[i] = Some((
                SceneNode {
                    node: node.clone(),
                    kind,
                    position,
                    color,
                    radius,
                },
                sim_node,
            ));
        }

        let (nodes, sim_nodes): (Vec<SceneNode>, Vec<SimNode>) = slots.into_iter().flatten().unzip();
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.node.id.clone(), i))
            .collect();

        let mut neighbors: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut sim_links = Vec::with_capacity(graph.links.len());
        for edge in &graph.links {
            neighbors
                .entry(edge.source.clone())
                .or_default()
                .insert(edge.target.clone());
            neighbors
                .entry(edge.target.clone())
                .or_default()
                .insert(edge.source.clone());
            if let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target)) {
                sim_links.push(SimLink {
                    source,
                    target,
                    kind: edge.kind,
                });
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = graph.links.len(),
            topics = total_topics,
            "Scene built"
        );

        Self {
            nodes,
            edges: graph.links,
            index,
            neighbors,
            parents,
            colors,
            simulation: Simulation::new(sim_nodes, sim_links, config.simulation.clone()),
            config: config.clone(),
            dropped,
        }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids sharing an edge with `id`.
    pub fn neighbors(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.neighbors.get(id)
    }

    pub fn parents(&self) -> &ParentIndex {
        &self.parents
    }

    /// Color map after this build; persist it and pass it to the next build.
    pub fn color_map(&self) -> &ColorMap {
        &self.colors
    }

    pub fn dropped(&self) -> &DropReport {
        &self.dropped
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Current coordinates of a node.
    pub fn coordinates(&self, id: &str) -> Option<(f64, f64)> {
        self.simulation.node(id).map(SimNode::position)
    }

    /// Step the simulation until it settles or `max_ticks` is reached.
    pub fn run_layout(&mut self, max_ticks: usize) -> RunStatus {
        self.simulation.run(max_ticks)
    }

    /// Edges of one kind.
    pub fn edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn node(id: &str, label: &str, level: NodeLevel, frequency: u64, first_seen: u64) -> Node {
        Node {
            id: id.to_string(),
            label: label.to_string(),
            level,
            size: 10.0,
            frequency,
            mentions: frequency,
            confidence: 0.9,
            keywords: vec![label.to_lowercase()],
            first_seen_message_id: first_seen,
            last_seen_message_id: first_seen,
        }
    }

    pub(crate) fn edge(source: &str, target: &str, kind: EdgeKind) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            weight: 1.0,
        }
    }

    pub(crate) fn sample_graph() -> GraphProjection {
        GraphProjection {
            nodes: vec![
                node("rust", "Rust", NodeLevel::Topic, 3, 1),
                node("rust::ownership", "Ownership", NodeLevel::Subtopic, 3, 1),
                node("u::rust::ownership::borrowing", "Borrowing", NodeLevel::Subsubtopic, 2, 1),
                node("u::rust::ownership::moves", "Moves", NodeLevel::Subsubtopic, 1, 2),
                node("graphs", "Graphs", NodeLevel::Topic, 1, 5),
                node("graphs::layout", "Layout", NodeLevel::Subtopic, 1, 5),
                node("u::graphs::layout::spiral", "Spiral", NodeLevel::Subsubtopic, 1, 5),
            ],
            links: vec![
                edge("rust", "rust::ownership", EdgeKind::Hierarchy),
                edge("rust::ownership", "u::rust::ownership::borrowing", EdgeKind::Hierarchy),
                edge("rust::ownership", "u::rust::ownership::moves", EdgeKind::Hierarchy),
                edge("graphs", "graphs::layout", EdgeKind::Hierarchy),
                edge("graphs::layout", "u::graphs::layout::spiral", EdgeKind::Hierarchy),
                edge(
                    "u::graphs::layout::spiral",
                    "u::rust::ownership::borrowing",
                    EdgeKind::Cooccurrence,
                ),
            ],
        }
    }

    #[test]
    fn test_sanitize_filters_bad_input() {
        let mut graph = sample_graph();
        graph.nodes.push(node("", "Nameless", NodeLevel::Topic, 1, 9));
        graph.nodes.push(node("blank", " ", NodeLevel::Topic, 1, 9));
        graph.nodes.push(node("rust", "Rust again", NodeLevel::Topic, 1, 9));
        graph.links.push(edge("rust", "missing", EdgeKind::Hierarchy));
        graph.links.push(edge("rust", "rust", EdgeKind::Cooccurrence));

        let (clean, report) = sanitize(&graph);
        assert_eq!(clean.nodes.len(), 7);
        assert_eq!(clean.links.len(), 6);
        assert_eq!(
            report,
            DropReport {
                invalid_nodes: 2,
                duplicate_nodes: 1,
                dangling_edges: 2,
            }
        );
    }

    #[test]
    fn test_topics_pinned_in_temporal_order() {
        let scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let rust = scene.node("rust").unwrap();
        let graphs = scene.node("graphs").unwrap();
        assert_eq!(rust.kind, NodeKind::Pinned);
        assert_eq!(rust.position, Some(0));
        assert_eq!(graphs.position, Some(1));
        assert_eq!(scene.node("rust::ownership").unwrap().kind, NodeKind::Free);
        assert_eq!(scene.node("rust::ownership").unwrap().position, None);
    }

    #[test]
    fn test_colors_and_radii() {
        let scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let config = VizConfig::default();

        assert_eq!(scene.color_map().len(), 2);
        assert_ne!(scene.node("rust").unwrap().color, scene.node("graphs").unwrap().color);
        assert_ne!(
            scene.node("rust").unwrap().color,
            scene.node("rust::ownership").unwrap().color
        );

        assert_eq!(scene.node("rust").unwrap().radius, config.radius.topic.max);
        assert_eq!(scene.node("graphs").unwrap().radius, config.radius.topic.min);
    }

    #[test]
    fn test_layout_keeps_topics_fixed() {
        let mut scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let before = scene.coordinates("rust").unwrap();
        let leaf_before = scene.coordinates("u::rust::ownership::moves").unwrap();
        scene.run_layout(500);
        assert_eq!(scene.coordinates("rust").unwrap(), before);
        assert_ne!(scene.coordinates("u::rust::ownership::moves").unwrap(), leaf_before);
    }

    #[test]
    fn test_neighbors_include_both_edge_kinds() {
        let scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let neighbors = scene.neighbors("u::rust::ownership::borrowing").unwrap();
        assert!(neighbors.contains("rust::ownership"));
        assert!(neighbors.contains("u::graphs::layout::spiral"));
        assert_eq!(scene.edges_of(EdgeKind::Cooccurrence).count(), 1);
    }
}
