//! Hover, drag, click and zoom handling over a [`Scene`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use topicflow_types::{Edge, Node, NodeLevel};
use tracing::debug;

use crate::config::InteractionConfig;
use crate::error::VizError;
use crate::scene::Scene;
use crate::simulation::NodeKind;

/// Screen transform: `screen = world * scale + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

impl Transform {
    pub fn apply(&self, (wx, wy): (f64, f64)) -> (f64, f64) {
        (wx * self.scale + self.x, wy * self.scale + self.y)
    }

    pub fn invert(&self, (sx, sy): (f64, f64)) -> (f64, f64) {
        ((sx - self.x) / self.scale, (sy - self.y) / self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub opacity: f64,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub opacity: f64,
}

/// Content shown next to the hovered node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub label: String,
    pub level: NodeLevel,
    pub frequency: u64,
    pub keywords: Vec<String>,
}

impl Tooltip {
    fn of(node: &Node) -> Self {
        Self {
            label: node.label.clone(),
            level: node.level,
            frequency: node.frequency,
            keywords: node.keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub node: String,
    /// Hovered node plus every node sharing an edge with it
    pub highlighted: BTreeSet<String>,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq)]
struct DragState {
    id: String,
    index: usize,
}

/// Pointer state of one view.
#[derive(Debug, Clone)]
pub struct Interaction {
    config: InteractionConfig,
    transform: Transform,
    hover: Option<HoverState>,
    drag: Option<DragState>,
}

impl Interaction {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            transform: Transform::default(),
            hover: None,
            drag: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn hovered(&self) -> Option<&HoverState> {
        self.hover.as_ref()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.id.as_str())
    }

    /// Highlight a node and its neighborhood.
    pub fn hover(&mut self, scene: &Scene, id: &str) -> Result<&HoverState, VizError> {
        let node = scene
            .node(id)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;

        let mut highlighted = scene.neighbors(id).cloned().unwrap_or_default();
        highlighted.insert(id.to_string());

        Ok(self.hover.insert(HoverState {
            node: id.to_string(),
            highlighted,
            tooltip: Tooltip::of(&node.node),
        }))
    }

    /// Restore default styles and hide the tooltip.
    pub fn hover_end(&mut self) {
        self.hover = None;
    }

    pub fn node_style(&self, id: &str) -> NodeStyle {
        let (opacity, stroke_width) = match &self.hover {
            None => (1.0, self.config.stroke_width),
            Some(h) if h.node == id => (1.0, self.config.highlight_stroke_width),
            Some(h) if h.highlighted.contains(id) => (1.0, self.config.stroke_width),
            Some(_) => (self.config.dimmed_opacity, self.config.stroke_width),
        };
        NodeStyle {
            opacity,
            stroke_width,
        }
    }

    pub fn edge_style(&self, edge: &Edge) -> EdgeStyle {
        let opacity = match &self.hover {
            None => 1.0,
            Some(h) if h.node == edge.source || h.node == edge.target => 1.0,
            Some(_) => self.config.dimmed_opacity,
        };
        EdgeStyle { opacity }
    }

    /// Begin dragging a free node. Returns false (and does nothing) for pinned
    /// nodes.
    pub fn drag_start(&mut self, scene: &mut Scene, id: &str) -> Result<bool, VizError> {
        let kind = scene
            .node(id)
            .map(|n| n.kind)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;
        if kind == NodeKind::Pinned {
            debug!(id, "Ignoring drag on pinned node");
            return Ok(false);
        }
        let index = scene
            .simulation()
            .index_of(id)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;
        let (x, y) = scene.simulation().nodes()[index].position();

        let simulation = scene.simulation_mut();
        simulation.fix(index, x, y);
        simulation.reheat_default();
        self.drag = Some(DragState {
            id: id.to_string(),
            index,
        });
        Ok(true)
    }

    /// Move the dragged node to screen coordinates `(x, y)`.
    pub fn drag_move(&mut self, scene: &mut Scene, x: f64, y: f64) {
        if let Some(drag) = &self.drag {
            let (wx, wy) = self.transform.invert((x, y));
            scene.simulation_mut().fix(drag.index, wx, wy);
        }
    }

    /// Release the dragged node back to the simulation.
    pub fn drag_end(&mut self, scene: &mut Scene) {
        if let Some(drag) = self.drag.take() {
            scene.simulation_mut().release(drag.index);
        }
    }

    /// Move a node to world coordinates. Pinned nodes move only when the
    /// configuration allows it.
    pub fn reposition(&mut self, scene: &mut Scene, id: &str, x: f64, y: f64) -> Result<(), VizError> {
        let kind = scene
            .node(id)
            .map(|n| n.kind)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;
        if kind == NodeKind::Pinned && !self.config.allow_pinned_reposition {
            return Err(VizError::Immovable {
                id: id.to_string(),
                reason: "pinned topic positions are fixed by the layout".to_string(),
            });
        }
        let index = scene
            .simulation()
            .index_of(id)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;
        let simulation = scene.simulation_mut();
        simulation.place(index, x, y);
        simulation.reheat_default();
        Ok(())
    }

    /// Hand the clicked node to the caller.
    pub fn click<F>(&self, scene: &Scene, id: &str, callback: F) -> Result<(), VizError>
    where
        F: FnOnce(&Node),
    {
        let node = scene
            .node(id)
            .ok_or_else(|| VizError::UnknownNode(id.to_string()))?;
        callback(&node.node);
        Ok(())
    }

    /// Zoom by `factor` keeping the screen point `anchor` still.
    pub fn zoom_by(&mut self, factor: f64, anchor: (f64, f64)) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let [min, max] = self.config.scale_extent;
        let scale = (self.transform.scale * factor).clamp(min, max);
        let ratio = scale / self.transform.scale;
        self.transform = Transform {
            scale,
            x: anchor.0 - (anchor.0 - self.transform.x) * ratio,
            y: anchor.1 - (anchor.1 - self.transform.y) * ratio,
        };
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.transform.x += dx;
        self.transform.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::ColorMap;
    use crate::config::VizConfig;
    use crate::scene::tests::sample_graph;

    fn scene() -> Scene {
        Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default())
    }

    #[test]
    fn test_hover_highlights_neighborhood() {
        let scene = scene();
        let mut ui = Interaction::new(InteractionConfig::default());
        let state = ui.hover(&scene, "rust::ownership").unwrap();
        assert_eq!(state.tooltip.label, "Ownership");
        assert_eq!(state.tooltip.frequency, 3);
        assert!(state.highlighted.contains("rust"));
        assert!(state.highlighted.contains("u::rust::ownership::moves"));
        assert!(!state.highlighted.contains("graphs"));

        assert_eq!(ui.node_style("rust::ownership").stroke_width, 3.0);
        assert_eq!(ui.node_style("rust").opacity, 1.0);
        assert_eq!(ui.node_style("graphs").opacity, 0.15);
        assert_eq!(ui.edge_style(&scene.edges()[0]).opacity, 1.0);
        assert_eq!(ui.edge_style(&scene.edges()[3]).opacity, 0.15);

        ui.hover_end();
        assert!(ui.hovered().is_none());
        assert_eq!(ui.node_style("graphs").opacity, 1.0);
    }

    #[test]
    fn test_hover_unknown_node() {
        let scene = scene();
        let mut ui = Interaction::new(InteractionConfig::default());
        assert!(matches!(ui.hover(&scene, "nope"), Err(VizError::UnknownNode(_))));
    }

    #[test]
    fn test_drag_free_node() {
        let mut scene = scene();
        let mut ui = Interaction::new(InteractionConfig::default());
        scene.run_layout(1000);

        assert!(ui.drag_start(&mut scene, "rust::ownership").unwrap());
        assert!(!scene.simulation().is_settled());
        ui.drag_move(&mut scene, 10.0, 20.0);
        scene.simulation_mut().tick();
        assert_eq!(scene.coordinates("rust::ownership"), Some((10.0, 20.0)));

        ui.drag_end(&mut scene);
        assert!(ui.dragging().is_none());
        let node = scene.simulation().node("rust::ownership").unwrap();
        assert!(node.fixed.is_none());
    }

    #[test]
    fn test_pinned_nodes_ignore_drag() {
        let mut scene = scene();
        let mut ui = Interaction::new(InteractionConfig::default());
        let before = scene.coordinates("rust");
        assert!(!ui.drag_start(&mut scene, "rust").unwrap());
        ui.drag_move(&mut scene, 0.0, 0.0);
        ui.drag_end(&mut scene);
        assert_eq!(scene.coordinates("rust"), before);
    }

    #[test]
    fn test_reposition_pinned_requires_permission() {
        let mut scene = scene();
        let mut locked = Interaction::new(InteractionConfig::default());
        assert!(matches!(
            locked.reposition(&mut scene, "rust", 5.0, 5.0),
            Err(VizError::Immovable { .. })
        ));

        let mut open = Interaction::new(InteractionConfig {
            allow_pinned_reposition: true,
            ..Default::default()
        });
        open.reposition(&mut scene, "rust", 5.0, 5.0).unwrap();
        assert_eq!(scene.coordinates("rust"), Some((5.0, 5.0)));
    }

    #[test]
    fn test_click_passes_full_node() {
        let scene = scene();
        let ui = Interaction::new(InteractionConfig::default());
        let mut clicked = None;
        ui.click(&scene, "graphs", |node| clicked = Some(node.clone())).unwrap();
        let node = clicked.unwrap();
        assert_eq!(node.label, "Graphs");
        assert_eq!(node.first_seen_message_id, 5);
    }

    #[test]
    fn test_zoom_clamps_and_keeps_anchor() {
        let mut ui = Interaction::new(InteractionConfig::default());
        let anchor = (100.0, 50.0);
        let world = ui.transform().invert(anchor);
        ui.zoom_by(2.0, anchor);
        assert_eq!(ui.transform().scale, 2.0);
        let back = ui.transform().apply(world);
        assert!((back.0 - anchor.0).abs() < 1e-9 && (back.1 - anchor.1).abs() < 1e-9);

        ui.zoom_by(100.0, anchor);
        assert_eq!(ui.transform().scale, 4.0);
        ui.zoom_by(1e-6, anchor);
        assert_eq!(ui.transform().scale, 0.2);
    }

    #[test]
    fn test_pan_translates() {
        let mut ui = Interaction::new(InteractionConfig::default());
        ui.pan(10.0, -5.0);
        ui.pan(1.0, 1.0);
        assert_eq!(ui.transform(), Transform { scale: 1.0, x: 11.0, y: -4.0 });
    }
}
