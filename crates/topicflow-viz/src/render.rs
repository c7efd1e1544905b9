//! SVG output of a scene.

use std::fmt::Write;

use topicflow_types::{EdgeKind, NodeLevel};

use crate::interaction::{Interaction, Transform};
use crate::scene::Scene;

const EMPTY_STATE_MESSAGE: &str = "No topics yet. Send some messages and run an update.";

/// Escape text for use in XML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render with default styles and an identity transform.
pub fn render_svg(scene: &Scene) -> String {
    render(scene, None)
}

/// Render with the hover styles and zoom transform of `interaction`.
pub fn render_svg_with(scene: &Scene, interaction: &Interaction) -> String {
    render(scene, Some(interaction))
}

fn render(scene: &Scene, interaction: Option<&Interaction>) -> String {
    let canvas = scene.config().canvas;
    let look = &scene.config().interaction;
    let mut svg = String::new();

    // writes to a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = canvas.width,
        h = canvas.height
    );

    if scene.is_empty() {
        let (cx, cy) = canvas.center();
        let _ = writeln!(
            svg,
            r#"  <text class="empty-state" x="{cx}" y="{cy}" text-anchor="middle">{}</text>"#,
            escape_xml(EMPTY_STATE_MESSAGE)
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let transform = interaction.map(Interaction::transform).unwrap_or_default();
    let _ = writeln!(svg, r#"  <g transform="{}">"#, transform_attr(&transform));

    svg.push_str("    <g class=\"links\">\n");
    for edge in scene.edges() {
        let (Some(a), Some(b)) = (scene.coordinates(&edge.source), scene.coordinates(&edge.target)) else {
            continue;
        };
        let opacity = interaction.map(|i| i.edge_style(edge).opacity).unwrap_or(1.0);
        let (class, dash) = match edge.kind {
            EdgeKind::Hierarchy => ("hierarchy", ""),
            EdgeKind::Cooccurrence => ("cooccurrence", r#" stroke-dasharray="4 4""#),
        };
        let width = 1.0 + edge.weight.max(0.0).ln_1p();
        let _ = writeln!(
            svg,
            r##"      <line class="{class}" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#999999" stroke-width="{:.2}" stroke-opacity="{opacity}"{dash}/>"##,
            a.0, a.1, b.0, b.1, width
        );
    }
    svg.push_str("    </g>\n");

    svg.push_str("    <g class=\"nodes\">\n");
    for node in scene.nodes() {
        let Some((x, y)) = scene.coordinates(&node.node.id) else {
            continue;
        };
        let (opacity, stroke_width) = match interaction {
            Some(i) => {
                let style = i.node_style(&node.node.id);
                (style.opacity, style.stroke_width)
            }
            None => (1.0, look.stroke_width),
        };
        let _ = writeln!(
            svg,
            r##"      <circle class="{level}" data-id="{id}" cx="{x:.2}" cy="{y:.2}" r="{r:.2}" fill="{fill}" stroke="#ffffff" stroke-width="{stroke_width}" opacity="{opacity}"><title>{title}</title></circle>"##,
            level = node.node.level,
            id = escape_xml(&node.node.id),
            r = node.radius,
            fill = escape_xml(&node.color),
            title = escape_xml(&node.node.label),
        );
        if node.node.level != NodeLevel::Subsubtopic {
            let _ = writeln!(
                svg,
                r#"      <text class="label" x="{x:.2}" y="{:.2}" text-anchor="middle" opacity="{opacity}">{}</text>"#,
                y + node.radius + 12.0,
                escape_xml(&node.node.label)
            );
        }
    }
    svg.push_str("    </g>\n");

    svg.push_str("  </g>\n</svg>\n");
    svg
}

fn transform_attr(t: &Transform) -> String {
    format!("translate({:.2},{:.2}) scale({})", t.x, t.y, t.scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::ColorMap;
    use crate::config::{InteractionConfig, VizConfig};
    use crate::scene::tests::{edge, node, sample_graph};
    use topicflow_types::GraphProjection;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">'"#), "&lt;a &amp; &quot;b&quot;&gt;&#39;");
    }

    #[test]
    fn test_empty_graph_renders_message() {
        let scene = Scene::build(&GraphProjection::default(), &ColorMap::new(), &VizConfig::default());
        let svg = render_svg(&scene);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("empty-state"));
        assert!(svg.contains("No topics yet"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_renders_nodes_and_edges() {
        let scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let svg = render_svg(&scene);
        assert_eq!(svg.matches("<circle").count(), 7);
        assert_eq!(svg.matches("<line").count(), 6);
        assert_eq!(svg.matches("stroke-dasharray").count(), 1);
        // subsubtopics have no text label
        assert_eq!(svg.matches(r#"class="label""#).count(), 4);
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_invalid_input_is_skipped() {
        let mut graph = sample_graph();
        graph.nodes.push(node("", "Ghost", NodeLevel::Topic, 1, 1));
        graph.nodes.push(node("<x>", "A <b> & c", NodeLevel::Topic, 1, 9));
        graph.links.push(edge("rust", "missing", EdgeKind::Hierarchy));

        let scene = Scene::build(&graph, &ColorMap::new(), &VizConfig::default());
        let svg = render_svg(&scene);
        assert_eq!(svg.matches("<circle").count(), 8);
        assert_eq!(svg.matches("<line").count(), 6);
        assert!(svg.contains("A &lt;b&gt; &amp; c"));
        assert!(svg.contains(r#"data-id="&lt;x&gt;""#));
        assert!(!svg.contains("Ghost"));
    }

    #[test]
    fn test_hover_and_zoom_are_rendered() {
        let scene = Scene::build(&sample_graph(), &ColorMap::new(), &VizConfig::default());
        let mut ui = Interaction::new(InteractionConfig::default());
        ui.hover(&scene, "graphs").unwrap();
        ui.pan(10.0, 20.0);

        let svg = render_svg_with(&scene, &ui);
        assert!(svg.contains("translate(10.00,20.00) scale(1)"));
        assert!(svg.contains(r#"opacity="0.15""#));
        assert!(svg.contains(r#"stroke-width="3""#));
    }
}
