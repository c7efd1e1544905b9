//! # topicflow-viz
//!
//! Layout, coloring and rendering of a projected topic graph.
//!
//! Topic-level nodes are pinned along a deterministic path in order of first
//! appearance; subtopics and subsubtopics float under a force simulation.
//! Topic colors persist across renders through a caller-held [`ColorMap`].

pub mod colors;
pub mod config;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod palette;
pub mod parent;
pub mod render;
pub mod scene;
pub mod simulation;

pub use colors::{assign_colors, topic_requests, ColorMap, ColorRequest, ColoredTopic};
pub use config::{
    CanvasConfig, ColorConfig, InteractionConfig, LayoutConfig, LayoutDirection, LayoutPattern,
    RadiusConfig, RadiusRange, SimulationConfig, VizConfig,
};
pub use error::VizError;
pub use interaction::{EdgeStyle, HoverState, Interaction, NodeStyle, Tooltip, Transform};
pub use layout::{phyllotaxis, pinned_position, radius_for, topic_position, FrequencySpan};
pub use palette::{lighten_hex, Rgb, DEFAULT_PALETTE, NEUTRAL_COLOR};
pub use parent::{node_colors, ParentIndex};
pub use render::{escape_xml, render_svg, render_svg_with};
pub use scene::{sanitize, DropReport, Scene, SceneNode};
pub use simulation::{NodeKind, RunStatus, SimLink, SimNode, Simulation};
