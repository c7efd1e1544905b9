//! Visualizer configuration.

use serde::{Deserialize, Serialize};
use topicflow_types::{NodeLevel, SimilarityConfig};

use crate::palette::{Rgb, DEFAULT_PALETTE, NEUTRAL_COLOR};

/// Master configuration for layout, coloring and interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub colors: ColorConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub radius: RadiusConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub interaction: InteractionConfig,
}

impl VizConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.canvas.validate()?;
        self.colors.validate()?;
        self.layout.validate()?;
        self.radius.validate()?;
        self.simulation.validate()?;
        self.interaction.validate()
    }
}

/// Drawing surface size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: f64,

    #[serde(default = "default_height")]
    pub height: f64,
}

fn default_width() -> f64 {
    1200.0
}

fn default_height() -> f64 {
    800.0
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl CanvasConfig {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(format!(
                "canvas must have a positive size, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

/// Topic color assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Colors allocated to dissimilar topics, in order
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// A topic at least this similar to a colored topic reuses its color
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f64,

    /// Lightening applied to subtopic nodes
    #[serde(default = "default_subtopic_lighten")]
    pub subtopic_lighten: f64,

    /// Lightening applied to subsubtopic nodes
    #[serde(default = "default_subsubtopic_lighten")]
    pub subsubtopic_lighten: f64,

    /// Color for nodes without a colored topic ancestor
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,

    #[serde(default)]
    pub similarity: SimilarityConfig,
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

fn default_reuse_threshold() -> f64 {
    0.6
}

fn default_subtopic_lighten() -> f64 {
    0.3
}

fn default_subsubtopic_lighten() -> f64 {
    0.55
}

fn default_fallback_color() -> String {
    NEUTRAL_COLOR.to_string()
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            reuse_threshold: default_reuse_threshold(),
            subtopic_lighten: default_subtopic_lighten(),
            subsubtopic_lighten: default_subsubtopic_lighten(),
            fallback_color: default_fallback_color(),
            similarity: SimilarityConfig::default(),
        }
    }
}

impl ColorConfig {
    /// Lightening factor for a node level (topics are not lightened).
    pub fn lighten_for(&self, level: NodeLevel) -> f64 {
        match level {
            NodeLevel::Topic => 0.0,
            NodeLevel::Subtopic => self.subtopic_lighten,
            NodeLevel::Subsubtopic => self.subsubtopic_lighten,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.palette.is_empty() {
            return Err("palette must not be empty".to_string());
        }
        for color in self.palette.iter().chain(std::iter::once(&self.fallback_color)) {
            Rgb::parse(color).map_err(|e| e.to_string())?;
        }
        if !(0.0..=1.0).contains(&self.reuse_threshold) {
            return Err(format!(
                "reuse_threshold must be 0.0-1.0, got {}",
                self.reuse_threshold
            ));
        }
        for factor in [self.subtopic_lighten, self.subsubtopic_lighten] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(format!("lighten factors must be 0.0-1.0, got {}", factor));
            }
        }
        self.similarity.validate()
    }
}

/// Path family for pinned topic nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPattern {
    /// Logarithmic spiral out of the canvas center
    #[default]
    Spiral,
    /// Row-wrapped S-curve, alternating direction per row
    Serpentine,
}

/// Which end of the path the oldest topic occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Pinned-node layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub pattern: LayoutPattern,

    #[serde(default)]
    pub direction: LayoutDirection,

    /// Distance between consecutive slots (serpentine) or base radius (spiral)
    #[serde(default = "default_spacing")]
    pub spacing: f64,

    #[serde(default)]
    pub offset_x: f64,

    #[serde(default)]
    pub offset_y: f64,

    /// Spiral angle increment per slot, in radians
    #[serde(default = "default_angle_step")]
    pub angle_step: f64,

    /// Spiral radius multiplier per full turn
    #[serde(default = "default_expansion")]
    pub expansion: f64,
}

fn default_spacing() -> f64 {
    140.0
}

fn default_angle_step() -> f64 {
    0.9
}

fn default_expansion() -> f64 {
    1.6
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pattern: LayoutPattern::default(),
            direction: LayoutDirection::default(),
            spacing: default_spacing(),
            offset_x: 0.0,
            offset_y: 0.0,
            angle_step: default_angle_step(),
            expansion: default_expansion(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.spacing > 0.0) {
            return Err(format!("spacing must be > 0, got {}", self.spacing));
        }
        if !(self.angle_step > 0.0) {
            return Err(format!("angle_step must be > 0, got {}", self.angle_step));
        }
        if !(self.expansion >= 1.0) {
            return Err(format!("expansion must be >= 1, got {}", self.expansion));
        }
        Ok(())
    }
}

/// Inclusive radius range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: f64,
    pub max: f64,
}

impl RadiusRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Per-level node radius ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusConfig {
    #[serde(default = "default_topic_radius")]
    pub topic: RadiusRange,

    #[serde(default = "default_subtopic_radius")]
    pub subtopic: RadiusRange,

    #[serde(default = "default_subsubtopic_radius")]
    pub subsubtopic: RadiusRange,
}

fn default_topic_radius() -> RadiusRange {
    RadiusRange::new(16.0, 36.0)
}

fn default_subtopic_radius() -> RadiusRange {
    RadiusRange::new(9.0, 20.0)
}

fn default_subsubtopic_radius() -> RadiusRange {
    RadiusRange::new(5.0, 12.0)
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            topic: default_topic_radius(),
            subtopic: default_subtopic_radius(),
            subsubtopic: default_subsubtopic_radius(),
        }
    }
}

impl RadiusConfig {
    pub fn for_level(&self, level: NodeLevel) -> RadiusRange {
        match level {
            NodeLevel::Topic => self.topic,
            NodeLevel::Subtopic => self.subtopic,
            NodeLevel::Subsubtopic => self.subsubtopic,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in [
            ("topic", self.topic),
            ("subtopic", self.subtopic),
            ("subsubtopic", self.subsubtopic),
        ] {
            if !(range.min > 0.0 && range.min <= range.max) {
                return Err(format!(
                    "{} radius range must satisfy 0 < min <= max, got [{}, {}]",
                    name, range.min, range.max
                ));
            }
        }
        Ok(())
    }
}

/// Force simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_alpha_min")]
    pub alpha_min: f64,

    #[serde(default = "default_alpha_decay")]
    pub alpha_decay: f64,

    /// Fraction of velocity lost per tick
    #[serde(default = "default_velocity_decay")]
    pub velocity_decay: f64,

    /// Alpha restored when a drag starts
    #[serde(default = "default_reheat_alpha")]
    pub reheat_alpha: f64,

    /// Many-body strength exerted by topic nodes (negative repels)
    #[serde(default = "default_charge_topic")]
    pub charge_topic: f64,

    #[serde(default = "default_charge_subtopic")]
    pub charge_subtopic: f64,

    #[serde(default = "default_charge_subsubtopic")]
    pub charge_subsubtopic: f64,

    #[serde(default = "default_hierarchy_distance")]
    pub hierarchy_distance: f64,

    #[serde(default = "default_hierarchy_strength")]
    pub hierarchy_strength: f64,

    #[serde(default = "default_cooccurrence_distance")]
    pub cooccurrence_distance: f64,

    #[serde(default = "default_cooccurrence_strength")]
    pub cooccurrence_strength: f64,

    /// Extra gap kept between colliding circles
    #[serde(default = "default_collision_padding")]
    pub collision_padding: f64,

    #[serde(default = "default_collision_strength")]
    pub collision_strength: f64,
}

fn default_alpha_min() -> f64 {
    0.001
}

fn default_alpha_decay() -> f64 {
    // reaches alpha_min after ~300 ticks
    1.0 - 0.001f64.powf(1.0 / 300.0)
}

fn default_velocity_decay() -> f64 {
    0.4
}

fn default_reheat_alpha() -> f64 {
    0.3
}

fn default_charge_topic() -> f64 {
    -400.0
}

fn default_charge_subtopic() -> f64 {
    -180.0
}

fn default_charge_subsubtopic() -> f64 {
    -60.0
}

fn default_hierarchy_distance() -> f64 {
    50.0
}

fn default_hierarchy_strength() -> f64 {
    0.9
}

fn default_cooccurrence_distance() -> f64 {
    240.0
}

fn default_cooccurrence_strength() -> f64 {
    0.05
}

fn default_collision_padding() -> f64 {
    3.0
}

fn default_collision_strength() -> f64 {
    0.7
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha_min: default_alpha_min(),
            alpha_decay: default_alpha_decay(),
            velocity_decay: default_velocity_decay(),
            reheat_alpha: default_reheat_alpha(),
            charge_topic: default_charge_topic(),
            charge_subtopic: default_charge_subtopic(),
            charge_subsubtopic: default_charge_subsubtopic(),
            hierarchy_distance: default_hierarchy_distance(),
            hierarchy_strength: default_hierarchy_strength(),
            cooccurrence_distance: default_cooccurrence_distance(),
            cooccurrence_strength: default_cooccurrence_strength(),
            collision_padding: default_collision_padding(),
            collision_strength: default_collision_strength(),
        }
    }
}

impl SimulationConfig {
    /// Many-body strength for a node level.
    pub fn charge_for(&self, level: NodeLevel) -> f64 {
        match level {
            NodeLevel::Topic => self.charge_topic,
            NodeLevel::Subtopic => self.charge_subtopic,
            NodeLevel::Subsubtopic => self.charge_subsubtopic,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.alpha_decay > 0.0 && self.alpha_decay < 1.0) {
            return Err(format!("alpha_decay must be in (0, 1), got {}", self.alpha_decay));
        }
        if !(self.alpha_min > 0.0 && self.alpha_min < 1.0) {
            return Err(format!("alpha_min must be in (0, 1), got {}", self.alpha_min));
        }
        if !(0.0..1.0).contains(&self.velocity_decay) {
            return Err(format!(
                "velocity_decay must be in [0, 1), got {}",
                self.velocity_decay
            ));
        }
        for (name, value) in [
            ("hierarchy_strength", self.hierarchy_strength),
            ("cooccurrence_strength", self.cooccurrence_strength),
            ("collision_strength", self.collision_strength),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be 0.0-1.0, got {}", name, value));
            }
        }
        if self.hierarchy_distance <= 0.0 || self.cooccurrence_distance <= 0.0 {
            return Err("link distances must be > 0".to_string());
        }
        Ok(())
    }
}

/// Hover, drag and zoom behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Allowed zoom range `[min, max]`
    #[serde(default = "default_scale_extent")]
    pub scale_extent: [f64; 2],

    /// Whether the host may move pinned topic nodes
    #[serde(default)]
    pub allow_pinned_reposition: bool,

    /// Opacity of nodes and edges outside the hover neighborhood
    #[serde(default = "default_dimmed_opacity")]
    pub dimmed_opacity: f64,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,

    /// Stroke width of the hovered node
    #[serde(default = "default_highlight_stroke_width")]
    pub highlight_stroke_width: f64,
}

fn default_scale_extent() -> [f64; 2] {
    [0.2, 4.0]
}

fn default_dimmed_opacity() -> f64 {
    0.15
}

fn default_stroke_width() -> f64 {
    1.5
}

fn default_highlight_stroke_width() -> f64 {
    3.0
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            scale_extent: default_scale_extent(),
            allow_pinned_reposition: false,
            dimmed_opacity: default_dimmed_opacity(),
            stroke_width: default_stroke_width(),
            highlight_stroke_width: default_highlight_stroke_width(),
        }
    }
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), String> {
        let [min, max] = self.scale_extent;
        if !(min > 0.0 && min <= max) {
            return Err(format!(
                "scale_extent must satisfy 0 < min <= max, got [{}, {}]",
                min, max
            ));
        }
        if !(0.0..=1.0).contains(&self.dimmed_opacity) {
            return Err(format!(
                "dimmed_opacity must be 0.0-1.0, got {}",
                self.dimmed_opacity
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = VizConfig::default();
        config.validate().unwrap();
        assert_eq!(config.colors.reuse_threshold, 0.6);
        assert_eq!(config.interaction.scale_extent, [0.2, 4.0]);
        assert_eq!(config.layout.pattern, LayoutPattern::Spiral);
    }

    #[test]
    fn test_alpha_decay_reaches_min_in_300_ticks() {
        let sim = SimulationConfig::default();
        let alpha = (1.0 - sim.alpha_decay).powi(300);
        assert!((alpha - sim.alpha_min).abs() < 1e-9);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: VizConfig = serde_json::from_str(
            r#"{"layout": {"pattern": "serpentine", "direction": "newest_first"}, "colors": {"reuse_threshold": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.pattern, LayoutPattern::Serpentine);
        assert_eq!(config.layout.direction, LayoutDirection::NewestFirst);
        assert_eq!(config.layout.spacing, 140.0);
        assert_eq!(config.colors.reuse_threshold, 0.8);
        assert_eq!(config.colors.palette.len(), 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = VizConfig::default();
        config.colors.palette.clear();
        assert!(config.validate().is_err());

        let mut config = VizConfig::default();
        config.interaction.scale_extent = [4.0, 0.2];
        assert!(config.validate().is_err());

        let mut config = VizConfig::default();
        config.radius.subtopic = RadiusRange::new(10.0, 5.0);
        assert!(config.validate().is_err());
    }
}
