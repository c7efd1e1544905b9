//! Analytic coordinates for pinned topic nodes, initial positions for free
//! nodes and node radii.

use std::f64::consts::{PI, TAU};

use topicflow_types::NodeLevel;

use crate::config::{CanvasConfig, LayoutConfig, LayoutDirection, LayoutPattern, RadiusConfig};

/// Golden angle in radians, used to scatter free nodes around a parent.
const GOLDEN_ANGLE: f64 = PI * (3.0 - 2.236_067_977_499_79);

/// Path slot for a topic's temporal position.
pub fn slot_for(position: usize, total: usize, direction: LayoutDirection) -> usize {
    match direction {
        LayoutDirection::OldestFirst => position,
        LayoutDirection::NewestFirst => total.saturating_sub(1).saturating_sub(position),
    }
}

/// Coordinates of path slot `slot` out of `total`.
pub fn pinned_position(slot: usize, total: usize, canvas: &CanvasConfig, config: &LayoutConfig) -> (f64, f64) {
    let slot = slot.min(total.saturating_sub(1));
    match config.pattern {
        LayoutPattern::Spiral => spiral(slot, canvas, config),
        LayoutPattern::Serpentine => serpentine(slot, canvas, config),
    }
}

/// Coordinates of the topic at temporal `position`, honoring the direction.
pub fn topic_position(position: usize, total: usize, canvas: &CanvasConfig, config: &LayoutConfig) -> (f64, f64) {
    pinned_position(slot_for(position, total, config.direction), total, canvas, config)
}

fn spiral(slot: usize, canvas: &CanvasConfig, config: &LayoutConfig) -> (f64, f64) {
    let (cx, cy) = canvas.center();
    let theta = slot as f64 * config.angle_step;
    let r = config.spacing * config.expansion.powf(theta / TAU);
    (
        cx + config.offset_x + r * theta.cos(),
        cy + config.offset_y + r * theta.sin(),
    )
}

/// Slots per serpentine row for a canvas width.
pub fn serpentine_columns(canvas: &CanvasConfig, config: &LayoutConfig) -> usize {
    (((canvas.width - config.spacing) / config.spacing).floor() as usize).max(1)
}

fn serpentine(slot: usize, canvas: &CanvasConfig, config: &LayoutConfig) -> (f64, f64) {
    let columns = serpentine_columns(canvas, config);
    let row = slot / columns;
    let mut column = slot % columns;
    if row % 2 == 1 {
        column = columns - 1 - column;
    }
    (
        config.spacing + column as f64 * config.spacing + config.offset_x,
        config.spacing + row as f64 * config.spacing + config.offset_y,
    )
}

/// Deterministic initial position of the `index`-th free child around its
/// parent.
pub fn phyllotaxis(parent: (f64, f64), index: usize, spread: f64) -> (f64, f64) {
    let angle = index as f64 * GOLDEN_ANGLE;
    let r = spread * ((index as f64) + 1.0).sqrt();
    (parent.0 + r * angle.cos(), parent.1 + r * angle.sin())
}

/// Frequency span of one level, for radius interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySpan {
    pub min: u64,
    pub max: u64,
}

impl FrequencySpan {
    pub fn of(frequencies: impl IntoIterator<Item = u64>) -> Option<Self> {
        frequencies.into_iter().fold(None, |span, f| match span {
            None => Some(Self { min: f, max: f }),
            Some(s) => Some(Self {
                min: s.min.min(f),
                max: s.max.max(f),
            }),
        })
    }
}

/// Radius for a node: linear in frequency within its level's range. A
/// degenerate span maps to the range minimum.
pub fn radius_for(frequency: u64, level: NodeLevel, span: Option<FrequencySpan>, config: &RadiusConfig) -> f64 {
    let range = config.for_level(level);
    let t = match span {
        Some(s) if s.max > s.min => {
            let clamped = frequency.clamp(s.min, s.max);
            (clamped - s.min) as f64 / (s.max - s.min) as f64
        }
        _ => 0.0,
    };
    range.min + (range.max - range.min) * t
}
