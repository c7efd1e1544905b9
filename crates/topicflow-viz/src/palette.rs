//! Hex colors, shading and the default palette.

use serde::{Deserialize, Serialize};

use crate::error::VizError;

/// Ten well-separated categorical colors.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
    "#bcbd22", "#393b79",
];

/// Color for nodes that have no colored topic ancestor.
pub const NEUTRAL_COLOR: &str = "#b0b0b0";

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse(hex: &str) -> Result<Self, VizError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VizError::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| VizError::InvalidColor(hex.to_string()))
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Mix toward white; `factor` 0 keeps the color, 1 yields white.
    pub fn lighten(&self, factor: f64) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let mix = |c: u8| (c as f64 + (255.0 - c as f64) * f).round() as u8;
        Self {
            r: mix(self.r),
            g: mix(self.g),
            b: mix(self.b),
        }
    }
}

/// Lighten a hex color string.
pub fn lighten_hex(hex: &str, factor: f64) -> Result<String, VizError> {
    Ok(Rgb::parse(hex)?.lighten(factor).to_hex())
}
