//! Style primitives for the cluster sub-layers.
//!
//! Colors are `[r, g, b, a]` with sRGB channels scaled from `0..=255` to
//! `0.0..=1.0`; no linearization is applied.

use serde::{Deserialize, Serialize};

/// 8-bit RGB plus alpha, as written in CSS `rgba()`.
pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> [f32; 4] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a]
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: [f32; 4],
}

impl Fill {
    pub const fn new(color: [f32; 4]) -> Self {
        Self { color }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: [f32; 4],
    pub width: f32,
}

impl Stroke {
    pub const fn new(color: [f32; 4], width: f32) -> Self {
        Self { color, width }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleStyle {
    /// Screen pixels.
    pub radius: f32,
    pub fill: Fill,
}

impl CircleStyle {
    pub const fn new(radius: f32, fill: Fill) -> Self {
        Self { radius, fill }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub text: String,
    pub fill: Fill,
    pub stroke: Stroke,
}

/// Marker image for a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub src: String,
    /// Fractional anchor inside the image, `[0.5, 1.0]` is bottom-center.
    pub anchor: [f32; 2],
    pub scale: f32,
}

impl Icon {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            anchor: [0.5, 1.0],
            scale: 1.0,
        }
    }
}

/// Everything the cluster layer draws that is not a member icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterStyles {
    pub convex_hull_stroke: Stroke,
    pub convex_hull_fill: Fill,
    pub outer_circle: CircleStyle,
    pub inner_circle: CircleStyle,
    pub text_fill: Fill,
    pub text_stroke: Stroke,
}

impl Default for ClusterStyles {
    fn default() -> Self {
        Self {
            convex_hull_stroke: Stroke::new(rgba(204, 85, 0, 1.0), 1.5),
            convex_hull_fill: Fill::new(rgba(255, 153, 0, 0.4)),
            outer_circle: CircleStyle::new(20.0, Fill::new(rgba(255, 153, 102, 0.3))),
            inner_circle: CircleStyle::new(14.0, Fill::new(rgba(255, 165, 0, 0.7))),
            text_fill: Fill::new(rgba(255, 255, 255, 1.0)),
            text_stroke: Stroke::new(rgba(0, 0, 0, 0.6), 3.0),
        }
    }
}

impl ClusterStyles {
    /// Count label drawn on the inner circle.
    pub fn count_text(&self, count: usize) -> TextStyle {
        TextStyle {
            text: count.to_string(),
            fill: self.text_fill,
            stroke: self.text_stroke,
        }
    }
}
