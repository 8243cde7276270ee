//! Resolved styles consumed by rendering surfaces.

use crate::style::label::{TextAlign, TextBaseline};
use crate::style::symbolizer::{LineCap, LineJoin, PointShape};
use crate::Color;

/// Resolved style of a feature.
///
/// A surface draws the parts relevant for the feature geometry: `point` for points, `stroke` for
/// lines, `fill` and `stroke` for polygons. `text` is drawn at the feature anchor point for any
/// geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStyle {
    /// Marker of point geometries.
    pub point: Option<PointPaint>,
    /// Polygon fill.
    pub fill: Option<Color>,
    /// Line and polygon outline.
    pub stroke: Option<StrokePaint>,
    /// Label text.
    pub text: Option<TextPaint>,
}

/// Point marker paint.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPaint {
    /// Marker shape.
    pub shape: PointShape,
    /// Marker radius in pixels.
    pub radius: f64,
    /// Marker fill.
    pub fill: Color,
    /// Marker outline.
    pub stroke: Color,
    /// Outline width in pixels.
    pub stroke_width: f64,
    /// Rotation in degrees.
    pub rotation: f64,
}

/// Line paint.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePaint {
    /// Line color.
    pub color: Color,
    /// Width in pixels.
    pub width: f64,
    /// Dash pattern in pixels. Empty for solid lines.
    pub dash: Vec<f64>,
    /// Line end style.
    pub cap: LineCap,
    /// Line join style.
    pub join: LineJoin,
}

impl StrokePaint {
    /// Solid stroke with round caps and joins.
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: vec![],
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }
}

/// Label text paint.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPaint {
    /// Text to draw.
    pub text: String,
    /// CSS font string.
    pub font: String,
    /// Text color.
    pub fill: Color,
    /// Halo color.
    pub halo: Color,
    /// Halo width in pixels.
    pub halo_width: f64,
    /// Offset from the anchor point in pixels.
    pub offset: [f64; 2],
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Vertical alignment.
    pub baseline: TextBaseline,
}

/// Parses a dash pattern like `"5, 10"`. Malformed entries are skipped.
pub fn parse_dash_array(value: Option<&str>) -> Vec<f64> {
    value
        .map(|v| {
            v.split(',')
                .filter_map(|part| part.trim().parse::<f64>().ok())
                .filter(|len| len.is_finite() && *len >= 0.0)
                .collect()
        })
        .unwrap_or_default()
}
