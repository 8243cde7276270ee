//! Layer symbol configuration as edited by the user.

use geojson::{FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

/// Geometry kind a symbolizer applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    /// Points and multipoints.
    Point,
    /// Line strings and multi line strings.
    Line,
    /// Polygons and multipolygons.
    Polygon,
}

impl GeometryKind {
    /// Guesses the kind from a geometry type name as reported by data sources (`"MultiPolygon"`,
    /// `"LINESTRING"`, `"3D Point"` etc). Matching is a case-insensitive substring search.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.contains("point") {
            Some(Self::Point)
        } else if name.contains("line") {
            Some(Self::Line)
        } else if name.contains("polygon") {
            Some(Self::Polygon)
        } else {
            None
        }
    }

    /// Kind of a GeoJSON geometry. Geometry collections take the kind of their first member.
    pub fn of_geometry(geometry: &Geometry) -> Option<Self> {
        Self::of_value(&geometry.value)
    }

    fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Point(_) | Value::MultiPoint(_) => Some(Self::Point),
            Value::LineString(_) | Value::MultiLineString(_) => Some(Self::Line),
            Value::Polygon(_) | Value::MultiPolygon(_) => Some(Self::Polygon),
            Value::GeometryCollection(items) => items.first().and_then(Self::of_geometry),
        }
    }

    /// Name used as the style cache key of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
        }
    }
}

/// Geometry kinds present in a feature collection.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct GeometryKinds {
    /// Collection has point features.
    pub has_point: bool,
    /// Collection has line features.
    pub has_line: bool,
    /// Collection has polygon features.
    pub has_polygon: bool,
}

impl GeometryKinds {
    /// Number of different kinds present.
    pub fn count(&self) -> usize {
        [self.has_point, self.has_line, self.has_polygon]
            .iter()
            .filter(|v| **v)
            .count()
    }
}

/// Scans the collection for the geometry kinds it contains. Stops as soon as all three were seen.
pub fn detect_geometry_kinds(collection: &FeatureCollection) -> GeometryKinds {
    let mut kinds = GeometryKinds::default();
    for feature in &collection.features {
        match feature.geometry.as_ref().and_then(GeometryKind::of_geometry) {
            Some(GeometryKind::Point) => kinds.has_point = true,
            Some(GeometryKind::Line) => kinds.has_line = true,
            Some(GeometryKind::Polygon) => kinds.has_polygon = true,
            None => {}
        }

        if kinds.count() == 3 {
            break;
        }
    }

    kinds
}

/// Kind of the first feature with a geometry.
pub fn first_geometry_kind(collection: &FeatureCollection) -> Option<GeometryKind> {
    collection
        .features
        .iter()
        .find_map(|f| f.geometry.as_ref().and_then(GeometryKind::of_geometry))
}

/// Symbol configuration of a layer, discriminated by geometry kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Symbolizer {
    /// Marker symbol.
    Point(PointSymbolizer),
    /// Stroke symbol.
    Line(LineSymbolizer),
    /// Fill and outline symbol.
    Polygon(PolygonSymbolizer),
}

impl Symbolizer {
    /// Default symbolizer for the given kind.
    pub fn default_for(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Point => Self::Point(PointSymbolizer::default()),
            GeometryKind::Line => Self::Line(LineSymbolizer::default()),
            GeometryKind::Polygon => Self::Polygon(PolygonSymbolizer::default()),
        }
    }

    /// Geometry kind the symbolizer is designed for.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::Line(_) => GeometryKind::Line,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }
}

/// Shape of a point marker.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PointShape {
    #[default]
    Circle,
    Square,
    Triangle,
    Star,
    Cross,
    Diamond,
}

/// Line end style.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Line join style.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LineJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

/// Point symbol. Colors are CSS strings and are parsed when the style is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointSymbolizer {
    /// Marker shape.
    pub shape: PointShape,
    /// Marker size in pixels.
    pub size: f64,
    /// Fill color.
    pub fill_color: String,
    /// Fill opacity in `[0, 1]`.
    pub fill_opacity: f64,
    /// Outline color.
    pub stroke_color: String,
    /// Outline width in pixels.
    pub stroke_width: f64,
    /// Outline opacity in `[0, 1]`.
    pub stroke_opacity: f64,
    /// Rotation in degrees.
    pub rotation: f64,
}

impl Default for PointSymbolizer {
    fn default() -> Self {
        Self {
            shape: PointShape::Circle,
            size: 8.0,
            fill_color: "#3388ff".into(),
            fill_opacity: 0.8,
            stroke_color: "#0066cc".into(),
            stroke_width: 2.0,
            stroke_opacity: 1.0,
            rotation: 0.0,
        }
    }
}

/// Line symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineSymbolizer {
    /// Line color.
    pub color: String,
    /// Line width in pixels.
    pub width: f64,
    /// Line opacity in `[0, 1]`.
    pub opacity: f64,
    /// Dash pattern as a comma separated list of lengths, e.g. `"5, 10"`.
    pub dash_array: Option<String>,
    /// Line end style.
    pub line_cap: LineCap,
    /// Line join style.
    pub line_join: LineJoin,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        Self {
            color: "#3388ff".into(),
            width: 2.0,
            opacity: 1.0,
            dash_array: None,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
        }
    }
}

/// Polygon symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolygonSymbolizer {
    /// Fill color.
    pub fill_color: String,
    /// Fill opacity in `[0, 1]`.
    pub fill_opacity: f64,
    /// Outline color.
    pub stroke_color: String,
    /// Outline width in pixels.
    pub stroke_width: f64,
    /// Outline opacity in `[0, 1]`.
    pub stroke_opacity: f64,
    /// Outline dash pattern, e.g. `"4, 2"`.
    pub stroke_dash_array: Option<String>,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill_color: "#3388ff".into(),
            fill_opacity: 0.5,
            stroke_color: "#0066cc".into(),
            stroke_width: 2.0,
            stroke_opacity: 1.0,
            stroke_dash_array: None,
        }
    }
}
