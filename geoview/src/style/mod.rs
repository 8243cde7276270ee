//! Layer symbology: the user-facing [`Symbolizer`] and [`LabelConfig`] configuration, and the
//! [`Style`] objects it resolves into.
//!
//! Unlabeled layers with a single geometry kind resolve into [`Style::Static`], one style array
//! shared by all features. Labeled layers and layers mixing geometry kinds resolve into
//! [`Style::PerFeature`], which memoizes style arrays in a [`StyleCache`] keyed by
//! [`FeatureKey`].

mod cache;
mod label;
mod paint;
mod resolver;
mod symbolizer;

pub use cache::{FeatureKey, StyleArray, StyleCache};
pub use label::{FontWeight, LabelAnchor, LabelConfig, TextAlign, TextBaseline};
pub use paint::{parse_dash_array, PointPaint, RenderStyle, StrokePaint, TextPaint};
pub use resolver::{
    neutral_style, resolve_style, symbolizer_style, ResolvedStyle, Style, StyleFunction,
};
pub use symbolizer::{
    detect_geometry_kinds, first_geometry_kind, GeometryKind, GeometryKinds, LineCap, LineJoin,
    LineSymbolizer, PointShape, PointSymbolizer, PolygonSymbolizer, Symbolizer,
};
