use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use geojson::{Feature, FeatureCollection};

use crate::error::{Diagnostic, DiagnosticKind};
use crate::layer::Layer;
use crate::style::cache::{FeatureKey, StyleArray, StyleCache};
use crate::style::label::LabelConfig;
use crate::style::paint::{parse_dash_array, PointPaint, RenderStyle, StrokePaint, TextPaint};
use crate::style::symbolizer::{
    detect_geometry_kinds, first_geometry_kind, GeometryKind, LineSymbolizer, PointSymbolizer,
    PolygonSymbolizer, Symbolizer,
};
use crate::Color;

/// Style attached to a render object.
#[derive(Clone)]
pub enum Style {
    /// One style array shared by every feature of the layer.
    Static(StyleArray),
    /// Style computed per feature through a keyed cache.
    PerFeature(StyleFunction),
}

impl Style {
    /// Style array to draw the given feature with.
    pub fn for_feature(&self, feature: &Feature) -> StyleArray {
        match self {
            Self::Static(styles) => styles.clone(),
            Self::PerFeature(function) => function.resolve(feature),
        }
    }

    /// Returns true for [`Style::Static`].
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Returns true if both values refer to the same style instance.
    pub fn ptr_eq(&self, other: &Style) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => Arc::ptr_eq(a, b),
            (Self::PerFeature(a), Self::PerFeature(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl Debug for Style {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(styles) => f.debug_tuple("Static").field(styles).finish(),
            Self::PerFeature(function) => f
                .debug_struct("PerFeature")
                .field("cached", &function.cache().len())
                .finish(),
        }
    }
}

/// Per-feature style function backed by a [`StyleCache`].
#[derive(Clone)]
pub struct StyleFunction {
    inner: Arc<StyleFunctionInner>,
}

struct StyleFunctionInner {
    keying: Keying,
    cache: StyleCache,
}

enum Keying {
    Label { field: String, base: RenderStyle, label: ResolvedLabel },
    Geometry,
}

#[derive(Debug, Clone)]
struct ResolvedLabel {
    font: String,
    fill: Color,
    halo: Color,
    halo_width: f64,
    offset: [f64; 2],
    config: LabelConfig,
}

impl StyleFunction {
    fn new(keying: Keying) -> Self {
        Self {
            inner: Arc::new(StyleFunctionInner {
                keying,
                cache: StyleCache::new(),
            }),
        }
    }

    /// Cache key of the feature.
    pub fn key(&self, feature: &Feature) -> FeatureKey {
        match &self.inner.keying {
            Keying::Label { field, .. } => FeatureKey::from_field(feature, field),
            Keying::Geometry => FeatureKey::from_geometry(feature),
        }
    }

    /// Style array of the feature, from cache if possible.
    pub fn resolve(&self, feature: &Feature) -> StyleArray {
        let key = self.key(feature);
        self.inner
            .cache
            .get_or_insert_with(key, |key| self.build(key))
    }

    /// Cache of the function.
    pub fn cache(&self) -> &StyleCache {
        &self.inner.cache
    }

    fn build(&self, key: &FeatureKey) -> StyleArray {
        match (&self.inner.keying, key) {
            (Keying::Label { base, label, .. }, key) => {
                let mut styles = vec![base.clone()];
                if let Some(text) = key.label_text() {
                    let (align, baseline) = label.config.anchor.alignment();
                    styles.push(RenderStyle {
                        text: Some(TextPaint {
                            text: text.to_string(),
                            font: label.font.clone(),
                            fill: label.fill,
                            halo: label.halo,
                            halo_width: label.halo_width,
                            offset: label.offset,
                            align,
                            baseline,
                        }),
                        ..Default::default()
                    });
                }
                styles.into()
            }
            (Keying::Geometry, FeatureKey::Geometry(Some(kind))) => {
                Arc::from(vec![symbolizer_style(&Symbolizer::default_for(*kind), &mut |_| {})])
            }
            (Keying::Geometry, _) => Arc::from(vec![neutral_style()]),
        }
    }
}

/// Style of a layer together with the configuration it was resolved from.
///
/// Keeping the resolved style lets the next resolution reuse it, and its cache, as long as the
/// symbol and label configuration stay the same.
#[derive(Debug, Clone)]
pub struct ResolvedStyle {
    symbolizer: Option<Symbolizer>,
    label: Option<LabelConfig>,
    style: Style,
}

impl ResolvedStyle {
    /// The style to attach to the render object.
    pub fn style(&self) -> &Style {
        &self.style
    }

    fn matches(&self, layer: &Layer) -> bool {
        self.symbolizer == layer.symbolizer && self.label == layer.label
    }
}

/// Converts the style configuration of a layer into a render style.
///
/// If `previous` was resolved from the same symbolizer and label configuration, it is returned
/// unchanged. Otherwise a new style is built and any per-feature cache starts empty. Malformed
/// colors fall back to defaults and are reported into `diagnostics`.
pub fn resolve_style(
    layer: &Layer,
    previous: Option<&ResolvedStyle>,
    diagnostics: &mut Vec<Diagnostic>,
) -> ResolvedStyle {
    if let Some(previous) = previous {
        if previous.matches(layer) {
            return previous.clone();
        }
        log::debug!("Style of layer {} changed, dropping its style cache", layer.id);
    }

    let mut report = |message: String| {
        diagnostics.push(Diagnostic::new(
            Some(&layer.id),
            DiagnosticKind::Style,
            message,
        ))
    };

    let geometry = layer.geometry.as_deref();
    let style = match layer.label.as_ref().filter(|label| label.is_active()) {
        Some(label) => {
            let base = match &layer.symbolizer {
                Some(symbolizer) => symbolizer_style(symbolizer, &mut report),
                None => default_style(geometry),
            };
            Style::PerFeature(StyleFunction::new(Keying::Label {
                field: label.field.clone(),
                base,
                label: resolve_label(label, &mut report),
            }))
        }
        None => match &layer.symbolizer {
            Some(symbolizer) => Style::Static(Arc::from(vec![symbolizer_style(
                symbolizer,
                &mut report,
            )])),
            None => match geometry {
                Some(collection) if detect_geometry_kinds(collection).count() > 1 => {
                    Style::PerFeature(StyleFunction::new(Keying::Geometry))
                }
                _ => Style::Static(Arc::from(vec![default_style(geometry)])),
            },
        },
    };

    ResolvedStyle {
        symbolizer: layer.symbolizer.clone(),
        label: layer.label.clone(),
        style,
    }
}

fn default_style(geometry: Option<&FeatureCollection>) -> RenderStyle {
    match geometry.and_then(first_geometry_kind) {
        Some(kind) => symbolizer_style(&Symbolizer::default_for(kind), &mut |_| {}),
        None => neutral_style(),
    }
}

/// Style used when neither a symbolizer nor a geometry kind is known. Draws any geometry.
pub fn neutral_style() -> RenderStyle {
    let point = point_style(&PointSymbolizer::default(), &mut |_| {});
    let polygon = polygon_style(&PolygonSymbolizer::default(), &mut |_| {});
    RenderStyle {
        stroke: Some(StrokePaint::solid(Color::DEFAULT_FILL, 2.0)),
        ..RenderStyle {
            point: point.point,
            ..polygon
        }
    }
}

fn parse_color(value: &str, fallback: Color, report: &mut impl FnMut(String)) -> Color {
    match Color::parse(value) {
        Some(color) => color,
        None => {
            report(format!(
                "malformed color '{value}', using {}",
                fallback.to_hex()
            ));
            fallback
        }
    }
}

fn opacity(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn positive(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        default
    }
}

/// Converts a symbolizer into its render style.
pub fn symbolizer_style(symbolizer: &Symbolizer, report: &mut impl FnMut(String)) -> RenderStyle {
    match symbolizer {
        Symbolizer::Point(point) => point_style(point, report),
        Symbolizer::Line(line) => line_style(line, report),
        Symbolizer::Polygon(polygon) => polygon_style(polygon, report),
    }
}

fn point_style(point: &PointSymbolizer, report: &mut impl FnMut(String)) -> RenderStyle {
    let fill = parse_color(&point.fill_color, Color::DEFAULT_FILL, report);
    let stroke = parse_color(&point.stroke_color, Color::DEFAULT_STROKE, report);
    RenderStyle {
        point: Some(PointPaint {
            shape: point.shape,
            radius: positive(point.size, 8.0) / 2.0,
            fill: fill.with_opacity(opacity(point.fill_opacity)),
            stroke: stroke.with_opacity(opacity(point.stroke_opacity)),
            stroke_width: positive(point.stroke_width, 2.0),
            rotation: if point.rotation.is_finite() {
                point.rotation
            } else {
                0.0
            },
        }),
        ..Default::default()
    }
}

fn line_style(line: &LineSymbolizer, report: &mut impl FnMut(String)) -> RenderStyle {
    let color = parse_color(&line.color, Color::DEFAULT_FILL, report);
    RenderStyle {
        stroke: Some(StrokePaint {
            color: color.with_opacity(opacity(line.opacity)),
            width: positive(line.width, 2.0),
            dash: parse_dash_array(line.dash_array.as_deref()),
            cap: line.line_cap,
            join: line.line_join,
        }),
        ..Default::default()
    }
}

fn polygon_style(polygon: &PolygonSymbolizer, report: &mut impl FnMut(String)) -> RenderStyle {
    let fill = parse_color(&polygon.fill_color, Color::DEFAULT_FILL, report);
    let stroke = parse_color(&polygon.stroke_color, Color::DEFAULT_STROKE, report);
    RenderStyle {
        fill: Some(fill.with_opacity(opacity(polygon.fill_opacity))),
        stroke: Some(StrokePaint {
            dash: parse_dash_array(polygon.stroke_dash_array.as_deref()),
            ..StrokePaint::solid(
                stroke.with_opacity(opacity(polygon.stroke_opacity)),
                positive(polygon.stroke_width, 2.0),
            )
        }),
        ..Default::default()
    }
}

fn resolve_label(label: &LabelConfig, report: &mut impl FnMut(String)) -> ResolvedLabel {
    let defaults = LabelConfig::default();
    let font_size = positive(label.font_size, defaults.font_size);
    ResolvedLabel {
        font: LabelConfig {
            font_size,
            ..label.clone()
        }
        .font(),
        fill: parse_color(&label.font_color, Color::BLACK, report),
        halo: parse_color(&label.halo_color, Color::WHITE, report),
        halo_width: positive(label.halo_width, defaults.halo_width),
        offset: if label.offset.iter().all(|v| v.is_finite()) {
            label.offset
        } else {
            defaults.offset
        },
        config: label.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::label::{TextAlign, TextBaseline};
    use crate::style::LabelAnchor;

    fn collection(json: &str) -> Arc<FeatureCollection> {
        Arc::new(serde_json::from_str(json).unwrap())
    }

    fn points() -> Arc<FeatureCollection> {
        collection(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "a"}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {"name": "a"}, "geometry": {"type": "Point", "coordinates": [1, 1]}},
                {"type": "Feature", "properties": {"name": "b"}, "geometry": {"type": "Point", "coordinates": [2, 2]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [3, 3]}}
            ]}"#,
        )
    }

    fn labeled_layer() -> Layer {
        Layer::vector("l", "Labeled", "/data/points.shp")
            .with_geometry(points())
            .with_label(LabelConfig {
                anchor: LabelAnchor::TopLeft,
                ..LabelConfig::for_field("name")
            })
    }

    #[test]
    fn unlabeled_layer_gets_static_style() {
        let layer = Layer::vector("l", "Points", "/p.shp")
            .with_geometry(points())
            .with_symbolizer(Symbolizer::Point(PointSymbolizer::default()));
        let resolved = resolve_style(&layer, None, &mut vec![]);

        assert!(resolved.style().is_static());
        let geometry = layer.geometry.as_ref().unwrap();
        let first = resolved.style().for_feature(&geometry.features[0]);
        let second = resolved.style().for_feature(&geometry.features[3]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first[0].point.as_ref().unwrap().radius, 4.0);
    }

    #[test]
    fn equal_label_values_share_style_instance() {
        let layer = labeled_layer();
        let resolved = resolve_style(&layer, None, &mut vec![]);
        let features = &layer.geometry.as_ref().unwrap().features;
        let style = resolved.style();

        let a1 = style.for_feature(&features[0]);
        let a2 = style.for_feature(&features[1]);
        let b = style.for_feature(&features[2]);
        let missing = style.for_feature(&features[3]);

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(a1.len(), 2);
        assert_eq!(missing.len(), 1);

        let text = a1[1].text.as_ref().unwrap();
        assert_eq!(text.text, "a");
        assert_eq!(text.font, "normal 12px sans-serif");
        assert_eq!((text.align, text.baseline), (TextAlign::Left, TextBaseline::Top));

        let Style::PerFeature(function) = style else {
            panic!("labeled layer must have a per-feature style");
        };
        assert_eq!(function.cache().len(), 3);
    }

    #[test]
    fn unchanged_config_reuses_style() {
        let layer = labeled_layer();
        let first = resolve_style(&layer, None, &mut vec![]);
        let second = resolve_style(&layer, Some(&first), &mut vec![]);
        assert!(first.style().ptr_eq(second.style()));
    }

    #[test]
    fn config_change_discards_cache() {
        let mut layer = labeled_layer();
        let first = resolve_style(&layer, None, &mut vec![]);
        let feature = &layer.geometry.as_ref().unwrap().features[0];
        let before = first.style().for_feature(feature);

        layer.label = Some(LabelConfig {
            font_size: 20.0,
            ..LabelConfig::for_field("name")
        });
        let second = resolve_style(&layer, Some(&first), &mut vec![]);
        let after = second.style().for_feature(feature);

        assert!(!first.style().ptr_eq(second.style()));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after[1].text.as_ref().unwrap().font, "normal 20px sans-serif");
    }

    #[test]
    fn mixed_geometry_is_styled_by_kind() {
        let layer = Layer::vector("m", "Mixed", "/m.geojson").with_geometry(collection(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
            ]}"#,
        ));
        let resolved = resolve_style(&layer, None, &mut vec![]);
        let features = &layer.geometry.as_ref().unwrap().features;

        let point = resolved.style().for_feature(&features[0]);
        let line = resolved.style().for_feature(&features[1]);
        assert!(point[0].point.is_some());
        assert!(line[0].point.is_none());
        assert!(line[0].stroke.is_some());
    }

    #[test]
    fn empty_layer_gets_neutral_style() {
        let layer = Layer::vector("e", "Empty", "/e.shp");
        let resolved = resolve_style(&layer, None, &mut vec![]);
        let Style::Static(styles) = resolved.style() else {
            panic!("expected static style");
        };
        assert_eq!(styles[0], neutral_style());
    }

    #[test]
    fn malformed_color_falls_back_with_diagnostic() {
        let layer = Layer::vector("p", "Polygons", "/p.shp").with_symbolizer(Symbolizer::Polygon(
            PolygonSymbolizer {
                fill_color: "not-a-color".into(),
                ..Default::default()
            },
        ));
        let mut diagnostics = vec![];
        let resolved = resolve_style(&layer, None, &mut diagnostics);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Style);
        let Style::Static(styles) = resolved.style() else {
            panic!("expected static style");
        };
        assert_eq!(styles[0].fill, Some(Color::DEFAULT_FILL.with_opacity(0.5)));
    }
}
