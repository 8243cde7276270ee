//! [Layers](Layer) specify a data source and the way the data should be drawn on the map.
//!
//! Layers are plain data: the engine never stores anything inside them except loaded geometry.
//! They are arranged into a [`LayerTree`], which the
//! [`RenderReconciler`](crate::reconciler::RenderReconciler) mirrors onto a
//! [`RenderSurface`](crate::render::RenderSurface).

use std::sync::Arc;

use geojson::FeatureCollection;
use geoview_types::Extent;
use serde::{Deserialize, Serialize};

use crate::style::{LabelConfig, Symbolizer};

mod tree;

pub use tree::{FlatLayer, LayerTree};

/// Kind of a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    /// Features fetched from a vector data source.
    Vector,
    /// Raster tiles downloaded by a URL template.
    RasterTile,
    /// Container of other layers. Never drawn by itself.
    Group,
}

/// Reference to the data of a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerSource {
    /// Path of a vector data source.
    pub path: Option<String>,
    /// URL template of a tile source, e.g. `https://{s}.tile.org/{z}/{x}/{y}.png`.
    pub url: Option<String>,
    /// Index of the sub-layer inside a multi-layer source.
    pub sub_layer: Option<u32>,
    /// Projection code of the source data. The engine data projection is used if not set.
    pub projection: Option<String>,
}

/// A named, styleable unit of map content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique id of the layer in the whole tree.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Kind of the layer.
    pub kind: LayerKind,
    /// Basemap layers are kept at the bottom of the tree and are ignored by full extent and auto
    /// zoom.
    #[serde(default)]
    pub basemap: bool,
    /// Data source.
    #[serde(default)]
    pub source: LayerSource,
    /// Visibility flag of the layer itself. A layer is drawn only if all its ancestors are visible
    /// too.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Opacity in `[0, 1]`, multiplied with the opacity of the ancestor groups.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Symbol configuration. Default symbol for the detected geometry kind is used if not set.
    #[serde(default)]
    pub symbolizer: Option<Symbolizer>,
    /// Label configuration.
    #[serde(default, rename = "labelConfig")]
    pub label: Option<LabelConfig>,
    /// Loaded features, in the layer source projection. `None` until loaded.
    #[serde(default)]
    pub geometry: Option<Arc<FeatureCollection>>,
    /// If set, the geometry is fetched only once the layer becomes visible.
    #[serde(default)]
    pub deferred_load: bool,
    /// Bounding box of the data in the layer source projection.
    #[serde(default)]
    pub extent: Option<Extent>,
    /// Child layers of a group, top first.
    #[serde(default)]
    pub children: Vec<Layer>,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

impl Layer {
    fn new(id: impl Into<String>, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            basemap: false,
            source: LayerSource::default(),
            visible: true,
            opacity: 1.0,
            symbolizer: None,
            label: None,
            geometry: None,
            deferred_load: false,
            extent: None,
            children: vec![],
        }
    }

    /// Creates a vector layer reading from the given path.
    pub fn vector(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        let mut layer = Self::new(id, name, LayerKind::Vector);
        layer.source.path = Some(path.into());
        layer
    }

    /// Creates a raster tile layer with the given URL template.
    pub fn raster_tile(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let mut layer = Self::new(id, name, LayerKind::RasterTile);
        layer.source.url = Some(url.into());
        layer
    }

    /// Creates a basemap tile layer.
    pub fn basemap(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            basemap: true,
            ..Self::raster_tile(id, name, url)
        }
    }

    /// Creates a group of layers.
    pub fn group(id: impl Into<String>, name: impl Into<String>, children: Vec<Layer>) -> Self {
        Self {
            children,
            ..Self::new(id, name, LayerKind::Group)
        }
    }

    /// Sets loaded geometry.
    pub fn with_geometry(mut self, geometry: Arc<FeatureCollection>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets symbol configuration.
    pub fn with_symbolizer(mut self, symbolizer: Symbolizer) -> Self {
        self.symbolizer = Some(symbolizer);
        self
    }

    /// Sets label configuration.
    pub fn with_label(mut self, label: LabelConfig) -> Self {
        self.label = Some(label);
        self
    }

    /// Sets the visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets opacity, clamped to `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = clamp_opacity(opacity);
        self
    }

    /// Marks the geometry to be loaded only when the layer becomes visible.
    pub fn with_deferred_load(mut self, deferred: bool) -> Self {
        self.deferred_load = deferred;
        self
    }

    /// Sets data extent.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Sets projection code of the source data.
    pub fn with_projection(mut self, code: impl Into<String>) -> Self {
        self.source.projection = Some(code.into());
        self
    }

    /// Sets sub-layer index of a multi-layer source.
    pub fn with_sub_layer(mut self, index: u32) -> Self {
        self.source.sub_layer = Some(index);
        self
    }

    /// Returns true for group layers.
    pub fn is_group(&self) -> bool {
        self.kind == LayerKind::Group
    }

    /// Projection of the layer data: its own source projection, or `fallback` if not declared.
    pub fn projection<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.source.projection.as_deref().unwrap_or(fallback)
    }
}

pub(crate) fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}
