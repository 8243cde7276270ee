//! Abstraction of the imperative rendering library the engine draws with.
//!
//! The engine never draws anything itself. It creates
//! [render objects](RenderSurface::create_object) on a [`RenderSurface`], keeps their style, draw
//! order and visibility in sync with the layer tree, and asks the surface which features are
//! under a pixel. Any concrete map library is plugged in by implementing the trait;
//! [`MemorySurface`] is an in-memory implementation.

use std::sync::Arc;

use geojson::{Feature, FeatureCollection};

use crate::style::Style;
use crate::view::{MapView, Point2d};

mod memory;

pub use memory::{MemoryObject, MemorySurface};

/// Handle of a render object created on a surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderObjectId(pub u64);

/// Handle of an overlay label created on a surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

/// Data drawn by a render object.
#[derive(Debug, Clone)]
pub enum RenderSource {
    /// Features in the map projection.
    Vector {
        /// The features.
        features: Arc<FeatureCollection>,
    },
    /// Raster tiles loaded by a URL template. `{0-3}` style ranges expand into subdomains.
    RasterTiles {
        /// URL template.
        url: String,
    },
}

impl RenderSource {
    /// Vector source with no features.
    pub fn empty_vector() -> Self {
        Self::Vector {
            features: Arc::new(empty_collection()),
        }
    }
}

/// Feature collection with no features.
pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![],
        foreign_members: None,
    }
}

/// Everything needed to create a render object.
#[derive(Debug, Clone)]
pub struct RenderObjectSpec {
    /// Drawn data.
    pub source: RenderSource,
    /// Style of vector features. Ignored for raster sources.
    pub style: Option<Style>,
    /// Draw order. Objects with higher values are drawn on top.
    pub z_index: i32,
    /// Visibility.
    pub visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

/// A feature found under a pixel.
#[derive(Debug, Clone)]
pub struct SurfaceHit {
    /// Object the feature belongs to.
    pub object: RenderObjectId,
    /// The feature, in the map projection.
    pub feature: Feature,
    /// Index of the feature in the object's collection.
    pub feature_index: usize,
}

/// How an overlay label is placed relative to its anchor point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverlayPositioning {
    /// Label is centered horizontally above the anchor.
    BottomCenter,
    /// Label is centered on the anchor.
    Center,
}

/// Text overlay anchored at a map position, so it moves with the map.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    /// Anchor in the map projection.
    pub position: [f64; 2],
    /// Label text. May contain line breaks.
    pub text: String,
    /// Placement relative to the anchor.
    pub positioning: OverlayPositioning,
    /// Offset from the anchor in pixels.
    pub offset: [f64; 2],
}

/// Imperative rendering surface.
///
/// Calls with an unknown handle are ignored.
pub trait RenderSurface {
    /// Creates a render object.
    fn create_object(&mut self, spec: RenderObjectSpec) -> RenderObjectId;
    /// Destroys a render object.
    fn destroy_object(&mut self, id: RenderObjectId);
    /// Replaces the style of a vector object.
    fn set_style(&mut self, id: RenderObjectId, style: Style);
    /// Changes draw order of an object.
    fn set_z_index(&mut self, id: RenderObjectId, z_index: i32);
    /// Shows or hides an object.
    fn set_visible(&mut self, id: RenderObjectId, visible: bool);
    /// Changes opacity of an object.
    fn set_opacity(&mut self, id: RenderObjectId, opacity: f64);
    /// Replaces the features of a vector object.
    fn set_features(&mut self, id: RenderObjectId, features: Arc<FeatureCollection>);
    /// Sets the displayed area.
    fn set_view(&mut self, view: &MapView);
    /// Features of visible vector objects within `tolerance` pixels of `pixel`, topmost first.
    fn hit_test(&self, pixel: Point2d, tolerance: f64) -> Vec<SurfaceHit>;
    /// Adds a map-anchored text overlay.
    fn add_label(&mut self, label: OverlayLabel) -> OverlayId;
    /// Removes a text overlay.
    fn remove_label(&mut self, id: OverlayId);
}
