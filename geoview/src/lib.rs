//! Geoview is the engine behind an interactive GIS map view. It keeps a rendering surface in sync
//! with a hierarchical layer tree and turns pointer input into panning, zooming, feature
//! selection, inspection and on-map measurement.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use geojson::FeatureCollection;
//! use geoview::layer::Layer;
//! use geoview::projection::CrsRegistry;
//! use geoview::render::MemorySurface;
//! use geoview::{EngineConfig, MapEngine, MapTool};
//! # use geoview::error::GeoviewError;
//! # use geoview::service::*;
//! #
//! # struct NoData;
//! #
//! # #[async_trait::async_trait]
//! # impl GeodataService for NoData {
//! #     async fn open_vector(&self, path: &str) -> Result<VectorInfo, GeoviewError> {
//! #         Err(GeoviewError::NotFound(path.into()))
//! #     }
//! #     async fn get_geometry(&self, path: &str, _: Option<u32>) -> Result<FeatureCollection, GeoviewError> {
//! #         Err(GeoviewError::NotFound(path.into()))
//! #     }
//! #     async fn get_attribute_table(&self, path: &str, _: Option<u32>, _: usize, _: usize) -> Result<AttributeTable, GeoviewError> {
//! #         Err(GeoviewError::NotFound(path.into()))
//! #     }
//! #     async fn open_multi_layer_vector(&self, path: &str) -> Result<MultiLayerInfo, GeoviewError> {
//! #         Err(GeoviewError::NotFound(path.into()))
//! #     }
//! #     async fn export_vector(&self, input: &str, _: &str, _: ExportFormat, _: Option<u32>) -> Result<(), GeoviewError> {
//! #         Err(GeoviewError::NotFound(input.into()))
//! #     }
//! # }
//!
//! # tokio_test::block_on(async {
//! let mut map = MapEngine::new(
//!     MemorySurface::new(),
//!     Arc::new(NoData),
//!     Arc::new(CrsRegistry::with_builtin()),
//!     EngineConfig::default(),
//! );
//! let mut events = map.subscribe();
//!
//! let parcels: FeatureCollection =
//!     serde_json::from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
//! map.add_layer(Layer::vector("parcels", "Parcels", "/data/parcels.shp").with_geometry(Arc::new(parcels)))
//!     .unwrap();
//!
//! let report = map.sync().await;
//! assert_eq!(report.created, ["parcels"]);
//!
//! map.handle().tool(MapTool::Select);
//! map.process_commands(web_time::Instant::now());
//! assert!(map.is_select_mode());
//! assert!(events.try_recv().is_err());
//! # });
//! ```
//!
//! # Main components
//!
//! * [`LayerTree`](layer::LayerTree) is the single source of truth: layers, nested groups, their
//!   visibility, opacity, styling and geometry once loaded.
//! * [`RenderReconciler`](reconciler::RenderReconciler) brings a
//!   [`RenderSurface`](render::RenderSurface) in line with the tree. The surface trait is all the
//!   engine knows about drawing; [`MemorySurface`](render::MemorySurface) is the in-memory
//!   implementation.
//! * [`GeometryLoader`](loader::GeometryLoader) fetches layer geometry from a
//!   [`GeodataService`](service::GeodataService), once per layer at a time.
//! * [`HitTester`](pick::HitTester), [`HighlightController`](highlight::HighlightController) and
//!   [`MeasureEngine`](measure::MeasureEngine) implement the interaction tools.
//! * [`MapEngine`] owns all of the above for one map, together with the [`MapView`] and the
//!   [`EventProcessor`](control::EventProcessor) that turns raw pointer input into clicks and
//!   drags.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub(crate) mod async_runtime;
mod color;
mod config;
pub mod control;
pub mod error;
pub mod highlight;
pub mod layer;
pub mod loader;
mod map;
pub mod measure;
mod messenger;
pub mod pick;
pub mod projection;
pub mod reconciler;
pub mod render;
pub mod selection;
pub mod service;
pub mod style;
mod view;

pub use color::Color;
pub use config::EngineConfig;
pub use map::{CursorHint, Debouncer, MapCommand, MapEngine, MapEvent, MapHandle, MapTool};
pub use messenger::{DummyMessenger, Messenger};
pub use view::{resolution_for_zoom, zoom_for_resolution, MapView, Point2d, Size, ZOOM_0_RESOLUTION};

// Reexport geoview_types
pub use geoview_types;
