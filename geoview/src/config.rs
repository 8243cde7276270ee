use std::time::Duration;

use geoview_types::geo::metrics::AreaFormula;
use geoview_types::geo::{WEB_MERCATOR, WGS84};
use serde::{Deserialize, Serialize};

/// Configuration of a [`MapEngine`](crate::MapEngine).
///
/// Can be deserialized from any serde format; missing fields take their default values.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    map_projection: String,
    data_projection: String,

    vector_z_offset: i32,
    highlight_z_index: i32,
    measure_z_index: i32,

    flash_interval: Duration,
    flash_count: u32,

    center_debounce: Duration,
    zoom_debounce: Duration,

    fit_padding: f64,
    min_zoom: f64,
    max_zoom: f64,
    hit_tolerance: f64,

    area_formula: AreaFormula,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            map_projection: WEB_MERCATOR.to_string(),
            data_projection: WGS84.to_string(),
            vector_z_offset: 100,
            highlight_z_index: 9998,
            measure_z_index: 9999,
            flash_interval: Duration::from_millis(200),
            flash_count: 3,
            center_debounce: Duration::from_millis(200),
            zoom_debounce: Duration::from_millis(100),
            fit_padding: 50.0,
            min_zoom: 2.0,
            max_zoom: 20.0,
            hit_tolerance: 3.0,
            area_formula: AreaFormula::Spherical,
        }
    }
}

impl EngineConfig {
    /// Projection of the map surface.
    pub fn map_projection(&self) -> &str {
        &self.map_projection
    }

    /// Sets projection of the map surface.
    pub fn with_map_projection(mut self, code: impl Into<String>) -> Self {
        self.map_projection = code.into();
        self
    }

    /// Projection of geometry as it is returned by the geodata service, and of the points the
    /// measurement engine accumulates.
    pub fn data_projection(&self) -> &str {
        &self.data_projection
    }

    /// Sets projection of geometry returned by the geodata service.
    pub fn with_data_projection(mut self, code: impl Into<String>) -> Self {
        self.data_projection = code.into();
        self
    }

    /// Z-index band added to every vector layer, so that vectors draw above all raster layers.
    pub fn vector_z_offset(&self) -> i32 {
        self.vector_z_offset
    }

    /// Sets the z-index band of vector layers.
    pub fn with_vector_z_offset(mut self, offset: i32) -> Self {
        self.vector_z_offset = offset;
        self
    }

    /// Z-index of the highlight overlay.
    pub fn highlight_z_index(&self) -> i32 {
        self.highlight_z_index
    }

    /// Sets z-index of the highlight overlay.
    pub fn with_highlight_z_index(mut self, z_index: i32) -> Self {
        self.highlight_z_index = z_index;
        self
    }

    /// Z-index of the measurement overlay.
    pub fn measure_z_index(&self) -> i32 {
        self.measure_z_index
    }

    /// Sets z-index of the measurement overlay.
    pub fn with_measure_z_index(mut self, z_index: i32) -> Self {
        self.measure_z_index = z_index;
        self
    }

    /// Interval between visibility toggles of a flashing feature.
    pub fn flash_interval(&self) -> Duration {
        self.flash_interval
    }

    /// Sets interval between visibility toggles of a flashing feature.
    pub fn with_flash_interval(mut self, interval: Duration) -> Self {
        self.flash_interval = interval;
        self
    }

    /// Number of off/on blinks of a flash.
    pub fn flash_count(&self) -> u32 {
        self.flash_count
    }

    /// Sets number of off/on blinks of a flash.
    pub fn with_flash_count(mut self, count: u32) -> Self {
        self.flash_count = count;
        self
    }

    /// Delay before a user-initiated center change is persisted.
    pub fn center_debounce(&self) -> Duration {
        self.center_debounce
    }

    /// Sets delay before a user-initiated center change is persisted.
    pub fn with_center_debounce(mut self, delay: Duration) -> Self {
        self.center_debounce = delay;
        self
    }

    /// Delay before a user-initiated zoom change is persisted.
    pub fn zoom_debounce(&self) -> Duration {
        self.zoom_debounce
    }

    /// Sets delay before a user-initiated zoom change is persisted.
    pub fn with_zoom_debounce(mut self, delay: Duration) -> Self {
        self.zoom_debounce = delay;
        self
    }

    /// Padding in pixels kept around an extent when the view is fitted to it.
    pub fn fit_padding(&self) -> f64 {
        self.fit_padding
    }

    /// Sets padding kept around fitted extents.
    pub fn with_fit_padding(mut self, padding: f64) -> Self {
        self.fit_padding = padding;
        self
    }

    /// Minimum allowed zoom level.
    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Maximum allowed zoom level.
    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Sets the allowed zoom range. Bounds are swapped if given in the wrong order.
    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = min_zoom.max(max_zoom);
        self
    }

    /// Radius in pixels around the pointer within which features are considered hit.
    pub fn hit_tolerance(&self) -> f64 {
        self.hit_tolerance
    }

    /// Sets hit-test tolerance in pixels.
    pub fn with_hit_tolerance(mut self, tolerance: f64) -> Self {
        self.hit_tolerance = tolerance;
        self
    }

    /// Formula used by the area measurement tool.
    pub fn area_formula(&self) -> AreaFormula {
        self.area_formula
    }

    /// Sets formula used by the area measurement tool.
    pub fn with_area_formula(mut self, formula: AreaFormula) -> Self {
        self.area_formula = formula;
        self
    }
}
