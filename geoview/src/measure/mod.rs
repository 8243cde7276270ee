//! On-map distance, area and coordinate measurement.
//!
//! The user picks a [`MeasureMode`] and clicks points on the map. The [`MeasureEngine`] keeps
//! the points of the shape being measured, draws them with the metric labels on its own overlay
//! object and moves finished shapes into a permanent set that stays on the map until the
//! measurement is cleared.

use std::sync::Arc;

use geojson::{Feature, FeatureCollection};
use geoview_types::geo::metrics::AreaFormula;
use geoview_types::geo::WGS84;
use geoview_types::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;
use crate::projection::MapProjector;
use crate::render::{
    empty_collection, OverlayId, OverlayLabel, RenderObjectId, RenderObjectSpec, RenderSource,
    RenderSurface,
};
use crate::style::{PointPaint, RenderStyle, StrokePaint, Style};
use crate::Color;

mod format;
mod shape;

pub use format::{format_area, format_coordinate, format_distance};
pub use shape::{sketch, Measurement, Sketch, SketchLabel};

/// What is measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureMode {
    /// Length of a path.
    Distance,
    /// Area of a polygon.
    Area,
    /// Coordinates of points.
    Coordinate,
}

/// Style of the measurement overlay.
pub fn measure_style() -> RenderStyle {
    RenderStyle {
        point: Some(PointPaint {
            shape: Default::default(),
            radius: 5.0,
            fill: Color::WHITE,
            stroke: Color::MEASURE,
            stroke_width: 2.0,
            rotation: 0.0,
        }),
        fill: Some(Color::MEASURE.with_opacity(0.3)),
        stroke: Some(StrokePaint::solid(Color::MEASURE, 3.0)),
        text: None,
    }
}

#[derive(Debug, Default)]
struct Drawn {
    features: Vec<Feature>,
    labels: Vec<OverlayId>,
}

/// Measurement state machine and its overlay.
#[derive(Debug)]
pub struct MeasureEngine {
    handle: RenderObjectId,
    formula: AreaFormula,
    mode: Option<MeasureMode>,
    points: Vec<GeoPoint>,
    measurement: Option<Measurement>,
    current: Drawn,
    finished: Drawn,
}

impl MeasureEngine {
    /// Creates the overlay object on the surface. It is drawn with the given z-index, above all
    /// layers.
    pub fn new(surface: &mut impl RenderSurface, z_index: i32, formula: AreaFormula) -> Self {
        let handle = surface.create_object(RenderObjectSpec {
            source: RenderSource::empty_vector(),
            style: Some(Style::Static(Arc::from(vec![measure_style()]))),
            z_index,
            visible: true,
            opacity: 1.0,
        });

        Self {
            handle,
            formula,
            mode: None,
            points: vec![],
            measurement: None,
            current: Drawn::default(),
            finished: Drawn::default(),
        }
    }

    /// Render object of the overlay.
    pub fn handle(&self) -> RenderObjectId {
        self.handle
    }

    /// Active mode. `None` when idle.
    pub fn mode(&self) -> Option<MeasureMode> {
        self.mode
    }

    /// Returns true if a mode is active.
    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }

    /// Points of the shape being measured.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Result for the shape being measured.
    pub fn measurement(&self) -> Option<Measurement> {
        self.measurement
    }

    /// Number of overlay labels on the surface.
    pub fn label_count(&self) -> usize {
        self.current.labels.len() + self.finished.labels.len()
    }

    /// Switches to `mode`. The shape being measured, if any, is finished first, so re-selecting
    /// the active mode starts a new shape.
    pub fn select_mode(&mut self, mode: MeasureMode) {
        self.finish();
        if self.mode != Some(mode) {
            log::debug!("Measure mode {:?} -> {mode:?}", self.mode);
        }
        self.mode = Some(mode);
    }

    /// Adds a point to the shape being measured. Ignored when idle.
    ///
    /// Returns true if the overlay changed.
    pub fn click(
        &mut self,
        point: GeoPoint,
        surface: &mut impl RenderSurface,
        projector: &MapProjector,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        let Some(mode) = self.mode else {
            return false;
        };

        self.points.push(point);
        self.redraw(mode, surface, projector, diagnostics);
        true
    }

    /// Finishes the shape being measured without changing the mode.
    ///
    /// Returns false if there was nothing to finish.
    pub fn double_click(&mut self) -> bool {
        if self.mode.is_none() || self.points.is_empty() {
            return false;
        }

        self.finish();
        true
    }

    /// Removes all shapes, finished ones included, and goes idle.
    pub fn clear(&mut self, surface: &mut impl RenderSurface) {
        for label in self
            .current
            .labels
            .drain(..)
            .chain(self.finished.labels.drain(..))
        {
            surface.remove_label(label);
        }
        self.current.features.clear();
        self.finished.features.clear();
        self.points.clear();
        self.measurement = None;
        self.mode = None;
        surface.set_features(self.handle, Arc::new(empty_collection()));
    }

    fn finish(&mut self) {
        if self.points.is_empty() {
            return;
        }

        log::debug!("Finished measuring a shape of {} points", self.points.len());
        self.finished.features.append(&mut self.current.features);
        self.finished.labels.append(&mut self.current.labels);
        self.points.clear();
        self.measurement = None;
    }

    fn redraw(
        &mut self,
        mode: MeasureMode,
        surface: &mut impl RenderSurface,
        projector: &MapProjector,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for label in self.current.labels.drain(..) {
            surface.remove_label(label);
        }

        let sketch = sketch(mode, &self.points, self.formula);
        self.measurement = sketch.measurement;
        self.current.features = sketch
            .features
            .iter()
            .map(|feature| projector.feature_to_map_or_identity(WGS84, feature, None, diagnostics))
            .collect();
        self.current.labels = sketch
            .labels
            .into_iter()
            .map(|label| {
                surface.add_label(OverlayLabel {
                    position: projector.point_to_map_or_identity(
                        WGS84,
                        label.anchor.to_array(),
                        diagnostics,
                    ),
                    text: label.text,
                    positioning: label.positioning,
                    offset: label.offset,
                })
            })
            .collect();

        let features = FeatureCollection {
            features: self
                .finished
                .features
                .iter()
                .chain(&self.current.features)
                .cloned()
                .collect(),
            ..empty_collection()
        };
        surface.set_features(self.handle, Arc::new(features));
    }
}
