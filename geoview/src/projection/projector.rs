use std::sync::Arc;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use geoview_types::Extent;

use crate::error::{Diagnostic, DiagnosticKind, GeoviewError};
use crate::projection::ProjectionGateway;

/// Moves features, points and extents between data projections and the map projection.
///
/// All `*_or_identity` methods never fail: if the gateway cannot transform the input, it is
/// returned unchanged and a [`DiagnosticKind::Projection`] diagnostic is pushed.
#[derive(Clone)]
pub struct MapProjector {
    gateway: Arc<dyn ProjectionGateway>,
    map_projection: String,
}

impl std::fmt::Debug for MapProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapProjector")
            .field("map_projection", &self.map_projection)
            .finish()
    }
}

impl MapProjector {
    /// Creates a projector for the given map projection.
    pub fn new(gateway: Arc<dyn ProjectionGateway>, map_projection: impl Into<String>) -> Self {
        Self {
            gateway,
            map_projection: map_projection.into(),
        }
    }

    /// Projection of the map surface.
    pub fn map_projection(&self) -> &str {
        &self.map_projection
    }

    /// The gateway used for transforms.
    pub fn gateway(&self) -> &Arc<dyn ProjectionGateway> {
        &self.gateway
    }

    /// Transforms points from `from` into the map projection.
    pub fn to_map(&self, from: &str, points: &[[f64; 2]]) -> Result<Vec<[f64; 2]>, GeoviewError> {
        self.gateway.transform(from, &self.map_projection, points)
    }

    /// Transforms points from the map projection into `to`.
    pub fn from_map(&self, to: &str, points: &[[f64; 2]]) -> Result<Vec<[f64; 2]>, GeoviewError> {
        self.gateway.transform(&self.map_projection, to, points)
    }

    /// Transforms one point into the map projection.
    pub fn point_to_map_or_identity(
        &self,
        from: &str,
        point: [f64; 2],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> [f64; 2] {
        self.transform_or_identity(from, &self.map_projection, &[point], None, diagnostics)
            .first()
            .copied()
            .unwrap_or(point)
    }

    /// Transforms one point from the map projection into `to`.
    pub fn point_from_map_or_identity(
        &self,
        to: &str,
        point: [f64; 2],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> [f64; 2] {
        self.transform_or_identity(&self.map_projection, to, &[point], None, diagnostics)
            .first()
            .copied()
            .unwrap_or(point)
    }

    /// Transforms an extent into the map projection. The result is the bounding box of the
    /// transformed corners.
    pub fn extent_to_map_or_identity(
        &self,
        from: &str,
        extent: &Extent,
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Extent {
        let corners = self.transform_or_identity(
            from,
            &self.map_projection,
            &extent.corners(),
            layer_id,
            diagnostics,
        );
        Extent::from_points(corners.into_iter()).unwrap_or(*extent)
    }

    /// Copy of the collection with all coordinates transformed into the map projection.
    pub fn collection_to_map_or_identity(
        &self,
        from: &str,
        collection: &FeatureCollection,
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> FeatureCollection {
        let mut collection = collection.clone();
        collection.bbox = None;
        let mut geometries: Vec<&mut Geometry> = collection
            .features
            .iter_mut()
            .filter_map(|feature| feature.geometry.as_mut())
            .collect();
        self.transform_geometries(
            from,
            &self.map_projection,
            &mut geometries,
            layer_id,
            diagnostics,
        );
        collection
    }

    /// Copy of a feature with all coordinates transformed from the map projection into `to`.
    pub fn feature_from_map_or_identity(
        &self,
        to: &str,
        feature: &Feature,
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Feature {
        let mut feature = feature.clone();
        feature.bbox = None;
        if let Some(geometry) = feature.geometry.as_mut() {
            self.transform_geometries(
                &self.map_projection,
                to,
                &mut [geometry],
                layer_id,
                diagnostics,
            );
        }
        feature
    }

    /// Copy of a feature with all coordinates transformed from `from` into the map projection.
    pub fn feature_to_map_or_identity(
        &self,
        from: &str,
        feature: &Feature,
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Feature {
        let mut feature = feature.clone();
        feature.bbox = None;
        if let Some(geometry) = feature.geometry.as_mut() {
            self.transform_geometries(
                from,
                &self.map_projection,
                &mut [geometry],
                layer_id,
                diagnostics,
            );
        }
        feature
    }

    fn transform_or_identity(
        &self,
        from: &str,
        to: &str,
        points: &[[f64; 2]],
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<[f64; 2]> {
        match self.gateway.transform(from, to, points) {
            Ok(transformed) if transformed.len() == points.len() => transformed,
            Ok(_) => {
                diagnostics.push(Diagnostic::new(
                    layer_id,
                    DiagnosticKind::Projection,
                    format!("transform from {from} to {to} returned wrong number of points"),
                ));
                points.to_vec()
            }
            Err(err) => {
                diagnostics.push(Diagnostic::from_error(
                    layer_id,
                    DiagnosticKind::Projection,
                    &err,
                ));
                points.to_vec()
            }
        }
    }

    fn transform_geometries(
        &self,
        from: &str,
        to: &str,
        geometries: &mut [&mut Geometry],
        layer_id: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if from == to {
            return;
        }

        let mut points = vec![];
        for geometry in geometries.iter_mut() {
            visit_positions(&mut geometry.value, &mut |position| {
                if let [x, y, ..] = position[..] {
                    points.push([x, y]);
                }
            });
        }

        let transformed =
            self.transform_or_identity(from, to, &points, layer_id, diagnostics);
        let mut transformed = transformed.into_iter();
        for geometry in geometries.iter_mut() {
            geometry.bbox = None;
            visit_positions(&mut geometry.value, &mut |position| {
                if position.len() >= 2 {
                    if let Some([x, y]) = transformed.next() {
                        position[0] = x;
                        position[1] = y;
                    }
                }
            });
        }
    }
}

/// Calls `f` for every position of the geometry value, in document order.
fn visit_positions(value: &mut Value, f: &mut impl FnMut(&mut Vec<f64>)) {
    match value {
        Value::Point(position) => f(position),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            positions.iter_mut().for_each(f)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines
            .iter_mut()
            .flat_map(|line| line.iter_mut())
            .for_each(f),
        Value::MultiPolygon(polygons) => polygons
            .iter_mut()
            .flat_map(|polygon| polygon.iter_mut())
            .flat_map(|ring| ring.iter_mut())
            .for_each(f),
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                geometry.bbox = None;
                visit_positions(&mut geometry.value, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geoview_types::geo::{WEB_MERCATOR, WGS84};

    use super::*;
    use crate::projection::CrsRegistry;

    fn projector() -> MapProjector {
        MapProjector::new(Arc::new(CrsRegistry::with_builtin()), WEB_MERCATOR)
    }

    fn polygon_collection() -> FeatureCollection {
        serde_json::from_str(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "GeometryCollection",
                    "geometries": [{"type": "Point", "coordinates": [180, 0, 12.5]}]}}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn collection_to_map() {
        let mut diagnostics = vec![];
        let projected = projector().collection_to_map_or_identity(
            WGS84,
            &polygon_collection(),
            Some("l"),
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());

        let Some(Value::Polygon(rings)) = projected.features[0].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected polygon");
        };
        assert_relative_eq!(rings[0][1][0], 111_319.49, epsilon = 0.01);
        assert_relative_eq!(rings[0][0][1], 0.0, epsilon = 1e-6);

        let Some(Value::GeometryCollection(items)) =
            projected.features[1].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected collection");
        };
        let Value::Point(point) = &items[0].value else {
            panic!("expected point");
        };
        assert_relative_eq!(point[0], 20_037_508.342789244, epsilon = 1e-6);
        assert_eq!(point[2], 12.5);
    }

    #[test]
    fn failing_transform_keeps_coordinates() {
        let mut diagnostics = vec![];
        let collection = polygon_collection();
        let result = projector().collection_to_map_or_identity(
            "EPSG:4513",
            &collection,
            Some("gk"),
            &mut diagnostics,
        );

        assert_eq!(result.features[0].geometry, collection.features[0].geometry);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Projection);
        assert_eq!(diagnostics[0].layer_id.as_deref(), Some("gk"));
    }

    #[test]
    fn extent_to_map() {
        let mut diagnostics = vec![];
        let extent = projector().extent_to_map_or_identity(
            WGS84,
            &Extent::new(-180.0, -10.0, 180.0, 10.0),
            None,
            &mut diagnostics,
        );
        assert_relative_eq!(extent.min_x, -20_037_508.342789244, epsilon = 1e-6);
        assert!(extent.max_y > 1_000_000.0);
    }
}
