use geojson::{Feature, Geometry, JsonObject, Value};
use geoview_types::geo::metrics::{path_length, ring_area, ring_centroid, AreaFormula};
use geoview_types::GeoPoint;

use crate::measure::format::{format_area, format_coordinate, format_distance};
use crate::measure::MeasureMode;
use crate::render::OverlayPositioning;

/// Offset of labels placed above a point, in pixels.
const ABOVE_POINT: [f64; 2] = [0.0, -10.0];

/// Result of a measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Path length in meters.
    Length(f64),
    /// Ring area in square meters.
    Area(f64),
    /// Position of the last clicked point.
    Position(GeoPoint),
}

/// Label of a measured shape, anchored at a geographic position.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchLabel {
    /// Anchor position.
    pub anchor: GeoPoint,
    /// Text.
    pub text: String,
    /// Placement relative to the anchor.
    pub positioning: OverlayPositioning,
    /// Pixel offset from the anchor.
    pub offset: [f64; 2],
}

/// Features and labels that visualize the points of a measurement. Geometries are in lon/lat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sketch {
    /// Markers, lines and polygons.
    pub features: Vec<Feature>,
    /// Metric and coordinate labels.
    pub labels: Vec<SketchLabel>,
    /// The computed result, if there are enough points for one.
    pub measurement: Option<Measurement>,
}

fn feature(value: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(JsonObject::new()),
        foreign_members: None,
    }
}

fn positions(points: &[GeoPoint]) -> Vec<Vec<f64>> {
    points.iter().map(GeoPoint::to_position).collect()
}

/// Builds the visualization of `points` measured in `mode`.
///
/// Every point gets a marker. Coordinate mode labels each point. Distance mode connects the
/// points and labels the last one with the path length. Area mode previews a line at two points
/// and from three points on closes the ring and labels its centroid with the area.
pub fn sketch(mode: MeasureMode, points: &[GeoPoint], formula: AreaFormula) -> Sketch {
    let mut sketch = Sketch {
        features: points
            .iter()
            .map(|point| feature(Value::Point(point.to_position())))
            .collect(),
        ..Default::default()
    };

    match mode {
        MeasureMode::Coordinate => {
            sketch.labels = points
                .iter()
                .map(|point| SketchLabel {
                    anchor: *point,
                    text: format_coordinate(point),
                    positioning: OverlayPositioning::BottomCenter,
                    offset: ABOVE_POINT,
                })
                .collect();
            sketch.measurement = points.last().copied().map(Measurement::Position);
        }
        MeasureMode::Distance => {
            let Some(last) = points.last().filter(|_| points.len() >= 2) else {
                return sketch;
            };

            let length = path_length(points);
            sketch
                .features
                .push(feature(Value::LineString(positions(points))));
            sketch.labels.push(SketchLabel {
                anchor: *last,
                text: format_distance(length),
                positioning: OverlayPositioning::BottomCenter,
                offset: ABOVE_POINT,
            });
            sketch.measurement = Some(Measurement::Length(length));
        }
        MeasureMode::Area => match points.len() {
            0 | 1 => {}
            2 => sketch
                .features
                .push(feature(Value::LineString(positions(points)))),
            _ => {
                let mut ring = positions(points);
                ring.push(points[0].to_position());
                sketch.features.push(feature(Value::Polygon(vec![ring])));

                if let (Some(area), Some(centroid)) =
                    (ring_area(points, formula), ring_centroid(points))
                {
                    sketch.labels.push(SketchLabel {
                        anchor: centroid,
                        text: format_area(area),
                        positioning: OverlayPositioning::Center,
                        offset: [0.0, 0.0],
                    });
                    sketch.measurement = Some(Measurement::Area(area));
                }
            }
        },
    }

    sketch
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use geoview_types::geo::metrics::MEAN_EARTH_RADIUS;
    use geoview_types::lonlat;

    use super::*;

    fn kinds(sketch: &Sketch) -> Vec<&'static str> {
        sketch
            .features
            .iter()
            .map(|f| match f.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Point(_)) => "point",
                Some(Value::LineString(_)) => "line",
                Some(Value::Polygon(_)) => "polygon",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn distance_of_hundredth_degree() {
        let sketch = sketch(
            MeasureMode::Distance,
            &[lonlat!(0.0, 0.0), lonlat!(0.0, 0.01)],
            AreaFormula::Spherical,
        );
        assert_eq!(kinds(&sketch), ["point", "point", "line"]);

        let Some(Measurement::Length(length)) = sketch.measurement else {
            panic!("expected length");
        };
        assert_relative_eq!(length, 1113.0, max_relative = 0.01);
        assert_eq!(sketch.labels[0].text, "1.11 km");
        assert_eq!(sketch.labels[0].anchor, lonlat!(0.0, 0.01));
        assert_eq!(sketch.labels[0].positioning, OverlayPositioning::BottomCenter);
    }

    #[test]
    fn single_distance_point_has_no_metric() {
        let sketch = sketch(
            MeasureMode::Distance,
            &[lonlat!(0.0, 0.0)],
            AreaFormula::Spherical,
        );
        assert_eq!(kinds(&sketch), ["point"]);
        assert!(sketch.labels.is_empty());
        assert!(sketch.measurement.is_none());
    }

    #[test]
    fn area_previews_line_at_two_points() {
        let sketch = sketch(
            MeasureMode::Area,
            &[lonlat!(0.0, 0.0), lonlat!(0.0, 0.01)],
            AreaFormula::Spherical,
        );
        assert_eq!(kinds(&sketch), ["point", "point", "line"]);
        assert!(sketch.measurement.is_none());
    }

    #[test]
    fn kilometer_square() {
        let side = 1000.0 / (MEAN_EARTH_RADIUS * std::f64::consts::PI / 180.0);
        let points = [
            lonlat!(0.0, 0.0),
            lonlat!(side, 0.0),
            lonlat!(side, side),
            lonlat!(0.0, side),
        ];
        let sketch = sketch(MeasureMode::Area, &points, AreaFormula::Planar);
        assert_eq!(kinds(&sketch), ["point", "point", "point", "point", "polygon"]);

        let Some(Value::Polygon(rings)) = sketch.features[4].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][0], rings[0][4]);

        let Some(Measurement::Area(area)) = sketch.measurement else {
            panic!("expected area");
        };
        assert_relative_eq!(area, 1_000_000.0, max_relative = 0.01);
        assert_eq!(sketch.labels[0].positioning, OverlayPositioning::Center);
        assert_relative_eq!(sketch.labels[0].anchor.lon(), side / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn coordinates_label_every_point() {
        let sketch = sketch(
            MeasureMode::Coordinate,
            &[lonlat!(116.397428, 39.90923), lonlat!(1.0, 2.0)],
            AreaFormula::Spherical,
        );
        assert_eq!(sketch.labels.len(), 2);
        assert_eq!(sketch.labels[0].text, "经度: 116.397428\n纬度: 39.909230");
        assert_eq!(sketch.labels[0].offset, [0.0, -10.0]);
        assert_matches!(sketch.measurement, Some(Measurement::Position(p)) if p == lonlat!(1.0, 2.0));
    }
}
