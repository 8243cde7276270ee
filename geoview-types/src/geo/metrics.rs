//! Length, area and centroid of measured shapes.
//!
//! Lengths are great-circle (haversine) distances on a sphere of [`MEAN_EARTH_RADIUS`]. Areas are
//! computed either with the spherical excess formula of Chamberlain and Duquette on the WGS84
//! semi-major axis sphere, or by a planar approximation (see [`AreaFormula`]).

use geo::{Area, Centroid, ChamberlainDuquetteArea, HaversineLength};
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::GeoPoint;

/// Mean radius of the Earth in meters (IUGG).
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Formula used to compute the area of a measured ring.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaFormula {
    /// Spherical excess on the sphere of the WGS84 semi-major axis.
    #[default]
    Spherical,
    /// Shoelace formula on a local equirectangular projection centered on the mean latitude of the
    /// ring. Accurate for small rings, degrades with ring size and latitude span.
    Planar,
}

fn to_line_string(points: &[GeoPoint]) -> LineString<f64> {
    points.iter().map(|p| Coord::from(*p)).collect()
}

/// Cumulative great-circle length of the path through the given points, in meters.
///
/// Returns `0.0` for less than two points.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    to_line_string(points).haversine_length()
}

/// Area of the ring through the given points in square meters. The ring is closed implicitly.
///
/// Returns `None` if less than three points are given.
pub fn ring_area(points: &[GeoPoint], formula: AreaFormula) -> Option<f64> {
    if points.len() < 3 {
        return None;
    }

    let area = match formula {
        AreaFormula::Spherical => {
            Polygon::new(to_line_string(points), vec![]).chamberlain_duquette_unsigned_area()
        }
        AreaFormula::Planar => {
            let mean_lat = points.iter().map(|p| p.lat_rad()).sum::<f64>() / points.len() as f64;
            let scale_x = MEAN_EARTH_RADIUS * mean_lat.cos();
            let projected: LineString<f64> = points
                .iter()
                .map(|p| Coord {
                    x: p.lon_rad() * scale_x,
                    y: p.lat_rad() * MEAN_EARTH_RADIUS,
                })
                .collect();
            Polygon::new(projected, vec![]).unsigned_area()
        }
    };

    Some(area)
}

/// Centroid of the ring through the given points. Returns `None` if less than three points are
/// given.
pub fn ring_centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.len() < 3 {
        return None;
    }

    Polygon::new(to_line_string(points), vec![])
        .centroid()
        .map(GeoPoint::from)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lonlat;

    fn square(side_deg: f64) -> Vec<GeoPoint> {
        vec![
            lonlat!(0.0, 0.0),
            lonlat!(side_deg, 0.0),
            lonlat!(side_deg, side_deg),
            lonlat!(0.0, side_deg),
        ]
    }

    #[test]
    fn length_of_hundredth_degree_meridian_arc() {
        let length = path_length(&[lonlat!(0.0, 0.0), lonlat!(0.0, 0.01)]);
        assert_relative_eq!(length, 1111.95, epsilon = 0.01);
    }

    #[test]
    fn length_is_cumulative() {
        let points = [lonlat!(0.0, 0.0), lonlat!(0.0, 0.01), lonlat!(0.0, 0.02)];
        assert_relative_eq!(
            path_length(&points),
            2.0 * path_length(&points[..2]),
            epsilon = 1e-6
        );
        assert_eq!(path_length(&points[..1]), 0.0);
    }

    #[test]
    fn kilometer_square_area() {
        // ~1000 m side at the equator
        let side = 1000.0 / (MEAN_EARTH_RADIUS * std::f64::consts::PI / 180.0);
        let spherical = ring_area(&square(side), AreaFormula::Spherical).unwrap();
        let planar = ring_area(&square(side), AreaFormula::Planar).unwrap();

        assert_relative_eq!(spherical, 1_000_000.0, max_relative = 0.01);
        assert_relative_eq!(planar, 1_000_000.0, max_relative = 0.01);
    }

    #[test]
    fn degenerate_rings_have_no_area() {
        assert!(ring_area(&square(1.0)[..2], AreaFormula::Spherical).is_none());
        assert!(ring_centroid(&square(1.0)[..2]).is_none());
    }

    #[test]
    fn centroid_of_square() {
        let centroid = ring_centroid(&square(0.02)).unwrap();
        assert_relative_eq!(centroid.lon(), 0.01, epsilon = 1e-9);
        assert_relative_eq!(centroid.lat(), 0.01, epsilon = 1e-9);
    }
}
