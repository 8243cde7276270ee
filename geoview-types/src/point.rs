use serde::{Deserialize, Serialize};

use crate::error::GeoviewTypesError;

/// 2d point on the surface of the Earth, in degrees.
///
/// The coordinate order follows GeoJSON: longitude first, latitude second. All measurement
/// operations of the engine consume points in this form.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct GeoPoint {
    lon: f64,
    lat: f64,
}

impl GeoPoint {
    /// Creates a new point from longitude and latitude in degrees.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in radians.
    pub fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }

    /// Latitude in radians.
    pub fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    /// Returns the point as `[lon, lat]`.
    pub fn to_array(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// Returns the point as a GeoJSON position (`vec![lon, lat]`).
    pub fn to_position(&self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }

    /// Returns true if both coordinates are finite and latitude is within `[-90, 90]`.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.lat.abs() <= 90.0
    }
}

impl TryFrom<&[f64]> for GeoPoint {
    type Error = GeoviewTypesError;

    fn try_from(value: &[f64]) -> Result<Self, Self::Error> {
        match value {
            [lon, lat, ..] => {
                let point = Self::new(*lon, *lat);
                if point.is_valid() {
                    Ok(point)
                } else {
                    Err(GeoviewTypesError::InvalidCoordinates(*lon, *lat))
                }
            }
            _ => Err(GeoviewTypesError::Conversion(format!(
                "position must have at least 2 coordinates, got {}",
                value.len()
            ))),
        }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<GeoPoint> for geo_types::Coord<f64> {
    fn from(value: GeoPoint) -> Self {
        geo_types::coord! { x: value.lon, y: value.lat }
    }
}

impl From<geo_types::Point<f64>> for GeoPoint {
    fn from(value: geo_types::Point<f64>) -> Self {
        Self::new(value.x(), value.y())
    }
}

/// Creates a new [`GeoPoint`] from longitude and latitude values (in degrees).
///
/// ```
/// use geoview_types::lonlat;
///
/// let point = lonlat!(116.397428, 39.90923);
/// assert_eq!(point.lon(), 116.397428);
/// assert_eq!(point.lat(), 39.90923);
/// ```
#[macro_export]
macro_rules! lonlat {
    ($lon:expr, $lat:expr) => {
        $crate::GeoPoint::new($lon, $lat)
    };
}
