use crate::geo::datum::Datum;
use crate::{Extent, GeoPoint};

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical (Web) Mercator projection, `EPSG:3857`.
#[derive(Debug, Copy, Clone, Default)]
pub struct WebMercator {
    datum: Datum,
}

impl WebMercator {
    /// Half of the projected world width in meters.
    pub const HALF_WORLD: f64 = 20_037_508.342_789_244;

    /// Creates a projection over the given datum. Only the semi-major axis is used.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }

    /// Valid extent of the projection in meters.
    pub fn extent() -> Extent {
        Extent::new(
            -Self::HALF_WORLD,
            -Self::HALF_WORLD,
            Self::HALF_WORLD,
            Self::HALF_WORLD,
        )
    }

    /// Projects a geographic point into `[x, y]` meters. Latitudes outside of the projection
    /// limits are clamped. Returns `None` for non-finite input.
    pub fn project(&self, input: &GeoPoint) -> Option<[f64; 2]> {
        let lat = input.lat().clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = self.datum.semimajor() * input.lon_rad();
        let y = self.datum.semimajor() * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

        if x.is_finite() && y.is_finite() {
            Some([x, y])
        } else {
            None
        }
    }

    /// Converts projected `[x, y]` meters back to a geographic point.
    pub fn unproject(&self, input: [f64; 2]) -> Option<GeoPoint> {
        let [x, y] = input;
        let lon = (x / self.datum.semimajor()).to_degrees();
        let lat = (2.0 * (y / self.datum.semimajor()).exp().atan() - std::f64::consts::FRAC_PI_2)
            .to_degrees();

        if lon.is_finite() && lat.is_finite() {
            Some(GeoPoint::new(lon, lat))
        } else {
            None
        }
    }
}
