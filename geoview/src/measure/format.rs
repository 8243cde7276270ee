//! Display text of measurement results.

use geoview_types::GeoPoint;

/// Length in meters below 1 km, kilometers from 1 km on, two decimals.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{meters:.2} m")
    }
}

/// Area in square meters below 1 km², square kilometers from 1 km² on, two decimals.
pub fn format_area(square_meters: f64) -> String {
    if square_meters >= 1_000_000.0 {
        format!("{:.2} km²", square_meters / 1_000_000.0)
    } else {
        format!("{square_meters:.2} m²")
    }
}

/// Longitude over latitude, six decimals each.
pub fn format_coordinate(point: &GeoPoint) -> String {
    format!("经度: {:.6}\n纬度: {:.6}", point.lon(), point.lat())
}

#[cfg(test)]
mod tests {
    use geoview_types::lonlat;

    use super::*;

    #[test]
    fn distance_unit_boundary() {
        assert_eq!(format_distance(0.0), "0.00 m");
        assert_eq!(format_distance(999.994), "999.99 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(1111.95), "1.11 km");
    }

    #[test]
    fn area_unit_boundary() {
        assert_eq!(format_area(999_999.0), "999999.00 m²");
        assert_eq!(format_area(1_000_000.0), "1.00 km²");
        assert_eq!(format_area(2_345_678.0), "2.35 km²");
    }

    #[test]
    fn longitude_comes_first() {
        assert_eq!(
            format_coordinate(&lonlat!(116.397428, 39.90923)),
            "经度: 116.397428\n纬度: 39.909230"
        );
    }
}
