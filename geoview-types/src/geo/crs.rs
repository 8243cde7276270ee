use serde::{Deserialize, Serialize};

use crate::geo::datum::Datum;

/// Code of the WGS84 geographic coordinate system.
pub const WGS84: &str = "EPSG:4326";
/// Code of the CGCS2000 geographic coordinate system.
pub const CGCS2000: &str = "EPSG:4490";
/// Code of the Web Mercator projection.
pub const WEB_MERCATOR: &str = "EPSG:3857";

/// Kind of coordinate reference system.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    /// Coordinates are longitude and latitude in degrees.
    Geographic,
    /// Coordinates are planar, usually meters.
    Projected,
}

/// Entry of the CRS catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsDefinition {
    /// Authority code, e.g. `EPSG:4490`.
    pub code: String,
    /// Human readable name.
    pub name: String,
    /// Geographic or projected.
    pub kind: CrsKind,
    /// Optional WKT definition, kept for adapters that delegate to an external transform engine.
    #[serde(default)]
    pub wkt: Option<String>,
}

impl CrsDefinition {
    /// Creates a definition without WKT.
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: CrsKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
            wkt: None,
        }
    }

    /// Datum of the coordinate system, if it is known to the built-in catalogue.
    pub fn datum(&self) -> Option<Datum> {
        match self.code.as_str() {
            WGS84 | WEB_MERCATOR => Some(Datum::WGS84),
            CGCS2000 => Some(Datum::CGCS2000),
            code if is_cgcs2000_gauss_kruger(code) => Some(Datum::CGCS2000),
            _ => None,
        }
    }
}

/// CGCS2000 Gauss-Kruger zone ranges, as EPSG code ranges.
const GK_6_DEGREE_ZONES: (u32, u32, u32) = (4491, 13, 23);
const GK_6_DEGREE_CM: (u32, u32) = (4502, 4512);
const GK_3_DEGREE_ZONES: (u32, u32, u32) = (4513, 25, 45);
const GK_3_DEGREE_CM: (u32, u32) = (4534, 4554);

fn epsg_number(code: &str) -> Option<u32> {
    code.strip_prefix("EPSG:")?.parse().ok()
}

fn is_cgcs2000_gauss_kruger(code: &str) -> bool {
    epsg_number(code).is_some_and(|n| (GK_6_DEGREE_ZONES.0..=GK_3_DEGREE_CM.1).contains(&n))
}

/// EPSG code of the CGCS2000 3-degree Gauss-Kruger zone (zones 25 to 45).
pub fn epsg_from_3_degree_zone(zone: u32) -> Option<String> {
    let (start, first, last) = GK_3_DEGREE_ZONES;
    (first..=last)
        .contains(&zone)
        .then(|| format!("EPSG:{}", start + zone - first))
}

/// EPSG code of the CGCS2000 6-degree Gauss-Kruger zone (zones 13 to 23).
pub fn epsg_from_6_degree_zone(zone: u32) -> Option<String> {
    let (start, first, last) = GK_6_DEGREE_ZONES;
    (first..=last)
        .contains(&zone)
        .then(|| format!("EPSG:{}", start + zone - first))
}

/// The catalogue registered by default: WGS84, CGCS2000, Web Mercator and the CGCS2000
/// Gauss-Kruger zones.
pub fn builtin_definitions() -> Vec<CrsDefinition> {
    let mut definitions = vec![
        CrsDefinition::new(WGS84, "WGS 84", CrsKind::Geographic),
        CrsDefinition::new(CGCS2000, "China Geodetic Coordinate System 2000", CrsKind::Geographic),
        CrsDefinition::new(WEB_MERCATOR, "WGS 84 / Pseudo-Mercator", CrsKind::Projected),
    ];

    let (start, first, last) = GK_6_DEGREE_ZONES;
    definitions.extend((first..=last).map(|zone| {
        CrsDefinition::new(
            format!("EPSG:{}", start + zone - first),
            format!("CGCS2000 / Gauss-Kruger zone {zone}"),
            CrsKind::Projected,
        )
    }));
    definitions.extend((GK_6_DEGREE_CM.0..=GK_6_DEGREE_CM.1).map(|code| {
        let cm = 75 + (code - GK_6_DEGREE_CM.0) * 6;
        CrsDefinition::new(
            format!("EPSG:{code}"),
            format!("CGCS2000 / Gauss-Kruger CM {cm}E"),
            CrsKind::Projected,
        )
    }));

    let (start, first, last) = GK_3_DEGREE_ZONES;
    definitions.extend((first..=last).map(|zone| {
        CrsDefinition::new(
            format!("EPSG:{}", start + zone - first),
            format!("CGCS2000 / 3-degree Gauss-Kruger zone {zone}"),
            CrsKind::Projected,
        )
    }));
    definitions.extend((GK_3_DEGREE_CM.0..=GK_3_DEGREE_CM.1).map(|code| {
        let cm = 75 + (code - GK_3_DEGREE_CM.0) * 3;
        CrsDefinition::new(
            format!("EPSG:{code}"),
            format!("CGCS2000 / 3-degree Gauss-Kruger CM {cm}E"),
            CrsKind::Projected,
        )
    }));

    definitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_codes() {
        assert_eq!(epsg_from_3_degree_zone(25).as_deref(), Some("EPSG:4513"));
        assert_eq!(epsg_from_3_degree_zone(45).as_deref(), Some("EPSG:4533"));
        assert_eq!(epsg_from_3_degree_zone(46), None);
        assert_eq!(epsg_from_6_degree_zone(13).as_deref(), Some("EPSG:4491"));
        assert_eq!(epsg_from_6_degree_zone(12), None);
    }

    #[test]
    fn catalogue_has_unique_codes() {
        let definitions = builtin_definitions();
        let mut codes: Vec<_> = definitions.iter().map(|d| d.code.clone()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), definitions.len());
        assert!(codes.contains(&"EPSG:4534".to_string()));
        assert!(codes.contains(&"EPSG:4554".to_string()));
    }

    #[test]
    fn gauss_kruger_zones_use_cgcs2000_datum() {
        let definition = CrsDefinition::new("EPSG:4513", "zone 25", CrsKind::Projected);
        assert_eq!(definition.datum(), Some(Datum::CGCS2000));
        let unknown = CrsDefinition::new("EPSG:32650", "UTM 50N", CrsKind::Projected);
        assert_eq!(unknown.datum(), None);
    }
}
