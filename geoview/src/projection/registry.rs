use ahash::{HashMap, HashMapExt};
use geoview_types::geo::{
    builtin_definitions, CrsDefinition, CrsKind, Datum, WebMercator, CGCS2000, WEB_MERCATOR, WGS84,
};
use geoview_types::{Extent, GeoPoint};
use parking_lot::RwLock;

use crate::error::GeoviewError;
use crate::projection::ProjectionGateway;

/// Projected extent reported for national projected systems (`EPSG:4xxx` that are not
/// geographic), in meters.
const NATIONAL_EXTENT: [f64; 4] = [-3_000_000.0, 2_000_000.0, 5_000_000.0, 7_000_000.0];

/// Built-in [`ProjectionGateway`].
///
/// Knows the catalogue of [`builtin_definitions`] and transforms between the geographic systems
/// (WGS84 and CGCS2000, treated as equal) and Web Mercator. Other registered systems can be
/// looked up but not transformed.
#[derive(Debug, Default)]
pub struct CrsRegistry {
    definitions: RwLock<HashMap<String, CrsDefinition>>,
}

impl CrsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with the built-in catalogue registered.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_all();
        registry
    }

    /// Registers a definition, replacing the previous one with the same code.
    pub fn register(&self, definition: CrsDefinition) {
        self.definitions
            .write()
            .insert(definition.code.clone(), definition);
    }

    /// Returns true if the code is registered.
    pub fn is_registered(&self, code: &str) -> bool {
        self.definitions.read().contains_key(code)
    }

    fn require(&self, code: &str) -> Result<CrsDefinition, GeoviewError> {
        self.definition(code)
            .ok_or_else(|| GeoviewError::Projection(format!("unknown coordinate system {code}")))
    }
}

fn is_geographic(definition: &CrsDefinition) -> bool {
    definition.kind == CrsKind::Geographic
}

fn project_all(
    datum: Datum,
    coordinates: &[[f64; 2]],
    project: bool,
) -> Result<Vec<[f64; 2]>, GeoviewError> {
    let projection = WebMercator::new(datum);
    coordinates
        .iter()
        .map(|&[x, y]| {
            let result = if project {
                projection.project(&GeoPoint::new(x, y))
            } else {
                projection.unproject([x, y]).map(|p| p.to_array())
            };
            result.ok_or_else(|| {
                GeoviewError::Projection(format!("cannot transform coordinates [{x}, {y}]"))
            })
        })
        .collect()
}

impl ProjectionGateway for CrsRegistry {
    fn register_all(&self) -> usize {
        let definitions = builtin_definitions();
        let count = definitions.len();
        let mut registered = self.definitions.write();
        for definition in definitions {
            registered.insert(definition.code.clone(), definition);
        }

        log::info!("Registered {count} coordinate systems");
        count
    }

    fn definition(&self, code: &str) -> Option<CrsDefinition> {
        self.definitions.read().get(code).cloned()
    }

    fn transform(
        &self,
        from: &str,
        to: &str,
        coordinates: &[[f64; 2]],
    ) -> Result<Vec<[f64; 2]>, GeoviewError> {
        if from == to {
            return Ok(coordinates.to_vec());
        }

        let source = self.require(from)?;
        let target = self.require(to)?;
        match (&source, &target) {
            (s, t) if is_geographic(s) && is_geographic(t) => Ok(coordinates.to_vec()),
            (s, t) if is_geographic(s) && t.code == WEB_MERCATOR => {
                project_all(s.datum().unwrap_or_default(), coordinates, true)
            }
            (s, t) if s.code == WEB_MERCATOR && is_geographic(t) => {
                project_all(t.datum().unwrap_or_default(), coordinates, false)
            }
            _ => Err(GeoviewError::Projection(format!(
                "no transformation from {from} to {to}"
            ))),
        }
    }

    fn extent_of(&self, code: &str) -> Option<Extent> {
        match code {
            WGS84 | CGCS2000 => Some(Extent::new(-180.0, -90.0, 180.0, 90.0)),
            WEB_MERCATOR => Some(WebMercator::extent()),
            code if code.starts_with("EPSG:4") => Some(Extent::from_array(NATIONAL_EXTENT)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn registers_builtin_catalogue() {
        let registry = CrsRegistry::new();
        assert!(!registry.is_registered(CGCS2000));
        let count = registry.register_all();
        assert!(count > 3);
        assert!(registry.is_registered(CGCS2000));
        assert!(registry.is_registered("EPSG:4513"));
    }

    #[test]
    fn geographic_to_web_mercator_and_back() {
        let registry = CrsRegistry::with_builtin();
        let projected = registry
            .transform(CGCS2000, WEB_MERCATOR, &[[116.397428, 39.90923]])
            .unwrap();
        assert_relative_eq!(projected[0][0], 12_957_302.41, epsilon = 0.01);

        let back = registry.transform(WEB_MERCATOR, WGS84, &projected).unwrap();
        assert_relative_eq!(back[0][0], 116.397428, epsilon = 1e-9);
        assert_relative_eq!(back[0][1], 39.90923, epsilon = 1e-9);

        let same = registry.transform(WGS84, CGCS2000, &[[1.0, 2.0]]).unwrap();
        assert_eq!(same, vec![[1.0, 2.0]]);
    }

    #[test]
    fn unsupported_transforms_fail() {
        let registry = CrsRegistry::with_builtin();
        assert_matches!(
            registry.transform("EPSG:4513", WEB_MERCATOR, &[[0.0, 0.0]]),
            Err(GeoviewError::Projection(_))
        );
        assert_matches!(
            registry.transform("EPSG:99999", WEB_MERCATOR, &[[0.0, 0.0]]),
            Err(GeoviewError::Projection(_))
        );
        assert_matches!(
            registry.transform(WGS84, WEB_MERCATOR, &[[f64::NAN, 0.0]]),
            Err(GeoviewError::Projection(_))
        );
    }

    #[test]
    fn extents() {
        let registry = CrsRegistry::with_builtin();
        assert_eq!(
            registry.extent_of(WGS84),
            Some(Extent::new(-180.0, -90.0, 180.0, 90.0))
        );
        assert_eq!(
            registry.extent_of("EPSG:4527").map(|e| e.to_array()),
            Some(NATIONAL_EXTENT)
        );
        assert_relative_eq!(
            registry.extent_of(WEB_MERCATOR).unwrap().max_x,
            20_037_508.342789244
        );
        assert_eq!(registry.extent_of("EPSG:32650"), None);
    }
}
