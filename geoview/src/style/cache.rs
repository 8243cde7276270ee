use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use geojson::{Feature, JsonValue};
use parking_lot::Mutex;

use crate::style::paint::RenderStyle;
use crate::style::symbolizer::GeometryKind;

/// Shared, immutable array of styles drawn for one feature, bottom first.
pub type StyleArray = Arc<[RenderStyle]>;

/// Discriminant the per-feature style cache is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    /// Geometry kind of the feature, for layers styled by geometry.
    Geometry(Option<GeometryKind>),
    /// Stringified value of the label field.
    Value(String),
    /// The label field is absent or `null`.
    Missing,
}

impl FeatureKey {
    /// Key of a feature for a layer labeled by `field`.
    ///
    /// Strings are taken as is, other values are stringified as JSON. Absent and `null` values both
    /// produce [`FeatureKey::Missing`], which is distinct from any string, including the empty one.
    pub fn from_field(feature: &Feature, field: &str) -> Self {
        match feature.property(field) {
            None | Some(JsonValue::Null) => Self::Missing,
            Some(JsonValue::String(value)) => Self::Value(value.clone()),
            Some(value) => Self::Value(value.to_string()),
        }
    }

    /// Key of a feature for a layer styled by geometry kind.
    pub fn from_geometry(feature: &Feature) -> Self {
        Self::Geometry(
            feature
                .geometry
                .as_ref()
                .and_then(GeometryKind::of_geometry),
        )
    }

    /// Label text for the key, if any.
    pub fn label_text(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Memo of resolved style arrays of one layer.
///
/// The cache is never patched: when the style configuration of the layer changes, the owner drops
/// it and starts a new one.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: Mutex<HashMap<FeatureKey, StyleArray>>,
}

impl StyleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached array for `key`, building and storing it with `build` on a miss.
    pub fn get_or_insert_with(
        &self,
        key: FeatureKey,
        build: impl FnOnce(&FeatureKey) -> StyleArray,
    ) -> StyleArray {
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&key) {
            return cached.clone();
        }

        log::trace!("Style cache miss for {key:?}");
        let styles = build(&key);
        entries.insert(key, styles.clone());
        styles
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(properties: &str) -> Feature {
        serde_json::from_str(&format!(
            r#"{{"type": "Feature", "geometry": null, "properties": {properties}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn keys_from_field_values() {
        assert_eq!(
            FeatureKey::from_field(&feature(r#"{"name": "a"}"#), "name"),
            FeatureKey::Value("a".into())
        );
        assert_eq!(
            FeatureKey::from_field(&feature(r#"{"name": 5}"#), "name"),
            FeatureKey::Value("5".into())
        );
        assert_eq!(
            FeatureKey::from_field(&feature(r#"{"name": null}"#), "name"),
            FeatureKey::Missing
        );
        assert_eq!(
            FeatureKey::from_field(&feature(r#"{}"#), "name"),
            FeatureKey::Missing
        );
        assert_ne!(
            FeatureKey::from_field(&feature(r#"{"name": ""}"#), "name"),
            FeatureKey::Missing
        );
    }

    #[test]
    fn builds_once_per_key() {
        let cache = StyleCache::new();
        let mut builds = 0;
        let first = cache.get_or_insert_with(FeatureKey::Missing, |_| {
            builds += 1;
            Arc::from(vec![RenderStyle::default()])
        });
        let second = cache.get_or_insert_with(FeatureKey::Missing, |_| {
            builds += 1;
            Arc::from(vec![])
        });

        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
