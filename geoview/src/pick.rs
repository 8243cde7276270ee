//! Finding features under a pixel and attributing them to layers.

use ahash::{HashSet, HashSetExt};
use geojson::feature::Id;
use geojson::{Feature, JsonValue};

use crate::error::{Diagnostic, DiagnosticKind};
use crate::layer::LayerTree;
use crate::projection::MapProjector;
use crate::reconciler::RenderReconciler;
use crate::render::{RenderObjectId, RenderSurface};
use crate::view::Point2d;

/// How many features a pick returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PickMode {
    /// Only the topmost feature.
    Select,
    /// Every feature under the pixel, topmost first.
    Browse,
}

/// A feature found under a pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFeature {
    /// Layer the feature belongs to.
    pub layer_id: String,
    /// Display name of the layer.
    pub layer_name: String,
    /// The feature in the projection of its layer.
    pub feature: Feature,
    /// Position of the feature in the layer.
    pub feature_index: usize,
}

impl PickedFeature {
    /// Identifier of the feature for display, see [`feature_id`].
    pub fn feature_id(&self) -> String {
        feature_id(&self.feature, Some(self.feature_index))
    }
}

/// Identifier of a feature: its own id, else its `id` property, else its position in the
/// layer, else an empty string.
pub fn feature_id(feature: &Feature, index: Option<usize>) -> String {
    match &feature.id {
        Some(Id::String(id)) => return id.clone(),
        Some(Id::Number(id)) => return id.to_string(),
        None => {}
    }

    match feature.property("id") {
        Some(JsonValue::String(id)) => id.clone(),
        Some(JsonValue::Null) | None => index.map(|index| index.to_string()).unwrap_or_default(),
        Some(value) => value.to_string(),
    }
}

/// Resolves surface hits into layer features.
///
/// Render objects that are not layers, like the highlight and measurement overlays, are
/// excluded from picking.
#[derive(Debug, Clone)]
pub struct HitTester {
    tolerance: f64,
    excluded: HashSet<RenderObjectId>,
}

impl HitTester {
    /// Creates a hit tester with the given tolerance in pixels.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            excluded: HashSet::new(),
        }
    }

    /// Excludes a render object from picking.
    pub fn exclude(&mut self, handle: RenderObjectId) {
        self.excluded.insert(handle);
    }

    /// Features under the pixel, topmost first.
    ///
    /// Hits on render objects that cannot be attributed to a layer of the tree are skipped and
    /// reported. Returned features are converted from the map projection into the projection
    /// their layer declares, or `data_projection` if it declares none.
    #[allow(clippy::too_many_arguments)]
    pub fn pick(
        &self,
        pixel: Point2d,
        mode: PickMode,
        surface: &impl RenderSurface,
        reconciler: &RenderReconciler,
        tree: &LayerTree,
        projector: &MapProjector,
        data_projection: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<PickedFeature> {
        let mut picked = vec![];
        for hit in surface.hit_test(pixel, self.tolerance) {
            if self.excluded.contains(&hit.object) {
                continue;
            }

            let Some(layer) = reconciler
                .layer_of(hit.object)
                .and_then(|layer_id| tree.find(layer_id))
            else {
                diagnostics.push(Diagnostic::new(
                    None,
                    DiagnosticKind::HitTest,
                    format!("render object {:?} does not belong to any layer", hit.object),
                ));
                continue;
            };

            let feature = projector.feature_from_map_or_identity(
                layer.projection(data_projection),
                &hit.feature,
                Some(&layer.id),
                diagnostics,
            );
            picked.push(PickedFeature {
                layer_id: layer.id.clone(),
                layer_name: layer.name.clone(),
                feature,
                feature_index: hit.feature_index,
            });

            if mode == PickMode::Select {
                break;
            }
        }

        picked
    }

    /// Returns true if any pickable feature is under the pixel.
    pub fn is_over_feature(
        &self,
        pixel: Point2d,
        surface: &impl RenderSurface,
        reconciler: &RenderReconciler,
    ) -> bool {
        surface
            .hit_test(pixel, self.tolerance)
            .iter()
            .any(|hit| {
                !self.excluded.contains(&hit.object) && reconciler.layer_of(hit.object).is_some()
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geojson::FeatureCollection;
    use geoview_types::geo::WEB_MERCATOR;

    use super::*;
    use crate::config::EngineConfig;
    use crate::layer::Layer;
    use crate::loader::GeometryLoader;
    use crate::projection::CrsRegistry;
    use crate::render::{MemorySurface, RenderObjectSpec, RenderSource};
    use crate::service::mock::MockGeodataService;
    use crate::view::{MapView, Size};

    fn square(id: &str) -> Arc<FeatureCollection> {
        Arc::new(
            serde_json::from_str(&format!(
                r#"{{"type": "FeatureCollection", "features": [
                    {{"type": "Feature", "properties": {{"id": "{id}"}}, "geometry": {{"type": "Polygon",
                        "coordinates": [[[-1, -1], [1, -1], [1, 1], [-1, 1], [-1, -1]]]}}}}
                ]}}"#
            ))
            .unwrap(),
        )
    }

    struct Scene {
        surface: MemorySurface,
        reconciler: RenderReconciler,
        tree: LayerTree,
        projector: MapProjector,
    }

    fn scene() -> Scene {
        let mut tree = LayerTree::new(vec![
            Layer::vector("top", "Top", "/top.shp").with_geometry(square("t")),
            Layer::group(
                "g",
                "Group",
                vec![Layer::vector("bottom", "Bottom", "/bottom.shp").with_geometry(square("b"))],
            ),
        ])
        .unwrap();
        let mut surface = MemorySurface::new();
        surface.set_view(
            &MapView::new(Point2d::new(0.0, 0.0), 10_000.0).with_size(Size::new(100.0, 100.0)),
        );
        let mut reconciler = RenderReconciler::new();
        let projector = MapProjector::new(Arc::new(CrsRegistry::with_builtin()), WEB_MERCATOR);
        let loader = GeometryLoader::new(Arc::new(MockGeodataService::new()));
        tokio_test::block_on(reconciler.reconcile(
            &mut tree,
            &mut surface,
            &loader,
            &projector,
            &EngineConfig::default(),
        ));

        Scene {
            surface,
            reconciler,
            tree,
            projector,
        }
    }

    fn pick(scene: &Scene, tester: &HitTester, mode: PickMode) -> Vec<PickedFeature> {
        tester.pick(
            Point2d::new(50.0, 50.0),
            mode,
            &scene.surface,
            &scene.reconciler,
            &scene.tree,
            &scene.projector,
            "EPSG:4326",
            &mut vec![],
        )
    }

    #[test]
    fn select_returns_topmost_only() {
        let scene = scene();
        let picked = pick(&scene, &HitTester::new(3.0), PickMode::Select);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].layer_id, "top");
        assert_eq!(picked[0].feature_id(), "t");
    }

    #[test]
    fn browse_returns_all_topmost_first() {
        let scene = scene();
        let picked = pick(&scene, &HitTester::new(3.0), PickMode::Browse);
        let layers: Vec<_> = picked.iter().map(|p| p.layer_id.as_str()).collect();
        assert_eq!(layers, ["top", "bottom"]);
        assert_eq!(picked[1].layer_name, "Bottom");
    }

    #[test]
    fn picked_feature_is_in_layer_projection() {
        let scene = scene();
        let picked = pick(&scene, &HitTester::new(3.0), PickMode::Select);
        let Some(geojson::Value::Polygon(rings)) =
            picked[0].feature.geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected polygon");
        };
        approx::assert_relative_eq!(rings[0][1][0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn overlays_and_foreign_objects_are_skipped() {
        let mut scene = scene();
        let overlay = scene.surface.create_object(RenderObjectSpec {
            source: RenderSource::Vector {
                features: square("overlay"),
            },
            style: None,
            z_index: 9998,
            visible: true,
            opacity: 1.0,
        });
        let mut tester = HitTester::new(3.0);
        tester.exclude(overlay);

        let mut diagnostics = vec![];
        let picked = tester.pick(
            Point2d::new(50.0, 50.0),
            PickMode::Select,
            &scene.surface,
            &scene.reconciler,
            &scene.tree,
            &scene.projector,
            "EPSG:4326",
            &mut diagnostics,
        );
        assert_eq!(picked[0].layer_id, "top");
        assert!(diagnostics.is_empty());

        let unowned = HitTester::new(3.0);
        let picked = unowned.pick(
            Point2d::new(50.0, 50.0),
            PickMode::Browse,
            &scene.surface,
            &scene.reconciler,
            &scene.tree,
            &scene.projector,
            "EPSG:4326",
            &mut diagnostics,
        );
        assert_eq!(picked.len(), 2);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::HitTest);
    }

    #[test]
    fn nothing_under_empty_pixel() {
        let scene = scene();
        let tester = HitTester::new(3.0);
        assert!(!tester.is_over_feature(Point2d::new(5.0, 5.0), &scene.surface, &scene.reconciler));
        assert!(tester.is_over_feature(
            Point2d::new(50.0, 50.0),
            &scene.surface,
            &scene.reconciler
        ));
    }

    #[test]
    fn feature_id_fallbacks() {
        let mut feature: Feature = serde_json::from_str(
            r#"{"type": "Feature", "id": 7, "properties": {"id": "prop"}, "geometry": null}"#,
        )
        .unwrap();
        assert_eq!(feature_id(&feature, Some(3)), "7");

        feature.id = None;
        assert_eq!(feature_id(&feature, Some(3)), "prop");

        feature.set_property("id", 12);
        assert_eq!(feature_id(&feature, Some(3)), "12");

        feature.remove_property("id");
        assert_eq!(feature_id(&feature, Some(3)), "3");
        assert_eq!(feature_id(&feature, None), "");
    }
}
