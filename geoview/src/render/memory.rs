use std::collections::BTreeMap;
use std::sync::Arc;

use geo::{Closest, ClosestPoint, Intersects};
use geojson::FeatureCollection;

use crate::render::{
    OverlayId, OverlayLabel, RenderObjectId, RenderObjectSpec, RenderSource, RenderSurface,
    SurfaceHit,
};
use crate::style::{RenderStyle, Style};
use crate::view::{MapView, Point2d};

/// Render object stored by a [`MemorySurface`].
#[derive(Debug)]
pub struct MemoryObject {
    /// Drawn data.
    pub source: RenderSource,
    /// Feature style.
    pub style: Option<Style>,
    /// Draw order.
    pub z_index: i32,
    /// Visibility.
    pub visible: bool,
    /// Opacity.
    pub opacity: f64,
    shapes: Vec<Option<geo::Geometry<f64>>>,
}

impl MemoryObject {
    fn new(spec: RenderObjectSpec) -> Self {
        let mut object = Self {
            source: spec.source,
            style: spec.style,
            z_index: spec.z_index,
            visible: spec.visible,
            opacity: spec.opacity,
            shapes: vec![],
        };
        object.update_shapes();
        object
    }

    /// Features of a vector object.
    pub fn features(&self) -> Option<&Arc<FeatureCollection>> {
        match &self.source {
            RenderSource::Vector { features } => Some(features),
            RenderSource::RasterTiles { .. } => None,
        }
    }

    fn update_shapes(&mut self) {
        self.shapes = match &self.source {
            RenderSource::Vector { features } => features
                .features
                .iter()
                .map(|feature| {
                    let geometry = feature.geometry.clone()?;
                    geo::Geometry::<f64>::try_from(geometry)
                        .map_err(|err| log::trace!("Feature is not hit-testable: {err}"))
                        .ok()
                })
                .collect(),
            RenderSource::RasterTiles { .. } => vec![],
        };
    }
}

/// [`RenderSurface`] that keeps render objects in memory and hit-tests them geometrically.
///
/// Draws nothing. Serves as the reference surface of the engine and allows to inspect what the
/// engine asked to draw.
#[derive(Debug, Default)]
pub struct MemorySurface {
    view: MapView,
    next_id: u64,
    objects: BTreeMap<RenderObjectId, MemoryObject>,
    labels: BTreeMap<OverlayId, OverlayLabel>,
    created: usize,
    destroyed: usize,
}

impl MemorySurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last view set by the engine.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Render object by handle.
    pub fn object(&self, id: RenderObjectId) -> Option<&MemoryObject> {
        self.objects.get(&id)
    }

    /// All live render objects.
    pub fn objects(&self) -> impl Iterator<Item = (RenderObjectId, &MemoryObject)> + '_ {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Number of live render objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// All live overlay labels.
    pub fn labels(&self) -> impl Iterator<Item = &OverlayLabel> + '_ {
        self.labels.values()
    }

    /// Number of objects created since the surface was made.
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Number of objects destroyed since the surface was made.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn marker_radius(styles: &[RenderStyle]) -> f64 {
    styles
        .iter()
        .filter_map(|style| style.point.as_ref())
        .map(|point| point.radius + point.stroke_width / 2.0)
        .fold(0.0, f64::max)
}

fn is_hit(shape: &geo::Geometry<f64>, point: &geo::Point<f64>, tolerance: f64) -> bool {
    if shape.intersects(point) {
        return true;
    }

    match shape.closest_point(point) {
        Closest::Intersection(_) => true,
        Closest::SinglePoint(closest) => {
            (closest.x() - point.x()).hypot(closest.y() - point.y()) <= tolerance
        }
        Closest::Indeterminate => false,
    }
}

impl RenderSurface for MemorySurface {
    fn create_object(&mut self, spec: RenderObjectSpec) -> RenderObjectId {
        let id = RenderObjectId(self.next_id());
        self.objects.insert(id, MemoryObject::new(spec));
        self.created += 1;
        id
    }

    fn destroy_object(&mut self, id: RenderObjectId) {
        if self.objects.remove(&id).is_some() {
            self.destroyed += 1;
        }
    }

    fn set_style(&mut self, id: RenderObjectId, style: Style) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.style = Some(style);
        }
    }

    fn set_z_index(&mut self, id: RenderObjectId, z_index: i32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.z_index = z_index;
        }
    }

    fn set_visible(&mut self, id: RenderObjectId, visible: bool) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.visible = visible;
        }
    }

    fn set_opacity(&mut self, id: RenderObjectId, opacity: f64) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.opacity = opacity;
        }
    }

    fn set_features(&mut self, id: RenderObjectId, features: Arc<FeatureCollection>) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.source = RenderSource::Vector { features };
            object.update_shapes();
        }
    }

    fn set_view(&mut self, view: &MapView) {
        self.view = *view;
    }

    fn hit_test(&self, pixel: Point2d, tolerance: f64) -> Vec<SurfaceHit> {
        let map_point = self.view.screen_to_map(pixel);
        let point = geo::Point::new(map_point.x, map_point.y);
        let resolution = self.view.resolution();

        let mut objects: Vec<_> = self
            .objects
            .iter()
            .filter(|(_, object)| object.visible)
            .collect();
        objects.sort_by(|(a_id, a), (b_id, b)| b.z_index.cmp(&a.z_index).then(b_id.cmp(a_id)));

        let mut hits = vec![];
        for (id, object) in objects {
            let Some(features) = object.features() else {
                continue;
            };

            // Later features are drawn over earlier ones.
            for (index, shape) in object.shapes.iter().enumerate().rev() {
                let (Some(shape), Some(feature)) = (shape, features.features.get(index)) else {
                    continue;
                };

                let radius = object
                    .style
                    .as_ref()
                    .map(|style| marker_radius(&style.for_feature(feature)))
                    .unwrap_or_default();
                if is_hit(shape, &point, (tolerance + radius) * resolution) {
                    hits.push(SurfaceHit {
                        object: *id,
                        feature: feature.clone(),
                        feature_index: index,
                    });
                }
            }
        }

        hits
    }

    fn add_label(&mut self, label: OverlayLabel) -> OverlayId {
        let id = OverlayId(self.next_id());
        self.labels.insert(id, label);
        id
    }

    fn remove_label(&mut self, id: OverlayId) {
        self.labels.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::OverlayPositioning;
    use crate::view::Size;

    fn squares() -> Arc<FeatureCollection> {
        Arc::new(
            serde_json::from_str(
                r#"{"type": "FeatureCollection", "features": [
                    {"type": "Feature", "properties": {"n": 1}, "geometry": {"type": "Polygon",
                        "coordinates": [[[-10, -10], [10, -10], [10, 10], [-10, 10], [-10, -10]]]}},
                    {"type": "Feature", "properties": {"n": 2}, "geometry": {"type": "Point",
                        "coordinates": [50, 0]}}
                ]}"#,
            )
            .unwrap(),
        )
    }

    fn surface() -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.set_view(
            &MapView::new(Point2d::new(0.0, 0.0), 1.0).with_size(Size::new(200.0, 200.0)),
        );
        surface
    }

    fn spec(z_index: i32) -> RenderObjectSpec {
        RenderObjectSpec {
            source: RenderSource::Vector {
                features: squares(),
            },
            style: None,
            z_index,
            visible: true,
            opacity: 1.0,
        }
    }

    #[test]
    fn hits_topmost_first() {
        let mut surface = surface();
        let low = surface.create_object(spec(1));
        let high = surface.create_object(spec(5));

        let hits = surface.hit_test(Point2d::new(100.0, 100.0), 3.0);
        let objects: Vec<_> = hits.iter().map(|hit| hit.object).collect();
        assert_eq!(objects, [high, low]);
        assert_eq!(hits[0].feature_index, 0);
    }

    #[test]
    fn hidden_objects_are_not_hit() {
        let mut surface = surface();
        let id = surface.create_object(spec(1));
        surface.set_visible(id, false);
        assert!(surface.hit_test(Point2d::new(100.0, 100.0), 3.0).is_empty());
    }

    #[test]
    fn point_hit_uses_tolerance() {
        let mut surface = surface();
        surface.create_object(spec(1));

        // The point feature is at map (50, 0), which is pixel (150, 100).
        assert_eq!(surface.hit_test(Point2d::new(152.0, 100.0), 3.0).len(), 1);
        assert!(surface.hit_test(Point2d::new(160.0, 100.0), 3.0).is_empty());
    }

    #[test]
    fn tracks_objects_and_labels() {
        let mut surface = surface();
        let id = surface.create_object(spec(1));
        surface.set_features(id, Arc::new(crate::render::empty_collection()));
        assert!(surface.hit_test(Point2d::new(100.0, 100.0), 3.0).is_empty());

        let label = surface.add_label(OverlayLabel {
            position: [0.0, 0.0],
            text: "a".into(),
            positioning: OverlayPositioning::Center,
            offset: [0.0, 0.0],
        });
        assert_eq!(surface.labels().count(), 1);
        surface.remove_label(label);
        assert_eq!(surface.labels().count(), 0);

        surface.destroy_object(id);
        surface.destroy_object(id);
        assert_eq!(surface.created_count(), 1);
        assert_eq!(surface.destroyed_count(), 1);
        assert_eq!(surface.object_count(), 0);
    }
}
