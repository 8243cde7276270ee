use std::sync::Arc;

use ahash::{HashSet, HashSetExt};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use crate::error::GeoviewError;
use crate::layer::{clamp_opacity, Layer, LayerKind};

/// Hierarchical list of layers, top layer first.
///
/// The tree is the single source of truth for what the map shows. The engine reads it on every
/// sync and writes into it only through [`LayerTree::write_geometry`].
///
/// ```
/// use geoview::layer::{Layer, LayerTree};
///
/// let mut tree = LayerTree::default();
/// tree.add(Layer::basemap("osm", "OSM", "https://tile.osm.org/{z}/{x}/{y}.png")).unwrap();
/// tree.add(Layer::vector("roads", "Roads", "/data/roads.shp")).unwrap();
///
/// let ids: Vec<_> = tree.iter().map(|layer| layer.id.as_str()).collect();
/// assert_eq!(ids, ["roads", "osm"]);
/// assert!(tree.add(Layer::vector("roads", "Again", "/data/roads.shp")).is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerTree {
    layers: Vec<Layer>,
}

/// Non-group layer of a flattened tree with the visibility and opacity it is drawn with.
#[derive(Debug, Clone)]
pub struct FlatLayer {
    /// The layer. Never a group.
    pub layer: Layer,
    /// Visible only if the layer and all its ancestors are visible.
    pub visible: bool,
    /// Opacity of the layer multiplied by the opacities of all its ancestors.
    pub opacity: f64,
}

impl LayerTree {
    /// Creates a tree from the given top-level layers, validating it.
    pub fn new(layers: Vec<Layer>) -> Result<Self, GeoviewError> {
        let tree = Self { layers };
        tree.validate()?;
        Ok(tree)
    }

    /// Adds a layer. Basemaps go to the very bottom, any other layer goes to the top, above all
    /// existing layers.
    pub fn add(&mut self, layer: Layer) -> Result<(), GeoviewError> {
        let index = if layer.basemap { self.layers.len() } else { 0 };
        self.insert(index, layer)
    }

    /// Inserts a top-level layer at `index`. Index past the end appends the layer.
    pub fn insert(&mut self, index: usize, layer: Layer) -> Result<(), GeoviewError> {
        let mut ids = self.ids();
        collect_ids(std::slice::from_ref(&layer), &mut ids)?;
        validate_layer(&layer)?;

        log::debug!("Adding layer {} to the tree", layer.id);
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        Ok(())
    }

    /// Removes the layer with the given id wherever it is in the tree, and returns it.
    pub fn remove(&mut self, id: &str) -> Option<Layer> {
        remove_from(&mut self.layers, id)
    }

    /// Finds a layer by id, searching through groups.
    pub fn find(&self, id: &str) -> Option<&Layer> {
        find_in(&self.layers, id)
    }

    /// Finds a layer by id, searching through groups.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Layer> {
        find_in_mut(&mut self.layers, id)
    }

    /// Returns true if a layer with the id is in the tree.
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Sets the visibility flag of a layer. Returns false if there is no such layer.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        match self.find_mut(id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Sets opacity of a layer, clamped to `[0, 1]`. Returns false if there is no such layer.
    pub fn set_opacity(&mut self, id: &str, opacity: f64) -> bool {
        match self.find_mut(id) {
            Some(layer) => {
                layer.opacity = clamp_opacity(opacity);
                true
            }
            None => false,
        }
    }

    /// Reorders top-level layers to follow `ids`, which must name every top-level layer exactly
    /// once.
    pub fn reorder<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), GeoviewError> {
        if ids.len() != self.layers.len() {
            return Err(GeoviewError::InvalidLayerTree(format!(
                "reorder expects {} ids, got {}",
                self.layers.len(),
                ids.len()
            )));
        }

        let mut positions = Vec::with_capacity(ids.len());
        let mut seen = HashSet::new();
        for id in ids {
            let id = id.as_ref();
            let Some(position) = self.layers.iter().position(|layer| layer.id == id) else {
                return Err(GeoviewError::NotFound(format!("top-level layer {id}")));
            };
            if !seen.insert(position) {
                return Err(GeoviewError::InvalidLayerTree(format!(
                    "layer {id} is listed twice"
                )));
            }
            positions.push(position);
        }

        let mut layers: Vec<Option<Layer>> =
            std::mem::take(&mut self.layers).into_iter().map(Some).collect();
        self.layers = positions
            .into_iter()
            .filter_map(|position| layers[position].take())
            .collect();
        Ok(())
    }

    /// Writes loaded geometry into a layer and clears its deferred load flag.
    ///
    /// Returns false, without changing anything, if the layer is no longer in the tree.
    pub fn write_geometry(&mut self, id: &str, geometry: Arc<FeatureCollection>) -> bool {
        match self.find_mut(id) {
            Some(layer) => {
                log::debug!(
                    "Loaded {} features into layer {id}",
                    geometry.features.len()
                );
                layer.geometry = Some(geometry);
                layer.deferred_load = false;
                true
            }
            None => {
                log::debug!("Layer {id} was removed before its geometry arrived");
                false
            }
        }
    }

    /// Depth-first list of non-group layers, top first. Visibility and opacity of groups are
    /// combined into their descendants.
    pub fn flatten(&self) -> Vec<FlatLayer> {
        let mut flat = vec![];
        flatten_into(&self.layers, true, 1.0, &mut flat);
        flat
    }

    /// Checks that layer ids are unique and that only groups have children.
    pub fn validate(&self) -> Result<(), GeoviewError> {
        collect_ids(&self.layers, &mut HashSet::new())?;
        self.layers.iter().try_for_each(validate_layer)
    }

    /// Iterates over top-level layers.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter()
    }

    /// Top-level layers.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of top-level layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the tree has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        let _ = collect_ids(&self.layers, &mut ids);
        ids
    }
}

fn collect_ids(layers: &[Layer], ids: &mut HashSet<String>) -> Result<(), GeoviewError> {
    for layer in layers {
        if !ids.insert(layer.id.clone()) {
            return Err(GeoviewError::InvalidLayerTree(format!(
                "duplicate layer id {}",
                layer.id
            )));
        }
        collect_ids(&layer.children, ids)?;
    }

    Ok(())
}

fn validate_layer(layer: &Layer) -> Result<(), GeoviewError> {
    if layer.kind != LayerKind::Group && !layer.children.is_empty() {
        return Err(GeoviewError::InvalidLayerTree(format!(
            "layer {} has children but is not a group",
            layer.id
        )));
    }

    layer.children.iter().try_for_each(validate_layer)
}

fn find_in<'a>(layers: &'a [Layer], id: &str) -> Option<&'a Layer> {
    layers.iter().find_map(|layer| {
        if layer.id == id {
            Some(layer)
        } else {
            find_in(&layer.children, id)
        }
    })
}

fn find_in_mut<'a>(layers: &'a mut [Layer], id: &str) -> Option<&'a mut Layer> {
    for layer in layers {
        if layer.id == id {
            return Some(layer);
        }
        if let Some(found) = find_in_mut(&mut layer.children, id) {
            return Some(found);
        }
    }

    None
}

fn remove_from(layers: &mut Vec<Layer>, id: &str) -> Option<Layer> {
    if let Some(position) = layers.iter().position(|layer| layer.id == id) {
        return Some(layers.remove(position));
    }

    layers
        .iter_mut()
        .find_map(|layer| remove_from(&mut layer.children, id))
}

fn flatten_into(layers: &[Layer], visible: bool, opacity: f64, flat: &mut Vec<FlatLayer>) {
    for layer in layers {
        let layer_visible = visible && layer.visible;
        let layer_opacity = opacity * clamp_opacity(layer.opacity);
        if layer.is_group() {
            flatten_into(&layer.children, layer_visible, layer_opacity, flat);
        } else {
            flat.push(FlatLayer {
                layer: layer.clone(),
                visible: layer_visible,
                opacity: layer_opacity,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn tree() -> LayerTree {
        LayerTree::new(vec![
            Layer::vector("a", "A", "/a.shp"),
            Layer::group(
                "g",
                "G",
                vec![
                    Layer::vector("b", "B", "/b.shp").with_opacity(0.5),
                    Layer::group("inner", "Inner", vec![Layer::vector("c", "C", "/c.shp")]),
                ],
            )
            .with_opacity(0.5),
            Layer::basemap("osm", "OSM", "https://tile/{z}/{x}/{y}.png"),
        ])
        .unwrap()
    }

    fn flat_ids(tree: &LayerTree) -> Vec<String> {
        tree.flatten().into_iter().map(|f| f.layer.id).collect()
    }

    #[test]
    fn flattens_depth_first() {
        assert_eq!(flat_ids(&tree()), ["a", "b", "c", "osm"]);
    }

    #[test]
    fn group_state_propagates_to_children() {
        let mut tree = tree();
        let flat = tree.flatten();
        assert_eq!(flat[1].opacity, 0.25);
        assert_eq!(flat[2].opacity, 0.5);

        tree.set_visible("g", false);
        let flat = tree.flatten();
        assert!(flat[0].visible);
        assert!(!flat[1].visible);
        assert!(!flat[2].visible);
        assert!(tree.find("c").unwrap().visible);
    }

    #[test]
    fn add_keeps_basemaps_at_bottom() {
        let mut tree = tree();
        tree.add(Layer::vector("new", "New", "/n.shp")).unwrap();
        tree.add(Layer::basemap("sat", "Sat", "https://sat/{z}/{x}/{y}"))
            .unwrap();

        let ids: Vec<_> = tree.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["new", "a", "g", "osm", "sat"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut tree = tree();
        assert_matches!(
            tree.add(Layer::vector("c", "Dup", "/c.shp")),
            Err(GeoviewError::InvalidLayerTree(_))
        );
        assert_matches!(
            tree.add(Layer::group(
                "x",
                "X",
                vec![Layer::vector("y", "Y", "/y"), Layer::vector("y", "Y", "/y")]
            )),
            Err(GeoviewError::InvalidLayerTree(_))
        );
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn removes_nested_layer() {
        let mut tree = tree();
        let removed = tree.remove("c").unwrap();
        assert_eq!(removed.id, "c");
        assert_eq!(flat_ids(&tree), ["a", "b", "osm"]);

        let group = tree.remove("g").unwrap();
        assert_eq!(group.children.len(), 2);
        assert_eq!(flat_ids(&tree), ["a", "osm"]);
        assert!(tree.remove("g").is_none());
    }

    #[test]
    fn reorders_top_level() {
        let mut tree = tree();
        tree.reorder(&["g", "a", "osm"]).unwrap();
        assert_eq!(flat_ids(&tree), ["b", "c", "a", "osm"]);

        assert_matches!(tree.reorder(&["g", "a"]), Err(GeoviewError::InvalidLayerTree(_)));
        assert_matches!(
            tree.reorder(&["g", "a", "nope"]),
            Err(GeoviewError::NotFound(_))
        );
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn geometry_write_back() {
        let mut tree = tree();
        tree.find_mut("b").unwrap().deferred_load = true;

        let geometry = Arc::new(FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        });
        assert!(tree.write_geometry("b", geometry.clone()));
        let layer = tree.find("b").unwrap();
        assert!(!layer.deferred_load);
        assert!(Arc::ptr_eq(layer.geometry.as_ref().unwrap(), &geometry));

        assert!(!tree.write_geometry("removed", geometry));
    }

    #[test]
    fn non_group_with_children_is_invalid() {
        let mut layer = Layer::vector("v", "V", "/v");
        layer.children.push(Layer::vector("w", "W", "/w"));
        assert_matches!(
            LayerTree::new(vec![layer]),
            Err(GeoviewError::InvalidLayerTree(_))
        );
    }
}
