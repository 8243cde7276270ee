//! Keeps render objects of a [`RenderSurface`] in sync with a [`LayerTree`].

use std::sync::Arc;

use ahash::{HashMap, HashSet};
use geojson::FeatureCollection;

use crate::config::EngineConfig;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::layer::{FlatLayer, Layer, LayerKind, LayerTree};
use crate::loader::{FetchTicket, GeometryLoader};
use crate::projection::MapProjector;
use crate::render::{
    empty_collection, RenderObjectId, RenderObjectSpec, RenderSource, RenderSurface,
};
use crate::style::{resolve_style, ResolvedStyle};

/// What a [`RenderReconciler::reconcile`] pass did.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Layers that got a render object for the first time.
    pub created: Vec<String>,
    /// Layers whose render object was destroyed and built again.
    pub replaced: Vec<String>,
    /// Layers whose render object was changed in place.
    pub updated: Vec<String>,
    /// Layers whose render object was destroyed because the layer is gone.
    pub destroyed: Vec<String>,
    /// Geometry fetches to run. Their outcomes go to [`GeometryLoader::complete`].
    pub fetches: Vec<FetchTicket>,
    /// Non-fatal failures of the pass.
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconcileReport {
    /// Returns true if the pass changed anything on the surface.
    pub fn surface_changed(&self) -> bool {
        !(self.created.is_empty()
            && self.replaced.is_empty()
            && self.updated.is_empty()
            && self.destroyed.is_empty())
    }
}

#[derive(Debug)]
struct RenderEntry {
    handle: RenderObjectId,
    kind: LayerKind,
    geometry: Option<Arc<FeatureCollection>>,
    path: Option<String>,
    sub_layer: Option<u32>,
    url: Option<String>,
    map_projection: String,
    visible: bool,
    opacity: f64,
    z_index: i32,
    style: Option<ResolvedStyle>,
    fetch_failed: bool,
}

/// Owner of the render objects drawn for the layers of a tree.
///
/// Every non-group layer of the flattened tree gets exactly one render object. The reconciler
/// is the only component that creates or destroys them; others map render objects back to
/// layers through [`layer_of`](Self::layer_of).
#[derive(Debug, Default)]
pub struct RenderReconciler {
    entries: HashMap<String, RenderEntry>,
    owners: HashMap<RenderObjectId, String>,
}

impl RenderReconciler {
    /// Creates a reconciler with no render objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the layer a render object was created for.
    pub fn layer_of(&self, handle: RenderObjectId) -> Option<&str> {
        self.owners.get(&handle).map(String::as_str)
    }

    /// Render object of a layer.
    pub fn handle_of(&self, layer_id: &str) -> Option<RenderObjectId> {
        self.entries.get(layer_id).map(|entry| entry.handle)
    }

    /// Number of live render objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no render objects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remembers that a background fetch for the layer failed, so that the next time the layer
    /// is shown it is fetched again.
    pub fn mark_fetch_failed(&mut self, layer_id: &str) {
        if let Some(entry) = self.entries.get_mut(layer_id) {
            entry.fetch_failed = true;
        }
    }

    /// Destroys all render objects.
    pub fn clear(&mut self, surface: &mut impl RenderSurface, loader: &GeometryLoader) {
        for (id, entry) in self.entries.drain() {
            surface.destroy_object(entry.handle);
            loader.forget(&id);
        }
        self.owners.clear();
    }

    /// Brings the surface in line with the tree.
    ///
    /// Render objects of layers no longer in the tree are destroyed. Layers without a render
    /// object get one, and so do layers whose geometry or source was replaced since the last
    /// pass; fetches still running for such a layer are discarded. Other
    /// render objects are updated in place. Geometry of visible vector layers that has not been
    /// loaded yet is fetched during the pass and written back into the tree; hidden layers with
    /// deferred loading are drawn empty until they are shown.
    ///
    /// The pass never fails. Fetch and projection failures degrade to empty or untransformed
    /// data and are listed in the report.
    pub async fn reconcile<S: RenderSurface>(
        &mut self,
        tree: &mut LayerTree,
        surface: &mut S,
        loader: &GeometryLoader,
        projector: &MapProjector,
        config: &EngineConfig,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let flat = tree.flatten();

        let present: HashSet<&str> = flat.iter().map(|item| item.layer.id.as_str()).collect();
        let gone: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();
        for id in gone {
            self.destroy(&id, surface);
            loader.forget(&id);
            report.destroyed.push(id);
        }

        let total = flat.len();
        for (index, item) in flat.iter().enumerate() {
            let z_index = z_index_for(item.layer.kind, index, total, config);
            let id = item.layer.id.as_str();

            let replace = match self.entries.get(id) {
                None => None,
                Some(entry) => Some(needs_rebuild(entry, &item.layer, projector)),
            };

            match replace {
                None => {
                    self.create(
                        item,
                        z_index,
                        tree,
                        surface,
                        loader,
                        projector,
                        config,
                        &mut report,
                    )
                    .await;
                    report.created.push(id.to_string());
                }
                Some(true) => {
                    log::debug!("Rebuilding render object of layer {id}");
                    self.destroy(id, surface);
                    loader.forget(id);
                    self.create(
                        item,
                        z_index,
                        tree,
                        surface,
                        loader,
                        projector,
                        config,
                        &mut report,
                    )
                    .await;
                    report.replaced.push(id.to_string());
                }
                Some(false) => {
                    if self.update(item, z_index, surface, loader, &mut report) {
                        report.updated.push(id.to_string());
                    }
                }
            }
        }

        if report.surface_changed() {
            log::debug!(
                "Reconciled {} layers: {} created, {} replaced, {} updated, {} destroyed",
                total,
                report.created.len(),
                report.replaced.len(),
                report.updated.len(),
                report.destroyed.len()
            );
        }

        report
    }

    fn destroy(&mut self, id: &str, surface: &mut impl RenderSurface) {
        if let Some(entry) = self.entries.remove(id) {
            surface.destroy_object(entry.handle);
            self.owners.remove(&entry.handle);
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn create<S: RenderSurface>(
        &mut self,
        item: &FlatLayer,
        z_index: i32,
        tree: &mut LayerTree,
        surface: &mut S,
        loader: &GeometryLoader,
        projector: &MapProjector,
        config: &EngineConfig,
        report: &mut ReconcileReport,
    ) {
        let mut layer = item.layer.clone();
        let mut fetch_failed = false;
        let mut url = None;
        let mut style = None;

        let source = match layer.kind {
            LayerKind::RasterTile => {
                let template = match &layer.source.url {
                    Some(template) => expand_subdomains(template),
                    None => {
                        report.diagnostics.push(Diagnostic::new(
                            Some(&layer.id),
                            DiagnosticKind::Fetch,
                            "raster layer has no tile URL",
                        ));
                        String::new()
                    }
                };
                url = layer.source.url.clone();
                RenderSource::RasterTiles { url: template }
            }
            LayerKind::Vector | LayerKind::Group => {
                if layer.geometry.is_none() && (item.visible || !layer.deferred_load) {
                    match loader.load(&layer).await {
                        Ok(Some(collection)) => {
                            let collection = Arc::new(collection);
                            tree.write_geometry(&layer.id, collection.clone());
                            layer.geometry = Some(collection);
                            layer.deferred_load = false;
                        }
                        Ok(None) => {}
                        Err(err) => {
                            report.diagnostics.push(Diagnostic::from_error(
                                Some(&layer.id),
                                DiagnosticKind::Fetch,
                                &err,
                            ));
                            fetch_failed = true;
                        }
                    }
                }

                let features = match &layer.geometry {
                    Some(collection) => projector.collection_to_map_or_identity(
                        layer.projection(config.data_projection()),
                        collection,
                        Some(&layer.id),
                        &mut report.diagnostics,
                    ),
                    None => empty_collection(),
                };

                style = Some(resolve_style(&layer, None, &mut report.diagnostics));
                RenderSource::Vector {
                    features: Arc::new(features),
                }
            }
        };

        let handle = surface.create_object(RenderObjectSpec {
            source,
            style: style.as_ref().map(|style| style.style().clone()),
            z_index,
            visible: item.visible,
            opacity: item.opacity,
        });

        self.owners.insert(handle, layer.id.clone());
        self.entries.insert(
            layer.id.clone(),
            RenderEntry {
                handle,
                kind: layer.kind,
                geometry: layer.geometry.clone(),
                path: layer.source.path.clone(),
                sub_layer: layer.source.sub_layer,
                url,
                map_projection: projector.map_projection().to_string(),
                visible: item.visible,
                opacity: item.opacity,
                z_index,
                style,
                fetch_failed,
            },
        );
    }

    fn update(
        &mut self,
        item: &FlatLayer,
        z_index: i32,
        surface: &mut impl RenderSurface,
        loader: &GeometryLoader,
        report: &mut ReconcileReport,
    ) -> bool {
        let layer = &item.layer;
        let Some(entry) = self.entries.get_mut(&layer.id) else {
            return false;
        };

        let mut changed = false;
        if entry.z_index != z_index {
            surface.set_z_index(entry.handle, z_index);
            entry.z_index = z_index;
            changed = true;
        }

        if entry.opacity != item.opacity {
            surface.set_opacity(entry.handle, item.opacity);
            entry.opacity = item.opacity;
            changed = true;
        }

        if entry.visible != item.visible {
            surface.set_visible(entry.handle, item.visible);
            entry.visible = item.visible;
            changed = true;

            if item.visible
                && layer.geometry.is_none()
                && (layer.deferred_load || entry.fetch_failed)
            {
                if let Some(ticket) = loader.begin(layer) {
                    log::debug!("Layer {} became visible, fetching its geometry", layer.id);
                    entry.fetch_failed = false;
                    report.fetches.push(ticket);
                }
            }
        }

        if let Some(previous) = &entry.style {
            let resolved = resolve_style(layer, Some(previous), &mut report.diagnostics);
            if !resolved.style().ptr_eq(previous.style()) {
                surface.set_style(entry.handle, resolved.style().clone());
                entry.style = Some(resolved);
                changed = true;
            }
        }

        changed
    }
}

fn needs_rebuild(entry: &RenderEntry, layer: &Layer, projector: &MapProjector) -> bool {
    if entry.kind != layer.kind {
        return true;
    }

    match layer.kind {
        LayerKind::RasterTile => entry.url != layer.source.url,
        LayerKind::Vector | LayerKind::Group => {
            let geometry_replaced = match (&layer.geometry, &entry.geometry) {
                (Some(current), Some(drawn)) => !Arc::ptr_eq(current, drawn),
                (None, None) => false,
                _ => true,
            };
            let source_replaced =
                entry.path != layer.source.path || entry.sub_layer != layer.source.sub_layer;
            let projection_changed = entry.map_projection != projector.map_projection();
            geometry_replaced || source_replaced || projection_changed
        }
    }
}

/// Draw order of the `index`-th layer of a flattened tree of `total` layers.
///
/// Earlier layers get higher values. Vector layers are shifted into a band above all raster
/// layers.
pub fn z_index_for(kind: LayerKind, index: usize, total: usize, config: &EngineConfig) -> i32 {
    let base = total.saturating_sub(index) as i32;
    match kind {
        LayerKind::RasterTile => base,
        LayerKind::Vector | LayerKind::Group => base + config.vector_z_offset().max(total as i32),
    }
}

/// Replaces a `{s}` subdomain placeholder with the subdomain range of the tile host.
pub fn expand_subdomains(template: &str) -> String {
    if !template.contains("{s}") {
        return template.to_string();
    }

    let range = if template.contains("google") {
        "{0-3}"
    } else {
        "{0-7}"
    };
    template.replace("{s}", range)
}
