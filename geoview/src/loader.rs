//! On-demand loading of vector layer geometry.

use std::sync::Arc;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use geojson::FeatureCollection;
use parking_lot::Mutex;

use crate::error::GeoviewError;
use crate::layer::{Layer, LayerKind, LayerTree};
use crate::service::GeodataService;

/// Permission to fetch geometry of one layer, issued by [`GeometryLoader::begin`].
///
/// While a ticket is outstanding no other ticket is issued for the same layer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    layer_id: String,
    path: String,
    sub_layer: Option<u32>,
    generation: u64,
}

impl FetchTicket {
    /// Id of the layer the geometry is for.
    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    /// Source path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sub-layer index, if the source has several layers.
    pub fn sub_layer(&self) -> Option<u32> {
        self.sub_layer
    }
}

/// Result of a finished fetch, to be handed back to [`GeometryLoader::complete`].
#[derive(Debug)]
pub struct FetchOutcome {
    /// Ticket the fetch was run with.
    pub ticket: FetchTicket,
    /// Fetched features or the failure.
    pub result: Result<FeatureCollection, GeoviewError>,
}

/// Fetches layer geometry from a [`GeodataService`], at most once at a time per layer.
///
/// Results are written into the [`LayerTree`] only if the layer is still there and was not
/// removed and re-added while the fetch was running.
pub struct GeometryLoader {
    service: Arc<dyn GeodataService>,
    in_flight: Mutex<HashSet<String>>,
    generations: Mutex<HashMap<String, u64>>,
}

impl GeometryLoader {
    /// Creates a loader over the given service.
    pub fn new(service: Arc<dyn GeodataService>) -> Self {
        Self {
            service,
            in_flight: Mutex::new(HashSet::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves a fetch for the layer.
    ///
    /// Returns `None` if a fetch for the layer is already running, or if the layer is not a
    /// vector layer with a path.
    pub fn begin(&self, layer: &Layer) -> Option<FetchTicket> {
        if layer.kind != LayerKind::Vector {
            return None;
        }
        let Some(path) = layer.source.path.clone() else {
            log::warn!("Vector layer {} has no source path", layer.id);
            return None;
        };

        if !self.in_flight.lock().insert(layer.id.clone()) {
            log::debug!("Geometry of layer {} is already being fetched", layer.id);
            return None;
        }

        let generation = self.generation(&layer.id);
        Some(FetchTicket {
            layer_id: layer.id.clone(),
            path,
            sub_layer: layer.source.sub_layer,
            generation,
        })
    }

    /// Runs the fetch of a ticket.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<FeatureCollection, GeoviewError> {
        log::debug!(
            "Fetching geometry of layer {} from {} (sub-layer {:?})",
            ticket.layer_id,
            ticket.path,
            ticket.sub_layer
        );
        self.service
            .get_geometry(&ticket.path, ticket.sub_layer)
            .await
    }

    /// Runs the fetch of a ticket and wraps the result into an outcome.
    pub async fn run(&self, ticket: FetchTicket) -> FetchOutcome {
        let result = self.fetch(&ticket).await;
        FetchOutcome { ticket, result }
    }

    /// Fetches geometry of a layer right away and releases the reservation.
    ///
    /// Returns `Ok(None)` if a fetch for the layer is already running.
    pub async fn load(&self, layer: &Layer) -> Result<Option<FeatureCollection>, GeoviewError> {
        let Some(ticket) = self.begin(layer) else {
            return Ok(None);
        };

        let result = self.fetch(&ticket).await;
        self.release(&ticket.layer_id);
        result.map(Some)
    }

    /// Applies a finished fetch to the tree and releases the reservation.
    ///
    /// Returns `Ok(true)` if the geometry was written, `Ok(false)` if the result was stale and
    /// discarded. A fetch error is returned as is. The layer keeps its deferred load flag then, so
    /// a later visibility change retries.
    pub fn complete(
        &self,
        outcome: FetchOutcome,
        tree: &mut LayerTree,
    ) -> Result<bool, GeoviewError> {
        let FetchOutcome { ticket, result } = outcome;
        if self.generation(&ticket.layer_id) != ticket.generation {
            log::debug!(
                "Discarding geometry of layer {}: the layer was removed or replaced",
                ticket.layer_id
            );
            return Ok(false);
        }

        self.release(&ticket.layer_id);
        let collection = result?;
        Ok(tree.write_geometry(&ticket.layer_id, Arc::new(collection)))
    }

    /// Returns true if a fetch for the layer is running.
    pub fn is_in_flight(&self, layer_id: &str) -> bool {
        self.in_flight.lock().contains(layer_id)
    }

    /// Invalidates all outstanding tickets of a removed or replaced layer.
    pub fn forget(&self, layer_id: &str) {
        self.release(layer_id);
        *self
            .generations
            .lock()
            .entry(layer_id.to_string())
            .or_insert(0) += 1;
    }

    fn release(&self, layer_id: &str) {
        self.in_flight.lock().remove(layer_id);
    }

    fn generation(&self, layer_id: &str) -> u64 {
        self.generations
            .lock()
            .get(layer_id)
            .copied()
            .unwrap_or_default()
    }
}
