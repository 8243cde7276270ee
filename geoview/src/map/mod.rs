//! A map instance: the layer tree, the rendering surface and everything the user does with them.
//!
//! [`MapEngine`] owns one [`RenderSurface`] and keeps it in line with its [`LayerTree`]. The host
//! feeds it raw pointer events and calls [`MapEngine::update`] on every frame; other parts of the
//! application talk to it through a [`MapHandle`] and listen to the [`MapEvent`]s returned by
//! [`MapEngine::subscribe`].

use std::sync::Arc;

use geojson::Feature;
use geoview_types::geo::WGS84;
use geoview_types::{Extent, GeoPoint};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use web_time::Instant;

use crate::async_runtime;
use crate::config::EngineConfig;
use crate::control::{
    EventProcessor, InputEvent, MapController, MapControllerConfiguration, MouseButton,
    PointerState, RawInput,
};
use crate::error::{Diagnostic, DiagnosticKind, GeoviewError};
use crate::highlight::{FlashCallback, HighlightController};
use crate::layer::{Layer, LayerTree};
use crate::loader::{FetchOutcome, FetchTicket, GeometryLoader};
use crate::measure::MeasureEngine;
use crate::messenger::Messenger;
use crate::pick::{HitTester, PickMode, PickedFeature};
use crate::projection::{MapProjector, ProjectionGateway};
use crate::reconciler::{ReconcileReport, RenderReconciler};
use crate::render::RenderSurface;
use crate::selection::{InspectionState, Selection, SelectionState};
use crate::service::GeodataService;
use crate::view::{MapView, Point2d};

mod command;
mod debounce;

pub use command::{CursorHint, MapCommand, MapEvent, MapHandle, MapTool};
pub use debounce::Debouncer;

/// Interactive map over a rendering surface.
pub struct MapEngine<S: RenderSurface> {
    config: EngineConfig,
    tree: LayerTree,
    surface: S,
    view: MapView,

    reconciler: RenderReconciler,
    loader: Arc<GeometryLoader>,
    projector: MapProjector,
    hit_tester: HitTester,
    highlight: HighlightController,
    measure: MeasureEngine,

    selection: SelectionState,
    inspection: InspectionState,
    select_mode: bool,
    measure_panel_open: bool,
    cursor: CursorHint,

    event_processor: EventProcessor,
    controller: MapController,
    center_debounce: Debouncer<Point2d>,
    zoom_debounce: Debouncer<f64>,

    command_sender: UnboundedSender<MapCommand>,
    commands: UnboundedReceiver<MapCommand>,
    events: Option<UnboundedSender<MapEvent>>,
    fetch_sender: UnboundedSender<FetchOutcome>,
    fetched: UnboundedReceiver<FetchOutcome>,
    pending_fetches: usize,
    skip_auto_zoom: bool,

    messenger: Option<Box<dyn Messenger>>,
}

impl<S: RenderSurface> MapEngine<S> {
    /// Creates a map with an empty layer tree.
    ///
    /// Registers all coordinate systems known to the gateway and creates the highlight and
    /// measurement overlays on the surface.
    pub fn new(
        mut surface: S,
        service: Arc<dyn GeodataService>,
        gateway: Arc<dyn ProjectionGateway>,
        config: EngineConfig,
    ) -> Self {
        let registered = gateway.register_all();
        log::debug!("Registered {registered} coordinate systems");

        let highlight = HighlightController::new(
            &mut surface,
            config.highlight_z_index(),
            config.flash_interval(),
            config.flash_count(),
        );
        let measure = MeasureEngine::new(
            &mut surface,
            config.measure_z_index(),
            config.area_formula(),
        );

        let mut hit_tester = HitTester::new(config.hit_tolerance());
        hit_tester.exclude(highlight.handle());
        hit_tester.exclude(measure.handle());

        let view = MapView::with_zoom_level(Point2d::origin(), config.min_zoom());
        surface.set_view(&view);

        let (command_sender, commands) = unbounded_channel();
        let (fetch_sender, fetched) = unbounded_channel();

        Self {
            projector: MapProjector::new(gateway, config.map_projection()),
            controller: MapController::new(
                MapControllerConfiguration::default()
                    .with_zoom_range(config.min_zoom(), config.max_zoom()),
            ),
            center_debounce: Debouncer::new(config.center_debounce()),
            zoom_debounce: Debouncer::new(config.zoom_debounce()),
            tree: LayerTree::default(),
            surface,
            view,
            reconciler: RenderReconciler::new(),
            loader: Arc::new(GeometryLoader::new(service)),
            hit_tester,
            highlight,
            measure,
            selection: SelectionState::default(),
            inspection: InspectionState::default(),
            select_mode: false,
            measure_panel_open: false,
            cursor: CursorHint::Default,
            event_processor: EventProcessor::default(),
            command_sender,
            commands,
            events: None,
            fetch_sender,
            fetched,
            pending_fetches: 0,
            skip_auto_zoom: false,
            messenger: None,
            config,
        }
    }

    /// Configuration the map was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layer tree of the map.
    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    /// Mutable access to a layer, e.g. to change its symbolizer. Applied on the next sync.
    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.tree.find_mut(id)
    }

    /// The rendering surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the rendering surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Current view.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Moves the map without treating it as a user move, e.g. when restoring a session.
    pub fn set_view(&mut self, view: MapView) {
        self.move_view(view, None);
    }

    /// Projection of the map surface.
    pub fn map_projection(&self) -> &str {
        self.projector.map_projection()
    }

    /// Switches the map surface to another projection, keeping the same place in view.
    ///
    /// Vector layers are rebuilt in the new projection on the next sync. The highlight and all
    /// measurements are cleared. If the view can't be moved into the new projection, nothing
    /// changes and the error is returned.
    pub fn set_map_projection(&mut self, code: &str) -> Result<(), GeoviewError> {
        let current = self.projector.map_projection();
        if current == code {
            return Ok(());
        }

        let center = self.view.center();
        let moved = self.projector.gateway().transform(
            current,
            code,
            &[[center.x, center.y], [center.x + self.view.resolution(), center.y]],
        )?;
        let &[[x, y], [edge_x, edge_y]] = moved.as_slice() else {
            return Err(GeoviewError::Projection(format!(
                "transform from {current} to {code} lost points"
            )));
        };
        let resolution = (edge_x - x).hypot(edge_y - y);
        let resolution = if resolution.is_finite() && resolution > 0.0 {
            resolution
        } else {
            self.view.resolution()
        };

        log::info!("Switching map projection from {current} to {code}");
        self.projector = MapProjector::new(self.projector.gateway().clone(), code);
        self.config = self.config.clone().with_map_projection(code);
        self.highlight.set_highlight(&mut self.surface, None);
        if self.selection.clear() {
            self.emit(MapEvent::SelectionChanged(None));
        }
        self.clear_measure();
        let view = MapView::new(Point2d::new(x, y), resolution).with_size(self.view.size());
        self.move_view(view, None);
        Ok(())
    }

    /// Render objects of the layers.
    pub fn reconciler(&self) -> &RenderReconciler {
        &self.reconciler
    }

    /// Highlight overlay.
    pub fn highlight(&self) -> &HighlightController {
        &self.highlight
    }

    /// Measurement tool.
    pub fn measure(&self) -> &MeasureEngine {
        &self.measure
    }

    /// Selected feature.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.get()
    }

    /// Features found by the last browse click.
    pub fn inspection(&self) -> &InspectionState {
        &self.inspection
    }

    /// Returns true if clicks select features instead of inspecting them.
    pub fn is_select_mode(&self) -> bool {
        self.select_mode
    }

    /// Returns true if the measurement panel is expanded.
    pub fn is_measure_panel_open(&self) -> bool {
        self.measure_panel_open
    }

    /// Cursor the host should show.
    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    /// Number of geometry fetches that have not been applied yet.
    pub fn pending_fetches(&self) -> usize {
        self.pending_fetches
    }

    /// Sender of commands to this map.
    pub fn handle(&self) -> MapHandle {
        MapHandle::new(self.command_sender.clone())
    }

    /// Returns the receiver of events of this map. A new subscription replaces the previous one.
    pub fn subscribe(&mut self) -> UnboundedReceiver<MapEvent> {
        let (sender, receiver) = unbounded_channel();
        self.events = Some(sender);
        receiver
    }

    /// Sets the hook used to ask the host for a redraw.
    pub fn set_messenger(&mut self, messenger: Option<impl Messenger + 'static>) {
        self.messenger = messenger.map(|m| Box::new(m) as Box<dyn Messenger>);
    }

    /// Adds a layer on top of all others, or at the bottom if it is a basemap.
    pub fn add_layer(&mut self, layer: Layer) -> Result<(), GeoviewError> {
        self.tree.add(layer)
    }

    /// Removes a layer, with its children. Clears the selection if it belonged to it.
    pub fn remove_layer(&mut self, id: &str) -> Option<Layer> {
        let removed = self.tree.remove(id)?;
        let selected_gone = self
            .selection
            .get()
            .is_some_and(|selection| !self.tree.contains(&selection.layer_id));
        if selected_gone {
            self.clear_selection();
        }

        Some(removed)
    }

    /// Shows or hides a layer. Returns false if there is no such layer.
    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> bool {
        self.tree.set_visible(id, visible)
    }

    /// Changes opacity of a layer. Returns false if there is no such layer.
    pub fn set_layer_opacity(&mut self, id: &str, opacity: f64) -> bool {
        self.tree.set_opacity(id, opacity)
    }

    /// Reorders top-level layers.
    pub fn reorder_layers<T: AsRef<str>>(&mut self, ids: &[T]) -> Result<(), GeoviewError> {
        self.tree.reorder(ids)
    }

    /// Replaces the whole tree, e.g. when a session is restored. The layers of the new tree do
    /// not move the map.
    pub fn replace_layers(&mut self, layers: Vec<Layer>) -> Result<(), GeoviewError> {
        self.tree = LayerTree::new(layers)?;
        self.skip_auto_zoom = true;
        Ok(())
    }

    /// Brings the surface in line with the layer tree.
    ///
    /// Fetches requested by the pass run in the background; their results are applied by
    /// [`complete_pending_fetches`](Self::complete_pending_fetches). Newly added data layers with
    /// a known extent are zoomed to.
    ///
    /// Natively, background fetches are spawned on the ambient tokio runtime. Called from any
    /// other executor, the fetches are not started: each is reported as a
    /// [`DiagnosticKind::Fetch`] diagnostic and retried the next time its layer is shown.
    pub async fn sync(&mut self) -> ReconcileReport {
        let report = self
            .reconciler
            .reconcile(
                &mut self.tree,
                &mut self.surface,
                &self.loader,
                &self.projector,
                &self.config,
            )
            .await;

        for ticket in &report.fetches {
            self.spawn_fetch(ticket.clone());
        }
        for diagnostic in &report.diagnostics {
            self.emit(MapEvent::Diagnostic(diagnostic.clone()));
        }

        if !std::mem::take(&mut self.skip_auto_zoom) {
            self.zoom_to_new_layers(&report.created);
        }
        if report.surface_changed() {
            self.redraw();
        }

        report
    }

    /// Applies finished geometry fetches to the layer tree. Returns the number of applied fetches.
    pub fn complete_pending_fetches(&mut self) -> usize {
        let mut count = 0;
        while let Ok(outcome) = self.fetched.try_recv() {
            self.apply_fetch(outcome);
            count += 1;
        }

        count
    }

    /// Syncs, waits for all running fetches and syncs again until nothing is left to load.
    pub async fn settle(&mut self) -> ReconcileReport {
        let mut report = self.sync().await;
        while self.pending_fetches > 0 {
            while self.pending_fetches > 0 {
                let Some(outcome) = self.fetched.recv().await else {
                    self.pending_fetches = 0;
                    break;
                };
                self.apply_fetch(outcome);
            }
            report = self.sync().await;
        }

        report
    }

    /// Frame step: applies queued commands and finished fetches, syncs the surface and advances
    /// timers. See [`sync`](Self::sync) for the runtime background fetches need.
    pub async fn update(&mut self, now: Instant) -> ReconcileReport {
        self.process_commands(now);
        self.complete_pending_fetches();
        let report = self.sync().await;
        self.tick(now);
        report
    }

    /// Advances the flash sequence and sends settled view changes.
    pub fn tick(&mut self, now: Instant) {
        if self.highlight.update(&mut self.surface, now) {
            self.redraw();
        }

        if let Some(center) = self.center_debounce.poll(now) {
            let mut diagnostics = vec![];
            let [lng, lat] = self.projector.point_from_map_or_identity(
                WGS84,
                [center.x, center.y],
                &mut diagnostics,
            );
            self.emit_all(diagnostics);
            self.emit(MapEvent::CenterChanged(GeoPoint::new(lng, lat)));
        }

        if let Some(zoom) = self.zoom_debounce.poll(now) {
            self.emit(MapEvent::ZoomChanged(zoom));
        }
    }

    /// Applies all commands sent through the [`MapHandle`]s. Returns the number of commands.
    pub fn process_commands(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command, now);
            count += 1;
        }

        count
    }

    /// Applies a command right away.
    pub fn apply_command(&mut self, command: MapCommand, now: Instant) {
        log::debug!("Applying map command {command:?}");
        match command {
            MapCommand::ZoomToFeature { bounds, feature } => {
                self.fit_data_extent(&bounds);
                if let Some(feature) = feature {
                    let feature = self.data_feature_to_map(&feature);
                    self.highlight.set_highlight(&mut self.surface, Some(feature));
                    self.redraw();
                }
            }
            MapCommand::ZoomToLayer { extent } => self.fit_data_extent(&extent),
            MapCommand::ClearSelection => self.clear_selection(),
            MapCommand::FlashFeature { feature } => {
                let feature = self.data_feature_to_map(&feature);
                self.flash(feature, now);
            }
            MapCommand::Tool(tool) => self.apply_tool(tool, now),
            MapCommand::Refresh => {
                self.surface.set_view(&self.view);
                self.redraw();
            }
            MapCommand::PanelResized { size } => self.move_view(self.view.with_size(size), None),
        }
    }

    /// Runs a toolbar action.
    pub fn apply_tool(&mut self, tool: MapTool, now: Instant) {
        match tool {
            MapTool::ZoomIn => {
                let view = self.controller.zoom_by(&self.view, 1.0);
                self.move_view(view, Some(now));
            }
            MapTool::ZoomOut => {
                let view = self.controller.zoom_by(&self.view, -1.0);
                self.move_view(view, Some(now));
            }
            MapTool::Pan => self.select_mode = false,
            MapTool::FullExtent => self.full_extent(),
            MapTool::Select => {
                if self.select_mode {
                    self.clear_selection();
                }
                self.select_mode = !self.select_mode;
            }
            MapTool::ClearSelection => self.clear_selection(),
            MapTool::Measure => {
                self.measure_panel_open = !self.measure_panel_open;
                if !self.measure_panel_open {
                    self.clear_measure();
                }
            }
            MapTool::ClearMeasure => self.clear_measure(),
            MapTool::MeasureMode(mode) => {
                self.select_mode = false;
                self.measure_panel_open = true;
                self.measure.select_mode(mode);
                self.emit(MapEvent::MeasurementChanged(None));
                self.set_cursor(CursorHint::Crosshair);
                self.redraw();
            }
        }
    }

    /// Handles a pointer event that happened at `now`.
    pub fn handle_event(&mut self, event: RawInput, now: Instant) {
        for event in self.event_processor.process(event, &self.view, now) {
            self.handle_input(event, now);
        }
    }

    /// Clears the selection and the highlight.
    pub fn clear_selection(&mut self) {
        self.highlight.set_highlight(&mut self.surface, None);
        if self.selection.clear() {
            self.emit(MapEvent::SelectionChanged(None));
        }
        self.redraw();
    }

    /// Removes all measurements and leaves the measurement mode.
    pub fn clear_measure(&mut self) {
        self.measure.clear(&mut self.surface);
        self.emit(MapEvent::MeasurementChanged(None));
        self.set_cursor(CursorHint::Default);
        self.redraw();
    }

    /// Shows the next inspected feature. Returns false at the last one.
    pub fn inspect_next(&mut self, now: Instant) -> bool {
        let moved = self.inspection.next();
        if moved {
            self.inspection_moved(now);
        }
        moved
    }

    /// Shows the previous inspected feature. Returns false at the first one.
    pub fn inspect_previous(&mut self, now: Instant) -> bool {
        let moved = self.inspection.previous();
        if moved {
            self.inspection_moved(now);
        }
        moved
    }

    /// Shows the inspected feature at `index`. Returns false if there is no such feature.
    pub fn inspect_at(&mut self, index: usize, now: Instant) -> bool {
        let moved = self.inspection.set_current(index);
        if moved {
            self.inspection_moved(now);
        }
        moved
    }

    fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match &event {
            InputEvent::PointerMoved(mouse) => self.pointer_moved(mouse),
            InputEvent::Click(MouseButton::Left, mouse) => self.click(mouse, now),
            InputEvent::DoubleClick(MouseButton::Left, mouse) => self.double_click(mouse, now),
            _ => {
                if let Some(view) = self.controller.handle(&event, &self.view) {
                    self.move_view(view, Some(now));
                }
            }
        }
    }

    fn pointer_moved(&mut self, mouse: &PointerState) {
        let mut diagnostics = vec![];
        let position = mouse.map;
        let [lng, lat] = self.projector.point_from_map_or_identity(
            WGS84,
            [position.x, position.y],
            &mut diagnostics,
        );
        self.emit_all(diagnostics);
        self.emit(MapEvent::MouseMoved { lat, lng });

        let cursor = if self.measure.is_active() {
            CursorHint::Crosshair
        } else if self
            .hit_tester
            .is_over_feature(mouse.screen, &self.surface, &self.reconciler)
        {
            CursorHint::Pointer
        } else {
            CursorHint::Default
        };
        self.set_cursor(cursor);
    }

    fn click(&mut self, mouse: &PointerState, now: Instant) {
        let mut diagnostics = vec![];

        if self.measure.is_active() {
            let position = mouse.map;
            let [lng, lat] = self.projector.point_from_map_or_identity(
                WGS84,
                [position.x, position.y],
                &mut diagnostics,
            );
            self.measure.click(
                GeoPoint::new(lng, lat),
                &mut self.surface,
                &self.projector,
                &mut diagnostics,
            );
            self.emit_all(diagnostics);
            self.emit(MapEvent::MeasurementChanged(self.measure.measurement()));
            self.redraw();
            return;
        }

        let mode = if self.select_mode {
            PickMode::Select
        } else {
            PickMode::Browse
        };
        let picked = self.hit_tester.pick(
            mouse.screen,
            mode,
            &self.surface,
            &self.reconciler,
            &self.tree,
            &self.projector,
            self.config.data_projection(),
            &mut diagnostics,
        );

        match mode {
            PickMode::Select => {
                if let Some(picked) = picked.into_iter().next() {
                    let feature = self.picked_to_map(&picked, &mut diagnostics);
                    self.highlight.set_highlight(&mut self.surface, Some(feature));
                    let selection = Selection::from(picked);
                    log::debug!(
                        "Selected feature {} of layer {}",
                        selection.feature_id,
                        selection.layer_id
                    );
                    if self.selection.set(Some(selection.clone())) {
                        self.emit(MapEvent::SelectionChanged(Some(selection)));
                    }
                    self.redraw();
                }
            }
            PickMode::Browse => {
                if !picked.is_empty() {
                    log::debug!("Inspecting {} features", picked.len());
                    self.inspection.set_items(picked);
                    self.inspection_moved(now);
                }
            }
        }

        self.emit_all(diagnostics);
    }

    fn double_click(&mut self, mouse: &PointerState, now: Instant) {
        if self.measure.is_active() {
            if self.measure.double_click() {
                self.emit(MapEvent::MeasurementChanged(None));
            }
            return;
        }

        let view = self.controller.clamp(self.view.zoom(0.5, mouse.screen));
        self.move_view(view, Some(now));
    }

    fn inspection_moved(&mut self, now: Instant) {
        self.emit(MapEvent::InspectionChanged {
            items: self.inspection.items().to_vec(),
            current: self.inspection.current_index(),
        });

        let Some(current) = self.inspection.current().cloned() else {
            return;
        };
        let mut diagnostics = vec![];
        let feature = self.picked_to_map(&current, &mut diagnostics);
        self.emit_all(diagnostics);
        self.flash(feature, now);
    }

    fn flash(&mut self, feature: Feature, now: Instant) {
        let on_done = self.events.clone().map(|sender| -> FlashCallback {
            Box::new(move || {
                let _ = sender.send(MapEvent::FlashFinished);
            })
        });
        self.highlight.flash(&mut self.surface, feature, now, on_done);
        self.redraw();
    }

    fn full_extent(&mut self) {
        let mut diagnostics = vec![];
        let data_projection = self.config.data_projection();
        let extents: Vec<Extent> = self
            .tree
            .flatten()
            .iter()
            .filter(|item| !item.layer.basemap)
            .filter_map(|item| {
                let extent = item.layer.extent?;
                Some(self.projector.extent_to_map_or_identity(
                    item.layer.projection(data_projection),
                    &extent,
                    Some(&item.layer.id),
                    &mut diagnostics,
                ))
            })
            .collect();
        self.emit_all(diagnostics);

        match Extent::union_all(extents) {
            Some(extent) => self.fit_map_extent(&extent),
            None => log::debug!("No data layer has an extent to show"),
        }
    }

    fn zoom_to_new_layers(&mut self, created: &[String]) {
        let mut diagnostics = vec![];
        let data_projection = self.config.data_projection();
        let extents: Vec<Extent> = created
            .iter()
            .filter_map(|id| self.tree.find(id))
            .filter(|layer| !layer.basemap)
            .filter_map(|layer| {
                let extent = layer.extent?;
                Some(self.projector.extent_to_map_or_identity(
                    layer.projection(data_projection),
                    &extent,
                    Some(&layer.id),
                    &mut diagnostics,
                ))
            })
            .collect();
        self.emit_all(diagnostics);

        if let Some(extent) = Extent::union_all(extents) {
            log::debug!("Zooming to new layers");
            self.fit_map_extent(&extent);
        }
    }

    fn fit_data_extent(&mut self, extent: &Extent) {
        let mut diagnostics = vec![];
        let extent = self.projector.extent_to_map_or_identity(
            self.config.data_projection(),
            extent,
            None,
            &mut diagnostics,
        );
        self.emit_all(diagnostics);
        self.fit_map_extent(&extent);
    }

    fn fit_map_extent(&mut self, extent: &Extent) {
        let view = self.controller.clamp(self.view.fit(extent, self.config.fit_padding()));
        self.move_view(view, None);
    }

    /// Changes the view. User moves, given the time they happened at, are persisted once they
    /// settle; programmatic ones are not.
    fn move_view(&mut self, view: MapView, user_move_at: Option<Instant>) {
        let previous = self.view;
        self.view = view;
        self.surface.set_view(&view);
        self.redraw();

        let Some(now) = user_move_at else {
            return;
        };
        if previous.center() != view.center() {
            self.center_debounce.schedule(view.center(), now);
        }
        if previous.resolution() != view.resolution() {
            self.zoom_debounce.schedule(view.zoom_level(), now);
        }
    }

    fn picked_to_map(&self, picked: &PickedFeature, diagnostics: &mut Vec<Diagnostic>) -> Feature {
        let data_projection = self.config.data_projection();
        let projection = self
            .tree
            .find(&picked.layer_id)
            .map(|layer| layer.projection(data_projection))
            .unwrap_or(data_projection);
        self.projector.feature_to_map_or_identity(
            projection,
            &picked.feature,
            Some(&picked.layer_id),
            diagnostics,
        )
    }

    fn data_feature_to_map(&mut self, feature: &Feature) -> Feature {
        let mut diagnostics = vec![];
        let feature = self.projector.feature_to_map_or_identity(
            self.config.data_projection(),
            feature,
            None,
            &mut diagnostics,
        );
        self.emit_all(diagnostics);
        feature
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        let loader = self.loader.clone();
        let sender = self.fetch_sender.clone();
        let layer_id = ticket.layer_id().to_string();
        let spawned = async_runtime::spawn_detached(async move {
            let outcome = loader.run(ticket).await;
            if sender.send(outcome).is_err() {
                log::debug!("Geometry arrived after the map was dropped");
            }
        });

        if spawned {
            self.pending_fetches += 1;
            return;
        }

        self.loader.forget(&layer_id);
        self.reconciler.mark_fetch_failed(&layer_id);
        let diagnostic = Diagnostic::new(
            Some(&layer_id),
            DiagnosticKind::Fetch,
            "no async runtime to fetch geometry on",
        );
        self.emit(MapEvent::Diagnostic(diagnostic));
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
        let layer_id = outcome.ticket.layer_id().to_string();
        if let Err(err) = self.loader.complete(outcome, &mut self.tree) {
            self.reconciler.mark_fetch_failed(&layer_id);
            let diagnostic = Diagnostic::from_error(Some(&layer_id), DiagnosticKind::Fetch, &err);
            self.emit(MapEvent::Diagnostic(diagnostic));
        }
    }

    fn set_cursor(&mut self, cursor: CursorHint) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.emit(MapEvent::CursorChanged(cursor));
        }
    }

    fn emit(&mut self, event: MapEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                log::debug!("Map event receiver was dropped");
                self.events = None;
            }
        }
    }

    fn emit_all(&mut self, diagnostics: Vec<Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(MapEvent::Diagnostic(diagnostic));
        }
    }

    fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }
}
