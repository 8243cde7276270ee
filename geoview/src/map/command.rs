use geojson::Feature;
use geoview_types::{Extent, GeoPoint};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Diagnostic;
use crate::measure::{MeasureMode, Measurement};
use crate::pick::PickedFeature;
use crate::selection::Selection;
use crate::view::Size;

/// Toolbar action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapTool {
    /// Zooms in by one level.
    ZoomIn,
    /// Zooms out by one level.
    ZoomOut,
    /// Plain navigation. Leaves select mode.
    Pan,
    /// Shows all data layers.
    FullExtent,
    /// Toggles select mode.
    Select,
    /// Clears the selection and the highlight.
    ClearSelection,
    /// Expands or collapses the measurement panel.
    Measure,
    /// Removes all measurements.
    ClearMeasure,
    /// Starts measuring in the given mode.
    MeasureMode(MeasureMode),
}

/// Request sent to a map through its [`MapHandle`].
///
/// Extents and features are in the data projection.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    /// Fits the bounds and highlights the feature, if given.
    ZoomToFeature {
        /// Area to show.
        bounds: Extent,
        /// Feature to highlight.
        feature: Option<Feature>,
    },
    /// Fits the extent of a layer.
    ZoomToLayer {
        /// Extent of the layer.
        extent: Extent,
    },
    /// Clears the selection and the highlight.
    ClearSelection,
    /// Blinks the feature.
    FlashFeature {
        /// Feature to blink.
        feature: Feature,
    },
    /// Runs a toolbar action.
    Tool(MapTool),
    /// Redraws the map.
    Refresh,
    /// The map container changed its size.
    PanelResized {
        /// New viewport size in pixels.
        size: Size,
    },
}

/// Cloneable sender of commands to one map instance.
///
/// Commands are queued and applied by the engine on its next
/// [`process_commands`](super::MapEngine::process_commands) call. Sending to a dropped engine is
/// a no-op.
#[derive(Debug, Clone)]
pub struct MapHandle {
    sender: UnboundedSender<MapCommand>,
}

impl MapHandle {
    pub(crate) fn new(sender: UnboundedSender<MapCommand>) -> Self {
        Self { sender }
    }

    /// Queues a command.
    pub fn send(&self, command: MapCommand) {
        if self.sender.send(command).is_err() {
            log::debug!("Map command dropped: the map is gone");
        }
    }

    /// Fits the bounds, in the data projection, and highlights the feature.
    pub fn zoom_to_feature(&self, bounds: Extent, feature: Option<Feature>) {
        self.send(MapCommand::ZoomToFeature { bounds, feature });
    }

    /// Fits the extent of a layer, in the data projection.
    pub fn zoom_to_layer(&self, extent: Extent) {
        self.send(MapCommand::ZoomToLayer { extent });
    }

    /// Clears the selection and the highlight.
    pub fn clear_selection(&self) {
        self.send(MapCommand::ClearSelection);
    }

    /// Blinks the feature.
    pub fn flash_feature(&self, feature: Feature) {
        self.send(MapCommand::FlashFeature { feature });
    }

    /// Runs a toolbar action.
    pub fn tool(&self, tool: MapTool) {
        self.send(MapCommand::Tool(tool));
    }

    /// Redraws the map.
    pub fn refresh(&self) {
        self.send(MapCommand::Refresh);
    }

    /// Tells the map its container has the new size.
    pub fn panel_resized(&self, size: Size) {
        self.send(MapCommand::PanelResized { size });
    }
}

/// Cursor the host should show over the map.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorHint {
    /// Regular cursor.
    #[default]
    Default,
    /// A feature is under the pointer.
    Pointer,
    /// A measurement mode is active.
    Crosshair,
}

/// Notification from a map instance to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The selection was replaced or cleared.
    SelectionChanged(Option<Selection>),
    /// A browse pick found features, or the inspected feature changed.
    InspectionChanged {
        /// Features under the click, topmost first.
        items: Vec<PickedFeature>,
        /// Index of the feature being looked at.
        current: usize,
    },
    /// The user moved the map. Sent once the movement settled.
    CenterChanged(GeoPoint),
    /// The user zoomed the map. Sent once the zoom settled.
    ZoomChanged(f64),
    /// Geographic position of the pointer.
    MouseMoved {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lng: f64,
    },
    /// The cursor hint changed.
    CursorChanged(CursorHint),
    /// The result of the measurement in progress changed.
    MeasurementChanged(Option<Measurement>),
    /// A flash sequence ended.
    FlashFinished,
    /// Something went wrong without interrupting the map.
    Diagnostic(Diagnostic),
}
