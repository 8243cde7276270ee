//! Error types used by the crate.

use geoview_types::error::GeoviewTypesError;
use thiserror::Error;

/// Geoview error type.
#[derive(Debug, Error)]
pub enum GeoviewError {
    /// Geometry or attribute retrieval failed.
    #[error("failed to fetch data for '{path}': {reason}")]
    Fetch {
        /// Source path or URL.
        path: String,
        /// Backend message.
        reason: String,
    },
    /// The backend geodata service reported an error.
    #[error("geodata service error: {0}")]
    Backend(String),
    /// Coordinate system is unknown or a transform failed.
    #[error("projection error: {0}")]
    Projection(String),
    /// Item not found.
    #[error("item not found: {0}")]
    NotFound(String),
    /// Layer tree violates an invariant (duplicate id, group without children etc).
    #[error("invalid layer tree: {0}")]
    InvalidLayerTree(String),
    /// Error decoding data.
    #[error("failed to decode data: {0}")]
    Decoding(#[from] serde_json::Error),
    /// Geometry conversion error.
    #[error(transparent)]
    Types(#[from] GeoviewTypesError),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

/// Non-fatal failure surfaced by the render and interaction pipeline.
///
/// Failures never abort a reconcile pass or an interaction. They are logged and reported as
/// diagnostics instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Layer the failure concerns, if any.
    pub layer_id: Option<String>,
    /// Category of the failure.
    pub kind: DiagnosticKind,
    /// Human readable description.
    pub message: String,
}

/// Category of a [`Diagnostic`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Geometry fetch failed; an empty collection was rendered.
    Fetch,
    /// Projection lookup or transform failed; coordinates were used as is.
    Projection,
    /// Style configuration was malformed; defaults were used.
    Style,
    /// A hit could not be attributed to a layer.
    HitTest,
}

impl Diagnostic {
    /// Creates a diagnostic and logs it at `warn` level.
    pub fn new(layer_id: Option<&str>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match layer_id {
            Some(id) => log::warn!("{kind:?} failure on layer {id}: {message}"),
            None => log::warn!("{kind:?} failure: {message}"),
        }

        Self {
            layer_id: layer_id.map(str::to_string),
            kind,
            message,
        }
    }

    /// Creates a diagnostic from an error.
    pub fn from_error(layer_id: Option<&str>, kind: DiagnosticKind, error: &GeoviewError) -> Self {
        Self::new(layer_id, kind, error.to_string())
    }
}
