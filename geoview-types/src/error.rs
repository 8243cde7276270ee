//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error)]
pub enum GeoviewTypesError {
    /// Geometry conversion error.
    #[error("invalid input geometry: {0}")]
    Conversion(String),
    /// Coordinate values are not finite or out of the valid range.
    #[error("invalid coordinates: [{0}, {1}]")]
    InvalidCoordinates(f64, f64),
}
