//! Access to coordinate reference systems.
//!
//! The engine does not do CRS math itself. It asks a [`ProjectionGateway`] to transform
//! coordinates and uses [`MapProjector`] to apply those transforms to GeoJSON features and
//! extents. [`CrsRegistry`] is the built-in gateway that knows the geographic systems and Web
//! Mercator.

use geoview_types::geo::CrsDefinition;
use geoview_types::Extent;
use maybe_sync::{MaybeSend, MaybeSync};

use crate::error::GeoviewError;

mod projector;
mod registry;

pub use projector::MapProjector;
pub use registry::CrsRegistry;

/// Registry of coordinate systems able to transform coordinates between them.
pub trait ProjectionGateway: MaybeSend + MaybeSync {
    /// Registers every known coordinate system. Returns the number of registered definitions.
    fn register_all(&self) -> usize;

    /// Definition of a registered coordinate system.
    fn definition(&self, code: &str) -> Option<CrsDefinition>;

    /// Transforms `[x, y]` coordinates from one system into another.
    fn transform(
        &self,
        from: &str,
        to: &str,
        coordinates: &[[f64; 2]],
    ) -> Result<Vec<[f64; 2]>, GeoviewError>;

    /// Valid area of a coordinate system, in its own units.
    fn extent_of(&self, code: &str) -> Option<Extent>;
}
