//! Geometry primitives used by the `geoview` map engine.
//!
//! The crate contains everything that does not depend on a rendering surface: geographic points
//! ([`GeoPoint`]), axis-aligned extents ([`Extent`]), the CRS catalogue with the built-in Web
//! Mercator projection ([`geo`]) and the metrics used by the on-map measurement tools
//! ([`geo::metrics`]).

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod error;
mod extent;
pub mod geo;
mod point;

pub use extent::Extent;
pub use point::GeoPoint;
