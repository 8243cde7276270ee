//! Geographic coordinate systems: the CRS catalogue ([`CrsDefinition`]), datums ([`Datum`]), the
//! built-in [`WebMercator`] projection and measurement [`metrics`].

mod crs;
mod datum;
pub mod metrics;
mod web_mercator;

pub use crs::{
    builtin_definitions, epsg_from_3_degree_zone, epsg_from_6_degree_zone, CrsDefinition, CrsKind,
    CGCS2000, WEB_MERCATOR, WGS84,
};
pub use datum::Datum;
pub use web_mercator::{WebMercator, MAX_LATITUDE};
