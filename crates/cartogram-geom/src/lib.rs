#![forbid(unsafe_code)]

//! Planar geometry kernel used by the cartogram pipeline.
//!
//! The kernel is intentionally small: axis-aligned [`Envelope`]s, simple rings assembled into
//! [`Polygon`]s and [`MultiPolygon`]s, and the handful of predicates the grid needs
//! (even-odd ray casting, segment intersection, shoelace areas).
//!
//! Polygon/polygon predicates are vertex based: `contains` and `intersects` test the vertices of
//! one polygon against the rings of the other. Edge crossings without a vertex inside are not
//! detected.

pub mod algorithms;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod multi_polygon;
pub mod polygon;

pub use algorithms::{
    SEGMENT_EPSILON, area_of_quadrangle, area_of_triangle, ring_area, ring_contains_point,
    segment_intersection,
};
pub use envelope::Envelope;
pub use error::{GeomError, Result};
pub use factory::polygons_from_rings;
pub use multi_polygon::MultiPolygon;
pub use polygon::Polygon;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type Unit = euclid::UnknownUnit;

pub type Coordinate = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn coord(x: f64, y: f64) -> Coordinate {
    euclid::point2(x, y)
}
