use std::sync::OnceLock;

use crate::algorithms::{ring_area, ring_contains_point, subdivide_segments};
use crate::{Coordinate, Envelope, Result};

/// A simple exterior ring with optional holes.
///
/// Rings are stored without a closing vertex. Envelope and area are computed lazily and cached;
/// the polygon itself never changes after construction.
#[derive(Debug, Clone)]
pub struct Polygon {
    exterior: Vec<Coordinate>,
    holes: Vec<Vec<Coordinate>>,
    envelope: OnceLock<Envelope>,
    area: OnceLock<f64>,
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.exterior == other.exterior && self.holes == other.holes
    }
}

fn open_ring(mut ring: Vec<Coordinate>) -> Vec<Coordinate> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

impl Polygon {
    pub fn new(exterior: Vec<Coordinate>) -> Self {
        Self::with_holes(exterior, Vec::new())
    }

    pub fn with_holes(exterior: Vec<Coordinate>, holes: Vec<Vec<Coordinate>>) -> Self {
        Self {
            exterior: open_ring(exterior),
            holes: holes.into_iter().map(open_ring).collect(),
            envelope: OnceLock::new(),
            area: OnceLock::new(),
        }
    }

    pub fn exterior(&self) -> &[Coordinate] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<Coordinate>] {
        &self.holes
    }

    pub fn coordinate_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    pub fn envelope(&self) -> Envelope {
        *self
            .envelope
            .get_or_init(|| Envelope::from_coordinates(&self.exterior))
    }

    /// Exterior area minus the area of every hole.
    pub fn area(&self) -> f64 {
        *self.area.get_or_init(|| {
            let holes: f64 = self.holes.iter().map(|h| ring_area(h)).sum();
            ring_area(&self.exterior) - holes
        })
    }

    pub fn contains_point(&self, p: Coordinate) -> bool {
        ring_contains_point(&self.exterior, p)
            && !self.holes.iter().any(|h| ring_contains_point(h, p))
    }

    /// Vertex-based containment: `other`'s envelope must lie within ours and every vertex of
    /// its exterior must pass the even-odd test against our exterior ring.
    pub fn contains(&self, other: &Polygon) -> bool {
        if !self.envelope().contains_envelope(&other.envelope()) {
            return false;
        }
        other
            .exterior
            .iter()
            .all(|&p| ring_contains_point(&self.exterior, p))
    }

    /// Vertex-based overlap test in both directions.
    ///
    /// True when a vertex of either exterior lies inside the other exterior. Overlaps that only
    /// cross edges (no vertex inside) are not detected.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if !self.envelope().intersects(&other.envelope()) {
            return false;
        }
        other
            .exterior
            .iter()
            .any(|&p| ring_contains_point(&self.exterior, p))
            || self
                .exterior
                .iter()
                .any(|&p| ring_contains_point(&other.exterior, p))
    }

    /// Copy of this polygon with every segment longer than `max_len` subdivided.
    pub fn regularized(&self, max_len: f64) -> Result<Polygon> {
        let exterior = subdivide_segments(&self.exterior, max_len, true)?;
        let holes = self
            .holes
            .iter()
            .map(|h| subdivide_segments(h, max_len, true))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::with_holes(exterior, holes))
    }
}
