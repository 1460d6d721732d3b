//! Re-expressing geometry through the deformed grid.

use cartogram_geom::{Coordinate, coord, segment_intersection};

use super::CartogramGrid;
use crate::ProjectionError;

type ProjectionResult<T> = std::result::Result<T, ProjectionError>;

/// Slack, in cell units, accepted at the outer grid boundary.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Crossing parameters closer than this along a segment are merged.
const CROSSING_EPSILON: f64 = 1e-12;

impl CartogramGrid {
    /// Fractional cell position of `value` along one axis, or `None` outside the grid.
    fn cell_position(value: f64, min: f64, cell_size: f64, cells: usize) -> Option<f64> {
        let f = (value - min) / cell_size;
        let upper = cells as f64;
        if !f.is_finite() || f < -BOUNDARY_TOLERANCE || f > upper + BOUNDARY_TOLERANCE {
            return None;
        }
        Some(f.clamp(0.0, upper))
    }

    /// Maps a point of the undeformed envelope into the deformed grid.
    ///
    /// Within its cell the point is expressed by its fractional position `(ti, tj)`; the result
    /// is the intersection of the two segments joining the points at `ti` on the lower and upper
    /// edges and at `tj` on the right and left edges of the displaced quadrilateral. If those
    /// segments miss each other the quadrilateral's centroid is returned.
    pub fn project_point(&self, x: f64, y: f64) -> ProjectionResult<Coordinate> {
        let out_of_bounds = || ProjectionError::OutOfBounds { x, y };
        let env = &self.envelope;
        let (cells_x, cells_y) = (self.size_x - 1, self.size_y - 1);
        let fx = Self::cell_position(x, env.min_x(), self.cell_size_x, cells_x)
            .ok_or_else(out_of_bounds)?;
        let fy = Self::cell_position(y, env.min_y(), self.cell_size_y, cells_y)
            .ok_or_else(out_of_bounds)?;

        let i = (fx.floor() as usize).min(cells_x - 1);
        let j = (fy.floor() as usize).min(cells_y - 1);
        let (ti, tj) = (fx - i as f64, fy - j as f64);

        let a = self.node(i, j);
        let b = self.node(i + 1, j);
        let c = self.node(i + 1, j + 1);
        let d = self.node(i, j + 1);

        let e = a + (b - a) * ti;
        let f = b + (c - b) * tj;
        let g = d + (c - d) * ti;
        let h = a + (d - a) * tj;

        Ok(segment_intersection(e, g, f, h).unwrap_or_else(|| {
            coord(
                0.25 * (a.x + b.x + c.x + d.x),
                0.25 * (a.y + b.y + c.y + d.y),
            )
        }))
    }

    pub fn project_coordinate(&self, c: Coordinate) -> ProjectionResult<Coordinate> {
        self.project_point(c.x, c.y)
    }

    /// Parameters in `(0, 1)` at which the segment from `a` to `b` (in cell units) crosses an
    /// integer grid line in `[0, cells]`.
    fn crossings(a: f64, b: f64, cells: usize, out: &mut Vec<f64>) {
        let (lo, hi) = (a.min(b), a.max(b));
        if !(lo.is_finite() && hi.is_finite()) || hi - lo <= 0.0 {
            return;
        }
        let first = (lo.floor() + 1.0).max(0.0);
        let last = (hi.ceil() - 1.0).min(cells as f64);
        let mut k = first;
        while k <= last {
            let t = (k - a) / (b - a);
            if t.is_finite() && t > 0.0 && t < 1.0 {
                out.push(t);
            }
            k += 1.0;
        }
    }

    /// Projects the segment `c1 → c2` as a polyline: its endpoints plus every point where it
    /// crosses a grid line, in order along the segment.
    pub fn project_line_segment(
        &self,
        c1: Coordinate,
        c2: Coordinate,
    ) -> ProjectionResult<Vec<Coordinate>> {
        let env = &self.envelope;
        let to_cells_x = |x: f64| (x - env.min_x()) / self.cell_size_x;
        let to_cells_y = |y: f64| (y - env.min_y()) / self.cell_size_y;

        let mut ts = Vec::new();
        Self::crossings(to_cells_x(c1.x), to_cells_x(c2.x), self.size_x - 1, &mut ts);
        Self::crossings(to_cells_y(c1.y), to_cells_y(c2.y), self.size_y - 1, &mut ts);
        ts.sort_by(f64::total_cmp);
        ts.dedup_by(|a, b| (*a - *b).abs() < CROSSING_EPSILON);

        let mut out = Vec::with_capacity(ts.len() + 2);
        out.push(self.project_coordinate(c1)?);
        for t in ts {
            out.push(self.project_coordinate(c1 + (c2 - c1) * t)?);
        }
        out.push(self.project_coordinate(c2)?);
        Ok(out)
    }

    /// Projects an open coordinate sequence segment by segment. Shared endpoints appear once and
    /// consecutive duplicates are dropped.
    pub fn project_coordinates(&self, line: &[Coordinate]) -> ProjectionResult<Vec<Coordinate>> {
        match line {
            [] => return Ok(Vec::new()),
            [only] => return Ok(vec![self.project_coordinate(*only)?]),
            _ => {}
        }
        let mut out: Vec<Coordinate> = Vec::with_capacity(line.len());
        for pair in line.windows(2) {
            let projected = self.project_line_segment(pair[0], pair[1])?;
            let skip = usize::from(!out.is_empty());
            for p in projected.into_iter().skip(skip) {
                if out.last() != Some(&p) {
                    out.push(p);
                }
            }
        }
        Ok(out)
    }

    /// Projects an implicitly closed ring, including its closing segment. The result is again
    /// implicitly closed.
    pub fn project_ring(&self, ring: &[Coordinate]) -> ProjectionResult<Vec<Coordinate>> {
        let Some(&first) = ring.first() else {
            return Ok(Vec::new());
        };
        let mut closed = ring.to_vec();
        closed.push(first);
        let mut out = self.project_coordinates(&closed)?;
        if out.len() > 1 && out.first() == out.last() {
            out.pop();
        }
        Ok(out)
    }
}
