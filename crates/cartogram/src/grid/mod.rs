//! The deformable grid laid over the cartogram envelope.
//!
//! Nodes form a `size_x × size_y` lattice; cells are the `(size_x-1) × (size_y-1)` quads
//! between them. Cell adjacency is fixed, only node positions move.

mod constrained;
mod density;
mod projection;

use std::ops::RangeInclusive;

use cartogram_geom::{Coordinate, Envelope, Polygon, area_of_quadrangle, coord};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::{Error, Result};

/// Role of a cell with respect to the input layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellState {
    /// Not covered by any master feature; carries the mean density.
    Empty,
    /// Covered (at least partly) by a master feature.
    Free,
    /// Empty cell touched by a constrained-layer feature; resists deformation.
    Rigid,
}

/// A cell exported for inspection: its current quadrilateral and densities.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub i: usize,
    pub j: usize,
    pub polygon: Polygon,
    pub original_density: f64,
    pub current_density: f64,
    pub state: CellState,
}

#[derive(Debug, Clone)]
pub struct CartogramGrid {
    size_x: usize,
    size_y: usize,
    envelope: Envelope,
    cell_size_x: f64,
    cell_size_y: f64,
    node_x: DMatrix<f64>,
    node_y: DMatrix<f64>,
    original_density: DMatrix<f64>,
    current_density: DMatrix<f64>,
    state: DMatrix<CellState>,
    mean_density: f64,
}

impl CartogramGrid {
    pub fn new(size_x: usize, size_y: usize, envelope: Envelope) -> Result<Self> {
        if size_x < 2 || size_y < 2 {
            return Err(Error::InvalidGrid { size_x, size_y });
        }
        if envelope.is_null() || envelope.width() <= 0.0 || envelope.height() <= 0.0 {
            return Err(Error::DegenerateEnvelope);
        }
        let (cells_x, cells_y) = (size_x - 1, size_y - 1);
        let mut grid = Self {
            size_x,
            size_y,
            envelope,
            cell_size_x: envelope.width() / cells_x as f64,
            cell_size_y: envelope.height() / cells_y as f64,
            node_x: DMatrix::zeros(size_x, size_y),
            node_y: DMatrix::zeros(size_x, size_y),
            original_density: DMatrix::zeros(cells_x, cells_y),
            current_density: DMatrix::zeros(cells_x, cells_y),
            state: DMatrix::from_element(cells_x, cells_y, CellState::Empty),
            mean_density: 0.0,
        };
        grid.compute_node_coordinates();
        Ok(grid)
    }

    /// Resets every node to the regular lattice over the envelope.
    pub fn compute_node_coordinates(&mut self) {
        let (min_x, min_y) = (self.envelope.min_x(), self.envelope.min_y());
        for i in 0..self.size_x {
            for j in 0..self.size_y {
                self.node_x[(i, j)] = min_x + i as f64 * self.cell_size_x;
                self.node_y[(i, j)] = min_y + j as f64 * self.cell_size_y;
            }
        }
    }

    pub fn size_x(&self) -> usize {
        self.size_x
    }

    pub fn size_y(&self) -> usize {
        self.size_y
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn cell_size_x(&self) -> f64 {
        self.cell_size_x
    }

    pub fn cell_size_y(&self) -> f64 {
        self.cell_size_y
    }

    pub fn mean_density(&self) -> f64 {
        self.mean_density
    }

    pub fn node(&self, i: usize, j: usize) -> Coordinate {
        coord(self.node_x[(i, j)], self.node_y[(i, j)])
    }

    pub fn set_node(&mut self, i: usize, j: usize, c: Coordinate) {
        self.node_x[(i, j)] = c.x;
        self.node_y[(i, j)] = c.y;
    }

    pub fn original_density(&self, i: usize, j: usize) -> f64 {
        self.original_density[(i, j)]
    }

    pub fn current_density(&self, i: usize, j: usize) -> f64 {
        self.current_density[(i, j)]
    }

    pub fn cell_state(&self, i: usize, j: usize) -> CellState {
        self.state[(i, j)]
    }

    pub fn set_cell_state(&mut self, i: usize, j: usize, state: CellState) {
        self.state[(i, j)] = state;
    }

    /// Index of the cell whose upper bound is the first one at or above `value`. Values at or
    /// below the lower bound map to 0; out-of-range values are clamped.
    fn cell_index(value: f64, min: f64, cell_size: f64, cells: usize) -> usize {
        if value <= min {
            return 0;
        }
        let idx = ((value - min) / cell_size).ceil() as isize - 1;
        idx.clamp(0, cells as isize - 1) as usize
    }

    pub fn cell_index_x(&self, x: f64) -> usize {
        Self::cell_index(
            x,
            self.envelope.min_x(),
            self.cell_size_x,
            self.size_x - 1,
        )
    }

    pub fn cell_index_y(&self, y: f64) -> usize {
        Self::cell_index(
            y,
            self.envelope.min_y(),
            self.cell_size_y,
            self.size_y - 1,
        )
    }

    /// The undeformed rectangle of cell `(i, j)`.
    pub fn cell_envelope(&self, i: usize, j: usize) -> Envelope {
        let min_x = self.envelope.min_x() + i as f64 * self.cell_size_x;
        let min_y = self.envelope.min_y() + j as f64 * self.cell_size_y;
        Envelope::new(
            min_x,
            min_x + self.cell_size_x,
            min_y,
            min_y + self.cell_size_y,
        )
    }

    /// Cell index ranges overlapping `env`, or `None` when it misses the grid.
    fn cell_ranges(
        &self,
        env: &Envelope,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        if !self.envelope.intersects(env) {
            return None;
        }
        Some((
            self.cell_index_x(env.min_x())..=self.cell_index_x(env.max_x()),
            self.cell_index_y(env.min_y())..=self.cell_index_y(env.max_y()),
        ))
    }

    /// Area of cell `(i, j)` as currently deformed.
    pub fn current_cell_area(&self, i: usize, j: usize) -> f64 {
        area_of_quadrangle(
            self.node(i, j),
            self.node(i + 1, j),
            self.node(i + 1, j + 1),
            self.node(i, j + 1),
        )
    }

    /// Re-derives each cell's current density from its deformed area, conserving the mass
    /// `originalDensity × originalArea`.
    pub fn update_density_values(&mut self) {
        let cell_area = self.cell_size_x * self.cell_size_y;
        for i in 0..self.size_x - 1 {
            for j in 0..self.size_y - 1 {
                let area = self.current_cell_area(i, j);
                if area > 0.0 {
                    self.current_density[(i, j)] =
                        self.original_density[(i, j)] * cell_area / area;
                }
            }
        }
    }

    /// Linearly rescales original and current densities so the original values span
    /// `[min, max]`. A constant field is set to `min`.
    pub fn scale_density_values(&mut self, min: f64, max: f64) {
        let lo = self.min_original_density();
        let hi = self.max_original_density();
        let span = hi - lo;
        let rescale = |v: f64| {
            if span > 0.0 {
                min + (v - lo) / span * (max - min)
            } else {
                min
            }
        };
        self.original_density.apply(|v| *v = rescale(*v));
        self.current_density.apply(|v| *v = rescale(*v));
        self.mean_density = rescale(self.mean_density);
    }

    /// Mean over cells of `|current - mean| / mean`.
    ///
    /// Measures the distance from an equalized grid: zero once every cell carries the mean
    /// density. It is not a comparison against the original densities.
    pub fn mean_density_error(&self) -> f64 {
        if self.mean_density <= 0.0 || self.current_density.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .current_density
            .iter()
            .map(|d| (d - self.mean_density).abs() / self.mean_density)
            .sum();
        total / self.current_density.len() as f64
    }

    pub fn min_original_density(&self) -> f64 {
        self.original_density.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_original_density(&self) -> f64 {
        self.original_density
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Every cell with its current quadrilateral, row by row.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        let cells_x = self.size_x - 1;
        (0..self.size_y - 1).flat_map(move |j| {
            (0..cells_x).map(move |i| GridCell {
                i,
                j,
                polygon: Polygon::new(vec![
                    self.node(i, j),
                    self.node(i + 1, j),
                    self.node(i + 1, j + 1),
                    self.node(i, j + 1),
                ]),
                original_density: self.original_density[(i, j)],
                current_density: self.current_density[(i, j)],
                state: self.state[(i, j)],
            })
        })
    }
}
