use cartogram_geom::{Coordinate, Envelope, coord};

use crate::grid::CartogramGrid;

/// A square lattice over the working envelope, drawn as polylines through the deformed grid.
///
/// Shows how the plane was stretched. Lines that leave the grid are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceGrid {
    /// Lattice spacing in input units.
    pub resolution: f64,
    pub lines: Vec<Vec<Coordinate>>,
}

impl ReferenceGrid {
    /// Builds a lattice with `size` cells along the longer side of `envelope`.
    pub fn build(grid: &CartogramGrid, envelope: &Envelope, size: usize) -> Self {
        let (width, height) = (envelope.width(), envelope.height());
        let cells = (size + 1) as f64;
        let resolution = (width / cells).max(height / cells);
        if !(resolution.is_finite() && resolution > 0.0) {
            return Self::default();
        }
        let nx = (width / resolution).floor() as usize;
        let ny = (height / resolution).floor() as usize;
        let at = |i: usize, j: usize| {
            coord(
                envelope.min_x() + i as f64 * resolution,
                envelope.min_y() + j as f64 * resolution,
            )
        };

        let horizontal = (0..=ny).map(|j| (0..=nx).map(|i| at(i, j)).collect::<Vec<_>>());
        let vertical = (0..=nx).map(|i| (0..=ny).map(|j| at(i, j)).collect::<Vec<_>>());
        let mut skipped = 0;
        let lines = horizontal
            .chain(vertical)
            .filter_map(|line| match grid.project_coordinates(&line) {
                Ok(projected) => Some(projected),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            tracing::warn!(
                lines = skipped,
                "reference grid lines outside the deformation grid"
            );
        }
        Self { resolution, lines }
    }
}
