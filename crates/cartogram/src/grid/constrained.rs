//! Keeping rigid cells close to their original square shape.

use cartogram_geom::coord;

use super::{CartogramGrid, CellState};

/// Corners of a cell, named by their position in the undeformed grid.
#[derive(Debug, Clone, Copy)]
enum Corner {
    LowerLeft,
    LowerRight,
    UpperRight,
    UpperLeft,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::UpperLeft,
        Corner::UpperRight,
        Corner::LowerRight,
        Corner::LowerLeft,
    ];

    /// Node offset of this corner from the cell's lower-left node.
    fn node_offset(self) -> (usize, usize) {
        match self {
            Corner::LowerLeft => (0, 0),
            Corner::LowerRight => (1, 0),
            Corner::UpperRight => (1, 1),
            Corner::UpperLeft => (0, 1),
        }
    }

    /// Offsets of the three other cells sharing this corner's node.
    fn neighbor_cells(self) -> [(isize, isize); 3] {
        match self {
            Corner::LowerLeft => [(-1, -1), (0, -1), (-1, 0)],
            Corner::LowerRight => [(1, -1), (0, -1), (1, 0)],
            Corner::UpperRight => [(1, 0), (1, 1), (0, 1)],
            Corner::UpperLeft => [(-1, 0), (-1, 1), (0, 1)],
        }
    }
}

impl CartogramGrid {
    /// Whether cell `(i+di, j+dj)` exists and carries density. Cells outside the grid do not.
    fn is_free_cell(&self, i: usize, j: usize, di: isize, dj: isize) -> bool {
        let (Some(ci), Some(cj)) = (i.checked_add_signed(di), j.checked_add_signed(dj)) else {
            return false;
        };
        ci < self.size_x - 1 && cj < self.size_y - 1 && self.state[(ci, cj)] == CellState::Free
    }

    /// Nudges the corners of every rigid cell toward a square. Returns how many nodes moved.
    pub fn conform_to_constrained_deformation(&mut self) -> usize {
        let mut moved = 0;
        for j in 0..self.size_y - 1 {
            for i in 0..self.size_x - 1 {
                if self.state[(i, j)] == CellState::Rigid {
                    moved += self.apply_constrained_deformation_to_cell(i, j);
                }
            }
        }
        tracing::debug!(nodes = moved, "conformed to constrained deformation");
        moved
    }

    /// Moves the corners of cell `(i, j)` toward the square with the cell's mean edge length,
    /// centered on the cell. A corner moves only when none of the other cells sharing its node
    /// is free. Returns how many corners moved.
    pub fn apply_constrained_deformation_to_cell(&mut self, i: usize, j: usize) -> usize {
        let ul = self.node(i, j + 1);
        let ur = self.node(i + 1, j + 1);
        let lr = self.node(i + 1, j);
        let ll = self.node(i, j);

        let (mut min_x, mut max_x) = ((ul.x + ll.x) / 2.0, (ur.x + lr.x) / 2.0);
        let (mut min_y, mut max_y) = ((ll.y + lr.y) / 2.0, (ul.y + ur.y) / 2.0);
        let (width, height) = (max_x - min_x, max_y - min_y);
        if width <= 0.0 || height <= 0.0 {
            return 0;
        }
        let edge = (width * height).sqrt();
        min_x -= (edge - width) / 2.0;
        max_x += (edge - width) / 2.0;
        min_y -= (edge - height) / 2.0;
        max_y += (edge - height) / 2.0;

        let mut moved = 0;
        for corner in Corner::ALL {
            let blocked = corner
                .neighbor_cells()
                .iter()
                .any(|&(di, dj)| self.is_free_cell(i, j, di, dj));
            if blocked {
                continue;
            }
            let (oi, oj) = corner.node_offset();
            let (x, y) = match corner {
                Corner::LowerLeft => (min_x, min_y),
                Corner::LowerRight => (max_x, min_y),
                Corner::UpperRight => (max_x, max_y),
                Corner::UpperLeft => (min_x, max_y),
            };
            if self.try_to_move_node(i + oi, j + oj, x, y) {
                moved += 1;
            }
        }
        moved
    }

    /// Moves node `(i, j)` toward `(x, y)`, at most a tenth of a cell width.
    ///
    /// The move is rejected when the node would reach or pass the x coordinate of any node in
    /// the neighboring columns, or the y coordinate of any node in the neighboring rows.
    pub fn try_to_move_node(&mut self, i: usize, j: usize, x: f64, y: f64) -> bool {
        let current = self.node(i, j);
        let mut target = coord(x, y);
        let distance = (target - current).length();
        let max_distance = self.cell_size_x / 10.0;
        if distance > max_distance {
            target = current + (target - current) * (max_distance / distance);
        }

        let rows = j.saturating_sub(1)..=(j + 1).min(self.size_y - 1);
        let cols = i.saturating_sub(1)..=(i + 1).min(self.size_x - 1);
        if i > 0 && rows.clone().any(|r| self.node_x[(i - 1, r)] >= target.x) {
            return false;
        }
        if i + 1 < self.size_x && rows.clone().any(|r| self.node_x[(i + 1, r)] <= target.x) {
            return false;
        }
        if j > 0 && cols.clone().any(|c| self.node_y[(c, j - 1)] >= target.y) {
            return false;
        }
        if j + 1 < self.size_y && cols.clone().any(|c| self.node_y[(c, j + 1)] <= target.y) {
            return false;
        }

        self.set_node(i, j, target);
        true
    }
}
