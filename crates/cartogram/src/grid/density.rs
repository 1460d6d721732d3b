use cartogram_geom::Envelope;
use nalgebra::DMatrix;

use super::{CartogramGrid, CellState};
use crate::progress::Progress;
use crate::{Error, Feature, Layer, Result};

/// Share of `(density - mean)` a partly covered cell receives from each overlapping feature.
pub const PARTIAL_COVERAGE_WEIGHT: f64 = 0.5;

impl CartogramGrid {
    /// Rasterizes the master layer's densities onto the cells.
    ///
    /// Feature densities are derived first (see [`Layer::compute_densities`]). Every cell starts
    /// at the layer's area-weighted mean density in state [`CellState::Empty`]; cells overlapped
    /// by a feature are then marked [`CellState::Free`].
    ///
    /// Fails with [`Error::NoDensity`] when the layer's mean density is not positive.
    pub fn compute_original_density(&mut self, layer: &mut Layer, is_density: bool) -> Result<()> {
        self.compute_original_density_with_progress(layer, is_density, None)
    }

    pub(crate) fn compute_original_density_with_progress(
        &mut self,
        layer: &mut Layer,
        is_density: bool,
        mut progress: Option<&mut Progress<'_>>,
    ) -> Result<()> {
        layer.compute_densities(is_density);
        if layer.total_area() <= 0.0 {
            return Err(Error::ZeroArea {
                layer: layer.name.clone(),
            });
        }
        let mean = layer.mean_density();
        if !(mean > 0.0 && mean.is_finite()) {
            return Err(Error::NoDensity {
                layer: layer.name.clone(),
            });
        }
        self.mean_density = mean;
        self.original_density.fill(mean);
        self.current_density.fill(mean);
        self.state.fill(CellState::Empty);

        let count = layer.features.len();
        for (n, feature) in layer.features.iter().enumerate() {
            self.fill_density_with_feature(feature);
            if let Some(progress) = progress.as_deref_mut() {
                progress.report_between(
                    100,
                    200,
                    (n + 1) as f64 / count as f64,
                    "computing densities",
                );
            }
        }
        tracing::debug!(
            features = count,
            mean_density = mean,
            "rasterized original density"
        );
        Ok(())
    }

    fn fill_density_with_feature(&mut self, feature: &Feature) {
        let Some((xs, ys)) = self.cell_ranges(&feature.envelope()) else {
            return;
        };
        let mean = self.mean_density;
        for i in xs {
            for j in ys.clone() {
                let cell = self.cell_envelope(i, j).to_polygon();
                if feature.geometry.contains(&cell) {
                    self.original_density[(i, j)] = feature.density;
                    self.current_density[(i, j)] = feature.density;
                    self.state[(i, j)] = CellState::Free;
                } else if feature.geometry.intersects(&cell) {
                    let weighted = self.original_density[(i, j)]
                        + PARTIAL_COVERAGE_WEIGHT * (feature.density - mean);
                    self.original_density[(i, j)] = weighted;
                    self.current_density[(i, j)] = weighted;
                    self.state[(i, j)] = CellState::Free;
                }
            }
        }
    }

    /// Marks cells still [`CellState::Empty`] that touch a feature of any of `layers` as
    /// [`CellState::Rigid`]. Returns the number of cells marked.
    pub fn prepare_constrained_deformation(&mut self, layers: &[Layer]) -> usize {
        let mut marked = 0;
        for feature in layers.iter().flat_map(|l| &l.features) {
            let Some((xs, ys)) = self.cell_ranges(&feature.envelope()) else {
                continue;
            };
            for i in xs {
                for j in ys.clone() {
                    if self.state[(i, j)] != CellState::Empty {
                        continue;
                    }
                    let cell = self.cell_envelope(i, j).to_polygon();
                    if feature.geometry.intersects(&cell) {
                        self.state[(i, j)] = CellState::Rigid;
                        marked += 1;
                    }
                }
            }
        }
        tracing::debug!(cells = marked, "prepared constrained deformation");
        marked
    }

    /// Resamples the current cell densities onto `raster`, whose cells evenly divide `extent`.
    ///
    /// Each grid cell contributes its density to every raster cell within the index range of its
    /// four corner nodes; covered raster cells take the average of their contributions, the rest
    /// the grid's mean density.
    pub fn fill_regular_density_grid(&self, raster: &mut DMatrix<f64>, extent: &Envelope) {
        let (nx, ny) = raster.shape();
        if nx == 0 || ny == 0 {
            return;
        }
        let cell_x = extent.width() / nx as f64;
        let cell_y = extent.height() / ny as f64;
        let index = |v: f64, min: f64, size: f64| ((v - min) / size).floor() as isize;
        let ix = |x: f64| index(x, extent.min_x(), cell_x);
        let iy = |y: f64| index(y, extent.min_y(), cell_y);

        let mut count = DMatrix::<u32>::zeros(nx, ny);
        raster.fill(0.0);
        for i in 0..self.size_x - 1 {
            for j in 0..self.size_y - 1 {
                let (ll, lr) = (self.node(i, j), self.node(i + 1, j));
                let (ur, ul) = (self.node(i + 1, j + 1), self.node(i, j + 1));

                let min_i = ix(ll.x).min(ix(ul.x)).max(0);
                let max_i = ix(lr.x).max(ix(ur.x)).min(nx as isize - 1);
                let min_j = iy(ll.y).min(iy(lr.y)).max(0);
                let max_j = iy(ul.y).max(iy(ur.y)).min(ny as isize - 1);
                if min_i > max_i || min_j > max_j {
                    continue;
                }
                let density = self.current_density[(i, j)];
                for x in min_i as usize..=max_i as usize {
                    for y in min_j as usize..=max_j as usize {
                        raster[(x, y)] += density;
                        count[(x, y)] += 1;
                    }
                }
            }
        }

        for (value, n) in raster.iter_mut().zip(count.iter()) {
            *value = if *n == 0 {
                self.mean_density
            } else {
                *value / f64::from(*n)
            };
        }
    }
}
