//! Gastner-Newman diffusion on a power-of-two raster.
//!
//! A [`DiffusionSolver`] samples the grid's current density onto a `(lx+1)×(ly+1)` raster over
//! a margin-padded extent, diffuses it spectrally and integrates the induced flow for every
//! raster node. The outer [`CartogramGrid`]'s nodes are then moved by bilinear interpolation in
//! the displaced raster.

mod integrate;
mod special;

use std::f64::consts::PI;

use cartogram_geom::{Coordinate, Envelope, coord};
use cartogram_spectral::{Direction, coscosft, cossinft, rlft3, sincosft};
use nalgebra::DMatrix;
use serde::Serialize;

pub use integrate::{IntegrationOutcome, StallReason};

use crate::budget::RunBudget;
use crate::grid::CartogramGrid;
use crate::options::DiffusionParams;
use crate::{Error, Result};

use special::erf;

/// Summary of one diffusion pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffusionReport {
    pub grid_size: usize,
    pub outcome: IntegrationOutcome,
    /// Accepted steps of the attempt whose positions were used.
    pub steps: usize,
    /// Simulated time reached by that attempt.
    pub time: f64,
    pub blurs: usize,
    pub retries: usize,
    /// Outer grid nodes that fell outside the raster and kept their position.
    pub unprojected_nodes: usize,
}

/// Raster extent around `env` whose aspect ratio matches `lx:ly`.
///
/// The dominant axis is widened by `margin`; the other axis is centered and sized to keep
/// raster cells square.
pub fn cartogram_extent(env: &Envelope, lx: usize, ly: usize, margin: f64) -> Envelope {
    let (lx, ly) = (lx as f64, ly as f64);
    if env.width() / lx > env.height() / ly {
        let max_x = 0.5 * ((1.0 + margin) * env.max_x() + (1.0 - margin) * env.min_x());
        let min_x = 0.5 * ((1.0 - margin) * env.max_x() + (1.0 + margin) * env.min_x());
        let center_y = 0.5 * (env.max_y() + env.min_y());
        let half_h = 0.5 * (max_x - min_x) * ly / lx;
        Envelope::new(min_x, max_x, center_y - half_h, center_y + half_h)
    } else {
        let max_y = 0.5 * ((1.0 + margin) * env.max_y() + (1.0 - margin) * env.min_y());
        let min_y = 0.5 * ((1.0 - margin) * env.max_y() + (1.0 + margin) * env.min_y());
        let center_x = 0.5 * (env.max_x() + env.min_x());
        let half_w = 0.5 * (max_y - min_y) * lx / ly;
        Envelope::new(center_x - half_w, center_x + half_w, min_y, max_y)
    }
}

/// Working state of one diffusion pass.
#[derive(Debug)]
pub struct DiffusionSolver {
    lx: usize,
    ly: usize,
    params: DiffusionParams,
    extent: Envelope,
    /// Initial density; kept in cosine/cosine spectral space between blurs.
    rho_0: DMatrix<f64>,
    rho: DMatrix<f64>,
    grid_vx: DMatrix<f64>,
    grid_vy: DMatrix<f64>,
    x: DMatrix<f64>,
    y: DMatrix<f64>,
    vx: DMatrix<f64>,
    vy: DMatrix<f64>,
    x_appr: DMatrix<f64>,
    y_appr: DMatrix<f64>,
    blurs: usize,
    steps: usize,
    time: f64,
}

impl DiffusionSolver {
    /// Allocates the working arrays for a `grid_size × grid_size` raster.
    pub fn new(grid_size: usize, params: DiffusionParams) -> Result<Self> {
        if grid_size < 4 || !grid_size.is_power_of_two() {
            return Err(Error::invalid_options(format!(
                "diffusion grid size must be a power of two of at least 4, got {grid_size}"
            )));
        }
        let (lx, ly) = (grid_size, grid_size);
        let field = || DMatrix::zeros(lx + 1, ly + 1);
        Ok(Self {
            lx,
            ly,
            params,
            extent: Envelope::null(),
            rho_0: field(),
            rho: field(),
            grid_vx: field(),
            grid_vy: field(),
            x: field(),
            y: field(),
            vx: field(),
            vy: field(),
            x_appr: field(),
            y_appr: field(),
            blurs: 0,
            steps: 0,
            time: 0.0,
        })
    }

    /// Runs one pass: rasterizes `grid`, integrates, and moves `grid`'s nodes.
    ///
    /// A stalled integration is retried from the lattice with a coarser blur, up to
    /// `max_retries` times. When retries run out the last accepted positions are still used.
    pub fn compute(
        mut self,
        grid: &mut CartogramGrid,
        budget: &RunBudget,
    ) -> Result<DiffusionReport> {
        self.extent = cartogram_extent(
            grid.envelope(),
            self.lx,
            self.ly,
            self.params.extent_margin,
        );
        self.compute_initial_density(grid)?;

        let mut retries = 0;
        let outcome = loop {
            let outcome = self.integrate(budget)?;
            let retryable = matches!(
                outcome,
                IntegrationOutcome::Stalled { reason } if reason != StallReason::BlurLimit
            );
            if !retryable || retries >= self.params.max_retries {
                break outcome;
            }
            retries += 1;
            tracing::warn!(
                ?outcome,
                retry = retries,
                blurs = self.blurs,
                "retrying with a coarser blur"
            );
        };

        let unprojected_nodes = self.project_grid(grid);
        let report = DiffusionReport {
            grid_size: self.lx,
            outcome,
            steps: self.steps,
            time: self.time,
            blurs: self.blurs,
            retries,
            unprojected_nodes,
        };
        tracing::debug!(
            grid_size = report.grid_size,
            outcome = ?report.outcome,
            steps = report.steps,
            time = report.time,
            blurs = report.blurs,
            "diffusion pass finished"
        );
        Ok(report)
    }

    pub fn extent(&self) -> &Envelope {
        &self.extent
    }

    /// Samples the grid density, conditions it and moves it into spectral space.
    fn compute_initial_density(&mut self, grid: &CartogramGrid) -> Result<()> {
        let cell_x = self.extent.width() / self.lx as f64;
        let cell_y = self.extent.height() / self.ly as f64;
        let mut raster_extent = self.extent;
        raster_extent.expand_by(cell_x / 2.0, cell_y / 2.0);
        grid.fill_regular_density_grid(&mut self.rho_0, &raster_extent);

        let min = self.rho_0.min();
        let max = self.rho_0.max();
        if min * 1000.0 < max {
            let bias = max / 1000.0 - min;
            tracing::debug!(min, max, bias, "biasing density");
            self.rho_0.add_scalar_mut(bias);
        }
        self.fold_periodic_edges();
        coscosft(&mut self.rho_0, Direction::Forward, Direction::Forward)?;
        Ok(())
    }

    /// Makes the last row and column equal to the first by averaging them.
    fn fold_periodic_edges(&mut self) {
        let (lx, ly) = (self.lx, self.ly);
        let rho = &mut self.rho_0;
        rho[(0, 0)] = 0.25 * (rho[(0, 0)] + rho[(0, ly)] + rho[(lx, 0)] + rho[(lx, ly)]);
        for i in 1..lx {
            rho[(i, 0)] = 0.5 * (rho[(i, 0)] + rho[(i, ly)]);
        }
        for j in 1..ly {
            rho[(0, j)] = 0.5 * (rho[(0, j)] + rho[(lx, j)]);
        }
        for i in 0..lx {
            rho[(i, ly)] = rho[(i, 0)];
        }
        for j in 0..=ly {
            rho[(lx, j)] = rho[(0, j)];
        }
    }

    /// Applies one more Gaussian blur to the spectral density and returns the smallest blurred
    /// value in real space.
    fn blur_density(&mut self) -> Result<f64> {
        let (lx, ly) = (self.lx, self.ly);
        coscosft(&mut self.rho_0, Direction::Inverse, Direction::Inverse)?;
        for v in self.rho_0.iter_mut() {
            if *v < -1e10 {
                *v = 0.0;
            }
        }
        self.gaussian_blur()?;

        let mut min = f64::INFINITY;
        for i in 0..lx {
            for j in 0..ly {
                min = min.min(self.rho_0[(i, j)]);
            }
        }
        coscosft(&mut self.rho_0, Direction::Forward, Direction::Forward)?;
        Ok(min)
    }

    /// Convolves the real-space density with an error-function kernel via the 2-D real FFT.
    fn gaussian_blur(&mut self) -> Result<()> {
        let (lx, ly) = (self.lx, self.ly);
        let sigma = self.params.sigma * self.params.sigma_factor.powi(self.blurs as i32);
        let width = 2f64.sqrt() * sigma;
        let offset = |i: usize, n: usize| {
            if i < n / 2 {
                i as f64
            } else {
                i as f64 - n as f64
            }
        };
        let kernel_1d = |p: f64| erf((p + 0.5) / width) - erf((p - 0.5) / width);
        let norm = (lx * ly) as f64;

        let mut pop = vec![0.0; lx * ly];
        let mut conv = vec![0.0; lx * ly];
        for i in 0..lx {
            let kx = kernel_1d(offset(i, lx));
            for j in 0..ly {
                pop[i * ly + j] = self.rho_0[(i, j)];
                conv[i * ly + j] = 0.5 * kx * kernel_1d(offset(j, ly)) / norm;
            }
        }

        let mut speq_pop = vec![0.0; 2 * lx];
        let mut speq_conv = vec![0.0; 2 * lx];
        rlft3(&mut pop, &mut speq_pop, 1, lx, ly, Direction::Forward)?;
        rlft3(&mut conv, &mut speq_conv, 1, lx, ly, Direction::Forward)?;
        multiply_complex(&mut pop, &conv);
        multiply_complex(&mut speq_pop, &speq_conv);
        rlft3(&mut pop, &mut speq_pop, 1, lx, ly, Direction::Inverse)?;

        for i in 0..lx {
            for j in 0..ly {
                self.rho_0[(i, j)] = pop[i * ly + j];
            }
        }
        Ok(())
    }

    /// Velocity field `v = -∇ρ/ρ` of the density diffused to time `t`, in raster units.
    fn calculate_velocity_field(&mut self, t: f64) -> Result<()> {
        let (lx, ly) = (self.lx as f64, self.ly as f64);
        for j in 0..=self.lx {
            let kx = PI * j as f64 / lx;
            for k in 0..=self.ly {
                let ky = PI * k as f64 / ly;
                let rho = (-(kx * kx + ky * ky) * t).exp() * self.rho_0[(j, k)];
                self.rho[(j, k)] = rho;
                self.grid_vx[(j, k)] = -kx * rho;
                self.grid_vy[(j, k)] = -ky * rho;
            }
        }
        coscosft(&mut self.rho, Direction::Inverse, Direction::Inverse)?;
        sincosft(&mut self.grid_vx, Direction::Inverse, Direction::Inverse)?;
        cossinft(&mut self.grid_vy, Direction::Inverse, Direction::Inverse)?;

        for ((vx, vy), rho) in self
            .grid_vx
            .iter_mut()
            .zip(self.grid_vy.iter_mut())
            .zip(self.rho.iter())
        {
            *vx = -*vx / rho;
            *vy = -*vy / rho;
        }
        Ok(())
    }

    /// Maps a point of the raster extent through the displaced raster, or `None` outside it.
    ///
    /// The extent is closed: points on its upper edges use the last raster cell.
    pub fn project_point(&self, x: f64, y: f64) -> Option<Coordinate> {
        let (lx, ly) = (self.lx as f64, self.ly as f64);
        let ext = &self.extent;
        let px = (x - ext.min_x()) * lx / ext.width();
        let py = (y - ext.min_y()) * ly / ext.height();
        if !(px >= 0.0 && px <= lx && py >= 0.0 && py <= ly) {
            return None;
        }
        let (fx, fy) = (px.floor(), py.floor());
        let (gx, dx) = if fx == lx {
            (self.lx - 1, 1.0)
        } else {
            (fx as usize, px - fx)
        };
        let (gy, dy) = if fy == ly {
            (self.ly - 1, 1.0)
        } else {
            (fy as usize, py - fy)
        };

        let (xs, ys) = (&self.x, &self.y);
        let lerp_x = |field: &DMatrix<f64>, row: usize| {
            (1.0 - dx) * field[(gx, row)] + dx * field[(gx + 1, row)]
        };
        let lerp_y = |field: &DMatrix<f64>, col: usize| {
            (1.0 - dy) * field[(col, gy)] + dy * field[(col, gy + 1)]
        };
        let (ax, ay) = (lerp_x(xs, gy), lerp_x(ys, gy));
        let (bx, by) = (lerp_x(xs, gy + 1), lerp_x(ys, gy + 1));
        let (cx, cy) = (lerp_y(xs, gx), lerp_y(ys, gx));
        let (ex, ey) = (lerp_y(xs, gx + 1), lerp_y(ys, gx + 1));

        let den = (bx - ax) * (cy - ey) + (ay - by) * (cx - ex);
        if den.abs() < 1e-12 {
            let ix = (ax + bx + cx + ex) / 4.0;
            let iy = (ay + by + cy + ey) / 4.0;
            return Some(coord(
                ix * ext.width() / lx + ext.min_x(),
                iy * ext.height() / ly + ext.min_y(),
            ));
        }
        let t = ((cx - ax) * (cy - ey) + (ay - cy) * (cx - ex)) / den;
        let rx = (ax + t * (bx - ax)) / lx;
        let ry = (ay + t * (by - ay)) / ly;
        Some(coord(
            (1.0 - rx) * ext.min_x() + rx * ext.max_x(),
            (1.0 - ry) * ext.min_y() + ry * ext.max_y(),
        ))
    }

    /// Moves every node of `grid`. Returns how many nodes could not be projected.
    fn project_grid(&self, grid: &mut CartogramGrid) -> usize {
        let mut unprojected = 0;
        for i in 0..grid.size_x() {
            for j in 0..grid.size_y() {
                let node = grid.node(i, j);
                match self.project_point(node.x, node.y) {
                    Some(p) => grid.set_node(i, j, p),
                    None => {
                        tracing::warn!(
                            i,
                            j,
                            x = node.x,
                            y = node.y,
                            "grid node outside diffusion extent"
                        );
                        unprojected += 1;
                    }
                }
            }
        }
        unprojected
    }

    /// Displaced raster position of node `(j, k)`, in raster units.
    pub fn displaced_node(&self, j: usize, k: usize) -> Option<(f64, f64)> {
        (j <= self.lx && k <= self.ly).then(|| (self.x[(j, k)], self.y[(j, k)]))
    }
}

/// `a *= b` over interleaved complex pairs.
fn multiply_complex(a: &mut [f64], b: &[f64]) {
    for (za, zb) in a.chunks_exact_mut(2).zip(b.chunks_exact(2)) {
        let re = za[0] * zb[0] - za[1] * zb[1];
        let im = za[1] * zb[0] + za[0] * zb[1];
        za[0] = re;
        za[1] = im;
    }
}
