//! Adaptive integration of the node trajectories through the diffusion velocity field.

use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::Serialize;

use super::DiffusionSolver;
use crate::budget::{BudgetState, RunBudget};
use crate::Result;

/// How an integration attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrationOutcome {
    /// The largest node displacement of a step fell below the convergence threshold.
    Converged,
    StepLimit,
    TimeLimit,
    /// The integrator could not make progress. The accepted positions are kept.
    Stalled { reason: StallReason },
    /// The run's deadline passed mid-integration.
    DeadlineReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StallReason {
    /// The corrector's Newton iteration did not converge or hit a singular Jacobian.
    NewtonDiverged,
    /// The step size fell below the configured floor.
    StepTooSmall,
    /// No blur within the configured count made the density non-negative.
    BlurLimit,
}

impl IntegrationOutcome {
    pub fn is_stalled(&self) -> bool {
        matches!(self, IntegrationOutcome::Stalled { .. })
    }
}

/// Bilinear interpolation of a `(lx+1)×(ly+1)` field at `(x, y)` in raster units. Points
/// outside the field read as zero.
pub(crate) fn interpolate_bilinear(field: &DMatrix<f64>, x: f64, y: f64) -> f64 {
    let (rows, cols) = field.shape();
    if !(x >= 0.0 && y >= 0.0) || x >= rows as f64 || y >= cols as f64 {
        return 0.0;
    }
    let (lx, ly) = (rows - 1, cols - 1);
    let (gx, gy) = (x.floor() as usize, y.floor() as usize);
    let (dx, dy) = (x - gx as f64, y - gy as f64);

    match (gx == lx, gy == ly) {
        (true, true) => field[(gx, gy)],
        (true, false) => (1.0 - dy) * field[(gx, gy)] + dy * field[(gx, gy + 1)],
        (false, true) => (1.0 - dx) * field[(gx, gy)] + dx * field[(gx + 1, gy)],
        (false, false) => {
            (1.0 - dx) * (1.0 - dy) * field[(gx, gy)]
                + (1.0 - dx) * dy * field[(gx, gy + 1)]
                + dx * (1.0 - dy) * field[(gx + 1, gy)]
                + dx * dy * field[(gx + 1, gy + 1)]
        }
    }
}

impl DiffusionSolver {
    /// Blurs until the density is non-negative, then integrates every raster node from its
    /// lattice position. Returns the outcome and leaves the accepted positions in `x`/`y`.
    pub(super) fn integrate(&mut self, budget: &RunBudget) -> Result<IntegrationOutcome> {
        loop {
            let min_density = self.blur_density()?;
            self.blurs += 1;
            if min_density >= 0.0 {
                break;
            }
            if self.blurs >= self.params.max_blurs {
                return Ok(IntegrationOutcome::Stalled {
                    reason: StallReason::BlurLimit,
                });
            }
        }

        let (lx, ly) = (self.lx, self.ly);
        for j in 0..=lx {
            for k in 0..=ly {
                self.x[(j, k)] = j as f64;
                self.y[(j, k)] = k as f64;
            }
        }
        self.steps = 0;
        self.time = 0.0;

        self.calculate_velocity_field(0.0)?;
        self.vx.copy_from(&self.grid_vx);
        self.vy.copy_from(&self.grid_vy);

        let p = self.params.clone();
        let mut h = p.initial_step;
        let mut max_change = f64::INFINITY;
        while self.steps < p.max_steps && self.time < p.time_limit && max_change > p.convergence {
            if budget.check()? == BudgetState::Expired {
                return Ok(IntegrationOutcome::DeadlineReached);
            }
            self.calculate_velocity_field(self.time + h)?;

            let mut step_ok = true;
            'nodes: for j in 0..=lx {
                for k in 0..=ly {
                    let (x0, y0) = (self.x[(j, k)], self.y[(j, k)]);
                    let (vx0, vy0) = (self.vx[(j, k)], self.vy[(j, k)]);
                    let xi = x0 + h * vx0;
                    let yi = y0 + h * vy0;
                    let vx_plus = interpolate_bilinear(&self.grid_vx, xi, yi);
                    let vy_plus = interpolate_bilinear(&self.grid_vy, xi, yi);
                    let guess = Vector2::new(
                        x0 + 0.5 * h * (vx0 + vx_plus),
                        y0 + 0.5 * h * (vy0 + vy_plus),
                    );

                    let origin = Vector2::new(x0, y0);
                    let velocity = Vector2::new(vx0, vy0);
                    let Some(appr) = self.newton(h, guess, origin, velocity) else {
                        tracing::warn!(node_x = j, node_y = k, h, "newton corrector diverged");
                        return Ok(IntegrationOutcome::Stalled {
                            reason: StallReason::NewtonDiverged,
                        });
                    };
                    self.x_appr[(j, k)] = appr.x;
                    self.y_appr[(j, k)] = appr.y;

                    if (guess - appr).norm_squared() > p.tol_int {
                        if h < p.min_step {
                            tracing::warn!(
                                h,
                                steps = self.steps,
                                "integration step below minimum"
                            );
                            return Ok(IntegrationOutcome::Stalled {
                                reason: StallReason::StepTooSmall,
                            });
                        }
                        h /= 10.0;
                        step_ok = false;
                        break 'nodes;
                    }
                }
            }
            if !step_ok {
                continue;
            }

            self.time += h;
            max_change = 0.0;
            for j in 0..=lx {
                for k in 0..=ly {
                    let dx = self.x[(j, k)] - self.x_appr[(j, k)];
                    let dy = self.y[(j, k)] - self.y_appr[(j, k)];
                    max_change = max_change.max(dx * dx + dy * dy);
                }
            }
            std::mem::swap(&mut self.x, &mut self.x_appr);
            std::mem::swap(&mut self.y, &mut self.y_appr);
            for j in 0..=lx {
                for k in 0..=ly {
                    let (x, y) = (self.x[(j, k)], self.y[(j, k)]);
                    self.vx[(j, k)] = interpolate_bilinear(&self.grid_vx, x, y);
                    self.vy[(j, k)] = interpolate_bilinear(&self.grid_vy, x, y);
                }
            }
            h *= 1.2;
            self.steps += 1;
        }

        Ok(if max_change <= p.convergence {
            IntegrationOutcome::Converged
        } else if self.steps >= p.max_steps {
            IntegrationOutcome::StepLimit
        } else {
            IntegrationOutcome::TimeLimit
        })
    }

    /// Solves the implicit midpoint equation `p - h/2·v(p) = x0 + h/2·v0` for `p`, starting
    /// from `guess`. The Jacobian is taken from the bilinear cell around the current iterate.
    fn newton(
        &self,
        h: f64,
        guess: Vector2<f64>,
        origin: Vector2<f64>,
        velocity: Vector2<f64>,
    ) -> Option<Vector2<f64>> {
        let (lx, ly) = (self.lx, self.ly);
        let half_h = 0.5 * h;
        let rhs = origin + velocity * half_h;
        let mut p = guess;

        for _ in 0..self.params.max_newton_iterations {
            let f = Vector2::new(
                p.x - half_h * interpolate_bilinear(&self.grid_vx, p.x, p.y),
                p.y - half_h * interpolate_bilinear(&self.grid_vy, p.x, p.y),
            ) - rhs;
            if !(f.x.is_finite() && f.y.is_finite()) {
                return None;
            }
            if f.norm_squared() < self.params.tol_f {
                return Some(p);
            }

            let gx = (p.x.floor().max(0.0) as usize).min(lx);
            let gy = (p.y.floor().max(0.0) as usize).min(ly);
            let (gxp, gyp) = ((gx + 1).min(lx), (gy + 1).min(ly));
            let (dx, dy) = (p.x - gx as f64, p.y - gy as f64);
            let vx = &self.grid_vx;
            let vy = &self.grid_vy;

            let dfxdx = 1.0
                - half_h
                    * ((1.0 - dy) * (vx[(gxp, gy)] - vx[(gx, gy)])
                        + dy * (vx[(gxp, gyp)] - vx[(gx, gyp)]));
            let dfxdy = -half_h
                * ((1.0 - dx) * (vx[(gx, gyp)] - vx[(gx, gy)])
                    + dx * (vx[(gxp, gyp)] - vx[(gxp, gy)]));
            let dfydx = -half_h
                * ((1.0 - dy) * (vy[(gxp, gy)] - vy[(gx, gy)])
                    + dy * (vy[(gxp, gyp)] - vy[(gx, gyp)]));
            let dfydy = 1.0
                - half_h
                    * ((1.0 - dx) * (vy[(gx, gyp)] - vy[(gx, gy)])
                        + dx * (vy[(gxp, gyp)] - vy[(gxp, gy)]));

            let jacobian = Matrix2::new(dfxdx, dfxdy, dfydx, dfydy);
            let delta = jacobian.try_inverse()? * -f;
            if delta.norm_squared() < self.params.tol_x {
                return Some(p);
            }
            p += delta;
        }
        None
    }
}
