use cartogram_geom::Envelope;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Numerical constants of the diffusion integrator.
///
/// The defaults are the values the method is usually run with; they are exposed so tests and
/// benchmarks can run reduced configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffusionParams {
    /// Stop once the largest squared node displacement of a step falls below this.
    pub convergence: f64,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_steps: usize,
    pub time_limit: f64,
    pub max_newton_iterations: usize,
    pub tol_f: f64,
    pub tol_x: f64,
    /// Largest squared disagreement between predictor and corrector that keeps a step.
    pub tol_int: f64,
    /// Width of the initial Gaussian blur, in raster cells.
    pub sigma: f64,
    /// Growth of the blur width per additional blur.
    pub sigma_factor: f64,
    pub max_blurs: usize,
    /// Integration restarts (each with a coarser blur) after a stall.
    pub max_retries: usize,
    /// Ratio between the raster extent and the grid envelope along the dominant axis.
    pub extent_margin: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            convergence: 1e-100,
            initial_step: 1e-4,
            min_step: 1e-5,
            max_steps: 3000,
            time_limit: 1e8,
            max_newton_iterations: 50,
            tol_f: 1e-3,
            tol_x: 1e-3,
            tol_int: 1e-3,
            sigma: 0.1,
            sigma_factor: 1.2,
            max_blurs: 64,
            max_retries: 8,
            extent_margin: 1.5,
        }
    }
}

/// Options of a cartogram run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartogramOptions {
    /// Deformation dial in `[0, 100]`; drives grid sizes and the number of passes.
    pub amount_of_deformation: u8,
    /// Nodes along the longer envelope axis. Defaults to `dial * 10 + 100`.
    pub grid_size: Option<usize>,
    /// Power-of-two size of the diffusion raster.
    pub diffusion_grid_size: Option<usize>,
    /// Number of diffusion passes in `[1, 4]`.
    pub diffusion_iterations: Option<usize>,
    pub master_attribute_is_density: bool,
    /// Master values equal to this are replaced by the layer mean before density computation.
    pub missing_value: Option<f64>,
    pub create_grid_layer: bool,
    pub grid_layer_size: usize,
    /// After this many seconds the current pass stops and the run is finalized.
    pub maximum_running_time_secs: Option<u64>,
    /// Overrides the estimated maximum segment length used for regularization.
    pub maximum_segment_length: Option<f64>,
    pub diffusion: DiffusionParams,
}

impl Default for CartogramOptions {
    fn default() -> Self {
        Self {
            amount_of_deformation: 50,
            grid_size: None,
            diffusion_grid_size: None,
            diffusion_iterations: None,
            master_attribute_is_density: false,
            missing_value: None,
            create_grid_layer: false,
            grid_layer_size: 100,
            maximum_running_time_secs: Some(3 * 3600),
            maximum_segment_length: None,
            diffusion: DiffusionParams::default(),
        }
    }
}

/// Grid sizes and pass count resolved for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeformationParams {
    pub grid_size_x: usize,
    pub grid_size_y: usize,
    pub diffusion_grid_size: usize,
    pub diffusion_iterations: usize,
}

fn dial_diffusion_grid_size(dial: u8) -> usize {
    match dial {
        0..=33 => 128,
        34..=66 => 256,
        _ => 512,
    }
}

fn dial_iterations(dial: u8) -> usize {
    (usize::from(dial) / 25 + 1).clamp(1, 4)
}

impl CartogramOptions {
    pub fn validate(&self) -> Result<()> {
        if self.amount_of_deformation > 100 {
            return Err(Error::invalid_options(format!(
                "amountOfDeformation must be within [0, 100], got {}",
                self.amount_of_deformation
            )));
        }
        if let Some(size) = self.diffusion_grid_size {
            if size < 4 || !size.is_power_of_two() {
                return Err(Error::invalid_options(format!(
                    "diffusionGridSize must be a power of two of at least 4, got {size}"
                )));
            }
        }
        if let Some(passes) = self.diffusion_iterations {
            if !(1..=4).contains(&passes) {
                return Err(Error::invalid_options(format!(
                    "diffusionIterations must be within [1, 4], got {passes}"
                )));
            }
        }
        if let Some(size) = self.grid_size {
            if size < 2 {
                return Err(Error::invalid_options(format!(
                    "gridSize must be at least 2, got {size}"
                )));
            }
        }
        if self.grid_layer_size == 0 {
            return Err(Error::invalid_options("gridLayerSize must be positive"));
        }
        if let Some(len) = self.maximum_segment_length {
            if !(len.is_finite() && len > 0.0) {
                return Err(Error::invalid_options(format!(
                    "maximumSegmentLength must be positive, got {len}"
                )));
            }
        }
        if let Some(missing) = self.missing_value {
            if !missing.is_finite() {
                return Err(Error::invalid_options("missingValue must be finite"));
            }
        }
        let d = &self.diffusion;
        if !(d.initial_step > 0.0 && d.min_step > 0.0 && d.sigma > 0.0 && d.sigma_factor >= 1.0)
        {
            return Err(Error::invalid_options(
                "diffusion step sizes and blur widths must be positive",
            ));
        }
        if d.extent_margin < 1.0 {
            return Err(Error::invalid_options("extentMargin must be at least 1"));
        }
        Ok(())
    }

    /// Resolves the dial and overrides against the working envelope.
    ///
    /// The outer grid gets the configured size along the longer envelope axis; the shorter
    /// axis shrinks to keep cells roughly square.
    pub fn resolve(&self, envelope: &Envelope) -> Result<DeformationParams> {
        self.validate()?;
        if envelope.is_null() || envelope.width() <= 0.0 || envelope.height() <= 0.0 {
            return Err(Error::DegenerateEnvelope);
        }

        let dial = self.amount_of_deformation;
        let base = self
            .grid_size
            .unwrap_or(usize::from(dial) * 10 + 100);
        let (width, height) = (envelope.width(), envelope.height());
        let shrink = |size: usize, ratio: f64| ((size as f64 * ratio).round() as usize).max(2);
        let (grid_size_x, grid_size_y) = if width > height {
            (base, shrink(base, height / width))
        } else {
            (shrink(base, width / height), base)
        };

        Ok(DeformationParams {
            grid_size_x,
            grid_size_y,
            diffusion_grid_size: self
                .diffusion_grid_size
                .unwrap_or_else(|| dial_diffusion_grid_size(dial)),
            diffusion_iterations: self
                .diffusion_iterations
                .unwrap_or_else(|| dial_iterations(dial)),
        })
    }
}
