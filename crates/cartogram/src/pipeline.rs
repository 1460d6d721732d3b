//! End-to-end cartogram computation.

use std::time::{Duration, Instant};

use cartogram_geom::Envelope;

use crate::budget::{BudgetState, CancelFlag, RunBudget};
use crate::diffusion::{DiffusionReport, DiffusionSolver, IntegrationOutcome};
use crate::grid::CartogramGrid;
use crate::progress::{PROGRESS_MAX, Progress, ProgressSink};
use crate::report::{ComputationReport, SizeErrorSummary, size_errors};
use crate::{
    CartogramOptions, DeformationParams, Error, Layer, ProjectedLayer, ReferenceGrid, Result,
};

/// Fraction of the layers' extent added on every side of the working envelope.
const ENVELOPE_MARGIN: f64 = 0.05;

const DEFAULT_SEGMENT_LENGTH: f64 = 500.0;

fn timing_enabled() -> bool {
    std::env::var("CARTOGRAM_TIMING")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Default, Clone)]
struct PipelineTimings {
    total: Duration,
    prepare: Duration,
    density: Duration,
    diffusion: Duration,
    projection: Duration,
    report: Duration,
}

/// A tenth of the edge of the square with the envelope's area, divided among the features.
pub fn estimate_maximum_segment_length(envelope: &Envelope, feature_count: usize) -> f64 {
    let area = envelope.area();
    if feature_count == 0 || envelope.is_null() || !(area > 0.0) {
        return DEFAULT_SEGMENT_LENGTH;
    }
    area.sqrt() / (feature_count as f64).sqrt() / 10.0
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct CartogramResult {
    pub master: ProjectedLayer,
    pub slaves: Vec<ProjectedLayer>,
    pub grid_layer: Option<ReferenceGrid>,
    /// The deformation grid in its final state.
    pub grid: CartogramGrid,
    pub report: ComputationReport,
}

/// Builder and driver of one cartogram run.
///
/// ```no_run
/// use cartogram::{Cartogram, CartogramOptions, Feature, Layer, NoProgress};
/// use cartogram::geom::coord;
///
/// let square = vec![coord(0.0, 0.0), coord(1.0, 0.0), coord(1.0, 1.0), coord(0.0, 1.0)];
/// let feature = Feature::from_rings("a", vec![square], 10.0)?;
/// let result = Cartogram::new(Layer::new("regions", vec![feature]))
///     .with_options(CartogramOptions::default())
///     .compute(&mut NoProgress)?;
/// println!("{:?}", result.report.size_error);
/// # Ok::<(), cartogram::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cartogram {
    master: Layer,
    slaves: Vec<Layer>,
    constrained: Vec<Layer>,
    options: CartogramOptions,
    cancel: Option<CancelFlag>,
}

impl Cartogram {
    pub fn new(master: Layer) -> Self {
        Self {
            master,
            slaves: Vec::new(),
            constrained: Vec::new(),
            options: CartogramOptions::default(),
            cancel: None,
        }
    }

    /// Layers deformed along with the master layer without contributing density.
    pub fn with_slaves(mut self, slaves: Vec<Layer>) -> Self {
        self.slaves = slaves;
        self
    }

    /// Layers whose empty cells are kept close to their original shape.
    pub fn with_constrained(mut self, constrained: Vec<Layer>) -> Self {
        self.constrained = constrained;
        self
    }

    pub fn with_options(mut self, options: CartogramOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Union of every involved layer's envelope, widened by 5% of its size on each side.
    pub fn working_envelope(&self) -> Envelope {
        let mut env = self.master.envelope();
        for layer in self.slaves.iter().chain(&self.constrained) {
            env.expand_to_include_envelope(&layer.envelope());
        }
        if !env.is_null() {
            env.expand_by(env.width() * ENVELOPE_MARGIN, env.height() * ENVELOPE_MARGIN);
        }
        env
    }

    fn budget(&self) -> RunBudget {
        let mut budget = RunBudget::unlimited();
        if let Some(secs) = self.options.maximum_running_time_secs {
            budget = budget.with_time_limit(Duration::from_secs(secs));
        }
        if let Some(flag) = &self.cancel {
            budget = budget.with_cancel_flag(flag.clone());
        }
        budget
    }

    /// Runs the whole pipeline. Progress is reported to `sink` on a `0..=1000` scale.
    pub fn compute(self, sink: &mut dyn ProgressSink) -> Result<CartogramResult> {
        let started = Instant::now();
        let timing = timing_enabled();
        let mut timings = PipelineTimings::default();
        let mut progress = Progress::new(sink);

        if self.master.is_empty() {
            return Err(Error::EmptyLayer {
                layer: self.master.name.clone(),
            });
        }
        self.options.validate()?;
        let envelope = self.working_envelope();
        let params = self.options.resolve(&envelope)?;
        let budget = self.budget();
        budget.check()?;
        tracing::info!(
            master = %self.master.name,
            features = self.master.features.len(),
            grid_size_x = params.grid_size_x,
            grid_size_y = params.grid_size_y,
            diffusion_grid_size = params.diffusion_grid_size,
            passes = params.diffusion_iterations,
            "starting cartogram computation"
        );

        let Cartogram {
            mut master,
            slaves,
            constrained,
            options,
            ..
        } = self;

        let stage = Instant::now();
        let is_density = options.master_attribute_is_density;
        let replaced_values = options
            .missing_value
            .map(|sentinel| master.replace_missing_values(sentinel, is_density))
            .unwrap_or(0);
        let cleaned_values = master.clean_values();
        if replaced_values + cleaned_values > 0 {
            tracing::info!(replaced_values, cleaned_values, "adjusted master values");
        }
        progress.report(50, "checked master values");
        let mut grid = CartogramGrid::new(params.grid_size_x, params.grid_size_y, envelope)?;
        timings.prepare = stage.elapsed();

        let stage = Instant::now();
        progress.report(100, "computing the grid density");
        grid.compute_original_density_with_progress(&mut master, is_density, Some(&mut progress))?;
        if !constrained.is_empty() {
            progress.report(300, "preparing constrained deformation");
            grid.prepare_constrained_deformation(&constrained);
        }
        timings.density = stage.elapsed();

        let stage = Instant::now();
        let (passes, finished_early) =
            run_passes(&mut grid, &params, &options, &budget, &mut progress)?;
        timings.diffusion = stage.elapsed();

        let moved_constrained_nodes = if constrained.is_empty() {
            0
        } else {
            progress.report(700, "applying constrained deformation");
            grid.conform_to_constrained_deformation()
        };

        let stage = Instant::now();
        let feature_count = master.features.len();
        let maximum_segment_length = options
            .maximum_segment_length
            .unwrap_or_else(|| estimate_maximum_segment_length(&envelope, feature_count));
        progress.report(750, "projecting the master layer");
        let master_projected = master.regularized(maximum_segment_length)?.project(&grid);
        let mut slaves_projected = Vec::with_capacity(slaves.len());
        for (n, slave) in slaves.iter().enumerate() {
            budget.check()?;
            progress.report_between(
                800,
                950,
                (n + 1) as f64 / slaves.len() as f64,
                "projecting slave layers",
            );
            slaves_projected.push(slave.regularized(maximum_segment_length)?.project(&grid));
        }
        let grid_layer = options
            .create_grid_layer
            .then(|| ReferenceGrid::build(&grid, &envelope, options.grid_layer_size));
        timings.projection = stage.elapsed();

        let stage = Instant::now();
        progress.report(950, "producing the computation report");
        let unprojectable_features = master_projected.failure_count()
            + slaves_projected
                .iter()
                .map(ProjectedLayer::failure_count)
                .sum::<usize>();
        let size_error =
            SizeErrorSummary::from_errors(size_errors(&master_projected).into_iter().flatten());
        let report = ComputationReport {
            params,
            amount_of_deformation: options.amount_of_deformation,
            master_layer: master.name.clone(),
            slave_layers: slaves.iter().map(|l| l.name.clone()).collect(),
            constrained_layers: constrained.iter().map(|l| l.name.clone()).collect(),
            master_values: master.value_summary(),
            replaced_values,
            cleaned_values,
            passes,
            finished_early,
            moved_constrained_nodes,
            mean_density_error: grid.mean_density_error(),
            maximum_segment_length,
            unprojectable_features,
            size_error,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        timings.report = stage.elapsed();
        progress.report(PROGRESS_MAX, "done");

        tracing::info!(
            elapsed_ms = report.elapsed_ms,
            mean_density_error = report.mean_density_error,
            unprojectable_features,
            "cartogram computation finished"
        );
        if timing {
            timings.total = started.elapsed();
            eprintln!(
                "[cartogram-timing] total={:?} prepare={:?} density={:?} diffusion={:?} projection={:?} report={:?}",
                timings.total,
                timings.prepare,
                timings.density,
                timings.diffusion,
                timings.projection,
                timings.report,
            );
        }

        Ok(CartogramResult {
            master: master_projected,
            slaves: slaves_projected,
            grid_layer,
            grid,
            report,
        })
    }
}

/// Runs the configured number of diffusion passes. Returns the pass reports and whether the
/// deadline stopped them early.
fn run_passes(
    grid: &mut CartogramGrid,
    params: &DeformationParams,
    options: &CartogramOptions,
    budget: &RunBudget,
    progress: &mut Progress<'_>,
) -> Result<(Vec<DiffusionReport>, bool)> {
    let count = params.diffusion_iterations;
    let mut passes = Vec::with_capacity(count);
    for pass in 0..count {
        if budget.check()? == BudgetState::Expired {
            tracing::warn!(pass, "maximum running time reached, skipping remaining passes");
            return Ok((passes, true));
        }
        progress.report_between(
            300,
            700,
            pass as f64 / count as f64,
            &format!("diffusion pass {} of {count}", pass + 1),
        );
        let solver = DiffusionSolver::new(params.diffusion_grid_size, options.diffusion.clone())?;
        let report = solver.compute(grid, budget)?;
        if report.outcome.is_stalled() {
            tracing::warn!(pass, outcome = ?report.outcome, "diffusion pass stalled");
        }
        let deadline = report.outcome == IntegrationOutcome::DeadlineReached;
        passes.push(report);
        grid.update_density_values();
        if deadline {
            tracing::warn!(pass, "maximum running time reached during diffusion");
            return Ok((passes, true));
        }
    }
    progress.report(700, "diffusion finished");
    Ok((passes, false))
}
