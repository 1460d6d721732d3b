#![forbid(unsafe_code)]

//! Density-equalizing cartograms.
//!
//! The pipeline follows Gastner and Newman's diffusion method: a [`CartogramGrid`] is laid
//! over the input layers and rasterizes the master layer's density; one or more
//! [`DiffusionSolver`] passes diffuse that density spectrally and move the grid nodes along the
//! induced flow; finally every feature is re-sampled through the deformed grid.
//!
//! [`Cartogram`] drives the whole run. The lower-level pieces are public for callers that want
//! to inspect or reuse them.

pub mod budget;
pub mod diffusion;
pub mod document;
pub mod error;
pub mod feature;
pub mod grid;
pub mod layer;
pub mod options;
pub mod pipeline;
pub mod progress;
pub mod reference_grid;
pub mod report;

pub use budget::{BudgetState, CancelFlag, RunBudget};
pub use diffusion::{DiffusionReport, DiffusionSolver, IntegrationOutcome, StallReason};
pub use document::{CartogramDocument, CartogramOutput};
pub use error::{Error, ProjectionError, Result};
pub use feature::Feature;
pub use grid::{CartogramGrid, CellState, GridCell};
pub use layer::{Layer, ProjectedLayer, ValueSummary};
pub use options::{CartogramOptions, DeformationParams, DiffusionParams};
pub use pipeline::{Cartogram, CartogramResult, estimate_maximum_segment_length};
pub use progress::{NoProgress, PROGRESS_MAX, ProgressSink};
pub use reference_grid::ReferenceGrid;
pub use report::{ComputationReport, SizeErrorSummary};

pub use cartogram_geom as geom;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
