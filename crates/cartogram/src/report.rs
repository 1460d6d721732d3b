//! Computation report produced at the end of a run.

use serde::Serialize;

use crate::{DeformationParams, DiffusionReport, ProjectedLayer, ValueSummary};

/// Per-feature size errors summarized over the master layer.
///
/// A feature's size error is `100 × projectedArea / targetArea` where the target area is its
/// share of the total master value applied to the total projected area. 100 is a perfect fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeErrorSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub within_one_std_dev: usize,
}

/// Size error of every master feature, in layer order. Features that failed to project or
/// carry a non-positive value get `None`.
pub fn size_errors(layer: &ProjectedLayer) -> Vec<Option<f64>> {
    let counted = |f: &crate::Feature| f.value.is_finite() && f.value > 0.0;
    let (value_sum, area_sum) = layer
        .projected()
        .filter(|&f| counted(f))
        .fold((0.0, 0.0), |(v, a), f| (v + f.value, a + f.area()));
    if value_sum <= 0.0 || area_sum <= 0.0 {
        return vec![None; layer.features.len()];
    }

    layer
        .features
        .iter()
        .map(|f| {
            let f = f.as_ref().ok().filter(|&f| counted(f))?;
            let target = f.value / value_sum * area_sum;
            Some(100.0 * f.area() / target)
        })
        .collect()
}

/// Linear interpolation between closest ranks of an ascending slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl SizeErrorSummary {
    pub fn from_errors(errors: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = errors.into_iter().filter(|e| e.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        Some(Self {
            count: sorted.len(),
            mean,
            std_dev,
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            within_one_std_dev: sorted
                .iter()
                .filter(|e| (*e - mean).abs() <= std_dev)
                .count(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationReport {
    pub params: DeformationParams,
    pub amount_of_deformation: u8,
    pub master_layer: String,
    pub slave_layers: Vec<String>,
    pub constrained_layers: Vec<String>,
    pub master_values: Option<ValueSummary>,
    /// Master values equal to the missing-value sentinel that were replaced.
    pub replaced_values: usize,
    /// Non-finite master values set to zero.
    pub cleaned_values: usize,
    pub passes: Vec<DiffusionReport>,
    /// True when the maximum running time cut the diffusion short.
    pub finished_early: bool,
    pub moved_constrained_nodes: usize,
    pub mean_density_error: f64,
    pub maximum_segment_length: f64,
    pub unprojectable_features: usize,
    pub size_error: Option<SizeErrorSummary>,
    pub elapsed_ms: u64,
}
