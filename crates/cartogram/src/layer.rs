use cartogram_geom::Envelope;
use serde::Serialize;

use crate::grid::CartogramGrid;
use crate::{Feature, ProjectionError, Result};

/// An ordered collection of features deformed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    pub name: String,
    pub features: Vec<Feature>,
}

/// Basic statistics over a layer's master values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

impl Layer {
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn envelope(&self) -> Envelope {
        let mut env = Envelope::null();
        for f in &self.features {
            env.expand_to_include_envelope(&f.envelope());
        }
        env
    }

    pub fn total_area(&self) -> f64 {
        self.features.iter().map(Feature::area).sum()
    }

    /// Sets every non-finite master value to zero and returns how many were changed.
    pub fn clean_values(&mut self) -> usize {
        let mut cleaned = 0;
        for f in &mut self.features {
            if !f.value.is_finite() {
                f.value = 0.0;
                cleaned += 1;
            }
        }
        cleaned
    }

    /// Replaces values equal to `sentinel` so that the affected features get the mean density
    /// of the others.
    ///
    /// For density values the replacement is the area-weighted mean density; for absolute
    /// values it is that mean density times the feature's own area. Returns how many values
    /// were replaced.
    pub fn replace_missing_values(&mut self, sentinel: f64, is_density: bool) -> usize {
        let is_missing = |v: f64| v == sentinel;
        let (mut weighted, mut area) = (0.0, 0.0);
        for f in self
            .features
            .iter()
            .filter(|f| f.value.is_finite() && !is_missing(f.value))
        {
            let a = f.area();
            weighted += if is_density { f.value * a } else { f.value };
            area += a;
        }
        let mean_density = if area > 0.0 { weighted / area } else { 0.0 };

        let mut replaced = 0;
        for f in self.features.iter_mut().filter(|f| is_missing(f.value)) {
            f.value = if is_density {
                mean_density
            } else {
                mean_density * f.area()
            };
            replaced += 1;
        }
        replaced
    }

    /// Derives each feature's density from its value.
    ///
    /// Non-positive values and zero-area features get density zero.
    pub fn compute_densities(&mut self, is_density: bool) {
        for f in &mut self.features {
            let area = f.area();
            f.density = if is_density {
                f.value.max(0.0)
            } else if area > 0.0 && f.value > 0.0 {
                f.value / area
            } else {
                0.0
            };
        }
    }

    /// Area-weighted mean of the feature densities.
    pub fn mean_density(&self) -> f64 {
        let total = self.total_area();
        if total <= 0.0 {
            return 0.0;
        }
        self.features
            .iter()
            .map(|f| f.area() / total * f.density)
            .sum()
    }

    pub fn value_summary(&self) -> Option<ValueSummary> {
        let values: Vec<f64> = self
            .features
            .iter()
            .map(|f| f.value)
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(ValueSummary {
            count: values.len(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: sum / values.len() as f64,
            sum,
        })
    }

    pub fn regularized(&self, max_len: f64) -> Result<Layer> {
        let features = self
            .features
            .iter()
            .map(|f| f.regularized(max_len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Layer::new(self.name.clone(), features))
    }

    /// Projects every feature through the grid. A feature that cannot be projected keeps its
    /// slot as an error.
    pub fn project(&self, grid: &CartogramGrid) -> ProjectedLayer {
        let features = self
            .features
            .iter()
            .map(|f| {
                f.project(grid).inspect_err(|err| {
                    tracing::warn!(
                        layer = %self.name,
                        feature = %f.id,
                        %err,
                        "feature not projectable"
                    );
                })
            })
            .collect();
        ProjectedLayer {
            name: self.name.clone(),
            features,
        }
    }
}

/// A layer after projection, one entry per input feature in input order.
#[derive(Debug, Clone)]
pub struct ProjectedLayer {
    pub name: String,
    pub features: Vec<std::result::Result<Feature, ProjectionError>>,
}

impl ProjectedLayer {
    pub fn projected(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter_map(|f| f.as_ref().ok())
    }

    pub fn failure_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_err()).count()
    }
}
