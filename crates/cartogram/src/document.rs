//! JSON documents exchanged with callers: a run's input layers and options, and its output.
//!
//! Coordinates are `[x, y]` pairs. A feature's geometry is a flat list of rings; rings lying
//! inside another ring become its holes.

use serde::{Deserialize, Serialize};

use crate::geom::{Coordinate, Polygon, coord};
use crate::pipeline::{Cartogram, CartogramResult};
use crate::report::{ComputationReport, size_errors};
use crate::{CartogramOptions, Feature, Layer, ProjectedLayer, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureDocument {
    pub id: Option<String>,
    pub rings: Vec<Vec<[f64; 2]>>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerDocument {
    pub name: String,
    pub features: Vec<FeatureDocument>,
}

/// Input of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartogramDocument {
    pub options: CartogramOptions,
    pub master: LayerDocument,
    pub slaves: Vec<LayerDocument>,
    pub constrained: Vec<LayerDocument>,
}

fn to_coordinates(ring: &[[f64; 2]]) -> Vec<Coordinate> {
    ring.iter().map(|&[x, y]| coord(x, y)).collect()
}

fn to_pairs(ring: &[Coordinate]) -> Vec<[f64; 2]> {
    ring.iter().map(|c| [c.x, c.y]).collect()
}

impl LayerDocument {
    /// Builds the layer. Features without an id are numbered by position; features without a
    /// value get NaN.
    pub fn to_layer(&self) -> Result<Layer> {
        let features = self
            .features
            .iter()
            .enumerate()
            .map(|(n, f)| {
                let id = f.id.clone().unwrap_or_else(|| n.to_string());
                let rings = f.rings.iter().map(|r| to_coordinates(r)).collect();
                Feature::from_rings(id, rings, f.value.unwrap_or(f64::NAN))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Layer::new(self.name.clone(), features))
    }
}

impl CartogramDocument {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Builds the pipeline described by this document.
    pub fn to_cartogram(&self) -> Result<Cartogram> {
        let slaves = self
            .slaves
            .iter()
            .map(LayerDocument::to_layer)
            .collect::<Result<Vec<_>>>()?;
        let constrained = self
            .constrained
            .iter()
            .map(LayerDocument::to_layer)
            .collect::<Result<Vec<_>>>()?;
        Ok(Cartogram::new(self.master.to_layer()?)
            .with_slaves(slaves)
            .with_constrained(constrained)
            .with_options(self.options.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonOutput {
    pub exterior: Vec<[f64; 2]>,
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl From<&Polygon> for PolygonOutput {
    fn from(polygon: &Polygon) -> Self {
        Self {
            exterior: to_pairs(polygon.exterior()),
            holes: polygon.holes().iter().map(|h| to_pairs(h)).collect(),
        }
    }
}

/// One feature of an output layer: either its projected polygons or the reason it has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOutput {
    pub id: String,
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygons: Option<Vec<PolygonOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOutput {
    pub name: String,
    pub features: Vec<FeatureOutput>,
}

impl LayerOutput {
    /// `source` is the layer before projection; failed features take their id from it.
    fn from_projected(
        layer: &ProjectedLayer,
        source: &Layer,
        size_errors: Option<Vec<Option<f64>>>,
    ) -> Self {
        let features = layer
            .features
            .iter()
            .zip(&source.features)
            .enumerate()
            .map(|(n, (projected, input))| {
                let size_error = size_errors.as_ref().and_then(|e| e.get(n).copied().flatten());
                match projected {
                    Ok(f) => FeatureOutput {
                        id: f.id.clone(),
                        value: f.value.is_finite().then_some(f.value),
                        polygons: Some(
                            f.geometry.polygons().iter().map(PolygonOutput::from).collect(),
                        ),
                        error: None,
                        size_error,
                    },
                    Err(err) => FeatureOutput {
                        id: input.id.clone(),
                        value: input.value.is_finite().then_some(input.value),
                        polygons: None,
                        error: Some(err.to_string()),
                        size_error: None,
                    },
                }
            })
            .collect();
        Self {
            name: layer.name.clone(),
            features,
        }
    }
}

/// Output of a run: the master layer first, then the slave layers in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartogramOutput {
    pub layers: Vec<LayerOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<Vec<[f64; 2]>>>,
    pub report: ComputationReport,
}

impl CartogramOutput {
    /// Pairs a result with the layers it was computed from, so failed features keep their ids.
    pub fn new(result: &CartogramResult, master: &Layer, slaves: &[Layer]) -> Self {
        let mut layers = vec![LayerOutput::from_projected(
            &result.master,
            master,
            Some(size_errors(&result.master)),
        )];
        layers.extend(
            result
                .slaves
                .iter()
                .zip(slaves)
                .map(|(projected, source)| LayerOutput::from_projected(projected, source, None)),
        );
        Self {
            layers,
            grid: result
                .grid_layer
                .as_ref()
                .map(|g| g.lines.iter().map(|l| to_pairs(l)).collect()),
            report: result.report.clone(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}

/// Runs the document end to end and returns the output document.
pub fn run_document(
    document: &CartogramDocument,
    sink: &mut dyn crate::ProgressSink,
) -> Result<CartogramOutput> {
    let master = document.master.to_layer()?;
    let slaves = document
        .slaves
        .iter()
        .map(LayerDocument::to_layer)
        .collect::<Result<Vec<_>>>()?;
    let result = document.to_cartogram()?.compute(sink)?;
    Ok(CartogramOutput::new(&result, &master, &slaves))
}
