use cartogram_geom::{Coordinate, Envelope, MultiPolygon, Polygon, polygons_from_rings};

use crate::grid::CartogramGrid;
use crate::{ProjectionError, Result};

/// A region with its master value.
///
/// `value` is NaN when the input carried no value; `density` is derived during grid
/// rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: MultiPolygon,
    pub value: f64,
    pub density: f64,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon, value: f64) -> Self {
        Self {
            id: id.into(),
            geometry,
            value,
            density: 0.0,
        }
    }

    /// Builds the geometry from a flat ring list; rings inside other rings become holes.
    pub fn from_rings(
        id: impl Into<String>,
        rings: Vec<Vec<Coordinate>>,
        value: f64,
    ) -> Result<Self> {
        let polygons = polygons_from_rings(rings)?;
        Ok(Self::new(id, MultiPolygon::new(polygons), value))
    }

    pub fn area(&self) -> f64 {
        self.geometry.area()
    }

    pub fn envelope(&self) -> Envelope {
        self.geometry.envelope()
    }

    pub fn regularized(&self, max_len: f64) -> Result<Feature> {
        Ok(Self {
            geometry: self.geometry.regularized(max_len)?,
            ..self.clone_scalars()
        })
    }

    /// Re-expresses the geometry through the deformed grid. Scalars are carried over.
    pub fn project(&self, grid: &CartogramGrid) -> std::result::Result<Feature, ProjectionError> {
        let polygons = self
            .geometry
            .polygons()
            .iter()
            .map(|polygon| {
                let exterior = grid.project_ring(polygon.exterior())?;
                let holes = polygon
                    .holes()
                    .iter()
                    .map(|hole| grid.project_ring(hole))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Polygon::with_holes(exterior, holes))
            })
            .collect::<std::result::Result<Vec<_>, ProjectionError>>()?;
        Ok(Self {
            geometry: MultiPolygon::new(polygons),
            ..self.clone_scalars()
        })
    }

    fn clone_scalars(&self) -> Feature {
        Self {
            id: self.id.clone(),
            geometry: MultiPolygon::default(),
            value: self.value,
            density: self.density,
        }
    }
}
