use crate::{Envelope, Polygon, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
}

impl From<Polygon> for MultiPolygon {
    fn from(polygon: Polygon) -> Self {
        Self {
            polygons: vec![polygon],
        }
    }
}

impl From<Vec<Polygon>> for MultiPolygon {
    fn from(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    pub fn envelope(&self) -> Envelope {
        let mut env = Envelope::null();
        for p in &self.polygons {
            env.expand_to_include_envelope(&p.envelope());
        }
        env
    }

    pub fn coordinate_count(&self) -> usize {
        self.polygons.iter().map(Polygon::coordinate_count).sum()
    }

    pub fn contains(&self, other: &Polygon) -> bool {
        self.polygons.iter().any(|p| p.contains(other))
    }

    pub fn intersects(&self, other: &Polygon) -> bool {
        self.polygons.iter().any(|p| p.intersects(other))
    }

    pub fn regularized(&self, max_len: f64) -> Result<MultiPolygon> {
        let polygons = self
            .polygons
            .iter()
            .map(|p| p.regularized(max_len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { polygons })
    }
}
