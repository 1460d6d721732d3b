pub type Result<T> = std::result::Result<T, GeomError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeomError {
    #[error("ring {ring} has {vertices} distinct vertices, at least 3 are required")]
    DegenerateRing { ring: usize, vertices: usize },

    #[error("ring {ring} has a non-finite coordinate at vertex {vertex}")]
    NonFiniteCoordinate { ring: usize, vertex: usize },

    #[error("maximum segment length must be positive and finite, got {0}")]
    InvalidSegmentLength(f64),
}
