use cartogram_geom::GeomError;
use cartogram_spectral::SpectralError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeomError),

    #[error(transparent)]
    Spectral(#[from] SpectralError),

    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("layer `{layer}` has no features")]
    EmptyLayer { layer: String },

    #[error("layer `{layer}` has no area to carry density")]
    ZeroArea { layer: String },

    #[error("layer `{layer}` has no positive value to distribute")]
    NoDensity { layer: String },

    #[error("a deformation grid needs at least 2x2 nodes, got {size_x}x{size_y}")]
    InvalidGrid { size_x: usize, size_y: usize },

    #[error("the working envelope is empty or has no extent")]
    DegenerateEnvelope,

    #[error("computation cancelled")]
    Cancelled,

    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}

/// Why a single feature (or point) could not be carried through the deformation grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("point ({x}, {y}) lies outside the deformation grid")]
    OutOfBounds { x: f64, y: f64 },
}
