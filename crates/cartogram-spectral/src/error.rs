pub type Result<T> = std::result::Result<T, SpectralError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpectralError {
    #[error("transform length {len} is not a power of two")]
    NotPowerOfTwo { len: usize },

    #[error("transform length {len} is below the minimum of {min}")]
    TooShort { len: usize, min: usize },

    #[error("buffer holds {actual} values, the transform needs {required}")]
    BufferTooShort { required: usize, actual: usize },
}

pub(crate) fn ensure_power_of_two(len: usize) -> Result<()> {
    if len.is_power_of_two() {
        Ok(())
    } else {
        Err(SpectralError::NotPowerOfTwo { len })
    }
}

pub(crate) fn ensure_len(actual: usize, required: usize) -> Result<()> {
    if actual < required {
        Err(SpectralError::BufferTooShort { required, actual })
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_min(len: usize, min: usize) -> Result<()> {
    if len < min {
        Err(SpectralError::TooShort { len, min })
    } else {
        Ok(())
    }
}
