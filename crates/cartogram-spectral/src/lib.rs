#![forbid(unsafe_code)]

//! Spectral transforms for the cartogram diffusion solver.
//!
//! All routines transform in place and follow the classic radix-2 formulation: the complex FFT
//! [`four1`], the packed real FFT [`realft`], the cosine ([`cosft`], DCT-I over `n+1` samples)
//! and sine ([`sinft`], DST-I over `n` samples) transforms built on it, their 2-D combinations
//! over an `nalgebra::DMatrix`, and the multi-dimensional [`fourn`] / [`rlft3`] pair used for
//! convolution.
//!
//! Every transformed axis must be a power of two; this is checked and reported as
//! [`SpectralError::NotPowerOfTwo`].

mod error;
mod fft;
mod planar;
mod trig;

pub use error::{Result, SpectralError};
pub use fft::{four1, fourn, realft, rlft3};
pub use planar::{coscosft, cossinft, sincosft};
pub use trig::{cosft, sinft};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transform direction. `Forward` corresponds to `isign = 1` in the classic formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    pub(crate) fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Inverse => -1.0,
        }
    }
}
