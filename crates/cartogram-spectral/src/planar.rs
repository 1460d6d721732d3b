//! 2-D separable transforms over `(lx+1)×(ly+1)` fields.
//!
//! The first matrix index is x (rows), the second is y (columns). `lx` and `ly` are inferred
//! from the matrix shape.

use nalgebra::DMatrix;

use crate::error::{Result, SpectralError};
use crate::{Direction, cosft, sinft};

fn extents(field: &DMatrix<f64>) -> Result<(usize, usize)> {
    let (rows, cols) = field.shape();
    if rows < 2 || cols < 2 {
        return Err(SpectralError::TooShort {
            len: rows.min(cols).saturating_sub(1),
            min: 2,
        });
    }
    Ok((rows - 1, cols - 1))
}

/// Runs `f` on every line of constant x (the values along y).
fn along_y(
    field: &mut DMatrix<f64>,
    mut f: impl FnMut(&mut [f64]) -> Result<()>,
) -> Result<()> {
    let mut line = vec![0.0; field.ncols()];
    for i in 0..field.nrows() {
        for (j, v) in line.iter_mut().enumerate() {
            *v = field[(i, j)];
        }
        f(&mut line)?;
        for (j, v) in line.iter().enumerate() {
            field[(i, j)] = *v;
        }
    }
    Ok(())
}

/// Runs `f` on every line of constant y. Columns are contiguous in nalgebra's storage.
fn along_x(
    field: &mut DMatrix<f64>,
    mut f: impl FnMut(&mut [f64]) -> Result<()>,
) -> Result<()> {
    let rows = field.nrows();
    for column in field.as_mut_slice().chunks_exact_mut(rows) {
        f(column)?;
    }
    Ok(())
}

/// Cosine transform along both axes.
pub fn coscosft(field: &mut DMatrix<f64>, dir_x: Direction, dir_y: Direction) -> Result<()> {
    let (lx, ly) = extents(field)?;
    along_y(field, |line| cosft(line, ly, dir_y))?;
    along_x(field, |line| cosft(line, lx, dir_x))
}

/// Sine transform along x, cosine transform along y.
pub fn sincosft(field: &mut DMatrix<f64>, dir_x: Direction, dir_y: Direction) -> Result<()> {
    let (lx, ly) = extents(field)?;
    along_y(field, |line| cosft(line, ly, dir_y))?;
    along_x(field, |line| sinft(line, lx, dir_x))
}

/// Cosine transform along x, sine transform along y.
pub fn cossinft(field: &mut DMatrix<f64>, dir_x: Direction, dir_y: Direction) -> Result<()> {
    let (lx, ly) = extents(field)?;
    along_y(field, |line| sinft(line, ly, dir_y))?;
    along_x(field, |line| cosft(line, lx, dir_x))
}
