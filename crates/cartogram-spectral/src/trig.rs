use std::f64::consts::PI;

use crate::Direction;
use crate::error::{Result, ensure_len, ensure_min, ensure_power_of_two};
use crate::fft::{Twiddle, realft};

/// Cosine transform (DCT-I) of the `n+1` samples `z[0..=n]`.
///
/// `F_k = ½(z_0 + (-1)^k z_n) + Σ_{j=1}^{n-1} z_j cos(πjk/n)`. The transform is its own inverse
/// up to a factor `2/n`, which the inverse direction applies.
pub fn cosft(z: &mut [f64], n: usize, dir: Direction) -> Result<()> {
    ensure_min(n, 2)?;
    ensure_power_of_two(n)?;
    ensure_len(z.len(), n + 1)?;

    let mut w = Twiddle::new(PI / n as f64);
    let mut sum = 0.5 * (z[0] - z[n]);
    z[0] = 0.5 * (z[0] + z[n]);
    for j in 1..(n >> 1) {
        w.advance();
        let y1 = 0.5 * (z[j] + z[n - j]);
        let y2 = z[j] - z[n - j];
        z[j] = y1 - w.wi * y2;
        z[n - j] = y1 + w.wi * y2;
        sum += w.wr * y2;
    }
    realft(&mut z[..n], n, Direction::Forward)?;
    z[n] = z[1];
    z[1] = sum;
    for j in (3..n).step_by(2) {
        sum += z[j];
        z[j] = sum;
    }

    if dir == Direction::Inverse {
        let scale = 2.0 / n as f64;
        z[..=n].iter_mut().for_each(|v| *v *= scale);
    }
    Ok(())
}

/// Sine transform (DST-I) of `z[0..n]`, with `z[0]` taken as zero.
///
/// `F_k = Σ_{j=1}^{n-1} z_j sin(πjk/n)`. Self-inverse up to `2/n`, applied by the inverse
/// direction. When the buffer is longer than `n`, `z[n]` is set to zero so that mixed
/// sine/cosine fields keep a consistent `n+1` layout.
pub fn sinft(z: &mut [f64], n: usize, dir: Direction) -> Result<()> {
    ensure_min(n, 2)?;
    ensure_power_of_two(n)?;
    ensure_len(z.len(), n)?;

    let mut w = Twiddle::new(PI / n as f64);
    z[0] = 0.0;
    for j in 1..=(n >> 1) {
        w.advance();
        let y1 = w.wi * (z[j] + z[n - j]);
        let y2 = 0.5 * (z[j] - z[n - j]);
        z[j] = y1 + y2;
        z[n - j] = y1 - y2;
    }
    realft(&mut z[..n], n, Direction::Forward)?;
    z[0] *= 0.5;
    z[1] = 0.0;
    let mut sum = 0.0;
    for j in (0..n - 1).step_by(2) {
        sum += z[j];
        z[j] = z[j + 1];
        z[j + 1] = sum;
    }

    if dir == Direction::Inverse {
        let scale = 2.0 / n as f64;
        z[..n].iter_mut().for_each(|v| *v *= scale);
    }
    if let Some(last) = z.get_mut(n) {
        *last = 0.0;
    }
    Ok(())
}
