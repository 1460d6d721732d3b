use std::f64::consts::PI;

use crate::Direction;
use crate::error::{Result, ensure_len, ensure_min, ensure_power_of_two};

/// Trigonometric recurrence `w ← w·e^{iθ}` evaluated without calling `sin`/`cos` per step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Twiddle {
    pub(crate) wr: f64,
    pub(crate) wi: f64,
    wpr: f64,
    wpi: f64,
}

impl Twiddle {
    pub(crate) fn new(theta: f64) -> Self {
        let half = (0.5 * theta).sin();
        Self {
            wr: 1.0,
            wi: 0.0,
            wpr: -2.0 * half * half,
            wpi: theta.sin(),
        }
    }

    pub(crate) fn advance(&mut self) {
        let wr = self.wr;
        self.wr = wr * self.wpr - self.wi * self.wpi + wr;
        self.wi = self.wi * self.wpr + wr * self.wpi + self.wi;
    }
}

/// In-place complex FFT of `nn` values stored as interleaved `(re, im)` pairs.
///
/// The inverse is unnormalized: a forward/inverse pair scales the data by `nn`.
pub fn four1(data: &mut [f64], nn: usize, dir: Direction) -> Result<()> {
    ensure_power_of_two(nn)?;
    let n = nn << 1;
    ensure_len(data.len(), n)?;

    let mut j = 0;
    for i in (0..n).step_by(2) {
        if j > i {
            data.swap(j, i);
            data.swap(j + 1, i + 1);
        }
        let mut m = nn;
        while m >= 2 && j >= m {
            j -= m;
            m >>= 1;
        }
        j += m;
    }

    let mut mmax = 2;
    while n > mmax {
        let istep = mmax << 1;
        let mut w = Twiddle::new(dir.sign() * (2.0 * PI / mmax as f64));
        for m in (0..mmax).step_by(2) {
            for i in (m..n).step_by(istep) {
                let j = i + mmax;
                let tempr = w.wr * data[j] - w.wi * data[j + 1];
                let tempi = w.wr * data[j + 1] + w.wi * data[j];
                data[j] = data[i] - tempr;
                data[j + 1] = data[i + 1] - tempi;
                data[i] += tempr;
                data[i + 1] += tempi;
            }
            w.advance();
        }
        mmax = istep;
    }
    Ok(())
}

/// FFT of `n` real samples.
///
/// The forward result packs the positive-frequency half: `data[0]` holds the zero frequency,
/// `data[1]` the Nyquist term, then `(re, im)` pairs. The inverse expects that layout and
/// returns the samples scaled by `n/2`.
pub fn realft(data: &mut [f64], n: usize, dir: Direction) -> Result<()> {
    ensure_min(n, 2)?;
    ensure_power_of_two(n)?;
    ensure_len(data.len(), n)?;
    let data = &mut data[..n];

    let c1 = 0.5;
    let half = n >> 1;
    let (c2, theta) = match dir {
        Direction::Forward => {
            four1(data, half, Direction::Forward)?;
            (-0.5, PI / half as f64)
        }
        Direction::Inverse => (0.5, -PI / half as f64),
    };

    let mut w = Twiddle::new(theta);
    w.advance();
    for i in 2..=(n >> 2) {
        let i1 = 2 * i - 2;
        let i2 = i1 + 1;
        let i3 = n + 2 - 2 * i;
        let i4 = i3 + 1;
        let h1r = c1 * (data[i1] + data[i3]);
        let h1i = c1 * (data[i2] - data[i4]);
        let h2r = -c2 * (data[i2] + data[i4]);
        let h2i = c2 * (data[i1] - data[i3]);
        data[i1] = h1r + w.wr * h2r - w.wi * h2i;
        data[i2] = h1i + w.wr * h2i + w.wi * h2r;
        data[i3] = h1r - w.wr * h2r + w.wi * h2i;
        data[i4] = -h1i + w.wr * h2i + w.wi * h2r;
        w.advance();
    }

    let h1r = data[0];
    match dir {
        Direction::Forward => {
            data[0] = h1r + data[1];
            data[1] = h1r - data[1];
        }
        Direction::Inverse => {
            data[0] = c1 * (h1r + data[1]);
            data[1] = c1 * (h1r - data[1]);
            four1(data, half, Direction::Inverse)?;
        }
    }
    Ok(())
}

/// Multi-dimensional complex FFT over interleaved `(re, im)` data laid out row-major (the last
/// dimension varies fastest). Unnormalized like [`four1`].
pub fn fourn(data: &mut [f64], dims: &[usize], dir: Direction) -> Result<()> {
    for &n in dims {
        ensure_power_of_two(n)?;
    }
    let ntot: usize = dims.iter().product();
    ensure_len(data.len(), 2 * ntot)?;

    // Indices below are 1-based positions of the real part: data[k - 1] is re, data[k] is im.
    let mut nprev = 1;
    for &n in dims.iter().rev() {
        let nrem = ntot / (n * nprev);
        let ip1 = nprev << 1;
        let ip2 = ip1 * n;
        let ip3 = ip2 * nrem;

        let mut i2rev = 1;
        for i2 in (1..=ip2).step_by(ip1) {
            if i2 < i2rev {
                for i1 in (i2..=i2 + ip1 - 2).step_by(2) {
                    for i3 in (i1..=ip3).step_by(ip2) {
                        let i3rev = i2rev + i3 - i2;
                        data.swap(i3 - 1, i3rev - 1);
                        data.swap(i3, i3rev);
                    }
                }
            }
            let mut ibit = ip2 >> 1;
            while ibit >= ip1 && i2rev > ibit {
                i2rev -= ibit;
                ibit >>= 1;
            }
            i2rev += ibit;
        }

        let mut ifp1 = ip1;
        while ifp1 < ip2 {
            let ifp2 = ifp1 << 1;
            let mut w = Twiddle::new(dir.sign() * 2.0 * PI / (ifp2 / ip1) as f64);
            for i3 in (1..=ifp1).step_by(ip1) {
                for i1 in (i3..=i3 + ip1 - 2).step_by(2) {
                    for k1 in (i1..=ip3).step_by(ifp2) {
                        let k2 = k1 + ifp1;
                        let tempr = w.wr * data[k2 - 1] - w.wi * data[k2];
                        let tempi = w.wr * data[k2] + w.wi * data[k2 - 1];
                        data[k2 - 1] = data[k1 - 1] - tempr;
                        data[k2] = data[k1] - tempi;
                        data[k1 - 1] += tempr;
                        data[k1] += tempi;
                    }
                }
                w.advance();
            }
            ifp1 = ifp2;
        }
        nprev *= n;
    }
    Ok(())
}

/// Packed real 3-D FFT of `data[nn1][nn2][nn3]` (row-major).
///
/// The forward transform leaves the non-negative frequencies of the last axis in `data` as
/// interleaved pairs and the Nyquist plane in `speq[nn1][2·nn2]`. The inverse consumes both and
/// returns the samples scaled by `nn1·nn2·nn3/2`.
pub fn rlft3(
    data: &mut [f64],
    speq: &mut [f64],
    nn1: usize,
    nn2: usize,
    nn3: usize,
    dir: Direction,
) -> Result<()> {
    ensure_min(nn3, 2)?;
    ensure_power_of_two(nn3)?;
    ensure_len(data.len(), nn1 * nn2 * nn3)?;
    ensure_len(speq.len(), nn1 * 2 * nn2)?;

    let dims = [nn1, nn2, nn3 >> 1];
    let c1 = 0.5;
    let c2 = -0.5 * dir.sign();
    let theta = dir.sign() * 2.0 * PI / nn3 as f64;

    // 1-based plane/row indices, 0-based position along the last axis.
    let at = |i1: usize, i2: usize, k: usize| ((i1 - 1) * nn2 + (i2 - 1)) * nn3 + k;
    let sq = |i1: usize, k: usize| (i1 - 1) * 2 * nn2 + k;

    if dir == Direction::Forward {
        fourn(data, &dims, Direction::Forward)?;
        for i1 in 1..=nn1 {
            for i2 in 1..=nn2 {
                speq[sq(i1, 2 * (i2 - 1))] = data[at(i1, i2, 0)];
                speq[sq(i1, 2 * (i2 - 1) + 1)] = data[at(i1, i2, 1)];
            }
        }
    }

    for i1 in 1..=nn1 {
        let j1 = if i1 != 1 { nn1 - i1 + 2 } else { 1 };
        let mut w = Twiddle::new(theta);
        let mut ii3 = 1;
        for i3 in 1..=(nn3 >> 2) + 1 {
            for i2 in 1..=nn2 {
                if i3 == 1 {
                    let j2 = if i2 != 1 { ((nn2 - i2) << 1) + 3 } else { 1 };
                    let (d_re, d_im) = (at(i1, i2, 0), at(i1, i2, 1));
                    let (s_re, s_im) = (sq(j1, j2 - 1), sq(j1, j2));
                    let h1r = c1 * (data[d_re] + speq[s_re]);
                    let h1i = c1 * (data[d_im] - speq[s_im]);
                    let h2i = c2 * (data[d_re] - speq[s_re]);
                    let h2r = -c2 * (data[d_im] + speq[s_im]);
                    data[d_re] = h1r + h2r;
                    data[d_im] = h1i + h2i;
                    speq[s_re] = h1r - h2r;
                    speq[s_im] = h2i - h1i;
                } else {
                    let j2 = if i2 != 1 { nn2 - i2 + 2 } else { 1 };
                    let j3 = nn3 + 3 - (i3 << 1);
                    let (a_re, a_im) = (at(i1, i2, ii3 - 1), at(i1, i2, ii3));
                    let (b_re, b_im) = (at(j1, j2, j3 - 1), at(j1, j2, j3));
                    let h1r = c1 * (data[a_re] + data[b_re]);
                    let h1i = c1 * (data[a_im] - data[b_im]);
                    let h2i = c2 * (data[a_re] - data[b_re]);
                    let h2r = -c2 * (data[a_im] + data[b_im]);
                    data[a_re] = h1r + w.wr * h2r - w.wi * h2i;
                    data[a_im] = h1i + w.wr * h2i + w.wi * h2r;
                    data[b_re] = h1r - w.wr * h2r + w.wi * h2i;
                    data[b_im] = -h1i + w.wr * h2i + w.wi * h2r;
                }
            }
            w.advance();
            ii3 += 2;
        }
    }

    if dir == Direction::Inverse {
        fourn(data, &dims, Direction::Inverse)?;
    }
    Ok(())
}
