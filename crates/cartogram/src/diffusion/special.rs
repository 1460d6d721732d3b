//! Error function for the blur kernel.

use std::f64::consts::PI;

const SERIES_EPSILON: f64 = 1e-15;
const SERIES_MAX_TERMS: usize = 10_000;

/// Lanczos approximation (g = 607/128) of `ln Γ(x)` for `x ≥ 0.5`.
pub(crate) fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 607.0 / 128.0;
    const COEFFICIENTS: [f64; 15] = [
        0.999_999_999_999_997_1,
        57.156_235_665_862_92,
        -59.597_960_355_475_49,
        14.136_097_974_741_746,
        -0.491_913_816_097_620_2,
        3.399_464_998_481_189e-5,
        4.652_362_892_704_858e-5,
        -9.837_447_530_487_956e-5,
        1.580_887_032_249_125e-4,
        -2.102_644_417_241_049e-4,
        2.174_396_181_152_126_5e-4,
        -1.643_181_065_367_639e-4,
        8.441_822_398_385_275e-5,
        -2.619_083_840_158_141e-5,
        3.689_918_265_953_162_4e-6,
    ];

    let mut sum = COEFFICIENTS[0];
    for (k, c) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + k as f64);
    }
    let tmp = x + G + 0.5;
    (x + 0.5) * tmp.ln() - tmp + 0.5 * (2.0 * PI).ln() + (sum / x).ln()
}

/// Regularized lower incomplete gamma function `P(a, x)` by its power series.
fn regularized_gamma_p(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let mut term = 1.0 / a;
    let mut sum = term;
    for n in 1..SERIES_MAX_TERMS {
        term *= x / (a + n as f64);
        sum += term;
        if term.abs() < SERIES_EPSILON * sum.abs() {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * sum
}

/// `erf(x)`, saturated to ±1 beyond |x| ≥ 4.
pub(crate) fn erf(x: f64) -> f64 {
    if x <= -4.0 {
        return -1.0;
    }
    if x >= 4.0 {
        return 1.0;
    }
    let p = regularized_gamma_p(0.5, x * x);
    if x < 0.0 { -p } else { p }
}
