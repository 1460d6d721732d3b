use std::f64::consts::PI;

use cartogram_spectral::{Direction, coscosft, cossinft, rlft3, sincosft};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_field(seed: u64, lx: usize, ly: usize) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(lx + 1, ly + 1, |_, _| rng.gen_range(0.0..5.0))
}

fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn coscosft_round_trip() {
    let original = random_field(1, 8, 16);
    let mut field = original.clone();
    coscosft(&mut field, Direction::Forward, Direction::Forward).unwrap();
    coscosft(&mut field, Direction::Inverse, Direction::Inverse).unwrap();
    assert!(max_abs_diff(&field, &original) < 1e-9);
}

#[test]
fn coscosft_matches_direct_sum() {
    let (lx, ly) = (4, 8);
    let input = random_field(2, lx, ly);
    let weight = |i: usize, n: usize| if i == 0 || i == n { 0.5 } else { 1.0 };
    let expected = DMatrix::from_fn(lx + 1, ly + 1, |k, l| {
        let mut sum = 0.0;
        for i in 0..=lx {
            for j in 0..=ly {
                sum += weight(i, lx)
                    * weight(j, ly)
                    * input[(i, j)]
                    * (PI * (i * k) as f64 / lx as f64).cos()
                    * (PI * (j * l) as f64 / ly as f64).cos();
            }
        }
        sum
    });

    let mut field = input.clone();
    coscosft(&mut field, Direction::Forward, Direction::Forward).unwrap();
    assert!(max_abs_diff(&field, &expected) < 1e-9);
}

#[test]
fn mixed_inverse_transforms_synthesize_single_modes() {
    let (lx, ly) = (8, 16);
    let (k, l) = (3, 5);

    let mut field = DMatrix::zeros(lx + 1, ly + 1);
    field[(k, l)] = 1.0;
    sincosft(&mut field, Direction::Inverse, Direction::Inverse).unwrap();
    let expected = DMatrix::from_fn(lx + 1, ly + 1, |i, j| {
        (2.0 / lx as f64)
            * (PI * (i * k) as f64 / lx as f64).sin()
            * (2.0 / ly as f64)
            * (PI * (j * l) as f64 / ly as f64).cos()
    });
    assert!(max_abs_diff(&field, &expected) < 1e-12);

    let mut field = DMatrix::zeros(lx + 1, ly + 1);
    field[(k, l)] = 1.0;
    cossinft(&mut field, Direction::Inverse, Direction::Inverse).unwrap();
    let expected = DMatrix::from_fn(lx + 1, ly + 1, |i, j| {
        (2.0 / lx as f64)
            * (PI * (i * k) as f64 / lx as f64).cos()
            * (2.0 / ly as f64)
            * (PI * (j * l) as f64 / ly as f64).sin()
    });
    assert!(max_abs_diff(&field, &expected) < 1e-12);
}

#[test]
fn rlft3_convolution_with_a_shifted_impulse_shifts_the_field() {
    let (nn2, nn3) = (4, 8);
    let mut rng = StdRng::seed_from_u64(3);
    let original: Vec<f64> = (0..nn2 * nn3).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let mut data = original.clone();
    let mut speq = vec![0.0; 2 * nn2];
    let mut kernel = vec![0.0; nn2 * nn3];
    let mut kernel_speq = vec![0.0; 2 * nn2];
    // Impulse one step along the second axis.
    kernel[nn3] = 1.0;

    rlft3(&mut data, &mut speq, 1, nn2, nn3, Direction::Forward).unwrap();
    rlft3(&mut kernel, &mut kernel_speq, 1, nn2, nn3, Direction::Forward).unwrap();

    let mul = |a: &mut [f64], b: &[f64]| {
        for (pa, pb) in a.chunks_exact_mut(2).zip(b.chunks_exact(2)) {
            let re = pa[0] * pb[0] - pa[1] * pb[1];
            let im = pa[0] * pb[1] + pa[1] * pb[0];
            pa[0] = re;
            pa[1] = im;
        }
    };
    mul(&mut data, &kernel);
    mul(&mut speq, &kernel_speq);

    rlft3(&mut data, &mut speq, 1, nn2, nn3, Direction::Inverse).unwrap();
    let scale = (nn2 * nn3) as f64 / 2.0;
    for i2 in 0..nn2 {
        for i3 in 0..nn3 {
            let shifted = original[((i2 + nn2 - 1) % nn2) * nn3 + i3];
            let got = data[i2 * nn3 + i3] / scale;
            assert!((got - shifted).abs() < 1e-9, "({i2},{i3}): {got} vs {shifted}");
        }
    }
}

#[test]
fn degenerate_fields_are_rejected() {
    let mut field = DMatrix::zeros(1, 9);
    assert!(coscosft(&mut field, Direction::Forward, Direction::Forward).is_err());
    let mut field = DMatrix::zeros(7, 9);
    assert!(coscosft(&mut field, Direction::Forward, Direction::Forward).is_err());
}
