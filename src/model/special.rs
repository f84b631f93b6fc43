// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Special functions and quadrature helpers shared by the PMT and intensity models.
//!
//! Call sites only see plain `f64` functions, so the underlying implementation
//! (series truncation, `statrs` routines, polynomial approximations) can change freely.

use std::f64::consts::PI;

use statrs::function::erf;
use statrs::function::gamma::ln_gamma;

/// Upper bound on the number of `0F3` series terms. The series peaks around `k ~ z^(1/4)`,
/// i.e. below 200 terms for every argument the series branch is used for.
const MAX_SERIES_TERMS: usize = 10_000;

/// Beyond this argument, `erfcx` switches from `exp(x^2) * erfc(x)` to its asymptotic series.
const ERFCX_ASYMPTOTIC: f64 = 25.0;

/// Generalized hypergeometric function `0F3(; b1, b2, b3; z)` for `z >= 0`,
/// summed until the terms drop below machine precision relative to the sum.
pub fn hyper_0f3(b: [f64; 3], z: f64) -> f64 {
    debug_assert!(z >= 0.0, "0F3 series is only used for non-negative arguments");

    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 0..MAX_SERIES_TERMS {
        let k = k as f64;
        term *= z / ((b[0] + k) * (b[1] + k) * (b[2] + k) * (k + 1.0));
        sum += term;
        if term <= sum * f64::EPSILON {
            break;
        }
    }
    sum
}

/// Natural logarithm of the leading large-`z` asymptotic of `0F3(; b1, b2, b3; z)`:
///
/// `Γ(b1)Γ(b2)Γ(b3) / ((2π)^1.5 * 2) * exp(4 z^(1/4)) * z^((1.5 - b1 - b2 - b3) / 4)`
pub fn ln_hyper_0f3_asymptotic(b: [f64; 3], z: f64) -> f64 {
    let ln_gammas: f64 = b.iter().map(|&b| ln_gamma(b)).sum();
    let nu = 0.25 * (1.5 - b.iter().sum::<f64>());

    ln_gammas - (4.0 * 2f64.sqrt() * PI.powf(1.5)).ln() + 4.0 * z.powf(0.25) + nu * z.ln()
}

pub fn erf(x: f64) -> f64 {
    erf::erf(x)
}

/// Scaled complementary error function `exp(x^2) * erfc(x)`.
pub fn erfcx(x: f64) -> f64 {
    if x < ERFCX_ASYMPTOTIC {
        (x * x).exp() * erf::erfc(x)
    } else {
        let x2 = x * x;
        (1.0 - 0.5 / x2 + 0.75 / (x2 * x2) - 1.875 / (x2 * x2 * x2)) / (x * PI.sqrt())
    }
}

/// Modified Bessel function of the first kind of order zero.
pub fn bessel_i0(x: f64) -> f64 {
    let y = 0.25 * x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * f64::EPSILON {
        term *= y / (k * k);
        sum += term;
        k += 1.0;
    }
    sum
}

/// Normal density with zero mean and standard deviation `sigma`.
pub fn gaussian(x: f64, sigma: f64) -> f64 {
    (-x * x / (2.0 * sigma * sigma)).exp() / (2.0 * PI * sigma * sigma).sqrt()
}

/// Laplace density with zero mean and scale `l`.
pub fn laplace(x: f64, l: f64) -> f64 {
    (-x.abs() / l).exp() / (2.0 * l)
}

/// Trapezoidal rule over samples `y` spaced uniformly by `dx`.
pub fn trapz(y: &[f64], dx: f64) -> f64 {
    match y.len() {
        0 | 1 => 0.0,
        n => dx * (y.iter().sum::<f64>() - 0.5 * (y[0] + y[n - 1])),
    }
}
