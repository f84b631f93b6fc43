// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

use failure::Fail;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "amplification shape parameter alpha must be non-zero")]
    ZeroAmplification,
    #[fail(display = "number of averaged samples must be at least 1")]
    InvalidSampleCount,
    #[fail(display = "readout noise sigma must be non-zero")]
    InvalidNoise,
    #[fail(display = "expected photon count {} is not a valid Poisson rate", e)]
    InvalidExpectedCount { e: f64 },
    #[fail(
        display = "invalid quadrature grid (delta_s={}, s_max={}): both must be finite and positive",
        delta_s, s_max
    )]
    InvalidQuadrature { delta_s: f64, s_max: f64 },
    #[fail(display = "cannot broadcast array of shape {:?} onto shape {:?}", from, to)]
    ShapeMismatch { from: Vec<usize>, to: Vec<usize> },
    #[fail(display = "expected {} parameters, got {}", expected, found)]
    ParameterCount { expected: usize, found: usize },
    #[fail(
        display = "density of observed value {} (expected count {}) underflows to zero, negative log-likelihood is infinite",
        s, e
    )]
    DensityUnderflow { s: f64, e: f64 },
    #[fail(display = "linear fit is degenerate: at least two distinct finitely weighted points are needed")]
    DegenerateFit,
    #[fail(display = "optimization failed: {}", msg)]
    Optimization { msg: String },
}
