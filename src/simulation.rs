// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Monte-Carlo simulation of PMT output.
//!
//! The number of detected photons is Poisson distributed with rate `e`. Each photon is
//! amplified by an independent `Gamma(3, 1/alpha)` multiplication, such that `n` photons
//! yield `Gamma(3n, 1/alpha)`. Gaussian readout noise around the offset `mu` is added last.

use ndarray::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal, Poisson};

use crate::errors::{Error, Result};


/// Sampler of PMT output for one acquisition setting.
#[derive(Debug, Clone)]
pub struct PmtSampler {
    alpha: f64,
    readout: Normal<f64>,
}

impl PmtSampler {
    /// Negative `alpha` and `sigma` are taken by their absolute value. A zero `sigma`
    /// simulates a noise-free readout.
    pub fn new(alpha: f64, sigma: f64, mu: f64) -> Result<Self> {
        let alpha = alpha.abs();
        if alpha == 0.0 || !alpha.is_finite() {
            return Err(Error::ZeroAmplification);
        }
        let readout = Normal::new(mu, sigma.abs()).map_err(|_| Error::InvalidNoise)?;
        Ok(PmtSampler { alpha, readout })
    }

    /// Number of photons detected given the expected count `e`.
    fn photons<R: Rng>(&self, e: f64, rng: &mut R) -> Result<u64> {
        if e == 0.0 {
            return Ok(0);
        }
        if !e.is_finite() {
            return Err(Error::InvalidExpectedCount { e });
        }
        let poisson = Poisson::new(e).map_err(|_| Error::InvalidExpectedCount { e })?;
        Ok(poisson.sample(rng) as u64)
    }

    /// One PMT output sample given the expected photon count `e`.
    pub fn sample<R: Rng>(&self, e: f64, rng: &mut R) -> Result<f64> {
        let n = self.photons(e, rng)?;
        let amplified = if n > 0 {
            Gamma::new(3.0 * n as f64, 1.0 / self.alpha)
                .map_err(|_| Error::ZeroAmplification)?
                .sample(rng)
        } else {
            0.0
        };
        Ok(amplified + self.readout.sample(rng))
    }

    /// Average of `n_aver` independent samples.
    pub fn sample_mean<R: Rng>(&self, e: f64, n_aver: u32, rng: &mut R) -> Result<f64> {
        if n_aver == 0 {
            return Err(Error::InvalidSampleCount);
        }
        let mut sum = 0.0;
        for _ in 0..n_aver {
            sum += self.sample(e, rng)?;
        }
        Ok(sum / f64::from(n_aver))
    }

    /// Averaged output for every element of `expected`.
    pub fn simulate<D: Dimension, R: Rng>(
        &self,
        expected: ArrayView<f64, D>,
        n_aver: u32,
        rng: &mut R,
    ) -> Result<Array<f64, D>> {
        let mut simulated = Array::zeros(expected.raw_dim());
        for (out, &e) in simulated.iter_mut().zip(expected.iter()) {
            *out = self.sample_mean(e, n_aver, rng)?;
        }
        Ok(simulated)
    }
}
