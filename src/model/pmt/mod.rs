// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Statistical model of photon-counting PMT output.
//!
//! A detected photon burst of Poisson rate `e` is amplified by a gamma-like multiplication
//! with shape parameter `alpha` and observed through additive Gaussian readout noise `sigma`.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub mod mean;
pub mod multiplication;
pub mod output;

pub use self::mean::nll_q_mean;
pub use self::multiplication::{f, multiplication_density};
pub use self::output::{output_density, q, Quadrature, QuadratureBuilder};


/// PMT gain, i.e. expected output per detected photon.
pub fn gain(alpha: f64) -> Result<f64> {
    if alpha == 0.0 {
        return Err(Error::ZeroAmplification);
    }
    Ok(3.0 / alpha)
}

/// Expected PMT output given the expected photon count `e`.
pub fn pmt_output(e: f64, alpha: f64) -> Result<f64> {
    Ok(gain(alpha)? * e)
}

/// Variance of a single PMT output sample given the expected photon count `e`.
///
/// Amplification shot noise and readout noise are independent, so their variances add.
pub fn pmt_output_var(e: f64, alpha: f64, sigma: f64) -> Result<f64> {
    if alpha == 0.0 {
        return Err(Error::ZeroAmplification);
    }
    Ok(4.0 * e / alpha + sigma * sigma)
}


/// Detector constants of one acquisition session.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct Acquisition {
    /// Amplification shape parameter.
    pub alpha: f64,
    /// Readout noise standard deviation.
    pub sigma: f64,
    /// DC offset of the output.
    #[builder(default = "0.0")]
    #[serde(default)]
    pub mu: f64,
}

impl Acquisition {
    pub fn new(alpha: f64, sigma: f64, mu: f64) -> Self {
        Acquisition { alpha, sigma, mu }
    }

    pub fn gain(&self) -> Result<f64> {
        gain(self.alpha)
    }

    /// Convert PMT output units (e.g. an intensity from a least-squares fit) to photon counts.
    pub fn to_photons(&self, value: f64) -> Result<f64> {
        Ok(value / self.gain()?)
    }

    /// Expected output for the expected photon count `e`, excluding the offset.
    pub fn to_output(&self, e: f64) -> Result<f64> {
        pmt_output(e, self.alpha)
    }
}


/// Shape that all of `shapes` broadcast to, with axes aligned from the back.
pub(crate) fn broadcast_shape(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let ndim = shapes.iter().map(|shape| shape.len()).max().unwrap_or(0);
    let mut merged = vec![1; ndim];
    for shape in shapes {
        let offset = ndim - shape.len();
        for (i, &len) in shape.iter().enumerate() {
            let current = merged[offset + i];
            if current == 1 {
                merged[offset + i] = len;
            } else if len != 1 && len != current {
                return Err(Error::ShapeMismatch {
                    from: shape.to_vec(),
                    to: merged,
                });
            }
        }
    }
    Ok(merged)
}

/// Broadcast `view` onto `shape`, reporting a shape mismatch as an error.
pub(crate) fn broadcast_onto<'a, 'b, E, D>(
    view: &'b ArrayView<'a, f64, E>,
    shape: D,
) -> Result<ArrayView<'b, f64, D>>
where
    E: Dimension + 'b,
    D: Dimension,
{
    let to = shape.slice().to_vec();
    view.broadcast(shape).ok_or_else(|| Error::ShapeMismatch {
        from: view.shape().to_vec(),
        to,
    })
}
