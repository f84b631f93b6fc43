// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Full density of a single PMT output sample, including readout noise.

use itertools::Itertools;
use ndarray::prelude::*;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::model::pmt::broadcast_onto;
use crate::model::pmt::multiplication::multiplication_density;
use crate::model::special::gaussian;


/// Uniform grid `0, delta_s, 2*delta_s, ... < s_max` used to integrate the
/// multiplication density against the readout noise kernel.
///
/// `s_max` has to be large enough for the multiplication density to carry negligible mass
/// beyond it, `delta_s` small enough to resolve it.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct Quadrature {
    #[builder(default = "1.0")]
    pub delta_s: f64,
    #[builder(default = "1024.0")]
    pub s_max: f64,
}

impl Default for Quadrature {
    fn default() -> Self {
        Quadrature {
            delta_s: 1.0,
            s_max: 1024.0,
        }
    }
}

impl Quadrature {
    pub fn new(delta_s: f64, s_max: f64) -> Result<Self> {
        let quadrature = Quadrature { delta_s, s_max };
        quadrature.validate()?;
        Ok(quadrature)
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.delta_s) && valid(self.s_max) {
            Ok(())
        } else {
            Err(Error::InvalidQuadrature {
                delta_s: self.delta_s,
                s_max: self.s_max,
            })
        }
    }

    /// Number of grid nodes.
    pub fn len(&self) -> usize {
        (self.s_max / self.delta_s).ceil() as usize
    }

    /// Grid nodes.
    pub fn nodes(&self) -> Vec<f64> {
        (0..self.len()).map(|i| i as f64 * self.delta_s).collect_vec()
    }
}


/// Convolution of the multiplication density (given expected count `e`) with the
/// readout noise kernel, evaluated at the offset-corrected values `ds`.
/// Absolute values of `e`, `a` and `sigma` have to be taken by the caller.
struct Convolution<'a> {
    nodes: &'a [f64],
    delta_s: f64,
    weights: Vec<f64>,
    spike: f64,
    sigma: f64,
}

impl<'a> Convolution<'a> {
    fn new(nodes: &'a [f64], delta_s: f64, e: f64, a: f64, sigma: f64) -> Self {
        Convolution {
            nodes,
            delta_s,
            weights: nodes
                .iter()
                .map(|&u| multiplication_density(u, e, a))
                .collect_vec(),
            spike: (-e).exp(),
            sigma,
        }
    }

    fn density(&self, ds: f64) -> f64 {
        let n = self.nodes.len();
        let integral = if n > 1 {
            let term = |i: usize| gaussian(ds - self.nodes[i], self.sigma) * self.weights[i];
            let sum: f64 = self
                .nodes
                .iter()
                .zip(&self.weights)
                .map(|(&u, &w)| gaussian(ds - u, self.sigma) * w)
                .sum();
            self.delta_s * (sum - 0.5 * (term(0) + term(n - 1)))
        } else {
            0.0
        };
        self.spike * gaussian(ds, self.sigma) + integral
    }
}


/// Probability density of the PMT output `s` given the expected photon count `e`.
///
/// Zero detected photons (probability `exp(-e)`) leave only the readout noise around
/// `mu`; otherwise the multiplication density is convolved with the readout noise.
/// `e`, `a` and `sigma` enter via their absolute values.
pub fn output_density(
    s: f64,
    e: f64,
    a: f64,
    mu: f64,
    sigma: f64,
    quadrature: &Quadrature,
) -> Result<f64> {
    let sigma = checked_sigma(sigma)?;
    quadrature.validate()?;

    let nodes = quadrature.nodes();
    let convolution = Convolution::new(&nodes, quadrature.delta_s, e.abs(), a.abs(), sigma);
    Ok(convolution.density(s - mu))
}

/// Element-wise `output_density`, with `e` broadcast onto the shape of `s`.
/// The quadrature grid is shared by all elements; the multiplication density on it is
/// reused for consecutive elements with equal expected count.
pub fn q<D, E>(
    s: ArrayView<f64, D>,
    e: ArrayView<f64, E>,
    a: f64,
    mu: f64,
    sigma: f64,
    quadrature: &Quadrature,
) -> Result<Array<f64, D>>
where
    D: Dimension,
    E: Dimension,
{
    let sigma = checked_sigma(sigma)?;
    quadrature.validate()?;
    let e = broadcast_onto(&e, s.raw_dim())?;
    let a = a.abs();

    let nodes = quadrature.nodes();
    let mut cached: Option<(f64, Convolution)> = None;

    Ok(Zip::from(&s).and(&e).map_collect(|&s, &e| {
        let e = e.abs();
        match cached {
            Some((cached_e, ref convolution)) if cached_e == e => convolution.density(s - mu),
            _ => {
                let convolution = Convolution::new(&nodes, quadrature.delta_s, e, a, sigma);
                let density = convolution.density(s - mu);
                cached = Some((e, convolution));
                density
            }
        }
    }))
}

fn checked_sigma(sigma: f64) -> Result<f64> {
    let sigma = sigma.abs();
    if sigma == 0.0 {
        Err(Error::InvalidNoise)
    } else {
        Ok(sigma)
    }
}
