// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Red blood cell edges along a line-scan.

use std::f64::consts::SQRT_2;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::special::erf;

parameters! {
    /// Blurred step between plasma and a red blood cell.
    pub struct RbcParams {
        /// Background.
        pub b,
        /// Height of the step.
        pub amplitude,
        /// Blur of the edge.
        pub s,
        /// Edge position.
        pub xo,
    }
}

/// Order of plasma and red blood cell along the line-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    /// Plasma precedes the cell along the scan; `rbc` profile.
    PlasmaBeforeRbc,
    /// The cell precedes the plasma along the scan; `rbc_inv` profile.
    RbcBeforePlasma,
}

impl Default for Edge {
    fn default() -> Self {
        Edge::PlasmaBeforeRbc
    }
}


/// Fluorescence along an RBC/plasma interface.
pub fn rbc(x: f64, p: &RbcParams) -> f64 {
    p.b + 0.5 * p.amplitude * (1.0 + erf((x - p.xo) / (SQRT_2 * p.s)))
}

/// Fluorescence along a plasma/RBC interface.
pub fn rbc_inv(x: f64, p: &RbcParams) -> f64 {
    p.b + 0.5 * p.amplitude * (1.0 - erf((x - p.xo) / (SQRT_2 * p.s)))
}

/// Expected fluorescence at the positions `x` for the given edge orientation.
pub fn profile(x: ArrayView1<f64>, p: &RbcParams, edge: Edge) -> Array1<f64> {
    match edge {
        Edge::PlasmaBeforeRbc => x.mapv(|x| rbc(x, p)),
        Edge::RbcBeforePlasma => x.mapv(|x| rbc_inv(x, p)),
    }
}
