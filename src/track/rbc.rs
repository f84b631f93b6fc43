// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Red blood cell localization in single-sample line-scans, and speed estimation from the
//! localized edges of consecutive scans.

use nalgebra::{Matrix2, Vector2};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::model::intensity::rbc::{profile, Edge, RbcParams};
use crate::model::intensity::Parameters;
use crate::model::pmt::{Acquisition, Quadrature};
use crate::track::{minimize, neg_log_density, FitResult, FnObjective, MleConfig};

pub fn default_quadrature() -> Quadrature {
    Quadrature {
        delta_s: 3.0,
        s_max: 800.0,
    }
}

/// Negative log-likelihood of `linescan` under an RBC edge with the flat parameters `p`
/// (see `RbcParams`), expected counts in photons.
pub fn neg_loglike(
    p: &[f64],
    linescan: ArrayView1<f64>,
    acquisition: &Acquisition,
    edge: Edge,
    quadrature: &Quadrature,
) -> Result<f64> {
    let params = RbcParams::from_slice(p)?;
    let x = Array::range(0.0, linescan.len() as f64, 1.0);
    let e = profile(x.view(), &params, edge);
    neg_log_density(linescan, e.view(), acquisition, quadrature)
}

pub fn mle_fit(
    linescan: ArrayView1<f64>,
    acquisition: &Acquisition,
    p0: &RbcParams,
    edge: Edge,
    quadrature: &Quadrature,
    config: &MleConfig,
) -> Result<(RbcParams, FitResult)> {
    quadrature.validate()?;
    let objective =
        FnObjective::new(|p: &[f64]| neg_loglike(p, linescan, acquisition, edge, quadrature));
    let fit = minimize(&objective, &p0.to_vec(), config)?;
    Ok((RbcParams::from_slice(&fit.parameters)?, fit))
}


/// Straight-line fit of RBC positions over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RbcSpeed {
    pub speed: f64,
    pub speed_err: f64,
    /// Position at time zero.
    pub intercept: f64,
    pub intercept_err: f64,
    /// Position at the mean time.
    pub x_mean: f64,
    pub x_mean_err: f64,
}

/// Estimate an RBC's speed from its positions `x` at times `t`, with standard errors `x_err`.
///
/// Points are weighted by `1 / x_err`; the reported errors derive from the covariance of the
/// weighted fit without rescaling by the residuals.
pub fn rbc_speed(t: &[f64], x: &[f64], x_err: &[f64]) -> Result<RbcSpeed> {
    if t.len() != x.len() || t.len() != x_err.len() {
        return Err(Error::ShapeMismatch {
            from: vec![x.len(), x_err.len()],
            to: vec![t.len()],
        });
    }

    let mut normal = Matrix2::zeros();
    let mut rhs = Vector2::zeros();
    for ((&t, &x), &err) in t.iter().zip(x).zip(x_err) {
        let w2 = 1.0 / (err * err);
        let row = Vector2::new(t, 1.0);
        normal += row * row.transpose() * w2;
        rhs += row * (x * w2);
    }
    let cov = normal.try_inverse().ok_or(Error::DegenerateFit)?;
    let coef = cov * rhs;
    if !coef.iter().all(|c| c.is_finite()) {
        return Err(Error::DegenerateFit);
    }
    let (speed, intercept) = (coef[0], coef[1]);

    let to = t.iter().sum::<f64>() / t.len() as f64;
    Ok(RbcSpeed {
        speed,
        speed_err: cov[(0, 0)].sqrt(),
        intercept,
        intercept_err: cov[(1, 1)].sqrt(),
        x_mean: intercept + speed * to,
        x_mean_err: (cov[(1, 1)] + 2.0 * to * cov[(0, 1)] + cov[(0, 0)] * to * to).sqrt(),
    })
}
