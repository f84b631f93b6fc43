// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Quantum dot localization in single-sample images.

use ndarray::prelude::*;

use crate::errors::Result;
use crate::model::intensity::qd::{pixel_grid, qd_blurred, QdParams};
use crate::model::intensity::Parameters;
use crate::model::pmt::{Acquisition, Quadrature};
use crate::track::{minimize, neg_log_density, FitResult, FnObjective, MleConfig};

/// Quadrature grid used for quantum dot images.
pub fn default_quadrature() -> Quadrature {
    Quadrature {
        delta_s: 5.0,
        s_max: 800.0,
    }
}

/// Negative log-likelihood of `image` under a blurred quantum dot with the flat parameters `p`
/// (see `QdParams`), expected counts in photons.
pub fn neg_loglike(
    p: &[f64],
    image: ArrayView2<f64>,
    acquisition: &Acquisition,
    quadrature: &Quadrature,
) -> Result<f64> {
    let params = QdParams::from_slice(p)?;
    let (x, y) = pixel_grid(image.dim());
    let e = qd_blurred(x.view(), y.view(), &params);
    neg_log_density(image, e.view(), acquisition, quadrature)
}

/// Fit a blurred quantum dot to `image`, starting from `p0`.
pub fn mle_fit(
    image: ArrayView2<f64>,
    acquisition: &Acquisition,
    p0: &QdParams,
    quadrature: &Quadrature,
    config: &MleConfig,
) -> Result<(QdParams, FitResult)> {
    quadrature.validate()?;
    debug!("fitting quantum dot in {:?} image", image.dim());
    let objective = FnObjective::new(|p: &[f64]| neg_loglike(p, image, acquisition, quadrature));
    let fit = minimize(&objective, &p0.to_vec(), config)?;
    Ok((QdParams::from_slice(&fit.parameters)?, fit))
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::errors::Error;

    fn truth() -> QdParams {
        QdParams {
            b: 0.5,
            amplitude: 60.0,
            xo: 6.2,
            yo: 5.7,
            sx: 1.6,
            sy: 1.6,
            theta: 0.0,
        }
    }

    #[test]
    fn test_neg_loglike_prefers_truth() {
        let acquisition = Acquisition::new(3.0, 0.5, 0.0);
        let quadrature = Quadrature::new(1.0, 200.0).unwrap();
        let p = truth();

        // the noise-free image of the true dot (in output units)
        let (x, y) = pixel_grid((12, 12));
        let image = qd_blurred(x.view(), y.view(), &p) * acquisition.gain().unwrap();

        let at_truth = neg_loglike(&p.to_vec(), image.view(), &acquisition, &quadrature).unwrap();
        let shifted = QdParams { xo: p.xo + 1.5, ..p };
        let off = neg_loglike(&shifted.to_vec(), image.view(), &acquisition, &quadrature).unwrap();
        assert!(at_truth < off);
    }

    #[test]
    fn test_parameter_count() {
        let acquisition = Acquisition::new(3.0, 0.5, 0.0);
        let image = Array2::zeros((4, 4));
        match neg_loglike(&[1.0, 2.0], image.view(), &acquisition, &default_quadrature()) {
            Err(Error::ParameterCount { expected: 7, found: 2 }) => (),
            other => panic!("expected parameter count error, got {:?}", other),
        }
    }
}
