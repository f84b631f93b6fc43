// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Density of PMT output caused by one or more detected photons.

use std::f64::consts::LN_2;

use ndarray::prelude::*;
use ndarray::Zip;

use crate::errors::Result;
use crate::model::pmt::{broadcast_onto, broadcast_shape};
use crate::model::special::{hyper_0f3, ln_hyper_0f3_asymptotic};

/// Denominator parameters of the `0F3` series.
const B: [f64; 3] = [4.0 / 3.0, 5.0 / 3.0, 2.0];

/// Series argument above which the large-argument asymptotic is used instead.
/// At this value the leading asymptotic term deviates from the series by less than 7e-4
/// (relative), while the series still needs fewer than 250 terms and stays below `f64::MAX`.
pub const SERIES_LIMIT: f64 = 1e9;


/// Probability density that a burst of Poisson(`e`) photons, each amplified by a
/// gamma-like multiplication of shape `a`, produces the output `s`.
///
/// The density only has support for `s > 0` and vanishes for non-positive `e` or `a`.
pub fn multiplication_density(s: f64, e: f64, a: f64) -> f64 {
    if s <= 0.0 || e <= 0.0 || a <= 0.0 {
        return 0.0;
    }

    let z = e * a.powi(3) * s.powi(3) / 27.0;
    // e * a^3 * s^2 * exp(-e - a*s), kept in log space since exp(-a*s) may underflow
    // while the hypergeometric factor is still large.
    let ln_prefactor = e.ln() + 3.0 * a.ln() + 2.0 * s.ln() - e - a * s;

    let ln_density = if z < SERIES_LIMIT {
        ln_prefactor - LN_2 + hyper_0f3(B, z).ln()
    } else {
        ln_prefactor - LN_2 + ln_hyper_0f3_asymptotic(B, z)
    };
    ln_density.exp()
}

/// Element-wise `multiplication_density` over the joint broadcast shape of `s`, `e` and `a`.
pub fn f<D, E, F>(
    s: ArrayView<f64, D>,
    e: ArrayView<f64, E>,
    a: ArrayView<f64, F>,
) -> Result<ArrayD<f64>>
where
    D: Dimension,
    E: Dimension,
    F: Dimension,
{
    let shape = IxDyn(&broadcast_shape(&[s.shape(), e.shape(), a.shape()])?);
    let s = broadcast_onto(&s, shape.clone())?;
    let e = broadcast_onto(&e, shape.clone())?;
    let a = broadcast_onto(&a, shape)?;

    Ok(Zip::from(&s)
        .and(&e)
        .and(&a)
        .map_collect(|&s, &e, &a| multiplication_density(s, e, a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::special::trapz;

    /// Output value at which the series argument equals `z`.
    fn s_at(z: f64, e: f64, a: f64) -> f64 {
        (27.0 * z / (e * a.powi(3))).cbrt()
    }

    #[test]
    fn test_single_photon_limit() {
        // for small z only the first series term matters:
        // 0.5 * e * a^3 * s^2 * exp(-e - a*s)
        let (s, e, a): (f64, f64, f64) = (1e-3, 0.2, 1.5);
        let expected = 0.5 * e * a.powi(3) * s * s * (-e - a * s).exp();
        assert_relative_eq!(multiplication_density(s, e, a), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_outside_support() {
        assert_eq!(multiplication_density(0.0, 2.0, 1.0), 0.0);
        assert_eq!(multiplication_density(-1.0, 2.0, 1.0), 0.0);
        assert_eq!(multiplication_density(3.0, 0.0, 1.0), 0.0);
        assert_eq!(multiplication_density(3.0, 2.0, 0.0), 0.0);
    }

    #[test]
    fn test_branch_continuity() {
        for &(e, a) in &[(100.0f64, 1.0f64), (100.0, 2.0), (75.0, 0.5)] {
            let s = s_at(SERIES_LIMIT, e, a);
            let below = multiplication_density(s * (1.0 - 1e-9), e, a);
            let above = multiplication_density(s * (1.0 + 1e-9), e, a);
            assert!(below > 0.0 && below.is_finite());
            assert!(above > 0.0 && above.is_finite());
            assert_relative_eq!(below, above, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_normalization() {
        // integrates to the probability of detecting at least one photon
        for &(e, a) in &[(2.0f64, 1.0f64), (0.5, 3.0), (10.0, 2.0)] {
            let s = Array::linspace(0.0, 200.0, 4001);
            let density: Vec<f64> = s.iter().map(|&s| multiplication_density(s, e, a)).collect();
            assert_relative_eq!(trapz(&density, 0.05), 1.0 - (-e).exp(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_large_output_is_finite() {
        // exp(-a*s) alone underflows here, the density does not
        let density = multiplication_density(800.0, 300.0, 1.0);
        assert!(density > 0.0 && density.is_finite());
    }

    #[test]
    fn test_broadcasting() {
        let s = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let e = array![0.5, 1.0, 2.0];
        let a = arr0(1.2);
        let density = f(s.view(), e.view(), a.view())
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();

        assert_eq!(density.shape(), &[2, 3]);
        for ((i, j), &d) in density.indexed_iter() {
            assert_eq!(d, multiplication_density(s[(i, j)], e[j], 1.2));
        }

        let e = array![0.5, 1.0];
        assert!(f(s.view(), e.view(), a.view()).is_err());
    }

    #[test]
    fn test_broadcasting_column_against_row() {
        let s = array![[1.0], [2.0], [3.0]];
        let e = array![0.5, 2.0];
        let a = arr0(1.0);
        let density = f(s.view(), e.view(), a.view())
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();

        assert_eq!(density.shape(), &[3, 2]);
        for ((i, j), &d) in density.indexed_iter() {
            assert_eq!(d, multiplication_density(s[(i, 0)], e[j], 1.0));
        }
    }

    #[test]
    fn test_broadcasting_scalar_output() {
        let s = arr0(2.0);
        let e = array![0.5, 2.0];
        let a = arr0(1.0);
        let density = f(s.view(), e.view(), a.view())
            .unwrap()
            .into_dimensionality::<Ix1>()
            .unwrap();

        assert_eq!(density.shape(), &[2]);
        assert_eq!(density[0], multiplication_density(2.0, 0.5, 1.0));
        assert_eq!(density[1], multiplication_density(2.0, 2.0, 1.0));
    }
}
