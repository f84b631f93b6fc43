// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::f64::consts::PI;

use ndarray::prelude::*;

use crate::errors::{Error, Result};
use crate::model::pmt::{broadcast_onto, pmt_output, pmt_output_var};


/// Negative log-likelihood of observing the averages `s` of `n_aver` PMT samples each,
/// given the expected photon counts `e` (broadcast onto the shape of `s`).
///
/// By the central limit theorem each average is normal with mean `pmt_output(e, a) + mu`
/// and variance `pmt_output_var(e, a, sigma) / n_aver`.
///
/// Elements whose term is not finite (e.g. a negative variance while the optimizer
/// explores invalid expected counts) contribute nothing to the sum. They are not an error.
pub fn nll_q_mean<D, E>(
    s: ArrayView<f64, D>,
    e: ArrayView<f64, E>,
    a: f64,
    sigma: f64,
    n_aver: u32,
    mu: f64,
) -> Result<f64>
where
    D: Dimension,
    E: Dimension,
{
    if n_aver == 0 {
        return Err(Error::InvalidSampleCount);
    }
    let n = f64::from(n_aver);
    let e = broadcast_onto(&e, s.raw_dim())?;

    let mut terms = Vec::with_capacity(s.len());
    for (&s, &e) in s.iter().zip(e.iter()) {
        let var = pmt_output_var(e, a, sigma)?;
        let mean = pmt_output(e, a)? + mu;
        terms.push((2.0 * PI * var / n).ln() + n * (s - mean).powi(2) / var);
    }

    let dropped = terms.iter().filter(|t| !t.is_finite()).count();
    if dropped > 0 {
        debug!("ignoring {} non-finite likelihood terms", dropped);
    }

    Ok(0.5 * terms.iter().filter(|t| t.is_finite()).sum::<f64>())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sample() {
        // var = 4*2/1 + 1 = 9, mean = 3/1*2 = 6
        let s = array![5.0];
        let e = arr0(2.0);
        let nll = nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 0.0).unwrap();
        let expected = 0.5 * ((2.0 * PI * 9.0).ln() + 1.0 / 9.0);
        assert_relative_eq!(nll, expected, max_relative = 1e-12);
        assert_relative_eq!(nll, 2.0731063774283376, max_relative = 1e-12);
    }

    #[test]
    fn test_averaged_samples() {
        let s = array![[5.0, 6.5], [7.0, 2.0]];
        let e = array![[2.0, 2.0], [2.5, 1.0]];
        let (a, sigma, n) = (1.0, 1.0, 16);
        let nll = nll_q_mean(s.view(), e.view(), a, sigma, n, 0.0).unwrap();

        let expected: f64 = s
            .iter()
            .zip(e.iter())
            .map(|(&s, &e)| {
                let var = (4.0 * e / a + sigma * sigma) / n as f64;
                let mean = 3.0 / a * e;
                0.5 * ((2.0 * PI * var).ln() + (s - mean).powi(2) / var)
            })
            .sum();
        assert_relative_eq!(nll, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_offset() {
        let s = array![15.0];
        let e = arr0(2.0);
        let with_offset = nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 10.0).unwrap();
        let s = array![5.0];
        let without = nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 0.0).unwrap();
        assert_relative_eq!(with_offset, without);
    }

    #[test]
    fn test_non_finite_terms_ignored() {
        let s = array![5.0, f64::NAN, 4.0];
        let e = arr0(2.0);
        let nll = nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 0.0).unwrap();

        let finite = array![5.0, 4.0];
        let expected = nll_q_mean(finite.view(), e.view(), 1.0, 1.0, 1, 0.0).unwrap();
        assert_relative_eq!(nll, expected);

        // negative variance: the logarithm is undefined for the second element
        let s = array![5.0, 5.0];
        let e = array![2.0, -10.0];
        let nll = nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 0.0).unwrap();
        let first = nll_q_mean(array![5.0].view(), arr0(2.0).view(), 1.0, 1.0, 1, 0.0).unwrap();
        assert_relative_eq!(nll, first);
    }

    #[test]
    fn test_invalid_arguments() {
        let s = array![5.0];
        let e = arr0(2.0);
        assert!(nll_q_mean(s.view(), e.view(), 1.0, 1.0, 0, 0.0).is_err());
        assert!(nll_q_mean(s.view(), e.view(), 0.0, 1.0, 1, 0.0).is_err());
        let e = array![1.0, 2.0];
        assert!(nll_q_mean(s.view(), e.view(), 1.0, 1.0, 1, 0.0).is_err());
    }
}
