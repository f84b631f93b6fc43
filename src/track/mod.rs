// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Maximum-likelihood localization of quantum dots, red blood cells and vessels.
//!
//! Every target provides a negative log-likelihood over its parameter vector, minimized here
//! with L-BFGS and a More-Thuente line search.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::model::pmt::{q, Acquisition, Quadrature};

pub mod qd;
pub mod rbc;
pub mod vessel;


/// Settings of the quasi-Newton minimizer.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct MleConfig {
    #[builder(default = "1000")]
    pub max_iters: u64,
    /// Convergence tolerance on the gradient norm.
    #[builder(default = "1e-6")]
    pub tol_grad: f64,
    /// Number of correction pairs kept for the inverse Hessian approximation.
    #[builder(default = "7")]
    pub memory: usize,
}

impl Default for MleConfig {
    fn default() -> Self {
        MleConfig {
            max_iters: 1000,
            tol_grad: 1e-6,
            memory: 7,
        }
    }
}


/// Scalar objective over a flat parameter vector.
pub trait ObjectiveFunction: Send + Sync {
    fn eval(&self, params: &[f64]) -> Result<f64>;

    /// Central finite differences with a step relative to each parameter's magnitude.
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        let mut grad = vec![0.0; params.len()];
        let mut shifted = params.to_vec();
        for i in 0..params.len() {
            let h = 1e-6 * params[i].abs().max(1.0);

            shifted[i] = params[i] + h;
            let upper = self.eval(&shifted)?;
            shifted[i] = params[i] - h;
            let lower = self.eval(&shifted)?;
            shifted[i] = params[i];

            grad[i] = (upper - lower) / (2.0 * h);
        }
        Ok(grad)
    }
}

/// Objective from a closure.
pub struct FnObjective<F> {
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&[f64]) -> Result<f64> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnObjective { f }
    }
}

impl<F> ObjectiveFunction for FnObjective<F>
where
    F: Fn(&[f64]) -> Result<f64> + Send + Sync,
{
    fn eval(&self, params: &[f64]) -> Result<f64> {
        (self.f)(params)
    }
}


/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub parameters: Vec<f64>,
    /// Negative log-likelihood at `parameters`.
    pub nll: f64,
    pub n_iter: u64,
    pub n_fev: usize,
    pub n_gev: usize,
    pub converged: bool,
    /// Termination status reported by the optimizer.
    pub message: String,
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fit (nll={:.6}, iterations={}, evaluations={}/{}, converged={}): {}",
            self.nll, self.n_iter, self.n_fev, self.n_gev, self.converged, self.message
        )
    }
}


#[derive(Default)]
struct Evaluations {
    cost: AtomicUsize,
    gradient: AtomicUsize,
}

/// The objective divided by `scale`, as seen by the optimizer.
struct Problem<'a> {
    objective: &'a dyn ObjectiveFunction,
    scale: f64,
    evaluations: Arc<Evaluations>,
}

impl<'a> CostFunction for Problem<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        self.evaluations.cost.fetch_add(1, Ordering::Relaxed);
        self.objective
            .eval(params)
            .map(|cost| cost / self.scale)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl<'a> Gradient for Problem<'a> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        self.evaluations.gradient.fetch_add(1, Ordering::Relaxed);
        self.objective
            .gradient(params)
            .map(|grad| grad.into_iter().map(|g| g / self.scale).collect())
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

/// Sum of `-ln q` over all observed values `s` given their expected photon counts `e`.
///
/// A density of exactly zero makes the sum infinite and is reported instead of summed.
pub fn neg_log_density<D: Dimension>(
    s: ArrayView<f64, D>,
    e: ArrayView<f64, D>,
    acquisition: &Acquisition,
    quadrature: &Quadrature,
) -> Result<f64> {
    let densities = q(
        s.view(),
        e.view(),
        acquisition.alpha,
        acquisition.mu,
        acquisition.sigma,
        quadrature,
    )?;
    let mut nll = 0.0;
    for ((&density, &s), &e) in densities.iter().zip(s.iter()).zip(e.iter()) {
        if density <= 0.0 {
            return Err(Error::DensityUnderflow { s, e });
        }
        nll -= density.ln();
    }
    Ok(nll)
}

fn optimization_error<E: fmt::Display>(e: E) -> Error {
    Error::Optimization { msg: e.to_string() }
}

/// Minimize `objective` starting from `p0`.
///
/// The objective is scaled such that its gradient at `p0` has at most unit norm, so the first
/// line search starts within unit distance of `p0`. Convergence is still judged on the
/// unscaled gradient. Hitting the iteration limit is not an error: it is reported via
/// `FitResult::converged`.
pub fn minimize(objective: &dyn ObjectiveFunction, p0: &[f64], config: &MleConfig) -> Result<FitResult> {
    if p0.is_empty() {
        return Err(Error::ParameterCount {
            expected: 1,
            found: 0,
        });
    }
    info!("minimizing negative log-likelihood over {} parameters", p0.len());

    let grad_norm = objective.gradient(p0)?.iter().map(|g| g * g).sum::<f64>().sqrt();
    let scale = if grad_norm.is_finite() { grad_norm.max(1.0) } else { 1.0 };
    debug!("initial gradient norm {}", grad_norm);

    let evaluations = Arc::new(Evaluations::default());
    let problem = Problem {
        objective,
        scale,
        evaluations: Arc::clone(&evaluations),
    };
    let solver = LBFGS::new(MoreThuenteLineSearch::new(), config.memory)
        .with_tolerance_grad(config.tol_grad / scale)
        .map_err(optimization_error)?
        .with_tolerance_cost(1e-12)
        .map_err(optimization_error)?;

    let res = Executor::new(problem, solver)
        .configure(|state| state.param(p0.to_vec()).max_iters(config.max_iters))
        .run()
        .map_err(optimization_error)?;

    let state = res.state();
    let parameters = state
        .get_best_param()
        .ok_or_else(|| optimization_error("no parameters evaluated"))?
        .clone();
    let status = state.get_termination_status();
    let converged = matches!(
        status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
    );

    let result = FitResult {
        parameters,
        nll: state.get_best_cost() * scale,
        n_iter: state.get_iter(),
        n_fev: evaluations.cost.load(Ordering::Relaxed),
        n_gev: evaluations.gradient.load(Ordering::Relaxed),
        converged,
        message: status.to_string(),
    };
    if converged {
        info!("{}", result);
    } else {
        warn!("{}", result);
    }
    Ok(result)
}


#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic;

    impl ObjectiveFunction for Quadratic {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            Ok((p[0] - 2.0).powi(2) + 3.0 * (p[1] + 1.0).powi(2) - 5.0)
        }
    }

    #[test]
    fn test_numeric_gradient() {
        let grad = Quadratic.gradient(&[0.0, 0.0]).unwrap();
        assert_relative_eq!(grad[0], -4.0, max_relative = 1e-6);
        assert_relative_eq!(grad[1], 6.0, max_relative = 1e-6);
    }

    #[test]
    fn test_minimize() {
        let result = minimize(&Quadratic, &[0.0, 0.0], &MleConfig::default()).unwrap();
        assert!(result.converged, "{}", result.message);
        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.parameters[1], -1.0, epsilon = 1e-4);
        assert_relative_eq!(result.nll, -5.0, epsilon = 1e-8);
        assert!(result.n_fev > 0);
    }

    #[test]
    fn test_closure_objective() {
        let objective = FnObjective::new(|p: &[f64]| Ok((p[0] - 1.0).powi(2) + (p[1] - 2.0).powi(4)));
        let config = MleConfigBuilder::default().max_iters(200).build().unwrap();
        let result = minimize(&objective, &[5.0, 5.0], &config).unwrap();
        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(result.parameters[1], 2.0, epsilon = 5e-2);
    }

    #[test]
    fn test_objective_error() {
        let objective = FnObjective::new(|_: &[f64]| Err(Error::InvalidNoise));
        assert!(minimize(&objective, &[1.0], &MleConfig::default()).is_err());
        assert!(minimize(&Quadratic, &[], &MleConfig::default()).is_err());
    }

    #[test]
    fn test_neg_log_density() {
        let acquisition = Acquisition::new(1.0, 1.0, 0.0);
        let quadrature = Quadrature::new(1.0, 100.0).unwrap();
        let e = array![2.0, 2.0];

        let s = array![3.0, 7.5];
        let nll = neg_log_density(s.view(), e.view(), &acquisition, &quadrature).unwrap();
        let densities = q(s.view(), e.view(), 1.0, 0.0, 1.0, &quadrature).unwrap();
        assert_relative_eq!(nll, -densities.mapv(f64::ln).sum(), max_relative = 1e-12);

        let far = array![3.0, 1e6];
        match neg_log_density(far.view(), e.view(), &acquisition, &quadrature) {
            Err(Error::DensityUnderflow { s, .. }) => assert_eq!(s, 1e6),
            other => panic!("expected density underflow, got {:?}", other),
        }
    }

    #[test]
    fn test_neg_log_density_matrix() {
        // the observed values stay usable after evaluating the densities
        let acquisition = Acquisition::new(1.0, 1.0, 0.0);
        let quadrature = Quadrature::new(1.0, 100.0).unwrap();
        let s = array![[3.0, 7.5], [1.0, 4.0]];
        let e = array![[2.0, 2.0], [0.5, 3.0]];

        let nll = neg_log_density(s.view(), e.view(), &acquisition, &quadrature).unwrap();
        let rows: f64 = (0..2)
            .map(|i| neg_log_density(s.row(i), e.row(i), &acquisition, &quadrature).unwrap())
            .sum();
        assert_relative_eq!(nll, rows, max_relative = 1e-12);
    }
}
