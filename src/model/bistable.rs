// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Intensity traces under periodically switched (bistable) bias.
//!
//! Every switching event changes the intensity by two exponentially saturating components.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// Two-component exponential response to a switching event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    pub tau1: f64,
    pub tau2: f64,
    pub di1: f64,
    pub di2: f64,
}

/// A periodic train of pulses of width `w`, the first one starting at `t0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseTrain {
    pub t0: f64,
    pub w: f64,
    pub response: StepResponse,
}


/// Response to a switching event at time zero.
pub fn step(t: f64, r: &StepResponse) -> f64 {
    if t >= 0.0 {
        r.di1 * (1.0 - (-t / r.tau1).exp()) + r.di2 * (1.0 - (-t / r.tau2).exp())
    } else {
        0.0
    }
}

/// Response to a pulse of width `w` starting at time zero.
pub fn step_diff(t: f64, w: f64, r: &StepResponse) -> f64 {
    step(t, r) - step(t - w, r)
}

/// Response to pulses repeating with period `dt`, evaluated at times `t`.
///
/// Pulses starting up to three periods before `t0` are included so that their decay is
/// visible at the beginning of the trace.
pub fn step_diff_periodic(t: ArrayView1<f64>, pulses: &PulseTrain, dt: f64) -> Array1<f64> {
    let t_end = match t.iter().last() {
        Some(&t_end) => t_end,
        None => return Array1::zeros(0),
    };
    let first = pulses.t0 - 3.0 * dt;
    let n_starts = ((t_end + 4.0 * dt - first) / dt).ceil().max(0.0) as usize;

    t.mapv(|t| {
        (0..n_starts)
            .map(|k| step_diff(t - (first + k as f64 * dt), pulses.w, &pulses.response))
            .sum()
    })
}

/// Trace with baseline `i0` and a single pulse train.
pub fn bb_single(t: ArrayView1<f64>, pulses: &PulseTrain, i0: f64, dt: f64) -> Array1<f64> {
    step_diff_periodic(t, pulses, dt).mapv(|v| i0 - v)
}

/// Trace with baseline `i0` and two interleaved pulse trains of equal period.
pub fn bb_double(
    t: ArrayView1<f64>,
    first: &PulseTrain,
    second: &PulseTrain,
    i0: f64,
    dt: f64,
) -> Array1<f64> {
    let mut trace = bb_single(t, first, i0, dt);
    trace -= &step_diff_periodic(t, second, dt);
    trace
}
