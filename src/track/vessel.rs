// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Vessel localization in line-scans whose pixels are averages of many PMT samples.
//!
//! Three protocols are supported:
//!
//! * A: simultaneous wall and plasma line-scans, including the glycocalyx (`fit_wall_plasma`),
//! * B: plasma line-scans only (`fit_plasma`),
//! * C: wall line-scans only (`fit_wall`),
//!
//! each for a single scan and for consecutive frames sharing the optical parameters.

use ndarray::prelude::*;

use crate::errors::Result;
use crate::model::intensity::vessel::{
    l_multi, l_multi_plasma, l_multi_wall, l_plasma_no_glx, l_wall, l_wall_plasma, PlasmaMulti,
    PlasmaNoGlxParams, VesselGrid, WallMulti, WallParams, WallPlasmaMulti, WallPlasmaParams,
};
use crate::model::intensity::Parameters;
use crate::model::pmt::{nll_q_mean, Acquisition};
use crate::track::{minimize, FitResult, FnObjective, MleConfig};

/// Fit the forward model `model`, mapping flat parameters to expected photon counts of the
/// shape of `data`, to averaged PMT output `data`.
pub fn mle<D, F>(
    data: ArrayView<f64, D>,
    model: F,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &[f64],
    config: &MleConfig,
) -> Result<FitResult>
where
    D: Dimension,
    F: Fn(&[f64]) -> Result<Array<f64, D>> + Send + Sync,
{
    let objective = FnObjective::new(|p: &[f64]| {
        let e = model(p)?;
        nll_q_mean(
            data.view(),
            e.view(),
            acquisition.alpha,
            acquisition.sigma,
            n_aver,
            acquisition.mu,
        )
    });
    minimize(&objective, p0, config)
}

fn positions(n: usize) -> Array1<f64> {
    Array::range(0.0, n as f64, 1.0)
}


/// Protocol A: wall (first row) and plasma (second row) line-scans of one frame.
pub fn fit_wall_plasma(
    scans: ArrayView2<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &WallPlasmaParams,
    grid: &VesselGrid,
    config: &MleConfig,
) -> Result<(WallPlasmaParams, FitResult)> {
    let x = positions(scans.ncols());
    let model = |p: &[f64]| -> Result<Array2<f64>> {
        Ok(l_wall_plasma(x.view(), &WallPlasmaParams::from_slice(p)?, grid))
    };
    let fit = mle(scans, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((WallPlasmaParams::from_slice(&fit.parameters)?, fit))
}

/// Protocol A over consecutive frames, `scans` of shape `(frames, 2, x)`.
pub fn fit_wall_plasma_multi(
    scans: ArrayView3<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &WallPlasmaMulti,
    grid: &VesselGrid,
    config: &MleConfig,
) -> Result<(WallPlasmaMulti, FitResult)> {
    let x = positions(scans.len_of(Axis(2)));
    let model = |p: &[f64]| -> Result<Array3<f64>> {
        Ok(l_multi(x.view(), &WallPlasmaMulti::from_slice(p)?, grid))
    };
    let fit = mle(scans, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((WallPlasmaMulti::from_slice(&fit.parameters)?, fit))
}

/// Protocol B: a plasma line-scan.
pub fn fit_plasma(
    scan: ArrayView1<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &PlasmaNoGlxParams,
    n_r: usize,
    config: &MleConfig,
) -> Result<(PlasmaNoGlxParams, FitResult)> {
    let x = positions(scan.len());
    let model = |p: &[f64]| -> Result<Array1<f64>> {
        Ok(l_plasma_no_glx(x.view(), &PlasmaNoGlxParams::from_slice(p)?, n_r))
    };
    let fit = mle(scan, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((PlasmaNoGlxParams::from_slice(&fit.parameters)?, fit))
}

/// Protocol B over consecutive frames, `scans` of shape `(frames, x)`.
pub fn fit_plasma_multi(
    scans: ArrayView2<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &PlasmaMulti,
    n_r: usize,
    config: &MleConfig,
) -> Result<(PlasmaMulti, FitResult)> {
    let x = positions(scans.ncols());
    let model = |p: &[f64]| -> Result<Array2<f64>> {
        Ok(l_multi_plasma(x.view(), &PlasmaMulti::from_slice(p)?, n_r))
    };
    let fit = mle(scans, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((PlasmaMulti::from_slice(&fit.parameters)?, fit))
}

/// Protocol C: a wall line-scan.
pub fn fit_wall(
    scan: ArrayView1<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &WallParams,
    grid: &VesselGrid,
    config: &MleConfig,
) -> Result<(WallParams, FitResult)> {
    let x = positions(scan.len());
    let model = |p: &[f64]| -> Result<Array1<f64>> {
        Ok(l_wall(x.view(), &WallParams::from_slice(p)?, grid))
    };
    let fit = mle(scan, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((WallParams::from_slice(&fit.parameters)?, fit))
}

/// Protocol C over consecutive frames, `scans` of shape `(frames, x)`.
pub fn fit_wall_multi(
    scans: ArrayView2<f64>,
    acquisition: &Acquisition,
    n_aver: u32,
    p0: &WallMulti,
    grid: &VesselGrid,
    config: &MleConfig,
) -> Result<(WallMulti, FitResult)> {
    let x = positions(scans.ncols());
    let model = |p: &[f64]| -> Result<Array2<f64>> {
        Ok(l_multi_wall(x.view(), &WallMulti::from_slice(p)?, grid))
    };
    let fit = mle(scans, model, acquisition, n_aver, &p0.to_vec(), config)?;
    Ok((WallMulti::from_slice(&fit.parameters)?, fit))
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::errors::Error;
    use crate::model::intensity::vessel::{WallFrame, WallShared};
    use crate::track::MleConfigBuilder;

    fn acquisition() -> Acquisition {
        Acquisition::new(3.0, 1.0, 0.0)
    }

    #[test]
    fn test_mle_recovers_levels() {
        // background plus a bump of known shape
        let bump = positions(20).mapv(|x| (-(x - 10.0f64).powi(2) / 8.0).exp());
        let truth = [2.0, 5.0];
        let gain = acquisition().gain().unwrap();
        let data = bump.mapv(|g| gain * (truth[0] + truth[1] * g));

        let model = |p: &[f64]| -> Result<Array1<f64>> { Ok(bump.mapv(|g| p[0] + p[1] * g)) };
        let fit = mle(data.view(), model, &acquisition(), 100, &[2.5, 4.5], &MleConfig::default())
            .unwrap();
        assert_relative_eq!(fit.parameters[0], truth[0], epsilon = 0.05);
        assert_relative_eq!(fit.parameters[1], truth[1], epsilon = 0.1);
    }

    #[test]
    fn test_mle_propagates_model_errors() {
        let data = positions(4);
        let model = |_: &[f64]| -> Result<Array1<f64>> { Err(Error::InvalidNoise) };
        assert!(mle(data.view(), model, &acquisition(), 1, &[1.0], &MleConfig::default()).is_err());
    }

    #[test]
    fn test_fit_wall_multi_frame_mismatch() {
        let p0 = WallMulti::new(
            WallShared {
                s_xy: 2.0,
                l: 5.0,
                b_plasma: 1.0,
                b_tissue: 0.5,
            },
            vec![
                WallFrame {
                    intensity: 10.0,
                    r_wall: 10.0,
                    xc: 20.0,
                    a1: 0.0,
                };
                2
            ],
        );
        let scans = Array2::zeros((3, 40));
        let grid = VesselGrid { n_r: 32, n_phi: 32 };
        let config = MleConfigBuilder::default().max_iters(1).build().unwrap();
        // three frames of data but two frames of parameters
        assert!(fit_wall_multi(scans.view(), &acquisition(), 10, &p0, &grid, &config).is_err());
    }
}
