// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Line-scans across blood vessels.
//!
//! A vessel is modelled as a cylinder of radius `r_wall` whose wall is labelled with
//! angular density `exp(a1 cos φ)`, and whose lumen of radius `r_lum` is filled with
//! labelled plasma. An optional glycocalyx layer between lumen and wall excludes plasma
//! with exponential profile of length `s_gcx`. The scan is blurred laterally by a Gaussian
//! PSF of width `s_xy` and axially by a Laplace profile of length `l`.

use std::f64::consts::PI;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::intensity::MultiFrame;
use crate::model::special::{bessel_i0, erfcx, gaussian, laplace, trapz};

/// Integration resolution of the vessel models.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct VesselGrid {
    /// Number of radial nodes across the lumen.
    #[builder(default = "256")]
    pub n_r: usize,
    /// Number of angular nodes around the wall.
    #[builder(default = "256")]
    pub n_phi: usize,
}

impl Default for VesselGrid {
    fn default() -> Self {
        VesselGrid { n_r: 256, n_phi: 256 }
    }
}

impl VesselGrid {
    /// Coarser default used when fitting several frames at once.
    pub fn multi_frame() -> Self {
        VesselGrid { n_r: 128, n_phi: 128 }
    }
}


parameters! {
    /// Plasma line-scan including the glycocalyx.
    pub struct PlasmaParams {
        pub xc,
        pub s_xy,
        pub l,
        pub r_lum,
        pub r_wall,
        pub s_gcx,
        pub intensity,
        pub b,
    }
}

parameters! {
    /// Plasma line-scan without glycocalyx.
    pub struct PlasmaNoGlxParams {
        pub xc,
        pub s_xy,
        pub l,
        pub r_lum,
        pub intensity,
        pub b,
    }
}

parameters! {
    /// Wall line-scan.
    pub struct WallParams {
        pub xc,
        pub s_xy,
        pub l,
        pub r_wall,
        pub a1,
        pub intensity,
        pub b_plasma,
        pub b_tissue,
    }
}

parameters! {
    /// Simultaneous wall and plasma line-scans.
    pub struct WallPlasmaParams {
        pub xc,
        pub s_xy,
        pub l,
        pub r_lum,
        pub r_wall,
        pub s_gcx,
        pub a1,
        pub i_wall,
        pub i_plasma,
        pub b_plasma,
        pub b_tissue_wall,
        pub b_tissue_plasma,
    }
}

parameters! {
    /// Parameters shared by all frames of consecutive wall and plasma line-scans.
    pub struct WallPlasmaShared {
        pub s_xy,
        pub l,
        /// Thickness of the glycocalyx, `r_wall - r_lum`.
        pub dr,
        pub s_gcx,
        pub b_plasma,
        pub b_tissue_wall,
        pub b_tissue_plasma,
    }
}

parameters! {
    pub struct WallPlasmaFrame {
        pub i_wall,
        pub i_plasma,
        pub r_wall,
        pub xc,
        pub a1,
    }
}

parameters! {
    /// Parameters shared by all frames of consecutive wall line-scans.
    pub struct WallShared {
        pub s_xy,
        pub l,
        pub b_plasma,
        pub b_tissue,
    }
}

parameters! {
    pub struct WallFrame {
        pub intensity,
        pub r_wall,
        pub xc,
        pub a1,
    }
}

parameters! {
    /// Parameters shared by all frames of consecutive plasma line-scans.
    pub struct PlasmaShared {
        pub s_xy,
        pub l,
        pub b,
    }
}

parameters! {
    pub struct PlasmaFrame {
        pub intensity,
        pub r_lum,
        pub xc,
    }
}

pub type WallPlasmaMulti = MultiFrame<WallPlasmaShared, WallPlasmaFrame>;
pub type WallMulti = MultiFrame<WallShared, WallFrame>;
pub type PlasmaMulti = MultiFrame<PlasmaShared, PlasmaFrame>;


/// Blurred profile of the labelled wall at lateral offsets `x_psf` from the vessel center.
pub fn f_wall(x_psf: ArrayView1<f64>, s_xy: f64, l: f64, r_wall: f64, a1: f64, n_phi: usize) -> Array1<f64> {
    let phi = Array1::linspace(-PI, PI, n_phi);
    let dphi = step(-PI, PI, n_phi);
    let i0 = bessel_i0(a1);

    x_psf.mapv(|x| {
        let integrand: Vec<f64> = phi
            .iter()
            .map(|&phi| {
                let rho = (a1 * phi.cos()).exp() / i0;
                r_wall * rho * gaussian(r_wall * phi.cos() - x, s_xy) * laplace(r_wall * phi.sin(), l)
            })
            .collect();
        trapz(&integrand, dphi)
    })
}

/// Blurred profile of a plasma-filled lumen at lateral offsets `x_psf` from the vessel center.
pub fn f_lumen(x_psf: ArrayView1<f64>, s_xy: f64, l: f64, r_lum: f64, n_r: usize) -> Array1<f64> {
    let r = Array1::linspace(-r_lum, r_lum, n_r);
    let dr = step(-r_lum, r_lum, n_r);

    x_psf.mapv(|x| {
        let integrand: Vec<f64> = r
            .iter()
            .map(|&r| {
                let chord = (r_lum * r_lum - r * r).max(0.0).sqrt();
                gaussian(r - x, s_xy) * (1.0 - (-chord / l).exp())
            })
            .collect();
        trapz(&integrand, dr)
    })
}

/// Blurred profile of plasma penetrating the glycocalyx between `r_lum` and `r_wall`.
pub fn f_gcx(
    x_psf: ArrayView1<f64>,
    s_xy: f64,
    l: f64,
    r_lum: f64,
    r_wall: f64,
    s_gcx: f64,
    n_phi: usize,
) -> Array1<f64> {
    let phi = Array1::linspace(0.0, PI, n_phi);
    let dphi = step(0.0, PI, n_phi);
    let s2 = s_xy * s_xy;

    // radial integral of the blurred, exponentially decaying layer up to radius r
    let radial = |x: f64, a: f64, b: f64, r: f64| {
        (-a * a * r * r + 2.0 * b * a * r - x * x / s2 / 2.0 + r_lum / s_gcx).exp()
            * (1.0 + PI.sqrt() * b * erfcx(a * r - b))
            / 2.0
            / (a * a)
    };

    x_psf.mapv(|x| {
        let integrand: Vec<f64> = phi
            .iter()
            .map(|&phi| {
                let a = (phi.cos().powi(2) / s2 / 2.0).sqrt();
                let b = (x * phi.cos() / s2 - phi.sin().abs() / l - 1.0 / s_gcx) / 2.0 / a;
                radial(x, a, b, r_lum) - radial(x, a, b, r_wall)
            })
            .collect();
        trapz(&integrand, dphi) / (2.0 * PI * s2).sqrt() / l
    })
}

pub fn f_plasma(
    x_psf: ArrayView1<f64>,
    s_xy: f64,
    l: f64,
    r_lum: f64,
    r_wall: f64,
    s_gcx: f64,
    grid: &VesselGrid,
) -> Array1<f64> {
    f_lumen(x_psf, s_xy, l, r_lum, grid.n_r) + f_gcx(x_psf, s_xy, l, r_lum, r_wall, s_gcx, grid.n_phi)
}

/// Plasma line-scan with glycocalyx.
pub fn l_plasma(x: ArrayView1<f64>, p: &PlasmaParams, grid: &VesselGrid) -> Array1<f64> {
    let x_psf = &x - p.xc;
    f_plasma(x_psf.view(), p.s_xy, p.l, p.r_lum, p.r_wall, p.s_gcx, grid) * (p.intensity - p.b) + p.b
}

/// Plasma line-scan without glycocalyx.
pub fn l_plasma_no_glx(x: ArrayView1<f64>, p: &PlasmaNoGlxParams, n_r: usize) -> Array1<f64> {
    let x_psf = &x - p.xc;
    f_lumen(x_psf.view(), p.s_xy, p.l, p.r_lum, n_r) * (p.intensity - p.b) + p.b
}

/// Wall line-scan: labelled wall, plasma background inside and tissue background outside.
pub fn l_wall(x: ArrayView1<f64>, p: &WallParams, grid: &VesselGrid) -> Array1<f64> {
    let x_psf = &x - p.xc;
    f_wall(x_psf.view(), p.s_xy, p.l, p.r_wall, p.a1, grid.n_phi) * p.intensity
        + f_lumen(x_psf.view(), p.s_xy, p.l, p.r_wall, grid.n_r) * (p.b_plasma - p.b_tissue)
        + p.b_tissue
}

/// Wall (first row) and plasma (second row) line-scans of the same vessel.
pub fn l_wall_plasma(x: ArrayView1<f64>, p: &WallPlasmaParams, grid: &VesselGrid) -> Array2<f64> {
    let wall = l_wall(
        x,
        &WallParams {
            xc: p.xc,
            s_xy: p.s_xy,
            l: p.l,
            r_wall: p.r_wall,
            a1: p.a1,
            intensity: p.i_wall,
            b_plasma: p.b_plasma,
            b_tissue: p.b_tissue_wall,
        },
        grid,
    );
    let plasma = l_plasma(
        x,
        &PlasmaParams {
            xc: p.xc,
            s_xy: p.s_xy,
            l: p.l,
            r_lum: p.r_lum,
            r_wall: p.r_wall,
            s_gcx: p.s_gcx,
            intensity: p.i_plasma,
            b: p.b_tissue_plasma,
        },
        grid,
    );
    stack_rows(&[wall, plasma], x.len())
}

/// Consecutive pairs of wall and plasma line-scans, shape `(frames, 2, x)`.
pub fn l_multi(x: ArrayView1<f64>, p: &WallPlasmaMulti, grid: &VesselGrid) -> Array3<f64> {
    let shared = &p.shared;
    let mut scans = Array3::zeros((p.frames.len(), 2, x.len()));
    for (frame, mut out) in p.frames.iter().zip(scans.outer_iter_mut()) {
        let params = WallPlasmaParams {
            xc: frame.xc,
            s_xy: shared.s_xy,
            l: shared.l,
            r_lum: frame.r_wall - shared.dr,
            r_wall: frame.r_wall,
            s_gcx: shared.s_gcx,
            a1: frame.a1,
            i_wall: frame.i_wall,
            i_plasma: frame.i_plasma,
            b_plasma: shared.b_plasma,
            b_tissue_wall: shared.b_tissue_wall,
            b_tissue_plasma: shared.b_tissue_plasma,
        };
        out.assign(&l_wall_plasma(x, &params, grid));
    }
    scans
}

/// Consecutive wall line-scans, shape `(frames, x)`.
pub fn l_multi_wall(x: ArrayView1<f64>, p: &WallMulti, grid: &VesselGrid) -> Array2<f64> {
    let shared = &p.shared;
    let scans = p
        .frames
        .iter()
        .map(|frame| {
            let params = WallParams {
                xc: frame.xc,
                s_xy: shared.s_xy,
                l: shared.l,
                r_wall: frame.r_wall,
                a1: frame.a1,
                intensity: frame.intensity,
                b_plasma: shared.b_plasma,
                b_tissue: shared.b_tissue,
            };
            l_wall(x, &params, grid)
        })
        .collect::<Vec<_>>();
    stack_rows(&scans, x.len())
}

/// Consecutive plasma line-scans without glycocalyx, shape `(frames, x)`.
pub fn l_multi_plasma(x: ArrayView1<f64>, p: &PlasmaMulti, n_r: usize) -> Array2<f64> {
    let shared = &p.shared;
    let scans = p
        .frames
        .iter()
        .map(|frame| {
            let params = PlasmaNoGlxParams {
                xc: frame.xc,
                s_xy: shared.s_xy,
                l: shared.l,
                r_lum: frame.r_lum,
                intensity: frame.intensity,
                b: shared.b,
            };
            l_plasma_no_glx(x, &params, n_r)
        })
        .collect::<Vec<_>>();
    stack_rows(&scans, x.len())
}


fn step(start: f64, stop: f64, n: usize) -> f64 {
    if n > 1 {
        (stop - start) / (n - 1) as f64
    } else {
        0.0
    }
}

fn stack_rows(rows: &[Array1<f64>], len: usize) -> Array2<f64> {
    let mut stacked = Array2::zeros((rows.len(), len));
    for (row, mut out) in rows.iter().zip(stacked.outer_iter_mut()) {
        out.assign(row);
    }
    stacked
}
