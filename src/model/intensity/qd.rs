// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Quantum dots.

use std::f64::consts::PI;

use ndarray::prelude::*;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

parameters! {
    /// Blurred quantum dot on a constant background.
    pub struct QdParams {
        /// Background.
        pub b,
        /// Total photon count of the dot.
        pub amplitude,
        pub xo,
        pub yo,
        /// Standard deviation along the first principal axis.
        pub sx,
        /// Standard deviation along the second principal axis.
        pub sy,
        /// Rotation of the principal axes.
        pub theta,
    }
}


/// Column (`x`) and row (`y`) coordinates of every pixel of an image with the given shape.
pub fn pixel_grid(shape: (usize, usize)) -> (Array2<f64>, Array2<f64>) {
    let x = Array2::from_shape_fn(shape, |(_, j)| j as f64);
    let y = Array2::from_shape_fn(shape, |(i, _)| i as f64);
    (x, y)
}

/// Rotationally asymmetric 2D Gaussian on a background, evaluated at the points `(x, y)`.
pub fn qd_blurred<D: Dimension>(
    x: ArrayView<f64, D>,
    y: ArrayView<f64, D>,
    p: &QdParams,
) -> Array<f64, D> {
    let (b, amplitude) = (p.b.abs(), p.amplitude.abs());
    let (sx2, sy2) = (p.sx * p.sx, p.sy * p.sy);
    let (sin, cos) = p.theta.sin_cos();

    // inverse covariance
    let q11 = cos * cos / sx2 + sin * sin / sy2;
    let q22 = sin * sin / sx2 + cos * cos / sy2;
    let q12 = 0.5 * ((2.0 * p.theta).sin() / sx2 - (2.0 * p.theta).sin() / sy2);
    let det = q11 * q22 - q12 * q12;

    let norm = 0.5 * amplitude * det.sqrt() / PI;

    Zip::from(&x).and(&y).map_collect(|&x, &y| {
        let (dx, dy) = (x - p.xo, y - p.yo);
        b + norm * (-0.5 * (q11 * dx * dx + 2.0 * q12 * dx * dy + q22 * dy * dy)).exp()
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QdParams {
        QdParams {
            b: 1.0,
            amplitude: 50.0,
            xo: 10.3,
            yo: 9.6,
            sx: 1.5,
            sy: 2.5,
            theta: 0.4,
        }
    }

    #[test]
    fn test_total_intensity() {
        let (x, y) = pixel_grid((40, 40));
        let p = params();
        let image = qd_blurred(x.view(), y.view(), &p);
        let above_background = image.sum() - p.b * image.len() as f64;
        assert_relative_eq!(above_background, p.amplitude, max_relative = 1e-3);
    }

    #[test]
    fn test_peak_at_center() {
        let p = QdParams {
            xo: 12.0,
            yo: 7.0,
            ..params()
        };
        let (x, y) = pixel_grid((20, 25));
        let image = qd_blurred(x.view(), y.view(), &p);
        let (argmax, _) = image
            .indexed_iter()
            .fold(((0, 0), 0.0), |best, (idx, &v)| if v > best.1 { (idx, v) } else { best });
        assert_eq!(argmax, (7, 12));
    }

    #[test]
    fn test_isotropic() {
        let p = QdParams {
            sx: 2.0,
            sy: 2.0,
            theta: 1.1,
            ..params()
        };
        let x = array![p.xo + 1.0, p.xo];
        let y = array![p.yo, p.yo - 1.0];
        let values = qd_blurred(x.view(), y.view(), &p);
        assert_relative_eq!(values[0], values[1], max_relative = 1e-12);
    }

    #[test]
    fn test_signs_ignored() {
        let (x, y) = pixel_grid((5, 5));
        let p = params();
        let flipped = QdParams {
            b: -p.b,
            amplitude: -p.amplitude,
            sx: -p.sx,
            ..p
        };
        assert_eq!(
            qd_blurred(x.view(), y.view(), &p),
            qd_blurred(x.view(), y.view(), &flipped)
        );
    }
}
