// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Expected fluorescence distributions on images and line-scans, in photon counts.
//!
//! Each model has a parameter struct that converts from and to the flat parameter
//! vectors an optimizer works on.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub use crate::model::special::{gaussian, laplace};

/// Flat parameter vector representation of a model's parameters.
pub trait Parameters: Sized {
    /// Number of parameters.
    const LEN: usize;

    fn from_slice(p: &[f64]) -> Result<Self>;

    fn to_vec(&self) -> Vec<f64>;
}

fn check_len(p: &[f64], expected: usize) -> Result<()> {
    if p.len() != expected {
        return Err(Error::ParameterCount {
            expected,
            found: p.len(),
        });
    }
    Ok(())
}

macro_rules! parameters {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($(#[$field_meta:meta])* pub $field:ident,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $($(#[$field_meta])* pub $field: f64,)+
        }

        impl $crate::model::intensity::Parameters for $name {
            const LEN: usize = [$(stringify!($field)),+].len();

            fn from_slice(p: &[f64]) -> $crate::errors::Result<Self> {
                $crate::model::intensity::check_len(p, Self::LEN)?;
                let mut i = 0;
                let mut next = || {
                    i += 1;
                    p[i - 1]
                };
                Ok($name {
                    $($field: next(),)+
                })
            }

            fn to_vec(&self) -> Vec<f64> {
                vec![$(self.$field),+]
            }
        }
    };
}

pub mod qd;
pub mod rbc;
pub mod vessel;


/// Parameters of a fit over several consecutive frames: a block of parameters shared by all
/// frames, followed by per-frame parameters.
///
/// In the flat layout, the per-frame parameters are grouped by field: first the first field
/// of every frame, then the second field of every frame and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFrame<S, F> {
    pub shared: S,
    pub frames: Vec<F>,
}

impl<S: Parameters, F: Parameters> MultiFrame<S, F> {
    pub fn new(shared: S, frames: Vec<F>) -> Self {
        MultiFrame { shared, frames }
    }

    /// Number of flat parameters for `n_frames` frames.
    pub fn len(n_frames: usize) -> usize {
        S::LEN + F::LEN * n_frames
    }

    pub fn from_slice(p: &[f64]) -> Result<Self> {
        if p.len() < S::LEN || (p.len() - S::LEN) % F::LEN != 0 {
            let n_frames = p.len().saturating_sub(S::LEN) / F::LEN;
            return Err(Error::ParameterCount {
                expected: Self::len(n_frames.max(1)),
                found: p.len(),
            });
        }
        let shared = S::from_slice(&p[..S::LEN])?;
        let per_frame = &p[S::LEN..];
        let n_frames = per_frame.len() / F::LEN;

        let mut frames = Vec::with_capacity(n_frames);
        let mut frame = vec![0.0; F::LEN];
        for k in 0..n_frames {
            for (j, value) in frame.iter_mut().enumerate() {
                *value = per_frame[j * n_frames + k];
            }
            frames.push(F::from_slice(&frame)?);
        }
        Ok(MultiFrame { shared, frames })
    }

    pub fn to_vec(&self) -> Vec<f64> {
        let n_frames = self.frames.len();
        let mut p = self.shared.to_vec();
        p.resize(Self::len(n_frames), 0.0);
        for (k, frame) in self.frames.iter().enumerate() {
            for (j, value) in frame.to_vec().into_iter().enumerate() {
                p[S::LEN + j * n_frames + k] = value;
            }
        }
        p
    }
}
