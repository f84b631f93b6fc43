// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Super-localization of fluorescent targets (quantum dots, red blood cells, blood vessel
//! walls and plasma) in two-photon microscopy, by maximum-likelihood fits that use the full
//! noise statistics of photon-counting PMTs.

#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod errors;
pub mod logging;
pub mod model;
pub mod simulation;
pub mod track;

pub use crate::errors::{Error, Result};
