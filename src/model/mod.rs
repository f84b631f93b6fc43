// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

pub use self::pmt::{Acquisition, Quadrature};

pub mod bistable;
pub mod intensity;
pub mod pmt;
pub mod special;
