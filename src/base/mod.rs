//! Implements the base structures for the simulation: options, parameters, and sample geometries

mod config;
mod constants;
mod param_j2;
mod samples;
pub use crate::base::config::*;
pub use crate::base::constants::*;
pub use crate::base::param_j2::*;
pub use crate::base::samples::*;
