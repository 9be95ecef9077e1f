//! Plastsim - monolithic J2 plasticity simulator
//!
//! The weak form of the coupled problem (displacement, plastic strain, isotropic and
//! kinematic hardening) is written once as a symbolic expression, split into blocks
//! per field, and solved with a Newton method over a prescribed loading history.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod expr;
pub mod fem;
pub mod material;
pub mod prelude;
pub mod util;
