//! Implements the J2 plasticity model as a symbolic weak form

mod j2_model;
pub use crate::material::j2_model::*;
