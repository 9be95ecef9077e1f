//! Implements the finite element machinery: spaces, fields, assembly, and the nonlinear solver

mod assembly;
mod control_convergence;
mod dist_vector;
mod essential;
mod fem_space;
mod field;
mod file_io;
mod linear_system;
mod load_step_driver;
mod mesh_tags;
mod post_processing;
mod solver_newton;
mod state_transfer;
pub use crate::fem::assembly::*;
pub use crate::fem::control_convergence::*;
pub use crate::fem::dist_vector::*;
pub use crate::fem::essential::*;
pub use crate::fem::fem_space::*;
pub use crate::fem::field::*;
pub use crate::fem::file_io::*;
pub use crate::fem::linear_system::*;
pub use crate::fem::load_step_driver::*;
pub use crate::fem::mesh_tags::*;
pub use crate::fem::post_processing::*;
pub use crate::fem::solver_newton::*;
pub use crate::fem::state_transfer::*;
