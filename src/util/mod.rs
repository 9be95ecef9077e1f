//! Contains some utility functions for reporting

mod plot_stress_strain;
pub use plot_stress_strain::*;
