use super::CONFIG_MIN_TOL;
use crate::StrError;
use russell_sparse::{Genie, LinSolParams};
use std::fmt;

/// Defines the line search strategy of the Newton method
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSearch {
    /// Full Newton step (no line search)
    Basic,

    /// Halves the step until the residual norm decreases
    Backtracking,
}

/// Holds configuration parameters of the nonlinear and linear solvers
pub struct Config {
    /// Line search strategy
    pub line_search: LineSearch,

    /// Absolute tolerance for the Euclidean norm of the residual vector
    pub tol_rr_abs: f64,

    /// Relative tolerance for the Euclidean norm of the residual vector (relative to the first iteration)
    pub tol_rr_rel: f64,

    /// Maximum number of Newton iterations
    pub n_max_iterations: usize,

    /// Maximum number of step halvings of the backtracking line search
    pub n_max_backtracking: usize,

    /// Linear solver kind (direct solvers only)
    pub lin_sol_genie: Genie,

    /// Parameters of the linear solver
    pub lin_sol_params: LinSolParams,

    /// Number of integration points per cell (None means the default of the cell kind)
    pub ngauss: Option<usize>,

    /// Shows load steps
    pub verbose_steps: bool,

    /// Shows Newton iterations
    pub verbose_iterations: bool,

    /// Shows the messages of the linear solver
    pub verbose_lin_sys_solve: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        Config {
            line_search: LineSearch::Basic,
            tol_rr_abs: 1e-12,
            tol_rr_rel: 1e-9,
            n_max_iterations: 12,
            n_max_backtracking: 8,
            lin_sol_genie: Genie::Umfpack,
            lin_sol_params: LinSolParams::new(),
            ngauss: Some(1),
            verbose_steps: true,
            verbose_iterations: true,
            verbose_lin_sys_solve: false,
        }
    }

    /// Sets the line search strategy
    pub fn set_line_search(&mut self, line_search: LineSearch) -> &mut Self {
        self.line_search = line_search;
        self
    }

    /// Sets the absolute and relative tolerances of the residual norm
    pub fn set_tolerances(&mut self, tol_rr_abs: f64, tol_rr_rel: f64) -> &mut Self {
        self.tol_rr_abs = tol_rr_abs;
        self.tol_rr_rel = tol_rr_rel;
        self
    }

    /// Sets the maximum number of Newton iterations
    pub fn set_n_max_iterations(&mut self, value: usize) -> &mut Self {
        self.n_max_iterations = value;
        self
    }

    /// Sets the maximum number of step halvings of the backtracking line search
    ///
    /// Zero means that only the full step is tried.
    pub fn set_n_max_backtracking(&mut self, value: usize) -> &mut Self {
        self.n_max_backtracking = value;
        self
    }

    /// Sets the linear solver
    pub fn set_lin_sol_genie(&mut self, genie: Genie) -> &mut Self {
        self.lin_sol_genie = genie;
        self
    }

    /// Sets the number of integration points per cell
    pub fn set_ngauss(&mut self, ngauss: Option<usize>) -> &mut Self {
        self.ngauss = ngauss;
        self
    }

    /// Enables or disables all messages (except those of the linear solver)
    pub fn set_verbose(&mut self, steps: bool, iterations: bool) -> &mut Self {
        self.verbose_steps = steps;
        self.verbose_iterations = iterations;
        self
    }

    /// Sets an option given as a key-value pair
    ///
    /// The keys follow the usual names of nonlinear solver options:
    ///
    /// * `snes_type` -- only `newtonls`
    /// * `snes_linesearch_type` -- `basic` or `bt`
    /// * `snes_atol`, `snes_rtol` -- tolerances of the residual norm
    /// * `snes_max_it` -- maximum number of iterations
    /// * `snes_linesearch_max_it` -- maximum number of step halvings
    /// * `ksp_type` -- only `preonly`
    /// * `pc_type` -- only `lu`
    /// * `pc_factor_mat_solver_type` -- `umfpack`, `mumps`, or `klu`
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<&mut Self, StrError> {
        match key {
            "snes_type" => {
                if value != "newtonls" {
                    return Err("only the newtonls nonlinear solver is available");
                }
            }
            "snes_linesearch_type" => {
                self.line_search = match value {
                    "basic" => LineSearch::Basic,
                    "bt" => LineSearch::Backtracking,
                    _ => return Err("line search type must be basic or bt"),
                }
            }
            "snes_atol" => self.tol_rr_abs = value.parse().map_err(|_| "cannot parse tolerance")?,
            "snes_rtol" => self.tol_rr_rel = value.parse().map_err(|_| "cannot parse tolerance")?,
            "snes_max_it" => {
                self.n_max_iterations = value.parse().map_err(|_| "cannot parse number of iterations")?
            }
            "snes_linesearch_max_it" => {
                self.n_max_backtracking = value.parse().map_err(|_| "cannot parse number of iterations")?
            }
            "ksp_type" => {
                if value != "preonly" {
                    return Err("only the preonly linear method is available");
                }
            }
            "pc_type" => {
                if value != "lu" {
                    return Err("only the lu preconditioner is available");
                }
            }
            "pc_factor_mat_solver_type" => {
                self.lin_sol_genie = match value {
                    "umfpack" => Genie::Umfpack,
                    "mumps" => Genie::Mumps,
                    "klu" => Genie::Klu,
                    _ => return Err("linear solver must be umfpack, mumps, or klu"),
                }
            }
            _ => return Err("option is not available"),
        }
        Ok(self)
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.tol_rr_abs < CONFIG_MIN_TOL {
            return Some(format!(
                "tol_rr_abs = {:?} is incorrect; it must be ≥ {:e}",
                self.tol_rr_abs, CONFIG_MIN_TOL
            ));
        }
        if self.tol_rr_rel < CONFIG_MIN_TOL {
            return Some(format!(
                "tol_rr_rel = {:?} is incorrect; it must be ≥ {:e}",
                self.tol_rr_rel, CONFIG_MIN_TOL
            ));
        }
        if self.n_max_iterations < 1 {
            return Some(format!(
                "n_max_iterations = {:?} is incorrect; it must be ≥ 1",
                self.n_max_iterations
            ));
        }
        if let Some(n) = self.ngauss {
            if n < 1 {
                return Some(format!("ngauss = {:?} is incorrect; it must be ≥ 1", n));
            }
        }
        None // all good
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Solver options\n")?;
        write!(f, "==============\n")?;
        write!(f, "line_search = {:?}\n", self.line_search)?;
        write!(f, "tol_rr_abs = {:?}\n", self.tol_rr_abs)?;
        write!(f, "tol_rr_rel = {:?}\n", self.tol_rr_rel)?;
        write!(f, "n_max_iterations = {:?}\n", self.n_max_iterations)?;
        write!(f, "n_max_backtracking = {:?}\n", self.n_max_backtracking)?;
        write!(f, "lin_sol_genie = {:?}\n", self.lin_sol_genie)?;
        write!(f, "ngauss = {:?}\n", self.ngauss)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
