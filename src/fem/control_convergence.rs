use crate::base::Config;
use russell_lab::{vec_norm, Norm, Vector};

/// Controls the convergence of the Newton iterations
///
/// The criteria use the Euclidean norm of the residual vector R:
///
/// 1. absolute: `‖R‖ < tol_rr_abs`
/// 2. relative: `‖R‖ < tol_rr_rel · ‖R₀‖` (from the second iteration on)
pub struct ControlConvergence<'a> {
    config: &'a Config,
    iteration: usize,
    norm_rr0: f64,
    norm_rr_prev: f64,
    norm_rr: f64,
    alpha: f64,
    found_nan: bool,
    converged_abs: bool,
    converged_rel: bool,
    diverging: bool,
}

impl<'a> ControlConvergence<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config) -> Self {
        ControlConvergence {
            config,
            iteration: 0,
            norm_rr0: 0.0,
            norm_rr_prev: 0.0,
            norm_rr: 0.0,
            alpha: 1.0,
            found_nan: false,
            converged_abs: false,
            converged_rel: false,
            diverging: false,
        }
    }

    /// Records the line search step length of the last update
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    /// Returns the current norm of R
    pub fn norm_rr(&self) -> f64 {
        self.norm_rr
    }

    /// Returns true if the norm of R is NaN or Inf
    pub fn found_nan(&self) -> bool {
        self.found_nan
    }

    /// Returns true if the absolute criterion is satisfied
    pub fn converged_abs(&self) -> bool {
        self.converged_abs
    }

    /// Returns true if the relative criterion is satisfied
    pub fn converged_rel(&self) -> bool {
        self.converged_rel
    }

    /// Analyzes the residual vector at a given iteration
    pub fn analyze_rr(&mut self, iteration: usize, rr: &Vector) {
        self.iteration = iteration;
        self.norm_rr = vec_norm(rr, Norm::Euc);
        self.found_nan = !self.norm_rr.is_finite();
        if iteration == 0 {
            self.norm_rr0 = self.norm_rr;
            self.alpha = 1.0;
        }
        if self.found_nan {
            self.converged_abs = false;
            self.converged_rel = false;
            self.diverging = false;
        } else {
            self.converged_abs = self.norm_rr < self.config.tol_rr_abs;
            self.converged_rel = iteration > 0 && self.norm_rr < self.config.tol_rr_rel * self.norm_rr0;
            self.diverging = iteration > 0 && self.norm_rr > self.norm_rr_prev;
        }
        self.norm_rr_prev = self.norm_rr;
    }

    /// Prints the header of the convergence table
    pub fn print_header(&self) {
        if self.config.verbose_steps || self.config.verbose_iterations {
            println!("\nPLASTSIM === LOAD STEPPING AND CONVERGENCE STATISTICS ===========================");
            println!("\nLegend:");
            println!("✅ ─ converged");
            println!("🔹 ─ converging");
            println!("🎈 ─ diverging");
            println!("😱 ─ found NaN or Inf");
            println!("\"iter\" means iteration\n");
            println!("{}", "─".repeat(79));
            println!("{:>5} {:>9} {:>11}", "iter", "α", "‖R‖₂");
            println!("{}", "─".repeat(79));
        }
    }

    /// Prints the load step information
    pub fn print_step(&self, step: usize, factor: f64) {
        if self.config.verbose_steps {
            println!("+++ Processing load factor μ = {:5.4} (step {})", factor, step);
        }
    }

    /// Prints the iteration information
    pub fn print_iteration(&self) {
        if self.config.verbose_iterations {
            let icon = if self.found_nan {
                "😱"
            } else if self.converged_abs || self.converged_rel {
                "✅"
            } else if self.diverging {
                "🎈"
            } else {
                "🔹"
            };
            if self.iteration == 0 {
                println!("{:>5} {:>9} {:>11.2e} {}", self.iteration, "·", self.norm_rr, icon);
            } else {
                println!(
                    "{:>5} {:>9.2e} {:>11.2e} {}",
                    self.iteration, self.alpha, self.norm_rr, icon
                );
            }
        }
    }

    /// Prints the horizontal line at the end of the analysis
    pub fn print_footer(&self) {
        if self.config.verbose_steps || self.config.verbose_iterations {
            println!("{}", "─".repeat(79));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
