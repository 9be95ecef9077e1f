use crate::base::Config;
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::{LinSolver, SparseMatrix, Sym};

/// Holds variables to solve the global (monolithic) linear system
pub struct LinearSystem<'a> {
    /// Total number of global equations (owned DOFs of all unknown fields)
    pub n_equation: usize,

    /// Holds the supremum of the number of nonzero values (nnz) in the global matrix
    ///
    /// **Notes:**
    ///
    /// 1. The local block matrices add only to parts of the global matrix
    /// 2. Shared DOFs make the exact nnz (much) smaller than nrow × ncol
    /// 3. The supremum is the sum of the sizes of all local block matrices plus one
    ///    diagonal entry per equation (used by the prescribed equations)
    pub nnz_sup: usize,

    /// Holds the residual vector R
    pub rr: Vector,

    /// Holds the global Jacobian matrix K
    pub kk: SparseMatrix,

    /// Holds the linear solver
    pub solver: LinSolver<'a>,

    /// Holds the "minus-delta-U" vector (the solution of the linear system)
    pub mdu: Vector,
}

impl<'a> LinearSystem<'a> {
    /// Allocates a new instance
    ///
    /// The coupled Jacobian is not symmetric in general, thus the full matrix is stored.
    pub fn new(config: &Config, n_equation: usize, nnz_sup: usize) -> Result<Self, StrError> {
        Ok(LinearSystem {
            n_equation,
            nnz_sup,
            rr: Vector::new(n_equation),
            kk: SparseMatrix::new_coo(n_equation, n_equation, nnz_sup, Sym::No)?,
            solver: LinSolver::new(config.lin_sol_genie)?,
            mdu: Vector::new(n_equation),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
