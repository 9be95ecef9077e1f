use super::{buffer_to_fields, fields_to_buffer, Assembler, BcSet, BlockVector, BufferLayout, ControlConvergence};
use super::{DistVector, FemSpace, FieldId, FieldSet, LinearSystem};
use crate::base::{Config, LineSearch};
use crate::expr::{derivative, extract_blocks, extract_forms, ExprArena, Form};
use crate::StrError;
use russell_lab::{vec_norm, Norm, Vector};

/// Defines the reason for stopping the nonlinear iterations
///
/// Positive codes indicate convergence; negative codes indicate divergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergedReason {
    /// ‖R‖ < tol_rr_abs
    FnormAbs,

    /// ‖R‖ < tol_rr_rel · ‖R₀‖
    FnormRelative,

    /// ‖R‖ is NaN or Inf
    FnormNan,

    /// The maximum number of iterations has been reached
    MaxIt,

    /// The line search could not decrease ‖R‖
    LineSearch,
}

impl ConvergedReason {
    /// Returns the numeric code
    pub fn code(&self) -> i32 {
        match self {
            ConvergedReason::FnormAbs => 2,
            ConvergedReason::FnormRelative => 3,
            ConvergedReason::FnormNan => -4,
            ConvergedReason::MaxIt => -5,
            ConvergedReason::LineSearch => -6,
        }
    }

    /// Returns true if the iterations converged
    pub fn converged(&self) -> bool {
        self.code() > 0
    }
}

/// Defines the state of the solver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Assembled,
    Iterating,
    Converged,
    Diverged,
}

/// Holds the block decomposition of a coupled residual form
pub struct BlockProblem {
    /// The unknown fields (ordered as the blocks)
    pub unknowns: Vec<FieldId>,

    /// The residual forms, one per unknown
    pub residual: Vec<Form>,

    /// The tangent blocks indexed by (test, trial)
    pub jacobian: Vec<Vec<Form>>,
}

impl BlockProblem {
    /// Splits a coupled residual form into blocks
    ///
    /// The Jacobian is the Gateaux derivative of the form w.r.t. the coefficients of the
    /// unknowns in the direction of their trial functions.
    pub fn new(arena: &mut ExprArena, fields: &FieldSet, form: &Form, unknowns: &[FieldId]) -> Result<Self, StrError> {
        if unknowns.is_empty() {
            return Err("there must be at least one unknown field");
        }
        let coefficients: Vec<_> = unknowns.iter().map(|id| fields.coefficient(arena, *id)).collect();
        let tests: Vec<_> = unknowns.iter().map(|id| fields.test(arena, *id)).collect();
        let trials: Vec<_> = unknowns.iter().map(|id| fields.trial(arena, *id)).collect();
        let residual = extract_forms(arena, form, &tests)?;
        let jac = derivative(arena, form.integrand, &coefficients, &trials)?;
        let jac_form = Form {
            integrand: jac,
            measure: form.measure,
        };
        let jacobian = extract_blocks(arena, &jac_form, &tests, &trials)?;
        Ok(BlockProblem {
            unknowns: unknowns.to_vec(),
            residual,
            jacobian,
        })
    }
}

/// Implements the monolithic Newton solver with line search
pub struct SolverNewton<'a> {
    config: &'a Config,
    assembler: Assembler<'a>,
    problem: BlockProblem,
    offsets: Vec<usize>,
    prescribed: Vec<bool>,
    prescribed_values: Vec<(usize, f64)>,
    buffer: BlockVector,
    u_old: Vector,
    linear_system: LinearSystem<'a>,
    control: ControlConvergence<'a>,
    status: SolverStatus,
    n_iterations: usize,
}

impl<'a> SolverNewton<'a> {
    /// Allocates a new instance
    pub fn new(
        config: &'a Config,
        arena: &'a ExprArena,
        fem: &'a FemSpace<'a>,
        fields: &FieldSet,
        problem: BlockProblem,
    ) -> Result<Self, StrError> {
        if let Some(msg) = config.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate solver because config.validate() failed");
        }
        let assembler = Assembler::new(arena, fem);
        let buffer = BlockVector::from_fields(fields, &problem.unknowns, BufferLayout::Flat)?;
        let mut offsets = Vec::with_capacity(problem.unknowns.len());
        let mut neq = 0;
        for id in &problem.unknowns {
            offsets.push(neq);
            neq += fields.get(*id).dim();
        }
        let nnz_sup = assembler.nnz_sup(fields, &problem.jacobian, &problem.unknowns, neq);
        let linear_system = LinearSystem::new(config, neq, nnz_sup)?;
        Ok(SolverNewton {
            config,
            assembler,
            problem,
            offsets,
            prescribed: vec![false; neq],
            prescribed_values: Vec::new(),
            buffer,
            u_old: Vector::new(neq),
            linear_system,
            control: ControlConvergence::new(config),
            status: SolverStatus::Assembled,
            n_iterations: 0,
        })
    }

    /// Returns the status
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// Returns the number of iterations of the last call to solve
    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    /// Returns access to the convergence control (e.g., to print the table header)
    pub fn control(&self) -> &ControlConvergence<'a> {
        &self.control
    }

    /// Replaces the boundary conditions
    pub fn set_bcs(&mut self, bcs: &BcSet) -> Result<(), StrError> {
        self.prescribed.fill(false);
        self.prescribed_values.clear();
        for bc in &bcs.all {
            let k = match self.problem.unknowns.iter().position(|id| *id == bc.field) {
                Some(k) => k,
                None => return Err("boundary condition field is not an unknown"),
            };
            if bc.dofs.len() != bc.values.len() {
                return Err("boundary condition must have one value per DOF");
            }
            let n = self.end_of(k) - self.offsets[k];
            for (dof, value) in bc.dofs.iter().zip(&bc.values) {
                if *dof >= n {
                    return Err("boundary condition DOF is out of bounds");
                }
                self.prescribed[self.offsets[k] + dof] = true;
                self.prescribed_values.push((self.offsets[k] + dof, *value));
            }
        }
        Ok(())
    }

    fn end_of(&self, k: usize) -> usize {
        if k + 1 < self.offsets.len() {
            self.offsets[k + 1]
        } else {
            self.prescribed.len()
        }
    }

    /// Runs the Newton iterations and updates the unknown fields
    ///
    /// The status becomes [SolverStatus::Diverged] if an error interrupts the iterations.
    pub fn solve(&mut self, fields: &mut FieldSet) -> Result<ConvergedReason, StrError> {
        self.status = SolverStatus::Iterating;
        match self.iterate(fields) {
            Ok(reason) => Ok(self.finish(reason)),
            Err(e) => {
                self.status = SolverStatus::Diverged;
                Err(e)
            }
        }
    }

    fn iterate(&mut self, fields: &mut FieldSet) -> Result<ConvergedReason, StrError> {
        let unknowns = &self.problem.unknowns;

        // apply the prescribed values
        fields_to_buffer(fields, unknowns, &mut self.buffer)?;
        let u = flat(&mut self.buffer)?;
        for (eq, value) in &self.prescribed_values {
            u.owned_mut()[*eq] = *value;
        }
        u.sync();
        buffer_to_fields(&self.buffer, fields, unknowns)?;

        let n_max = self.config.n_max_iterations;
        for iteration in 0..=n_max {
            self.n_iterations = iteration;
            let lin = &mut self.linear_system;

            // residual vector
            self.assembler.residual(
                fields,
                &self.problem.residual,
                unknowns,
                &self.offsets,
                &self.prescribed,
                &mut lin.rr,
            )?;

            // check convergence
            self.control.analyze_rr(iteration, &lin.rr);
            self.control.print_iteration();
            if self.control.found_nan() {
                return Ok(ConvergedReason::FnormNan);
            }
            if self.control.converged_abs() {
                return Ok(ConvergedReason::FnormAbs);
            }
            if self.control.converged_rel() {
                return Ok(ConvergedReason::FnormRelative);
            }
            if iteration == n_max {
                break;
            }

            // Jacobian matrix
            let kk = lin.kk.get_coo_mut()?;
            kk.reset();
            self.assembler.tangent(
                fields,
                &self.problem.jacobian,
                unknowns,
                &self.offsets,
                &self.prescribed,
                kk,
            )?;
            for eq in 0..self.prescribed.len() {
                if self.prescribed[eq] {
                    lin.kk.put(eq, eq, 1.0)?;
                }
            }

            // solve K·mdu = R
            lin.solver.actual.factorize(&mut lin.kk, Some(self.config.lin_sol_params))?;
            lin.solver
                .actual
                .solve(&mut lin.mdu, &lin.kk, &lin.rr, self.config.verbose_lin_sys_solve)?;

            // update the unknowns
            let u = flat(&mut self.buffer)?;
            self.u_old.as_mut_data().copy_from_slice(u.owned());
            match self.config.line_search {
                LineSearch::Basic => {
                    update(u, &self.u_old, &lin.mdu, 1.0);
                    buffer_to_fields(&self.buffer, fields, unknowns)?;
                }
                LineSearch::Backtracking => {
                    let norm_old = self.control.norm_rr();
                    let mut alpha = 1.0;
                    let mut accepted = false;
                    for _ in 0..=self.config.n_max_backtracking {
                        let u = flat(&mut self.buffer)?;
                        update(u, &self.u_old, &lin.mdu, alpha);
                        buffer_to_fields(&self.buffer, fields, unknowns)?;
                        self.assembler.residual(
                            fields,
                            &self.problem.residual,
                            unknowns,
                            &self.offsets,
                            &self.prescribed,
                            &mut lin.rr,
                        )?;
                        let norm_new = vec_norm(&lin.rr, Norm::Euc);
                        if norm_new < norm_old || norm_new < self.config.tol_rr_abs {
                            accepted = true;
                            break;
                        }
                        alpha *= 0.5;
                    }
                    if !accepted {
                        return Ok(ConvergedReason::LineSearch);
                    }
                    self.control.set_alpha(alpha);
                }
            }
        }
        Ok(ConvergedReason::MaxIt)
    }

    fn finish(&mut self, reason: ConvergedReason) -> ConvergedReason {
        self.status = if reason.converged() {
            SolverStatus::Converged
        } else {
            SolverStatus::Diverged
        };
        reason
    }
}

/// Returns the flat vector of a buffer
fn flat(buffer: &mut BlockVector) -> Result<&mut DistVector, StrError> {
    match buffer {
        BlockVector::Flat(vector) => Ok(vector),
        BlockVector::Segmented(..) => Err("solver requires a flat buffer"),
    }
}

/// Sets u = u_old - alpha · mdu and synchronizes u
fn update(u: &mut DistVector, u_old: &Vector, mdu: &Vector, alpha: f64) {
    for (i, value) in u.owned_mut().iter_mut().enumerate() {
        *value = u_old[i] - alpha * mdu[i];
    }
    u.sync();
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{BlockProblem, ConvergedReason, SolverNewton, SolverStatus};
    use crate::base::{Config, LineSearch, SampleMeshes};
    use crate::expr::{ExprArena, Form};
    use crate::fem::{BcSet, DirichletBc, FemSpace, FieldSet, Rank, Space};
    use russell_lab::approx_eq;

    // F = δh·(h³ + h - 2), with root h = 1
    fn cubic_problem(arena: &mut ExprArena, fields: &FieldSet) -> BlockProblem {
        let h = fields.coefficient(arena, 0);
        let dh = fields.test(arena, 0);
        let hh = arena.product(h, h).unwrap();
        let hhh = arena.product(hh, h).unwrap();
        let a = arena.sum(hhh, h).unwrap();
        let two = arena.scalar(2.0);
        let b = arena.sub(a, two).unwrap();
        let integrand = arena.product(dh, b).unwrap();
        BlockProblem::new(arena, fields, &Form::new(integrand), &[0]).unwrap()
    }

    #[test]
    fn converged_reason_works() {
        assert_eq!(ConvergedReason::FnormAbs.code(), 2);
        assert_eq!(ConvergedReason::FnormRelative.code(), 3);
        assert_eq!(ConvergedReason::FnormNan.code(), -4);
        assert_eq!(ConvergedReason::MaxIt.code(), -5);
        assert_eq!(ConvergedReason::LineSearch.code(), -6);
        assert!(ConvergedReason::FnormRelative.converged());
        assert!(!ConvergedReason::MaxIt.converged());
    }

    #[test]
    fn new_captures_errors() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
        let mut arena = ExprArena::new();
        let one = arena.scalar(1.0);
        assert_eq!(
            BlockProblem::new(&mut arena, &fields, &Form::new(one), &[]).err(),
            Some("there must be at least one unknown field")
        );
        let problem = cubic_problem(&mut arena, &fields);
        let mut config = Config::new();
        config.set_n_max_iterations(0);
        assert_eq!(
            SolverNewton::new(&config, &arena, &fem, &fields, problem).err(),
            Some("cannot allocate solver because config.validate() failed")
        );
    }

    #[test]
    fn solve_works_with_both_line_searches() {
        for line_search in [LineSearch::Basic, LineSearch::Backtracking] {
            let mesh = SampleMeshes::one_tet4();
            let fem = FemSpace::new(&mesh, Some(1)).unwrap();
            let mut fields = FieldSet::new();
            let h = fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
            let mut arena = ExprArena::new();
            let problem = cubic_problem(&mut arena, &fields);
            let mut config = Config::new();
            config.set_line_search(line_search).set_verbose(false, false);
            let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();
            assert_eq!(solver.status(), SolverStatus::Assembled);
            let reason = solver.solve(&mut fields).unwrap();
            assert!(reason.converged());
            assert_eq!(solver.status(), SolverStatus::Converged);
            assert!(solver.n_iterations() > 2);
            approx_eq(fields.get(h).values.owned()[0], 1.0, 1e-8);
            approx_eq(fields.get(h).values.all()[0], 1.0, 1e-8);
        }
    }

    #[test]
    fn solve_reports_divergence() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();

        // maximum number of iterations
        let mut arena = ExprArena::new();
        let problem = cubic_problem(&mut arena, &fields);
        let mut config = Config::new();
        config.set_n_max_iterations(1).set_verbose(false, false);
        let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();
        assert_eq!(solver.solve(&mut fields).unwrap(), ConvergedReason::MaxIt);
        assert_eq!(solver.status(), SolverStatus::Diverged);

        // NaN: F = δh·sqrt(h - 1) with h = 0
        fields.get_mut(0).values.owned_mut().fill(0.0);
        fields.get_mut(0).sync();
        let mut arena = ExprArena::new();
        let h = fields.coefficient(&mut arena, 0);
        let dh = fields.test(&mut arena, 0);
        let one = arena.scalar(1.0);
        let a = arena.sub(h, one).unwrap();
        let b = arena.sqrt(a).unwrap();
        let integrand = arena.product(dh, b).unwrap();
        let problem = BlockProblem::new(&mut arena, &fields, &Form::new(integrand), &[0]).unwrap();
        let config = Config::new();
        let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();
        assert_eq!(solver.solve(&mut fields).unwrap(), ConvergedReason::FnormNan);
    }

    #[test]
    fn backtracking_is_limited() {
        // from h = 0, the full step lands on h = 2 and increases ‖R‖; half a step hits the root
        for (n_max_backtracking, correct) in [(0, ConvergedReason::LineSearch), (1, ConvergedReason::FnormAbs)] {
            let mesh = SampleMeshes::one_tet4();
            let fem = FemSpace::new(&mesh, Some(1)).unwrap();
            let mut fields = FieldSet::new();
            let h = fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
            let mut arena = ExprArena::new();
            let problem = cubic_problem(&mut arena, &fields);
            let mut config = Config::new();
            config
                .set_line_search(LineSearch::Backtracking)
                .set_n_max_backtracking(n_max_backtracking)
                .set_verbose(false, false);
            let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();
            assert_eq!(solver.solve(&mut fields).unwrap(), correct);
            if correct.converged() {
                approx_eq(fields.get(h).values.owned()[0], 1.0, 1e-15);
            } else {
                assert_eq!(solver.status(), SolverStatus::Diverged);
            }
        }
    }

    #[test]
    fn solve_error_sets_diverged_status() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
        let mut arena = ExprArena::new();
        let problem = cubic_problem(&mut arena, &fields);
        let mut config = Config::new();
        config.set_verbose(false, false);
        let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();
        let mut empty = FieldSet::new();
        assert_eq!(solver.solve(&mut empty).err(), Some("field id is out of bounds"));
        assert_eq!(solver.status(), SolverStatus::Diverged);
        solver.solve(&mut fields).unwrap();
        assert_eq!(solver.status(), SolverStatus::Converged);
    }

    #[test]
    fn boundary_conditions_are_applied() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let u = fields.add(&fem, "u", Rank::Vector, Space::Nodal).unwrap();
        let h = fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();

        // F = grad(v):grad(u)
        let mut arena = ExprArena::new();
        let wu = fields.coefficient(&mut arena, u);
        let vu = fields.test(&mut arena, u);
        let gu = arena.grad(wu).unwrap();
        let gv = arena.grad(vu).unwrap();
        let integrand = arena.inner(gv, gu).unwrap();
        let problem = BlockProblem::new(&mut arena, &fields, &Form::new(integrand), &[u]).unwrap();
        assert_eq!(problem.jacobian.len(), 1);
        let mut config = Config::new();
        config.set_verbose(false, false);
        let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem).unwrap();

        let mut wrong = BcSet::new();
        wrong.all.push(DirichletBc {
            field: h,
            dofs: vec![0],
            values: vec![0.0],
        });
        assert_eq!(solver.set_bcs(&wrong).err(), Some("boundary condition field is not an unknown"));
        let mut wrong = BcSet::new();
        wrong.all.push(DirichletBc {
            field: u,
            dofs: vec![12],
            values: vec![0.0],
        });
        assert_eq!(solver.set_bcs(&wrong).err(), Some("boundary condition DOF is out of bounds"));

        // fix everything but the y and z components of point 1
        let mut bcs = BcSet::new();
        bcs.all.push(DirichletBc {
            field: u,
            dofs: vec![0, 1, 2, 3, 6, 7, 8, 9, 10, 11],
            values: vec![0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        });
        solver.set_bcs(&bcs).unwrap();
        let reason = solver.solve(&mut fields).unwrap();
        assert!(reason.converged());
        assert_eq!(fields.get(u).values.owned()[3], 0.1);
        approx_eq(fields.get(u).values.owned()[4], 0.0, 1e-15);
    }
}
