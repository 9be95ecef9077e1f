use crate::base::{ParamJ2, RJ2_THRESHOLD};
use crate::expr::{derivative, diff, ExprArena, ExprId, Form, Tensor3, Value};
use crate::fem::{BlockProblem, FemSpace, FieldId, FieldSet, Rank, Space};
use crate::StrError;

/// Holds the ids of the fields of the J2 plasticity problem
#[derive(Clone, Copy, Debug)]
pub struct J2Fields {
    /// Displacement (nodal vector)
    pub u: FieldId,

    /// Plastic strain (quadrature tensor)
    pub pp: FieldId,

    /// Isotropic hardening (quadrature scalar)
    pub h: FieldId,

    /// Kinematic hardening or back-stress (quadrature tensor)
    pub bb: FieldId,

    /// Displacement at the previous step
    pub u0: FieldId,

    /// Plastic strain at the previous step
    pub pp0: FieldId,

    /// Isotropic hardening at the previous step
    pub h0: FieldId,

    /// Back-stress at the previous step
    pub bb0: FieldId,

    /// Stress at the previous step
    pub ss0: FieldId,

    /// Cell averages of P, B, S, and h (for output)
    pub pp_cell: FieldId,
    pub bb_cell: FieldId,
    pub ss_cell: FieldId,
    pub h_cell: FieldId,
}

impl J2Fields {
    /// Allocates all fields (with zero values)
    pub fn new(fem: &FemSpace, fields: &mut FieldSet) -> Result<Self, StrError> {
        Ok(J2Fields {
            u: fields.add(fem, "u", Rank::Vector, Space::Nodal)?,
            pp: fields.add(fem, "P", Rank::SymTensor, Space::Quadrature)?,
            h: fields.add(fem, "h", Rank::Scalar, Space::Quadrature)?,
            bb: fields.add(fem, "B", Rank::SymTensor, Space::Quadrature)?,
            u0: fields.add(fem, "u0", Rank::Vector, Space::Nodal)?,
            pp0: fields.add(fem, "P0", Rank::SymTensor, Space::Quadrature)?,
            h0: fields.add(fem, "h0", Rank::Scalar, Space::Quadrature)?,
            bb0: fields.add(fem, "B0", Rank::SymTensor, Space::Quadrature)?,
            ss0: fields.add(fem, "S0", Rank::SymTensor, Space::Quadrature)?,
            pp_cell: fields.add(fem, "Po", Rank::SymTensor, Space::Cell)?,
            bb_cell: fields.add(fem, "Bo", Rank::SymTensor, Space::Cell)?,
            ss_cell: fields.add(fem, "So", Rank::SymTensor, Space::Cell)?,
            h_cell: fields.add(fem, "ho", Rank::Scalar, Space::Cell)?,
        })
    }

    /// Returns the primary fields ordered as the blocks: u, P, h, B
    pub fn unknowns(&self) -> Vec<FieldId> {
        vec![self.u, self.pp, self.h, self.bb]
    }

    /// Returns the (primary, shadow) pairs copied when a step is committed
    pub fn shadows(&self) -> [(FieldId, FieldId); 4] {
        [(self.u, self.u0), (self.pp, self.pp0), (self.h, self.h0), (self.bb, self.bb0)]
    }
}

/// Defines the direction of plastic flow
#[derive(Clone, Copy, Debug)]
pub enum FlowRule {
    /// g = f, thus the flow direction is ∂f/∂S
    Associative,

    /// Prescribed (constant) flow direction
    Fixed(Tensor3),
}

/// Holds the symbolic expressions of the monolithic J2 plasticity formulation
///
/// The kinematics use the deformation gradient `F = I + grad(u)` and the Green-Lagrange
/// strain `E = ½(FᵀF − I)`. The stress is given by the St.Venant-Kirchhoff model on the
/// elastic strain `E − P`:
///
/// ```text
/// S = 2μ (E − P) + λ tr(E − P) I
/// f = √3 rJ2(dev(S) − dev(B)) − (Sy + h)
/// dλ = max(f, 0)
/// ```
///
/// The residual form couples all primary fields:
///
/// ```text
/// F = δE:S + δP:((P−P0) − dλ ∂g/∂S) + δh·((h−h0) − dλ bh (qh − h))
///   + δB:((B−B0) − dλ bb (qb ∂g/∂S − B))
/// ```
pub struct J2Model {
    /// Holds the field ids
    pub fields: J2Fields,

    /// Holds the coupled residual form
    pub residual: Form,

    /// Green-Lagrange strain E
    pub strain: ExprId,

    /// Second Piola-Kirchhoff stress S
    pub stress: ExprId,

    /// Plastic strain P
    pub plastic_strain: ExprId,

    /// Isotropic hardening h
    pub hardening: ExprId,

    /// Back-stress B
    pub back_stress: ExprId,

    /// Yield function f
    pub yield_function: ExprId,

    /// Plastic multiplier dλ
    pub multiplier: ExprId,

    /// Total differential of the yield function df
    pub df: ExprId,

    /// Flow direction ∂g/∂S
    pub flow_direction: ExprId,

    /// Axial components E·n·n, S·n·n, and P·n·n with n = x-axis
    pub axial_strain: ExprId,
    pub axial_stress: ExprId,
    pub axial_plastic_strain: ExprId,

    /// Consistency measure dλ·df
    pub dlambda_df: ExprId,

    /// Consistency measure dλ·f
    pub dlambda_f: ExprId,
}

impl J2Model {
    /// Builds the expressions
    pub fn new(
        arena: &mut ExprArena,
        fields: &FieldSet,
        j2: &J2Fields,
        param: &ParamJ2,
        flow_rule: FlowRule,
    ) -> Result<Self, StrError> {
        if let Some(msg) = param.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate J2 model because param.validate() failed");
        }

        // primary fields, shadows, and variations
        let u = fields.coefficient(arena, j2.u);
        let pp = fields.coefficient(arena, j2.pp);
        let h = fields.coefficient(arena, j2.h);
        let bb = fields.coefficient(arena, j2.bb);
        let pp0 = fields.coefficient(arena, j2.pp0);
        let h0 = fields.coefficient(arena, j2.h0);
        let bb0 = fields.coefficient(arena, j2.bb0);
        let ss0 = fields.coefficient(arena, j2.ss0);
        let du = fields.test(arena, j2.u);
        let dpp = fields.test(arena, j2.pp);
        let dh = fields.test(arena, j2.h);
        let dbb = fields.test(arena, j2.bb);

        // strains
        let ii = arena.identity();
        let grad_u = arena.grad(u)?;
        let ff = arena.sum(ii, grad_u)?;
        let fft = arena.transpose(ff)?;
        let cc = arena.dot(fft, ff)?;
        let cc_minus_ii = arena.sub(cc, ii)?;
        let half = arena.scalar(0.5);
        let ee = arena.product(half, cc_minus_ii)?;
        let ee_el = arena.sub(ee, pp)?;

        // stress
        let two_mu = arena.scalar(2.0 * param.mu);
        let lambda = arena.scalar(param.lambda);
        let deviatoric_part = arena.product(two_mu, ee_el)?;
        let tr_ee_el = arena.trace(ee_el)?;
        let la_tr = arena.product(lambda, tr_ee_el)?;
        let volumetric_part = arena.product(la_tr, ii)?;
        let ss = arena.sum(deviatoric_part, volumetric_part)?;

        // variables for differentiation
        let ss_var = arena.variable(ss);
        let bb_var = arena.variable(bb);
        let h_var = arena.variable(h);

        // yield function
        let dev_ss = arena.dev(ss_var)?;
        let dev_bb = arena.dev(bb_var)?;
        let relative = arena.sub(dev_ss, dev_bb)?;
        let r = sqrt_j2(arena, relative)?;
        let sq3 = arena.scalar(f64::sqrt(3.0));
        let q = arena.product(sq3, r)?;
        let sy = arena.scalar(param.sy);
        let radius = arena.sum(sy, h_var)?;
        let f = arena.sub(q, radius)?;

        // total differential of the yield function
        let dfds = diff(arena, f, ss_var)?;
        let dfdh = diff(arena, f, h_var)?;
        let dfdb = diff(arena, f, bb_var)?;
        let inc_ss = arena.sub(ss_var, ss0)?;
        let inc_h = arena.sub(h_var, h0)?;
        let inc_bb = arena.sub(bb_var, bb0)?;
        let df_ss = arena.inner(dfds, inc_ss)?;
        let df_h = arena.product(dfdh, inc_h)?;
        let df_bb = arena.inner(dfdb, inc_bb)?;
        let df_partial = arena.sum(df_ss, df_h)?;
        let df = arena.sum(df_partial, df_bb)?;

        // flow direction (g = f for the associative rule)
        let dgds = match flow_rule {
            FlowRule::Associative => diff(arena, f, ss_var)?,
            FlowRule::Fixed(direction) => arena.literal(Value::Tensor(direction)),
        };

        // plastic multiplier (closed-form return map)
        let zero = arena.scalar(0.0);
        let dlambda = arena.max_value(f, zero)?;

        // variation of the strain
        let dee = derivative(arena, ee, &[u], &[du])?;

        // δE:S
        let w_u = arena.inner(dee, ss)?;

        // δP:((P−P0) − dλ ∂g/∂S)
        let inc_pp = arena.sub(pp, pp0)?;
        let flow = arena.product(dlambda, dgds)?;
        let res_pp = arena.sub(inc_pp, flow)?;
        let w_pp = arena.inner(dpp, res_pp)?;

        // δh·((h−h0) − dλ bh (qh − h))
        let inc_h_plain = arena.sub(h, h0)?;
        let qh = arena.scalar(param.qh);
        let saturation_h = arena.sub(qh, h)?;
        let bh = arena.scalar(param.bh);
        let rate_h = arena.product(dlambda, bh)?;
        let evolution_h = arena.product(rate_h, saturation_h)?;
        let res_h = arena.sub(inc_h_plain, evolution_h)?;
        let w_h = arena.product(dh, res_h)?;

        // δB:((B−B0) − dλ bb (qb ∂g/∂S − B))
        let inc_bb_plain = arena.sub(bb, bb0)?;
        let qb = arena.scalar(param.qb);
        let target_bb = arena.product(qb, dgds)?;
        let saturation_bb = arena.sub(target_bb, bb)?;
        let bb_rate = arena.scalar(param.bb);
        let rate_bb = arena.product(dlambda, bb_rate)?;
        let evolution_bb = arena.product(rate_bb, saturation_bb)?;
        let res_bb = arena.sub(inc_bb_plain, evolution_bb)?;
        let w_bb = arena.inner(dbb, res_bb)?;

        // coupled form
        let w_u_pp = arena.sum(w_u, w_pp)?;
        let w_u_pp_h = arena.sum(w_u_pp, w_h)?;
        let integrand = arena.sum(w_u_pp_h, w_bb)?;

        // post-processing
        let axial_strain = arena.component(ee, 0, 0)?;
        let axial_stress = arena.component(ss, 0, 0)?;
        let axial_plastic_strain = arena.component(pp, 0, 0)?;
        let dlambda_df = arena.product(dlambda, df)?;
        let dlambda_f = arena.product(dlambda, f)?;

        Ok(J2Model {
            fields: *j2,
            residual: Form::new(integrand),
            strain: ee,
            stress: ss,
            plastic_strain: pp,
            hardening: h,
            back_stress: bb,
            yield_function: f,
            multiplier: dlambda,
            df,
            flow_direction: dgds,
            axial_strain,
            axial_stress,
            axial_plastic_strain,
            dlambda_df,
            dlambda_f,
        })
    }

    /// Splits the residual into blocks for the unknowns u, P, h, B
    pub fn block_problem(&self, arena: &mut ExprArena, fields: &FieldSet) -> Result<BlockProblem, StrError> {
        BlockProblem::new(arena, fields, &self.residual, &self.fields.unknowns())
    }
}

/// Returns the square root of the J2 invariant `sqrt(½ A:A)`
///
/// Values below [RJ2_THRESHOLD] are replaced by zero.
pub fn sqrt_j2(arena: &mut ExprArena, a: ExprId) -> Result<ExprId, StrError> {
    let aa = arena.inner(a, a)?;
    let half = arena.scalar(0.5);
    let j2 = arena.product(half, aa)?;
    let r = arena.sqrt(j2)?;
    let threshold = arena.scalar(RJ2_THRESHOLD);
    let zero = arena.scalar(0.0);
    arena.conditional(r, threshold, zero, r)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{sqrt_j2, FlowRule, J2Fields, J2Model};
    use crate::base::{ParamJ2, SampleMeshes};
    use crate::expr::{Evaluator, ExprArena, Form, TerminalSource, Value};
    use crate::fem::{Assembler, FemSpace, FieldSet};
    use crate::StrError;
    use russell_lab::approx_eq;

    struct NoFields;

    impl TerminalSource for NoFields {
        fn coefficient(&self, _: usize) -> Result<Value, StrError> {
            Err("no fields")
        }
        fn coefficient_grad(&self, _: usize) -> Result<Value, StrError> {
            Err("no fields")
        }
    }

    #[test]
    fn sqrt_j2_works() {
        let mut arena = ExprArena::new();
        let tiny = arena.literal(Value::Tensor([[1e-13, 0.0, 0.0], [0.0, -1e-13, 0.0], [0.0, 0.0, 0.0]]));
        let a = arena.literal(Value::Tensor([[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 0.0]]));
        let b = arena.literal(Value::Tensor([[0.0, 2.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 0.0]]));
        let r_tiny = sqrt_j2(&mut arena, tiny).unwrap();
        let r_a = sqrt_j2(&mut arena, a).unwrap();
        let r_b = sqrt_j2(&mut arena, b).unwrap();
        let source = NoFields;
        let mut eval = Evaluator::new(&arena, &source);
        assert_eq!(eval.value(r_tiny).unwrap(), Value::Scalar(0.0));
        assert_eq!(eval.value(r_a).unwrap(), Value::Scalar(1.0));
        approx_eq(eval.value(r_b).unwrap().scalar().unwrap(), 2.0, 1e-15);
    }

    #[test]
    fn new_captures_errors() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let j2 = J2Fields::new(&fem, &mut fields).unwrap();
        let mut arena = ExprArena::new();
        let mut param = ParamJ2::sample();
        param.mu = 0.0;
        assert_eq!(
            J2Model::new(&mut arena, &fields, &j2, &param, FlowRule::Associative).err(),
            Some("cannot allocate J2 model because param.validate() failed")
        );
        assert_eq!(
            J2Fields::new(&fem, &mut fields).err(),
            Some("field name already exists")
        );
    }

    #[test]
    fn expressions_work() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let j2 = J2Fields::new(&fem, &mut fields).unwrap();
        assert_eq!(j2.unknowns(), &[j2.u, j2.pp, j2.h, j2.bb]);
        let param = ParamJ2::sample();
        let mut arena = ExprArena::new();
        let model = J2Model::new(&mut arena, &fields, &j2, &param, FlowRule::Associative).unwrap();
        let (exx, sxx) = (model.axial_strain, model.axial_stress);
        let syy = arena.component(model.stress, 1, 1).unwrap();
        let (dlambda_df, dlambda_f) = (model.dlambda_df, model.dlambda_f);
        let problem = model.block_problem(&mut arena, &fields).unwrap();
        assert_eq!(problem.residual.len(), 4);
        assert_eq!(problem.jacobian.len(), 4);

        // uniaxial strain: u = (0.01 x, 0, 0)
        fields.get_mut(j2.u).values.owned_mut()[3] = 0.01;
        fields.get_mut(j2.u).sync();
        let asm = Assembler::new(&arena, &fem);
        let avg = |fields: &FieldSet, id| asm.functional(fields, &Form::new(id)).unwrap() * 6.0;
        let e = 0.01 + 0.5 * 0.01 * 0.01;
        approx_eq(avg(&fields, exx), e, 1e-15);
        approx_eq(avg(&fields, sxx), (2.0 * param.mu + param.lambda) * e, 1e-12);
        approx_eq(avg(&fields, syy), param.lambda * e, 1e-13);

        // √3 rJ2(dev S) = 2μ e for uniaxial strain
        let f = 2.0 * param.mu * e - param.sy;
        approx_eq(avg(&fields, model.yield_function), f, 1e-12);
        approx_eq(avg(&fields, model.multiplier), f, 1e-12);
        approx_eq(avg(&fields, dlambda_f), f * f, 1e-11);
        assert!(avg(&fields, dlambda_df) > 0.0);

        // elastic state: dλ = max(f, 0) = 0
        fields.get_mut(j2.u).values.owned_mut()[3] = 0.0001;
        fields.get_mut(j2.u).sync();
        assert!(avg(&fields, model.yield_function) < 0.0);
        assert_eq!(avg(&fields, model.multiplier), 0.0);
        assert_eq!(avg(&fields, dlambda_f), 0.0);
    }

    #[test]
    fn fixed_flow_rule_works() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let j2 = J2Fields::new(&fem, &mut fields).unwrap();
        let mut arena = ExprArena::new();
        let direction = [[1.0, 0.0, 0.0], [0.0, -0.5, 0.0], [0.0, 0.0, -0.5]];
        let model = J2Model::new(&mut arena, &fields, &j2, &ParamJ2::sample(), FlowRule::Fixed(direction)).unwrap();
        let source = NoFields;
        let mut eval = Evaluator::new(&arena, &source);
        assert_eq!(eval.value(model.flow_direction).unwrap(), Value::Tensor(direction));
    }
}
