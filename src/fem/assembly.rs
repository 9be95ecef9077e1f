use super::{tensor_to_mandel, FemSpace, FieldId, FieldSet, Rank, Space};
use crate::expr::{BasisFunction, Binding, Evaluator, ExprArena, ExprId, Form, Multilinear, TerminalSource, Value};
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::CooMatrix;

/// Provides the field values at one integration point
struct PointSource<'a> {
    fem: &'a FemSpace<'a>,
    fields: &'a FieldSet,
    cell: usize,
    p: usize,
}

impl<'a> TerminalSource for PointSource<'a> {
    fn coefficient(&self, id: usize) -> Result<Value, StrError> {
        if id >= self.fields.len() {
            return Err("coefficient refers to an unknown field");
        }
        self.fem.value(self.fields.get(id), self.cell, self.p)
    }

    fn coefficient_grad(&self, id: usize) -> Result<Value, StrError> {
        if id >= self.fields.len() {
            return Err("coefficient refers to an unknown field");
        }
        self.fem.gradient(self.fields.get(id), self.cell, self.p)
    }
}

/// Holds the local basis and the local-to-global map of a field at an integration point
struct LocalBasis {
    basis: Vec<BasisFunction>,
    dofs: Vec<usize>,
}

/// Integrates forms over the mesh
///
/// The global equation of DOF `d` of the unknown `unknowns[i]` is `offsets[i] + d`.
pub struct Assembler<'a> {
    arena: &'a ExprArena,
    fem: &'a FemSpace<'a>,
}

impl<'a> Assembler<'a> {
    /// Allocates a new instance
    pub fn new(arena: &'a ExprArena, fem: &'a FemSpace<'a>) -> Self {
        Assembler { arena, fem }
    }

    /// Returns the local bases of all unknowns at an integration point
    fn local_bases(&self, fields: &FieldSet, unknowns: &[FieldId], cell: usize, p: usize) -> Result<Vec<LocalBasis>, StrError> {
        let mut res = Vec::with_capacity(unknowns.len());
        for id in unknowns {
            let f = fields.get(*id);
            res.push(LocalBasis {
                basis: self.fem.basis(f.rank, f.space, cell, p)?,
                dofs: self.fem.local_dofs(f.rank, f.space, cell, p),
            });
        }
        Ok(res)
    }

    /// Assembles the residual vector
    ///
    /// `forms[i]` is the residual form tested with the test function of `unknowns[i]`.
    /// Rows flagged in `prescribed` are left with zero.
    pub fn residual(
        &self,
        fields: &FieldSet,
        forms: &[Form],
        unknowns: &[FieldId],
        offsets: &[usize],
        prescribed: &[bool],
        rr: &mut Vector,
    ) -> Result<(), StrError> {
        if forms.len() != unknowns.len() || offsets.len() != unknowns.len() {
            return Err("there must be one residual form and one offset per unknown");
        }
        rr.fill(0.0);
        for cell in 0..self.fem.points.len() {
            for p in 0..self.fem.points[cell].len() {
                let dv = self.fem.points[cell][p].dv;
                let bases = self.local_bases(fields, unknowns, cell, p)?;
                let source = PointSource {
                    fem: self.fem,
                    fields,
                    cell,
                    p,
                };
                let mut eval = Evaluator::new(self.arena, &source);
                for (i, form) in forms.iter().enumerate() {
                    if form.is_zero(self.arena) || !self.fem.in_measure(form.measure, cell) {
                        continue;
                    }
                    let test = Binding {
                        field: unknowns[i],
                        basis: &bases[i].basis,
                    };
                    match eval.evaluate(form.integrand, Some(&test), None)? {
                        Multilinear::Zero(..) => (),
                        Multilinear::Test(values) => {
                            for (a, v) in values.iter().enumerate() {
                                let eq = offsets[i] + bases[i].dofs[a];
                                if !prescribed[eq] {
                                    rr[eq] += v.scalar()? * dv;
                                }
                            }
                        }
                        _ => return Err("residual form must be linear in the test function"),
                    }
                }
            }
        }
        Ok(())
    }

    /// Adds the tangent blocks to the (reset) Jacobian matrix
    ///
    /// Entries in prescribed rows or columns are skipped; the caller puts ones on their diagonal.
    /// Every non-prescribed entry of a block that is not structurally zero is put, even when the
    /// block evaluates to zero at a point, so the pattern stays the same between factorizations.
    pub fn tangent(
        &self,
        fields: &FieldSet,
        blocks: &[Vec<Form>],
        unknowns: &[FieldId],
        offsets: &[usize],
        prescribed: &[bool],
        kk: &mut CooMatrix,
    ) -> Result<(), StrError> {
        if blocks.len() != unknowns.len() || offsets.len() != unknowns.len() {
            return Err("there must be one row of blocks and one offset per unknown");
        }
        for cell in 0..self.fem.points.len() {
            for p in 0..self.fem.points[cell].len() {
                let dv = self.fem.points[cell][p].dv;
                let bases = self.local_bases(fields, unknowns, cell, p)?;
                let source = PointSource {
                    fem: self.fem,
                    fields,
                    cell,
                    p,
                };
                let mut eval = Evaluator::new(self.arena, &source);
                for (i, row) in blocks.iter().enumerate() {
                    for (j, block) in row.iter().enumerate() {
                        if block.is_zero(self.arena) || !self.fem.in_measure(block.measure, cell) {
                            continue;
                        }
                        let test = Binding {
                            field: unknowns[i],
                            basis: &bases[i].basis,
                        };
                        let trial = Binding {
                            field: unknowns[j],
                            basis: &bases[j].basis,
                        };
                        // a zero branch still puts its entries so the sparsity pattern is fixed
                        let local = match eval.evaluate(block.integrand, Some(&test), Some(&trial))? {
                            Multilinear::Zero(..) => None,
                            Multilinear::Both(ntrial, values) => Some((ntrial, values)),
                            _ => return Err("tangent block must be bilinear"),
                        };
                        for (a, dof_a) in bases[i].dofs.iter().enumerate() {
                            let r = offsets[i] + dof_a;
                            if prescribed[r] {
                                continue;
                            }
                            for (b, dof_b) in bases[j].dofs.iter().enumerate() {
                                let c = offsets[j] + dof_b;
                                if prescribed[c] {
                                    continue;
                                }
                                let value = match &local {
                                    Some((ntrial, values)) => values[a * ntrial + b].scalar()? * dv,
                                    None => 0.0,
                                };
                                kk.put(r, c, value)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the supremum of the number of nonzero values of the Jacobian matrix
    ///
    /// Counts all local block entries plus one diagonal entry per equation (for prescribed DOFs).
    pub fn nnz_sup(&self, fields: &FieldSet, blocks: &[Vec<Form>], unknowns: &[FieldId], neq: usize) -> usize {
        let mut nnz = neq;
        for cell in 0..self.fem.points.len() {
            for p in 0..self.fem.points[cell].len() {
                let sizes: Vec<_> = unknowns
                    .iter()
                    .map(|id| {
                        let f = fields.get(*id);
                        self.fem.local_dofs(f.rank, f.space, cell, p).len()
                    })
                    .collect();
                for (i, row) in blocks.iter().enumerate() {
                    for (j, block) in row.iter().enumerate() {
                        if !block.is_zero(self.arena) && self.fem.in_measure(block.measure, cell) {
                            nnz += sizes[i] * sizes[j];
                        }
                    }
                }
            }
        }
        nnz
    }

    /// Integrates a scalar form without arguments
    pub fn functional(&self, fields: &FieldSet, form: &Form) -> Result<f64, StrError> {
        let mut res = 0.0;
        for cell in 0..self.fem.points.len() {
            if !self.fem.in_measure(form.measure, cell) {
                continue;
            }
            for p in 0..self.fem.points[cell].len() {
                let source = PointSource {
                    fem: self.fem,
                    fields,
                    cell,
                    p,
                };
                let mut eval = Evaluator::new(self.arena, &source);
                res += eval.value(form.integrand)?.scalar()? * self.fem.points[cell][p].dv;
            }
        }
        Ok(res)
    }

    /// Evaluates an expression at the integration points and stores the values in a quadrature field
    pub fn interpolate(&self, fields: &mut FieldSet, expr: ExprId, target: FieldId) -> Result<(), StrError> {
        let (rank, space) = (fields.get(target).rank, fields.get(target).space);
        if space != Space::Quadrature {
            return Err("interpolation requires a quadrature field");
        }
        let mut values = vec![0.0; fields.get(target).dim()];
        for cell in 0..self.fem.points.len() {
            for p in 0..self.fem.points[cell].len() {
                let source = PointSource {
                    fem: self.fem,
                    fields,
                    cell,
                    p,
                };
                let mut eval = Evaluator::new(self.arena, &source);
                let comps = components(&eval.value(expr)?, rank)?;
                for (dof, v) in self.fem.local_dofs(rank, space, cell, p).iter().zip(comps) {
                    values[*dof] = v;
                }
            }
        }
        let field = fields.get_mut(target);
        field.values.owned_mut().copy_from_slice(&values);
        field.sync();
        Ok(())
    }

    /// Computes the volume average of an expression in each cell and stores it in a cell field
    pub fn project_cell_average(&self, fields: &mut FieldSet, expr: ExprId, target: FieldId) -> Result<(), StrError> {
        let (rank, space) = (fields.get(target).rank, fields.get(target).space);
        if space != Space::Cell {
            return Err("projection requires a cell field");
        }
        let nc = rank.ncomp();
        let mut values = vec![0.0; fields.get(target).dim()];
        for cell in 0..self.fem.points.len() {
            let mut volume = 0.0;
            for p in 0..self.fem.points[cell].len() {
                let dv = self.fem.points[cell][p].dv;
                let source = PointSource {
                    fem: self.fem,
                    fields,
                    cell,
                    p,
                };
                let mut eval = Evaluator::new(self.arena, &source);
                let comps = components(&eval.value(expr)?, rank)?;
                for (c, v) in comps.iter().enumerate() {
                    values[cell * nc + c] += v * dv;
                }
                volume += dv;
            }
            for c in 0..nc {
                values[cell * nc + c] /= volume;
            }
        }
        let field = fields.get_mut(target);
        field.values.owned_mut().copy_from_slice(&values);
        field.sync();
        Ok(())
    }
}

/// Returns the components of a value stored in a field of the given rank
fn components(value: &Value, rank: Rank) -> Result<Vec<f64>, StrError> {
    match (value, rank) {
        (Value::Scalar(s), Rank::Scalar) => Ok(vec![*s]),
        (Value::Vector(v), Rank::Vector) => Ok(v.to_vec()),
        (Value::Tensor(t), Rank::SymTensor) => Ok(tensor_to_mandel(t).to_vec()),
        _ => Err("expression shape does not match the field rank"),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
