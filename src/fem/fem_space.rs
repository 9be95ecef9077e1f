use super::{Field, Rank, Space};
use crate::expr::{BasisFunction, Measure, Value};
use crate::StrError;
use gemlab::integ::Gauss;
use gemlab::mesh::Mesh;

/// Holds the interpolation data at an integration point
#[derive(Clone, Debug)]
pub struct IntegPoint {
    /// Volume weight: det(J) × Gauss weight
    pub dv: f64,

    /// Interpolation functions N(ξ) of the cell nodes
    pub interp: Vec<f64>,

    /// Spatial gradients ∂N/∂x of the interpolation functions (nnode)
    pub gradient: Vec<[f64; 3]>,

    /// Real coordinates of the integration point
    pub coords: [f64; 3],
}

/// Holds the integration points of a three-dimensional mesh and numbers the degrees of freedom
///
/// DOF numbering:
///
/// * `Space::Nodal` -- `point × ncomp + c`
/// * `Space::Quadrature` -- `(first_point(cell) + p) × ncomp + c`
/// * `Space::Cell` -- `cell × ncomp + c`
pub struct FemSpace<'a> {
    /// The mesh
    pub mesh: &'a Mesh,

    /// Integration points of each cell
    pub points: Vec<Vec<IntegPoint>>,

    /// Index of the first integration point of each cell in the global numbering
    first_point: Vec<usize>,

    /// Total number of integration points
    n_integ_point: usize,
}

impl<'a> FemSpace<'a> {
    /// Allocates a new instance
    ///
    /// `ngauss` is the number of integration points per cell; None means the default of the cell kind.
    pub fn new(mesh: &'a Mesh, ngauss: Option<usize>) -> Result<Self, StrError> {
        if mesh.ndim != 3 {
            return Err("mesh must be three-dimensional");
        }
        let mut points = Vec::with_capacity(mesh.cells.len());
        let mut first_point = Vec::with_capacity(mesh.cells.len());
        let mut n_integ_point = 0;
        for cell in &mesh.cells {
            let gauss = Gauss::new_or_sized(cell.kind, ngauss)?;
            let mut pad = mesh.get_pad(cell.id);
            let nnode = cell.kind.nnode();
            let mut cell_points = Vec::with_capacity(gauss.npoint());
            for p in 0..gauss.npoint() {
                let ksi = gauss.coords(p);
                let det_jac = pad.calc_gradient(ksi)?;
                if det_jac <= 0.0 {
                    return Err("cell has a non-positive Jacobian determinant");
                }
                (pad.fn_interp)(&mut pad.interp, ksi);
                let mut coords = [0.0; 3];
                let mut gradient = vec![[0.0; 3]; nnode];
                for m in 0..nnode {
                    for j in 0..3 {
                        coords[j] += pad.interp[m] * pad.xxt.get(j, m);
                        gradient[m][j] = pad.gradient.get(m, j);
                    }
                }
                cell_points.push(IntegPoint {
                    dv: det_jac * gauss.weight(p),
                    interp: pad.interp.as_data().clone(),
                    gradient,
                    coords,
                });
            }
            first_point.push(n_integ_point);
            n_integ_point += cell_points.len();
            points.push(cell_points);
        }
        Ok(FemSpace {
            mesh,
            points,
            first_point,
            n_integ_point,
        })
    }

    /// Returns the total number of integration points
    pub fn n_integ_point(&self) -> usize {
        self.n_integ_point
    }

    /// Returns the number of DOFs of a field with the given rank and space
    pub fn ndof(&self, rank: Rank, space: Space) -> Result<usize, StrError> {
        let n = match space {
            Space::Nodal => {
                if rank == Rank::SymTensor {
                    return Err("nodal tensor fields are not available");
                }
                self.mesh.points.len()
            }
            Space::Quadrature => self.n_integ_point,
            Space::Cell => self.mesh.cells.len(),
        };
        Ok(n * rank.ncomp())
    }

    /// Returns the local-to-global map of a field at an integration point
    ///
    /// The order matches the basis functions returned by [FemSpace::basis].
    pub fn local_dofs(&self, rank: Rank, space: Space, cell: usize, p: usize) -> Vec<usize> {
        let nc = rank.ncomp();
        match space {
            Space::Nodal => {
                let cell_points = &self.mesh.cells[cell].points;
                let mut dofs = Vec::with_capacity(cell_points.len() * nc);
                for point in cell_points {
                    for c in 0..nc {
                        dofs.push(point * nc + c);
                    }
                }
                dofs
            }
            Space::Quadrature => {
                let q = self.first_point[cell] + p;
                (0..nc).map(|c| q * nc + c).collect()
            }
            Space::Cell => (0..nc).map(|c| cell * nc + c).collect(),
        }
    }

    /// Returns the local basis functions of a field at an integration point
    pub fn basis(&self, rank: Rank, space: Space, cell: usize, p: usize) -> Result<Vec<BasisFunction>, StrError> {
        match space {
            Space::Nodal => {
                let ip = &self.points[cell][p];
                let mut res = Vec::with_capacity(ip.interp.len() * rank.ncomp());
                for m in 0..ip.interp.len() {
                    let nm = ip.interp[m];
                    let gm = ip.gradient[m];
                    match rank {
                        Rank::Scalar => res.push(BasisFunction {
                            value: Value::Scalar(nm),
                            grad: Some(Value::Vector(gm)),
                        }),
                        Rank::Vector => {
                            for c in 0..3 {
                                let mut value = [0.0; 3];
                                let mut grad = [[0.0; 3]; 3];
                                value[c] = nm;
                                grad[c] = gm;
                                res.push(BasisFunction {
                                    value: Value::Vector(value),
                                    grad: Some(Value::Tensor(grad)),
                                });
                            }
                        }
                        Rank::SymTensor => return Err("nodal tensor fields are not available"),
                    }
                }
                Ok(res)
            }
            Space::Quadrature | Space::Cell => Ok(discontinuous_basis(rank)),
        }
    }

    /// Returns the value of a field at an integration point
    pub fn value(&self, field: &Field, cell: usize, p: usize) -> Result<Value, StrError> {
        let values = field.values.all();
        if field.space != Space::Nodal {
            // the basis is the identity (Mandel basis for tensors)
            let dofs = self.local_dofs(field.rank, field.space, cell, p);
            return Ok(match field.rank {
                Rank::Scalar => Value::Scalar(values[dofs[0]]),
                Rank::Vector => Value::Vector([values[dofs[0]], values[dofs[1]], values[dofs[2]]]),
                Rank::SymTensor => {
                    let mandel: Vec<_> = dofs.iter().map(|d| values[*d]).collect();
                    Value::Tensor(super::mandel_to_tensor(&mandel))
                }
            });
        }
        let ip = &self.points[cell][p];
        let cell_points = &self.mesh.cells[cell].points;
        match field.rank {
            Rank::Scalar => {
                let mut s = 0.0;
                for (m, point) in cell_points.iter().enumerate() {
                    s += ip.interp[m] * values[*point];
                }
                Ok(Value::Scalar(s))
            }
            Rank::Vector => {
                let mut v = [0.0; 3];
                for (m, point) in cell_points.iter().enumerate() {
                    for i in 0..3 {
                        v[i] += ip.interp[m] * values[point * 3 + i];
                    }
                }
                Ok(Value::Vector(v))
            }
            Rank::SymTensor => Err("nodal tensor fields are not available"),
        }
    }

    /// Returns the spatial gradient of a (nodal) field at an integration point
    pub fn gradient(&self, field: &Field, cell: usize, p: usize) -> Result<Value, StrError> {
        if field.space != Space::Nodal {
            return Err("gradient is only available for nodal fields");
        }
        let values = field.values.all();
        let ip = &self.points[cell][p];
        let cell_points = &self.mesh.cells[cell].points;
        match field.rank {
            Rank::Scalar => {
                let mut g = [0.0; 3];
                for (m, point) in cell_points.iter().enumerate() {
                    for j in 0..3 {
                        g[j] += values[*point] * ip.gradient[m][j];
                    }
                }
                Ok(Value::Vector(g))
            }
            Rank::Vector => {
                // grad(u)ᵢⱼ = ∂uᵢ/∂xⱼ
                let mut g = [[0.0; 3]; 3];
                for (m, point) in cell_points.iter().enumerate() {
                    for i in 0..3 {
                        for j in 0..3 {
                            g[i][j] += values[point * 3 + i] * ip.gradient[m][j];
                        }
                    }
                }
                Ok(Value::Tensor(g))
            }
            Rank::SymTensor => Err("nodal tensor fields are not available"),
        }
    }

    /// Returns whether a cell belongs to the integration domain
    pub fn in_measure(&self, measure: Measure, cell: usize) -> bool {
        match measure {
            Measure::All => true,
            Measure::Subdomain(attribute) => self.mesh.cells[cell].attribute == attribute,
        }
    }

    /// Returns the volume of the integration domain
    pub fn volume(&self, measure: Measure) -> f64 {
        let mut res = 0.0;
        for (cell, cell_points) in self.points.iter().enumerate() {
            if self.in_measure(measure, cell) {
                res += cell_points.iter().map(|ip| ip.dv).sum::<f64>();
            }
        }
        res
    }
}

/// Returns the basis of a discontinuous (quadrature or cell) space
fn discontinuous_basis(rank: Rank) -> Vec<BasisFunction> {
    match rank {
        Rank::Scalar => vec![BasisFunction {
            value: Value::Scalar(1.0),
            grad: None,
        }],
        Rank::Vector => (0..3)
            .map(|c| {
                let mut value = [0.0; 3];
                value[c] = 1.0;
                BasisFunction {
                    value: Value::Vector(value),
                    grad: None,
                }
            })
            .collect(),
        Rank::SymTensor => (0..6)
            .map(|k| {
                let mut mandel = [0.0; 6];
                mandel[k] = 1.0;
                BasisFunction {
                    value: Value::Tensor(super::mandel_to_tensor(&mandel)),
                    grad: None,
                }
            })
            .collect(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::FemSpace;
    use crate::base::{SampleMeshes, Specimen, ATTRIBUTE_GAUGE};
    use crate::expr::{Measure, Value};
    use crate::fem::{DistVector, Field, Rank, Space};
    use gemlab::mesh::Mesh;
    use russell_lab::approx_eq;

    #[test]
    fn new_captures_errors() {
        let mesh = Mesh {
            ndim: 2,
            points: Vec::new(),
            cells: Vec::new(),
        };
        assert_eq!(FemSpace::new(&mesh, None).err(), Some("mesh must be three-dimensional"));
    }

    #[test]
    fn one_tet4_works() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        assert_eq!(fem.n_integ_point(), 1);
        let ip = &fem.points[0][0];
        approx_eq(ip.dv, 1.0 / 6.0, 1e-15);
        for j in 0..3 {
            approx_eq(ip.coords[j], 0.25, 1e-15);
        }
        // ∇N₀ = (-1,-1,-1), ∇N₁ = (1,0,0), ...
        assert_eq!(ip.gradient[0], [-1.0, -1.0, -1.0]);
        assert_eq!(ip.gradient[1], [1.0, 0.0, 0.0]);
        assert_eq!(fem.ndof(Rank::Vector, Space::Nodal), Ok(12));
        assert_eq!(fem.ndof(Rank::SymTensor, Space::Quadrature), Ok(6));
        assert_eq!(fem.ndof(Rank::Scalar, Space::Cell), Ok(1));
        assert_eq!(
            fem.ndof(Rank::SymTensor, Space::Nodal).err(),
            Some("nodal tensor fields are not available")
        );
        assert_eq!(fem.local_dofs(Rank::Vector, Space::Nodal, 0, 0)[4], 4);
        assert_eq!(fem.local_dofs(Rank::SymTensor, Space::Quadrature, 0, 0), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(fem.basis(Rank::Vector, Space::Nodal, 0, 0).unwrap().len(), 12);
        assert_eq!(fem.basis(Rank::SymTensor, Space::Quadrature, 0, 0).unwrap().len(), 6);
    }

    #[test]
    fn value_and_gradient_work() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        // u = (2x, 3y + z, 0)
        let mut values = DistVector::new(12, Vec::new()).unwrap();
        for (m, point) in mesh.points.iter().enumerate() {
            let x = &point.coords;
            values.owned_mut()[3 * m] = 2.0 * x[0];
            values.owned_mut()[3 * m + 1] = 3.0 * x[1] + x[2];
        }
        let u = Field::new("u", Rank::Vector, Space::Nodal, values);
        match fem.gradient(&u, 0, 0).unwrap() {
            Value::Tensor(g) => {
                approx_eq(g[0][0], 2.0, 1e-15);
                approx_eq(g[1][1], 3.0, 1e-15);
                approx_eq(g[1][2], 1.0, 1e-15);
                approx_eq(g[2][2], 0.0, 1e-15);
            }
            _ => panic!("tensor expected"),
        }
        match fem.value(&u, 0, 0).unwrap() {
            Value::Vector(v) => {
                approx_eq(v[0], 0.5, 1e-15);
                approx_eq(v[1], 1.0, 1e-15);
            }
            _ => panic!("vector expected"),
        }
        let mut values = DistVector::new(6, Vec::new()).unwrap();
        values.owned_mut()[3] = f64::sqrt(2.0);
        let s = Field::new("S", Rank::SymTensor, Space::Quadrature, values);
        match fem.value(&s, 0, 0).unwrap() {
            Value::Tensor(t) => {
                approx_eq(t[0][1], 1.0, 1e-15);
                approx_eq(t[1][0], 1.0, 1e-15);
            }
            _ => panic!("tensor expected"),
        }
        assert_eq!(
            fem.gradient(&s, 0, 0).err(),
            Some("gradient is only available for nodal fields")
        );
    }

    #[test]
    fn volume_works() {
        let specimen = Specimen {
            l0: 0.1,
            d0: 0.02,
            l_grip: 0.03,
            nx_gauge: 2,
            nx_grip: 1,
            n_section: 1,
        };
        let mesh = specimen.mesh().unwrap();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        approx_eq(fem.volume(Measure::All), 0.16 * 0.02 * 0.02, 1e-15);
        approx_eq(fem.volume(Measure::Subdomain(ATTRIBUTE_GAUGE)), 0.1 * 0.02 * 0.02, 1e-15);
        assert!(fem.in_measure(Measure::All, 0));
    }
}
