use super::{FieldId, FieldSet, MeshTags, Rank, Space};
use crate::StrError;
use std::fmt;

/// Defines the displacement degrees of freedom
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dof {
    Ux,
    Uy,
    Uz,
}

impl Dof {
    /// Returns the component index
    pub fn index(&self) -> usize {
        match self {
            Dof::Ux => 0,
            Dof::Uy => 1,
            Dof::Uz => 2,
        }
    }
}

/// Holds prescribed values of some DOFs of a field
#[derive(Clone, Debug)]
pub struct DirichletBc {
    /// The constrained field
    pub field: FieldId,

    /// The DOF numbers within the field
    pub dofs: Vec<usize>,

    /// The prescribed values (one per DOF)
    pub values: Vec<f64>,
}

/// Holds the boundary conditions of one load step
#[derive(Clone, Debug)]
pub struct BcSet {
    pub all: Vec<DirichletBc>,
}

impl BcSet {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        BcSet { all: Vec::new() }
    }
}

/// Holds the definition of essential boundary conditions
///
/// Each entry prescribes some components of the displacement on a named interface with a
/// function of the point coordinates and the load factor. The values are computed again
/// for every load step by [Essential::build].
pub struct Essential<'a> {
    all: Vec<(String, Vec<Dof>, Box<dyn Fn(&[f64], f64) -> [f64; 3] + 'a>)>,
}

impl<'a> Essential<'a> {
    /// Allocates a new instance
    pub fn new() -> Self {
        Essential { all: Vec::new() }
    }

    /// Sets prescribed displacement components on an interface
    pub fn on<F>(&mut self, interface: &str, dofs: &[Dof], value: F) -> &mut Self
    where
        F: Fn(&[f64], f64) -> [f64; 3] + 'a,
    {
        self.all.push((interface.to_string(), dofs.to_vec(), Box::new(value)));
        self
    }

    /// Computes the boundary conditions for a load factor
    pub fn build(&self, tags: &MeshTags, fields: &FieldSet, field: FieldId, factor: f64) -> Result<BcSet, StrError> {
        let f = fields.get(field);
        if f.rank != Rank::Vector || f.space != Space::Nodal {
            return Err("essential boundary conditions require a nodal vector field");
        }
        let mut bcs = BcSet::new();
        for (interface, dofs, value) in &self.all {
            let points = tags.points(interface)?;
            let mut bc = DirichletBc {
                field,
                dofs: Vec::with_capacity(points.len() * dofs.len()),
                values: Vec::with_capacity(points.len() * dofs.len()),
            };
            for point in points {
                let u = value(&tags.mesh.points[*point].coords, factor);
                for dof in dofs {
                    bc.dofs.push(point * 3 + dof.index());
                    bc.values.push(u[dof.index()]);
                }
            }
            bcs.all.push(bc);
        }
        Ok(bcs)
    }
}

impl<'a> fmt::Display for Essential<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Essential boundary conditions\n")?;
        write!(f, "=============================\n")?;
        for (interface, dofs, _) in &self.all {
            write!(f, "{} : {:?}\n", interface, dofs)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Dof, Essential};
    use crate::base::SampleMeshes;
    use crate::fem::{FemSpace, FieldSet, MeshTags, Rank, Space};

    #[test]
    fn build_works() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let u = fields.add(&fem, "u", Rank::Vector, Space::Nodal).unwrap();
        let h = fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
        let mut tags = MeshTags::new(&mesh);
        tags.add_surface_x("left", 0.0).unwrap();
        tags.add_surface_z("bottom", 0.0).unwrap();

        let mut essential = Essential::new();
        essential
            .on("left", &[Dof::Ux], |x, lf| [lf * (1.0 + x[1]), 0.0, 0.0])
            .on("bottom", &[Dof::Uy, Dof::Uz], |_, _| [0.0, 0.0, 0.0]);
        assert_eq!(
            format!("{}", essential),
            "Essential boundary conditions\n\
             =============================\n\
             left : [Ux]\n\
             bottom : [Uy, Uz]\n"
        );

        let bcs = essential.build(&tags, &fields, u, 2.0).unwrap();
        assert_eq!(bcs.all.len(), 2);
        assert_eq!(bcs.all[0].dofs, &[0, 6, 9]);
        assert_eq!(bcs.all[0].values, &[2.0, 4.0, 2.0]);
        assert_eq!(bcs.all[1].dofs, &[1, 2, 4, 5, 7, 8]);
        assert_eq!(
            essential.build(&tags, &fields, h, 1.0).err(),
            Some("essential boundary conditions require a nodal vector field")
        );

        let mut wrong = Essential::new();
        wrong.on("right", &[Dof::Ux], |_, _| [0.0; 3]);
        assert_eq!(
            wrong.build(&tags, &fields, u, 1.0).err(),
            Some("cannot find interface with the given name")
        );
    }
}
