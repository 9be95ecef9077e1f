use super::{DistVector, FemSpace};
use crate::expr::{ArgNumber, ExprArena, ExprId, Shape, Tensor3};
use crate::StrError;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Defines the tensor rank of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Rank {
    /// One component
    Scalar,

    /// Three components
    Vector,

    /// Six Mandel components `[00, 11, 22, √2·01, √2·12, √2·02]`
    SymTensor,
}

impl Rank {
    /// Returns the number of components
    pub fn ncomp(&self) -> usize {
        match self {
            Rank::Scalar => 1,
            Rank::Vector => 3,
            Rank::SymTensor => 6,
        }
    }

    /// Returns the shape of the corresponding expression
    pub fn shape(&self) -> Shape {
        match self {
            Rank::Scalar => Shape::Scalar,
            Rank::Vector => Shape::Vector,
            Rank::SymTensor => Shape::Tensor,
        }
    }
}

/// Defines the discretization space of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Space {
    /// Continuous piecewise-linear; values at the mesh points
    Nodal,

    /// One value per integration point
    Quadrature,

    /// One value per cell (piecewise constant)
    Cell,
}

/// Defines the index of a field in a [FieldSet]
pub type FieldId = usize;

/// Holds a named discretized quantity
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub rank: Rank,
    pub space: Space,
    pub values: DistVector,
}

impl Field {
    /// Allocates a new instance
    pub fn new(name: &str, rank: Rank, space: Space, values: DistVector) -> Self {
        Field {
            name: name.to_string(),
            rank,
            space,
            values,
        }
    }

    /// Refreshes the ghost entries
    pub fn sync(&mut self) {
        self.values.sync();
    }

    /// Returns the number of owned values
    pub fn dim(&self) -> usize {
        self.values.n_owned()
    }
}

/// Converts six Mandel components into a (symmetric) second-order tensor
pub fn mandel_to_tensor(mandel: &[f64]) -> Tensor3 {
    let mut tt = Tensor2::new(Mandel::Symmetric);
    for k in 0..6 {
        tt.vector_mut()[k] = mandel[k];
    }
    let mut res = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            res[i][j] = tt.get(i, j);
        }
    }
    res
}

/// Converts a second-order tensor into six Mandel components (the skew part is discarded)
pub fn tensor_to_mandel(tensor: &Tensor3) -> [f64; 6] {
    let mut tt = Tensor2::new(Mandel::Symmetric);
    for i in 0..3 {
        for j in i..3 {
            tt.sym_set(i, j, (tensor[i][j] + tensor[j][i]) / 2.0);
        }
    }
    let mut res = [0.0; 6];
    for k in 0..6 {
        res[k] = tt.vector()[k];
    }
    res
}

/// Holds all fields of a simulation
pub struct FieldSet {
    all: Vec<Field>,
    names: HashMap<String, FieldId>,
}

impl FieldSet {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        FieldSet {
            all: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Adds a field with zero values sized according to the discretization
    pub fn add(&mut self, fem: &FemSpace, name: &str, rank: Rank, space: Space) -> Result<FieldId, StrError> {
        let ndof = fem.ndof(rank, space)?;
        self.push(Field::new(name, rank, space, DistVector::new(ndof, Vec::new())?))
    }

    /// Adds an allocated field
    pub fn push(&mut self, field: Field) -> Result<FieldId, StrError> {
        if self.names.contains_key(&field.name) {
            return Err("field name already exists");
        }
        let id = self.all.len();
        self.names.insert(field.name.clone(), id);
        self.all.push(field);
        Ok(id)
    }

    /// Returns the number of fields
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Returns the id of a field given its name
    pub fn id(&self, name: &str) -> Result<FieldId, StrError> {
        self.names.get(name).copied().ok_or("cannot find field with the given name")
    }

    /// Returns an access to a field
    ///
    /// # Panics
    ///
    /// A panic occurs if the id is out of bounds.
    pub fn get(&self, id: FieldId) -> &Field {
        &self.all[id]
    }

    /// Returns an access to a field or an error if the id is out of bounds
    pub fn try_get(&self, id: FieldId) -> Result<&Field, StrError> {
        self.all.get(id).ok_or("field id is out of bounds")
    }

    /// Returns a mutable access to a field
    ///
    /// # Panics
    ///
    /// A panic occurs if the id is out of bounds.
    pub fn get_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.all[id]
    }

    /// Returns the coefficient (current value) of a field as an expression
    pub fn coefficient(&self, arena: &mut ExprArena, id: FieldId) -> ExprId {
        arena.coefficient(id, self.all[id].rank.shape())
    }

    /// Returns the test function of a field
    pub fn test(&self, arena: &mut ExprArena, id: FieldId) -> ExprId {
        arena.argument(ArgNumber::Test, id, self.all[id].rank.shape())
    }

    /// Returns the trial function of a field
    pub fn trial(&self, arena: &mut ExprArena, id: FieldId) -> ExprId {
        arena.argument(ArgNumber::Trial, id, self.all[id].rank.shape())
    }

    /// Copies the owned values of a field into another field and synchronizes the target
    pub fn copy_values(&mut self, from: FieldId, to: FieldId) -> Result<(), StrError> {
        if from == to {
            return Ok(());
        }
        if self.all[from].dim() != self.all[to].dim() {
            return Err("fields must have the same number of values");
        }
        let source = self.all[from].values.owned().to_vec();
        let target = &mut self.all[to];
        target.values.owned_mut().copy_from_slice(&source);
        target.sync();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{mandel_to_tensor, tensor_to_mandel, Field, FieldSet, Rank, Space};
    use crate::expr::{ExprArena, Shape};
    use crate::fem::DistVector;
    use russell_lab::approx_eq;

    fn field(name: &str, n: usize) -> Field {
        Field::new(name, Rank::Scalar, Space::Quadrature, DistVector::new(n, Vec::new()).unwrap())
    }

    #[test]
    fn rank_works() {
        assert_eq!(Rank::Scalar.ncomp(), 1);
        assert_eq!(Rank::Vector.ncomp(), 3);
        assert_eq!(Rank::SymTensor.ncomp(), 6);
        assert_eq!(Rank::SymTensor.shape(), Shape::Tensor);
    }

    #[test]
    fn mandel_conversion_works() {
        let t = [[1.0, 4.0, 6.0], [4.0, 2.0, 5.0], [6.0, 5.0, 3.0]];
        let m = tensor_to_mandel(&t);
        let s = f64::sqrt(2.0);
        approx_eq(m[0], 1.0, 1e-15);
        approx_eq(m[3], 4.0 * s, 1e-14);
        approx_eq(m[4], 5.0 * s, 1e-14);
        approx_eq(m[5], 6.0 * s, 1e-14);
        let back = mandel_to_tensor(&m);
        for i in 0..3 {
            for j in 0..3 {
                approx_eq(back[i][j], t[i][j], 1e-14);
            }
        }
    }

    #[test]
    fn field_set_works() {
        let mut fields = FieldSet::new();
        let a = fields.push(field("a", 3)).unwrap();
        let b = fields.push(field("b", 3)).unwrap();
        let c = fields.push(field("c", 2)).unwrap();
        assert_eq!(fields.push(field("a", 3)).err(), Some("field name already exists"));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.id("b"), Ok(b));
        assert_eq!(fields.id("z").err(), Some("cannot find field with the given name"));
        assert_eq!(fields.try_get(c).unwrap().dim(), 2);
        assert_eq!(fields.try_get(3).err(), Some("field id is out of bounds"));

        fields.get_mut(a).values.owned_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        fields.copy_values(a, b).unwrap();
        assert_eq!(fields.get(b).values.owned(), &[1.0, 2.0, 3.0]);
        assert_eq!(
            fields.copy_values(a, c).err(),
            Some("fields must have the same number of values")
        );

        let mut arena = ExprArena::new();
        let w = fields.coefficient(&mut arena, a);
        let v = fields.test(&mut arena, a);
        let du = fields.trial(&mut arena, a);
        assert_eq!(arena.format(w), "w0");
        assert_eq!(arena.format(v), "v0");
        assert_eq!(arena.format(du), "du0");
    }
}
