use super::Shape;
use crate::StrError;
use russell_lab::{vec_add, vec_inner, Vector};
use russell_tensor::{t2_add, t2_ddot_t2, t2_dot_t2, t2_dot_vec, vec_dot_t2, Mandel, Tensor2};

/// Defines a 3×3 tensor stored as an array of rows
pub type Tensor3 = [[f64; 3]; 3];

/// Holds the numeric value of an expression at a point
///
/// Tensors are always 3×3 (the simulations run in 3D); symmetric tensors are
/// expanded from their Mandel representation before entering an expression.
/// The algebra runs on general (non-symmetric) Mandel tensors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector([f64; 3]),
    Tensor(Tensor3),
}

/// Converts row-major components into a general Mandel tensor
fn to_t2(a: &Tensor3) -> Result<Tensor2, StrError> {
    Tensor2::from_matrix(a, Mandel::General)
}

/// Converts a Mandel tensor back into row-major components
fn from_t2(tt: &Tensor2) -> Tensor3 {
    let mut c = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            c[i][j] = tt.get(i, j);
        }
    }
    c
}

fn from_vector(v: &Vector) -> [f64; 3] {
    [v[0], v[1], v[2]]
}

impl Value {
    /// Returns the zero value of a given shape
    pub fn zero(shape: Shape) -> Self {
        match shape {
            Shape::Scalar => Value::Scalar(0.0),
            Shape::Vector => Value::Vector([0.0; 3]),
            Shape::Tensor => Value::Tensor([[0.0; 3]; 3]),
        }
    }

    /// Returns the identity tensor
    pub fn identity() -> Self {
        Value::Tensor(from_t2(&Tensor2::identity(Mandel::General)))
    }

    /// Returns the shape of this value
    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(..) => Shape::Scalar,
            Value::Vector(..) => Shape::Vector,
            Value::Tensor(..) => Shape::Tensor,
        }
    }

    /// Returns the scalar number or an error if the value is not a scalar
    pub fn scalar(&self) -> Result<f64, StrError> {
        match self {
            Value::Scalar(s) => Ok(*s),
            _ => Err("value is not a scalar"),
        }
    }

    /// Returns the tensor components or an error if the value is not a tensor
    pub fn tensor(&self) -> Result<Tensor3, StrError> {
        match self {
            Value::Tensor(t) => Ok(*t),
            _ => Err("value is not a tensor"),
        }
    }

    /// Returns true if all components are finite
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Scalar(s) => s.is_finite(),
            Value::Vector(v) => v.iter().all(|x| x.is_finite()),
            Value::Tensor(t) => t.iter().all(|row| row.iter().all(|x| x.is_finite())),
        }
    }

    /// Computes self + other (same shapes)
    pub fn add(&self, other: &Value) -> Result<Value, StrError> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(a + b)),
            (Value::Vector(a), Value::Vector(b)) => {
                let mut c = Vector::new(3);
                vec_add(&mut c, 1.0, &Vector::from(a), 1.0, &Vector::from(b))?;
                Ok(Value::Vector(from_vector(&c)))
            }
            (Value::Tensor(a), Value::Tensor(b)) => {
                let mut c = Tensor2::new(Mandel::General);
                t2_add(&mut c, 1.0, &to_t2(a)?, 1.0, &to_t2(b)?);
                Ok(Value::Tensor(from_t2(&c)))
            }
            _ => Err("cannot add values with different shapes"),
        }
    }

    /// Computes alpha * self
    pub fn scale(&self, alpha: f64) -> Value {
        match self {
            Value::Scalar(a) => Value::Scalar(alpha * a),
            Value::Vector(a) => Value::Vector(a.map(|x| alpha * x)),
            Value::Tensor(a) => Value::Tensor(a.map(|row| row.map(|x| alpha * x))),
        }
    }

    /// Computes the product of a scalar by any value (either side may be the scalar)
    pub fn product(a: &Value, b: &Value) -> Result<Value, StrError> {
        match (a, b) {
            (Value::Scalar(s), _) => Ok(b.scale(*s)),
            (_, Value::Scalar(s)) => Ok(a.scale(*s)),
            _ => Err("product requires at least one scalar operand"),
        }
    }

    /// Computes the single contraction (matrix-like product) a · b
    ///
    /// ```text
    /// tensor · tensor → tensor
    /// tensor · vector → vector
    /// vector · tensor → vector
    /// vector · vector → scalar
    /// ```
    pub fn dot(a: &Value, b: &Value) -> Result<Value, StrError> {
        match (a, b) {
            (Value::Tensor(x), Value::Tensor(y)) => {
                let mut c = Tensor2::new(Mandel::General);
                t2_dot_t2(&mut c, &to_t2(x)?, &to_t2(y)?);
                Ok(Value::Tensor(from_t2(&c)))
            }
            (Value::Tensor(x), Value::Vector(y)) => {
                let mut c = Vector::new(3);
                t2_dot_vec(&mut c, 1.0, &to_t2(x)?, &Vector::from(y));
                Ok(Value::Vector(from_vector(&c)))
            }
            (Value::Vector(x), Value::Tensor(y)) => {
                let mut c = Vector::new(3);
                vec_dot_t2(&mut c, 1.0, &Vector::from(x), &to_t2(y)?);
                Ok(Value::Vector(from_vector(&c)))
            }
            (Value::Vector(x), Value::Vector(y)) => Ok(Value::Scalar(vec_inner(&Vector::from(x), &Vector::from(y)))),
            _ => Err("dot product requires vector or tensor operands"),
        }
    }

    /// Computes the full contraction a : b (same shapes)
    pub fn inner(a: &Value, b: &Value) -> Result<Value, StrError> {
        match (a, b) {
            (Value::Scalar(x), Value::Scalar(y)) => Ok(Value::Scalar(x * y)),
            (Value::Vector(x), Value::Vector(y)) => Ok(Value::Scalar(vec_inner(&Vector::from(x), &Vector::from(y)))),
            (Value::Tensor(x), Value::Tensor(y)) => Ok(Value::Scalar(t2_ddot_t2(&to_t2(x)?, &to_t2(y)?))),
            _ => Err("inner product requires operands with the same shape"),
        }
    }

    /// Computes the transpose of a tensor
    pub fn transpose(&self) -> Result<Value, StrError> {
        let a = to_t2(&self.tensor()?)?;
        let mut at = Tensor2::new(Mandel::General);
        a.transpose(&mut at);
        Ok(Value::Tensor(from_t2(&at)))
    }

    /// Computes the trace of a tensor
    pub fn trace(&self) -> Result<Value, StrError> {
        let a = to_t2(&self.tensor()?)?;
        Ok(Value::Scalar(a.trace()))
    }

    /// Computes the deviatoric part of a tensor: dev(a) = a - tr(a)/3 I
    pub fn deviatoric(&self) -> Result<Value, StrError> {
        let a = to_t2(&self.tensor()?)?;
        let mut dev = Tensor2::new(Mandel::General);
        a.deviator(&mut dev);
        Ok(Value::Tensor(from_t2(&dev)))
    }

    /// Extracts a component; `j` is ignored for vectors
    pub fn component(&self, i: usize, j: usize) -> Result<Value, StrError> {
        if i > 2 || j > 2 {
            return Err("component index is out of bounds");
        }
        match self {
            Value::Vector(a) => Ok(Value::Scalar(a[i])),
            Value::Tensor(a) => Ok(Value::Scalar(a[i][j])),
            Value::Scalar(..) => Err("cannot extract component of a scalar"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::expr::Shape;
    use russell_lab::approx_eq;

    #[test]
    fn zero_and_shape_work() {
        assert_eq!(Value::zero(Shape::Scalar), Value::Scalar(0.0));
        assert_eq!(Value::zero(Shape::Vector).shape(), Shape::Vector);
        assert_eq!(Value::zero(Shape::Tensor).shape(), Shape::Tensor);
        assert_eq!(Value::identity().component(1, 1).unwrap(), Value::Scalar(1.0));
        assert_eq!(Value::Vector([1.0, 2.0, 3.0]).scalar().err(), Some("value is not a scalar"));
    }

    fn assert_tensor_approx(a: &Value, correct: &[[f64; 3]; 3]) {
        let t = a.tensor().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                approx_eq(t[i][j], correct[i][j], 1e-13);
            }
        }
    }

    #[test]
    fn algebra_works() {
        let a = Value::Tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let b = Value::Tensor([[1.0, 2.0, 0.0], [3.0, -1.0, 5.0], [0.0, 4.0, 1.0]]);
        let id = Value::identity();
        assert_tensor_approx(&Value::dot(&a, &id).unwrap(), &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_tensor_approx(
            &Value::dot(&a, &b).unwrap(),
            &[[7.0, 12.0, 13.0], [19.0, 27.0, 31.0], [31.0, 42.0, 49.0]],
        );
        assert_tensor_approx(&a.add(&b).unwrap(), &[[2.0, 4.0, 3.0], [7.0, 4.0, 11.0], [7.0, 12.0, 10.0]]);
        approx_eq(Value::inner(&a, &id).unwrap().scalar().unwrap(), 15.0, 1e-14);
        approx_eq(Value::inner(&a, &b).unwrap().scalar().unwrap(), 83.0, 1e-13);
        approx_eq(a.trace().unwrap().scalar().unwrap(), 15.0, 1e-14);
        assert_tensor_approx(&a.transpose().unwrap(), &[[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0]]);
        let dev = a.deviatoric().unwrap();
        assert_tensor_approx(&dev, &[[-4.0, 2.0, 3.0], [4.0, 0.0, 6.0], [7.0, 8.0, 4.0]]);
        approx_eq(dev.trace().unwrap().scalar().unwrap(), 0.0, 1e-14);
        let v = Value::Vector([1.0, 0.0, 0.0]);
        let Value::Vector(av) = Value::dot(&a, &v).unwrap() else { panic!("expected a vector") };
        let Value::Vector(va) = Value::dot(&v, &a).unwrap() else { panic!("expected a vector") };
        for i in 0..3 {
            approx_eq(av[i], [1.0, 4.0, 7.0][i], 1e-14);
            approx_eq(va[i], [1.0, 2.0, 3.0][i], 1e-14);
        }
        assert_eq!(Value::dot(&v, &v).unwrap(), Value::Scalar(1.0));
        assert_eq!(
            v.add(&Value::Vector([0.0, 2.0, 0.0])).unwrap(),
            Value::Vector([1.0, 2.0, 0.0])
        );
        assert_eq!(Value::product(&Value::Scalar(2.0), &v).unwrap(), Value::Vector([2.0, 0.0, 0.0]));
        assert_eq!(
            Value::product(&v, &v).err(),
            Some("product requires at least one scalar operand")
        );
        assert_eq!(a.add(&v).err(), Some("cannot add values with different shapes"));
    }
}
