use super::{ArgNumber, ExprArena, ExprId, Node, Shape, Value};
use crate::StrError;
use std::collections::HashMap;

/// Provides the values of field coefficients at the current integration point
pub trait TerminalSource {
    /// Returns the value of the coefficient of field `id`
    fn coefficient(&self, id: usize) -> Result<Value, StrError>;

    /// Returns the spatial gradient of the coefficient of field `id`
    fn coefficient_grad(&self, id: usize) -> Result<Value, StrError>;
}

/// Holds a local basis function of a field evaluated at an integration point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasisFunction {
    /// Value of the basis function (same shape as the field)
    pub value: Value,

    /// Gradient of the basis function (None for spaces without gradients)
    pub grad: Option<Value>,
}

/// Binds a test or trial argument to the local basis of a field
#[derive(Clone, Copy, Debug)]
pub struct Binding<'a> {
    /// Index of the field whose argument is bound
    pub field: usize,

    /// Local basis functions at the integration point
    pub basis: &'a [BasisFunction],
}

/// Holds the result of evaluating an expression that is (multi)linear in the arguments
///
/// The values are vectorized over the local basis of the bound test and trial fields.
/// `Both(ntrial, values)` stores `values[a * ntrial + b]` for test function `a` and
/// trial function `b`.
#[derive(Clone, Debug, PartialEq)]
pub enum Multilinear {
    /// Structural zero; compatible with any argument dependence
    Zero(Shape),

    /// No dependence on arguments
    Const(Value),

    /// Linear in the test function
    Test(Vec<Value>),

    /// Linear in the trial function
    Trial(Vec<Value>),

    /// Bilinear in test and trial functions
    Both(usize, Vec<Value>),
}

/// Evaluates expressions at one integration point
///
/// Sub-expressions without arguments are cached for the lifetime of the evaluator, thus
/// allocate one evaluator per integration point and reuse it for all forms at that point.
/// The not-selected branch of a conditional is never evaluated.
pub struct Evaluator<'a> {
    arena: &'a ExprArena,
    source: &'a dyn TerminalSource,
    constants: HashMap<ExprId, Value>,
}

impl<'a> Evaluator<'a> {
    /// Allocates a new instance
    pub fn new(arena: &'a ExprArena, source: &'a dyn TerminalSource) -> Self {
        Evaluator {
            arena,
            source,
            constants: HashMap::new(),
        }
    }

    /// Evaluates an expression that does not depend on arguments
    pub fn value(&mut self, id: ExprId) -> Result<Value, StrError> {
        if let Some(v) = self.constants.get(&id) {
            return Ok(*v);
        }
        let res = match *self.arena.node(id) {
            Node::Zero(shape) => Value::zero(shape),
            Node::Literal(lit) => lit.value(),
            Node::Identity => Value::identity(),
            Node::Coefficient { id, .. } => self.source.coefficient(id)?,
            Node::Argument { .. } => return Err("arguments cannot be evaluated as constants"),
            Node::Variable { expr, .. } => self.value(expr)?,
            Node::Grad(a) => match *self.arena.node(a) {
                Node::Coefficient { id, .. } => self.source.coefficient_grad(id)?,
                _ => return Err("arguments cannot be evaluated as constants"),
            },
            Node::Sum(a, b) => self.value(a)?.add(&self.value(b)?)?,
            Node::Product(a, b) => Value::product(&self.value(a)?, &self.value(b)?)?,
            Node::Division(a, b) => {
                let den = self.value(b)?.scalar()?;
                self.value(a)?.scale(1.0 / den)
            }
            Node::Dot(a, b) => Value::dot(&self.value(a)?, &self.value(b)?)?,
            Node::Inner(a, b) => Value::inner(&self.value(a)?, &self.value(b)?)?,
            Node::Transpose(a) => self.value(a)?.transpose()?,
            Node::Trace(a) => self.value(a)?.trace()?,
            Node::Deviatoric(a) => self.value(a)?.deviatoric()?,
            Node::Component(a, i, j) => self.value(a)?.component(i, j)?,
            Node::AsTensor(c) => {
                let mut t = [[0.0; 3]; 3];
                for i in 0..3 {
                    for j in 0..3 {
                        t[i][j] = self.value(c[i * 3 + j])?.scalar()?;
                    }
                }
                Value::Tensor(t)
            }
            Node::Sqrt(a) => Value::Scalar(f64::sqrt(self.value(a)?.scalar()?)),
            Node::MaxValue(a, b) => Value::Scalar(f64::max(self.value(a)?.scalar()?, self.value(b)?.scalar()?)),
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                if self.value(lhs)?.scalar()? < self.value(rhs)?.scalar()? {
                    self.value(then)?
                } else {
                    self.value(otherwise)?
                }
            }
        };
        self.constants.insert(id, res);
        Ok(res)
    }

    /// Evaluates an expression with the given test and trial bindings
    pub fn evaluate(
        &mut self,
        id: ExprId,
        test: Option<&Binding>,
        trial: Option<&Binding>,
    ) -> Result<Multilinear, StrError> {
        let mut cache = HashMap::new();
        self.eval_node(id, test, trial, &mut cache)
    }

    fn eval_node(
        &mut self,
        id: ExprId,
        test: Option<&Binding>,
        trial: Option<&Binding>,
        cache: &mut HashMap<ExprId, Multilinear>,
    ) -> Result<Multilinear, StrError> {
        let node = *self.arena.node(id);
        if let Node::Zero(shape) = node {
            return Ok(Multilinear::Zero(shape));
        }
        if !self.arena.has_argument(id) {
            return Ok(Multilinear::Const(self.value(id)?));
        }
        if let Some(res) = cache.get(&id) {
            return Ok(res.clone());
        }
        let shape = self.arena.shape(id);
        let res = match node {
            Node::Argument { number, field, .. } => basis_values(number, field, test, trial, false)?,
            Node::Grad(a) => match *self.arena.node(a) {
                Node::Argument { number, field, .. } => basis_values(number, field, test, trial, true)?,
                _ => return Err("gradient is only available for coefficients and arguments"),
            },
            Node::Variable { expr, .. } => self.eval_node(expr, test, trial, cache)?,
            Node::Sum(a, b) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                let mb = self.eval_node(b, test, trial, cache)?;
                add(ma, mb)?
            }
            Node::Product(a, b) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                let mb = self.eval_node(b, test, trial, cache)?;
                combine(ma, mb, shape, Value::product)?
            }
            Node::Division(a, b) => {
                if self.arena.has_argument(b) {
                    return Err("expression is nonlinear in the arguments");
                }
                let den = self.value(b)?.scalar()?;
                let ma = self.eval_node(a, test, trial, cache)?;
                map(ma, shape, |x| Ok(x.scale(1.0 / den)))?
            }
            Node::Dot(a, b) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                let mb = self.eval_node(b, test, trial, cache)?;
                combine(ma, mb, shape, Value::dot)?
            }
            Node::Inner(a, b) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                let mb = self.eval_node(b, test, trial, cache)?;
                combine(ma, mb, shape, Value::inner)?
            }
            Node::Transpose(a) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                map(ma, shape, |x| x.transpose())?
            }
            Node::Trace(a) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                map(ma, shape, |x| x.trace())?
            }
            Node::Deviatoric(a) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                map(ma, shape, |x| x.deviatoric())?
            }
            Node::Component(a, i, j) => {
                let ma = self.eval_node(a, test, trial, cache)?;
                map(ma, shape, |x| x.component(i, j))?
            }
            Node::AsTensor(c) => {
                let mut parts = Vec::with_capacity(9);
                for k in 0..9 {
                    parts.push(self.eval_node(c[k], test, trial, cache)?);
                }
                as_tensor(parts)?
            }
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                if self.arena.has_argument(lhs) || self.arena.has_argument(rhs) {
                    return Err("expression is nonlinear in the arguments");
                }
                if self.value(lhs)?.scalar()? < self.value(rhs)?.scalar()? {
                    self.eval_node(then, test, trial, cache)?
                } else {
                    self.eval_node(otherwise, test, trial, cache)?
                }
            }
            Node::Sqrt(..) | Node::MaxValue(..) => return Err("expression is nonlinear in the arguments"),
            Node::Zero(..) | Node::Literal(..) | Node::Identity | Node::Coefficient { .. } => {
                return Err("terminal without arguments reached the argument evaluator")
            }
        };
        cache.insert(id, res.clone());
        Ok(res)
    }
}

/// Returns the (gradients of) basis functions of a bound argument
fn basis_values(
    number: ArgNumber,
    field: usize,
    test: Option<&Binding>,
    trial: Option<&Binding>,
    gradient: bool,
) -> Result<Multilinear, StrError> {
    let binding = match number {
        ArgNumber::Test => test.ok_or("test function is not bound")?,
        ArgNumber::Trial => trial.ok_or("trial function is not bound")?,
    };
    if binding.field != field {
        return Err("argument belongs to a field that is not bound");
    }
    let mut values = Vec::with_capacity(binding.basis.len());
    for phi in binding.basis {
        if gradient {
            values.push(phi.grad.ok_or("basis function has no gradient")?);
        } else {
            values.push(phi.value);
        }
    }
    Ok(match number {
        ArgNumber::Test => Multilinear::Test(values),
        ArgNumber::Trial => Multilinear::Trial(values),
    })
}

fn map_values<F>(xs: &[Value], f: F) -> Result<Vec<Value>, StrError>
where
    F: Fn(&Value) -> Result<Value, StrError>,
{
    xs.iter().map(f).collect()
}

/// Applies a unary operation
fn map<F>(m: Multilinear, shape: Shape, f: F) -> Result<Multilinear, StrError>
where
    F: Fn(&Value) -> Result<Value, StrError>,
{
    Ok(match m {
        Multilinear::Zero(..) => Multilinear::Zero(shape),
        Multilinear::Const(x) => Multilinear::Const(f(&x)?),
        Multilinear::Test(xs) => Multilinear::Test(map_values(&xs, f)?),
        Multilinear::Trial(xs) => Multilinear::Trial(map_values(&xs, f)?),
        Multilinear::Both(n, xs) => Multilinear::Both(n, map_values(&xs, f)?),
    })
}

/// Adds two results with the same argument dependence
fn add(a: Multilinear, b: Multilinear) -> Result<Multilinear, StrError> {
    let pairwise = |xs: &[Value], ys: &[Value]| -> Result<Vec<Value>, StrError> {
        if xs.len() != ys.len() {
            return Err("cannot add expressions with different arguments");
        }
        xs.iter().zip(ys).map(|(x, y)| x.add(y)).collect()
    };
    Ok(match (a, b) {
        (Multilinear::Zero(..), m) | (m, Multilinear::Zero(..)) => m,
        (Multilinear::Const(x), Multilinear::Const(y)) => Multilinear::Const(x.add(&y)?),
        (Multilinear::Test(xs), Multilinear::Test(ys)) => Multilinear::Test(pairwise(&xs, &ys)?),
        (Multilinear::Trial(xs), Multilinear::Trial(ys)) => Multilinear::Trial(pairwise(&xs, &ys)?),
        (Multilinear::Both(n, xs), Multilinear::Both(m, ys)) if n == m => Multilinear::Both(n, pairwise(&xs, &ys)?),
        _ => return Err("cannot add expressions with different arguments"),
    })
}

/// Applies a binary product-like operation (zero is absorbing)
fn combine<F>(a: Multilinear, b: Multilinear, shape: Shape, op: F) -> Result<Multilinear, StrError>
where
    F: Fn(&Value, &Value) -> Result<Value, StrError>,
{
    use Multilinear::{Both, Const, Test, Trial, Zero};
    Ok(match (a, b) {
        (Zero(..), _) | (_, Zero(..)) => Zero(shape),
        (Const(x), Const(y)) => Const(op(&x, &y)?),
        (Const(x), Test(ys)) => Test(map_values(&ys, |y| op(&x, y))?),
        (Const(x), Trial(ys)) => Trial(map_values(&ys, |y| op(&x, y))?),
        (Const(x), Both(n, ys)) => Both(n, map_values(&ys, |y| op(&x, y))?),
        (Test(xs), Const(y)) => Test(map_values(&xs, |x| op(x, &y))?),
        (Trial(xs), Const(y)) => Trial(map_values(&xs, |x| op(x, &y))?),
        (Both(n, xs), Const(y)) => Both(n, map_values(&xs, |x| op(x, &y))?),
        (Test(xs), Trial(ys)) => {
            let mut values = Vec::with_capacity(xs.len() * ys.len());
            for x in &xs {
                for y in &ys {
                    values.push(op(x, y)?);
                }
            }
            Both(ys.len(), values)
        }
        (Trial(xs), Test(ys)) => {
            let mut values = Vec::with_capacity(xs.len() * ys.len());
            for y in &ys {
                for x in &xs {
                    values.push(op(x, y)?);
                }
            }
            Both(xs.len(), values)
        }
        _ => return Err("expression is nonlinear in the arguments"),
    })
}

/// Assembles a tensor from nine scalar results with the same argument dependence
fn as_tensor(parts: Vec<Multilinear>) -> Result<Multilinear, StrError> {
    // find the argument dependence and the number of values
    let mut template: Option<&Multilinear> = None;
    for p in &parts {
        match p {
            Multilinear::Zero(..) => (),
            Multilinear::Const(..) => return Err("cannot add expressions with different arguments"),
            _ => {
                if let Some(t) = template {
                    if std::mem::discriminant(t) != std::mem::discriminant(p) {
                        return Err("cannot add expressions with different arguments");
                    }
                }
                template = Some(p);
            }
        }
    }
    let (len, ntrial) = match template {
        None => return Ok(Multilinear::Zero(Shape::Tensor)),
        Some(Multilinear::Test(xs)) | Some(Multilinear::Trial(xs)) => (xs.len(), 0),
        Some(Multilinear::Both(n, xs)) => (xs.len(), *n),
        Some(_) => return Err("cannot add expressions with different arguments"),
    };
    let mut values = vec![[[0.0; 3]; 3]; len];
    for (k, p) in parts.iter().enumerate() {
        let xs = match p {
            Multilinear::Test(xs) | Multilinear::Trial(xs) => xs,
            Multilinear::Both(n, xs) if *n == ntrial => xs,
            Multilinear::Zero(..) => continue,
            _ => return Err("cannot add expressions with different arguments"),
        };
        if xs.len() != len {
            return Err("cannot add expressions with different arguments");
        }
        for (t, x) in values.iter_mut().zip(xs) {
            t[k / 3][k % 3] = x.scalar()?;
        }
    }
    let values = values.into_iter().map(Value::Tensor).collect();
    Ok(match template {
        Some(Multilinear::Test(..)) => Multilinear::Test(values),
        Some(Multilinear::Trial(..)) => Multilinear::Trial(values),
        _ => Multilinear::Both(ntrial, values),
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
