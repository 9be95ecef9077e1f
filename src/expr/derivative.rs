use super::{ExprArena, ExprId, Node, Shape, Value};
use crate::StrError;
use std::collections::HashMap;

/// Computes the Gateaux derivative of an expression w.r.t. field coefficients
///
/// Each `coefficients[k]` (a [Node::Coefficient]) is perturbed in the direction of
/// `directions[k]`, usually a test or trial function of the same shape. Variables are
/// transparent: the derivative passes through to the wrapped expression.
///
/// # Examples
///
/// ```
/// use plastsim::expr::{derivative, ArgNumber, ExprArena, Shape};
///
/// # fn main() -> Result<(), &'static str> {
/// let mut arena = ExprArena::new();
/// let h = arena.coefficient(0, Shape::Scalar);
/// let dh = arena.argument(ArgNumber::Trial, 0, Shape::Scalar);
/// let hh = arena.product(h, h)?;
/// let d = derivative(&mut arena, hh, &[h], &[dh])?;
/// assert_eq!(arena.format(d), "(du0 * w0 + w0 * du0)");
/// # Ok(())
/// # }
/// ```
pub fn derivative(
    arena: &mut ExprArena,
    expr: ExprId,
    coefficients: &[ExprId],
    directions: &[ExprId],
) -> Result<ExprId, StrError> {
    if coefficients.len() != directions.len() {
        return Err("the number of directions must equal the number of coefficients");
    }
    let mut seed = HashMap::new();
    for (c, d) in coefficients.iter().zip(directions) {
        match arena.node(*c) {
            Node::Coefficient { .. } => (),
            _ => return Err("can only differentiate w.r.t. coefficients"),
        }
        if arena.shape(*c) != arena.shape(*d) {
            return Err("direction must have the same shape as the coefficient");
        }
        seed.insert(*c, *d);
    }
    Differentiator::new(seed).run(arena, expr)
}

/// Computes the derivative of an expression w.r.t. a variable
///
/// For a scalar variable the result has the shape of `expr`. For a tensor variable `expr`
/// must be a scalar and the result is the tensor `∂expr/∂var` assembled from the nine
/// directional derivatives along the unit tensors.
pub fn diff(arena: &mut ExprArena, expr: ExprId, var: ExprId) -> Result<ExprId, StrError> {
    if arena.variable_label(var).is_none() {
        return Err("can only differentiate w.r.t. variables");
    }
    match arena.shape(var) {
        Shape::Scalar => {
            let one = arena.scalar(1.0);
            Differentiator::new(HashMap::from([(var, one)])).run(arena, expr)
        }
        Shape::Vector => Err("differentiation w.r.t. vector variables is not available"),
        Shape::Tensor => {
            if arena.shape(expr) != Shape::Scalar {
                return Err("can only differentiate scalars w.r.t. tensors");
            }
            let zero = arena.zero(Shape::Scalar);
            let mut components = [zero; 9];
            for i in 0..3 {
                for j in 0..3 {
                    let mut unit = [[0.0; 3]; 3];
                    unit[i][j] = 1.0;
                    let direction = arena.literal(Value::Tensor(unit));
                    let seed = HashMap::from([(var, direction)]);
                    components[i * 3 + j] = Differentiator::new(seed).run(arena, expr)?;
                }
            }
            arena.as_tensor(components)
        }
    }
}

/// Applies the forward-mode differentiation rules with memoization
struct Differentiator {
    /// Maps differentiation terminals (coefficients or variables) to their directions
    seed: HashMap<ExprId, ExprId>,

    /// Memoized results
    memo: HashMap<ExprId, ExprId>,
}

impl Differentiator {
    fn new(seed: HashMap<ExprId, ExprId>) -> Self {
        Differentiator {
            seed,
            memo: HashMap::new(),
        }
    }

    fn run(&mut self, arena: &mut ExprArena, id: ExprId) -> Result<ExprId, StrError> {
        if let Some(d) = self.seed.get(&id) {
            return Ok(*d);
        }
        if let Some(d) = self.memo.get(&id) {
            return Ok(*d);
        }
        let shape = arena.shape(id);
        let d = match *arena.node(id) {
            Node::Zero(..) | Node::Literal(..) | Node::Identity => arena.zero(shape),
            Node::Coefficient { .. } | Node::Argument { .. } => arena.zero(shape),
            Node::Variable { expr, .. } => self.run(arena, expr)?,
            Node::Grad(a) => {
                let da = self.run(arena, a)?;
                arena.grad(da)?
            }
            Node::Sum(a, b) => {
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                arena.sum(da, db)?
            }
            Node::Product(a, b) => {
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                let t1 = arena.product(da, b)?;
                let t2 = arena.product(a, db)?;
                arena.sum(t1, t2)?
            }
            Node::Division(a, b) => {
                // (a/b)' = a'/b - a b'/b²
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                let t1 = arena.division(da, b)?;
                let bb = arena.product(b, b)?;
                let a_bb = arena.division(a, bb)?;
                let t2 = arena.product(a_bb, db)?;
                arena.sub(t1, t2)?
            }
            Node::Dot(a, b) => {
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                let t1 = arena.dot(da, b)?;
                let t2 = arena.dot(a, db)?;
                arena.sum(t1, t2)?
            }
            Node::Inner(a, b) => {
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                let t1 = arena.inner(da, b)?;
                let t2 = arena.inner(a, db)?;
                arena.sum(t1, t2)?
            }
            Node::Transpose(a) => {
                let da = self.run(arena, a)?;
                arena.transpose(da)?
            }
            Node::Trace(a) => {
                let da = self.run(arena, a)?;
                arena.trace(da)?
            }
            Node::Deviatoric(a) => {
                let da = self.run(arena, a)?;
                arena.dev(da)?
            }
            Node::Component(a, i, j) => {
                let da = self.run(arena, a)?;
                arena.component(da, i, j)?
            }
            Node::AsTensor(c) => {
                let mut dc = c;
                for k in 0..9 {
                    dc[k] = self.run(arena, c[k])?;
                }
                arena.as_tensor(dc)?
            }
            Node::Sqrt(a) => {
                // sqrt(a)' = a' / (2 sqrt(a))
                let da = self.run(arena, a)?;
                if arena.is_zero(da) {
                    da
                } else {
                    let two = arena.scalar(2.0);
                    let den = arena.product(two, id)?;
                    arena.division(da, den)?
                }
            }
            Node::MaxValue(a, b) => {
                let da = self.run(arena, a)?;
                let db = self.run(arena, b)?;
                arena.conditional(a, b, db, da)?
            }
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                let d_then = self.run(arena, then)?;
                let d_otherwise = self.run(arena, otherwise)?;
                arena.conditional(lhs, rhs, d_then, d_otherwise)?
            }
        };
        self.memo.insert(id, d);
        Ok(d)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
