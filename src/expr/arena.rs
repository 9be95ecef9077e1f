use super::{ArgNumber, ExprId, Literal, Node, Shape, Value};
use crate::StrError;
use std::collections::HashMap;

/// Holds all nodes of the expression graph
///
/// The arena owns every node; expressions are referred to by [ExprId]. Building a node that
/// already exists returns the existing id (hash-consing), thus memoization keyed by id is
/// equivalent to memoization keyed by structure.
///
/// The builder methods apply the standard build rules of the algebra:
///
/// * zero is the neutral element of the sum
/// * zero is absorbing for product, dot, inner, grad, transpose, trace, deviatoric,
///   component, and square root
/// * max and conditional collapse to zero when both choices are zero
///
/// No other simplification is performed.
pub struct ExprArena {
    /// Holds all nodes
    nodes: Vec<Node>,

    /// Holds the shape of each node
    shapes: Vec<Shape>,

    /// Indicates whether a node depends on a test or trial function
    with_argument: Vec<bool>,

    /// Maps nodes to their ids (hash-consing)
    lookup: HashMap<Node, ExprId>,

    /// Counts the variable labels handed out so far
    n_label: usize,
}

impl ExprArena {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        ExprArena {
            nodes: Vec::new(),
            shapes: Vec::new(),
            with_argument: Vec::new(),
            lookup: HashMap::new(),
            n_label: 0,
        }
    }

    /// Returns the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a node
    pub fn node(&self, id: ExprId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the shape of an expression
    pub fn shape(&self, id: ExprId) -> Shape {
        self.shapes[id.0]
    }

    /// Returns true if the expression depends on a test or trial function
    pub fn has_argument(&self, id: ExprId) -> bool {
        self.with_argument[id.0]
    }

    /// Returns true if the expression is a zero
    pub fn is_zero(&self, id: ExprId) -> bool {
        self.nodes[id.0].is_zero()
    }

    /// Returns the label if the expression is a variable
    pub fn variable_label(&self, id: ExprId) -> Option<usize> {
        match self.nodes[id.0] {
            Node::Variable { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Adds a node or returns the id of an existing identical node
    fn push(&mut self, node: Node, shape: Shape) -> ExprId {
        if let Some(id) = self.lookup.get(&node) {
            return *id;
        }
        let with_argument = match node {
            Node::Argument { .. } => true,
            _ => node.operands().iter().any(|a| self.with_argument[a.0]),
        };
        let id = ExprId(self.nodes.len());
        self.nodes.push(node);
        self.shapes.push(shape);
        self.with_argument.push(with_argument);
        self.lookup.insert(node, id);
        id
    }

    // terminals ---------------------------------------------------------------------------------------------------

    /// Returns a zero with a given shape
    pub fn zero(&mut self, shape: Shape) -> ExprId {
        self.push(Node::Zero(shape), shape)
    }

    /// Returns a scalar constant (zero values become Zero)
    pub fn scalar(&mut self, value: f64) -> ExprId {
        self.literal(Value::Scalar(value))
    }

    /// Returns a constant value (values with all components equal to zero become Zero)
    pub fn literal(&mut self, value: Value) -> ExprId {
        let shape = value.shape();
        let all_zero = match value {
            Value::Scalar(s) => s == 0.0,
            Value::Vector(v) => v.iter().all(|x| *x == 0.0),
            Value::Tensor(t) => t.iter().all(|row| row.iter().all(|x| *x == 0.0)),
        };
        if all_zero {
            return self.zero(shape);
        }
        self.push(Node::Literal(Literal::from_value(&value)), shape)
    }

    /// Returns the identity tensor
    pub fn identity(&mut self) -> ExprId {
        self.push(Node::Identity, Shape::Tensor)
    }

    /// Returns the coefficient (current value) of a discrete field
    pub fn coefficient(&mut self, id: usize, shape: Shape) -> ExprId {
        self.push(Node::Coefficient { id, shape }, shape)
    }

    /// Returns a test or trial function of a discrete field
    pub fn argument(&mut self, number: ArgNumber, field: usize, shape: Shape) -> ExprId {
        self.push(Node::Argument { number, field, shape }, shape)
    }

    /// Wraps an expression into a new differentiation variable
    pub fn variable(&mut self, expr: ExprId) -> ExprId {
        let label = self.n_label;
        self.n_label += 1;
        let shape = self.shape(expr);
        self.push(Node::Variable { expr, label }, shape)
    }

    /// Returns the expression wrapped by a variable (or the expression itself)
    pub fn unwrap_variable(&self, id: ExprId) -> ExprId {
        match self.nodes[id.0] {
            Node::Variable { expr, .. } => expr,
            _ => id,
        }
    }

    // operators ---------------------------------------------------------------------------------------------------

    /// Returns the spatial gradient of a coefficient or argument
    pub fn grad(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        let shape = self.shape(a).grad().ok_or("gradient of tensors is not available")?;
        match self.nodes[a.0] {
            Node::Zero(..) => Ok(self.zero(shape)),
            Node::Coefficient { .. } | Node::Argument { .. } => Ok(self.push(Node::Grad(a), shape)),
            _ => Err("gradient is only available for coefficients and arguments"),
        }
    }

    /// Returns a + b
    pub fn sum(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        let shape = self.shape(a);
        if self.shape(b) != shape {
            return Err("cannot add expressions with different shapes");
        }
        if self.is_zero(a) {
            return Ok(b);
        }
        if self.is_zero(b) {
            return Ok(a);
        }
        Ok(self.push(Node::Sum(a, b), shape))
    }

    /// Returns -a
    pub fn neg(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        let minus_one = self.scalar(-1.0);
        self.product(minus_one, a)
    }

    /// Returns a - b
    pub fn sub(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        let minus_b = self.neg(b)?;
        self.sum(a, minus_b)
    }

    /// Returns the product of a scalar by any expression
    pub fn product(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        let shape = match (self.shape(a), self.shape(b)) {
            (Shape::Scalar, s) => s,
            (s, Shape::Scalar) => s,
            _ => return Err("product requires at least one scalar operand"),
        };
        if self.is_zero(a) || self.is_zero(b) {
            return Ok(self.zero(shape));
        }
        Ok(self.push(Node::Product(a, b), shape))
    }

    /// Returns a / b where b is a scalar
    pub fn division(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        if self.shape(b) != Shape::Scalar {
            return Err("denominator must be a scalar");
        }
        if self.is_zero(b) {
            return Err("division by zero");
        }
        let shape = self.shape(a);
        if self.is_zero(a) {
            return Ok(self.zero(shape));
        }
        Ok(self.push(Node::Division(a, b), shape))
    }

    /// Returns the single contraction a · b
    pub fn dot(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        let shape = match (self.shape(a), self.shape(b)) {
            (Shape::Tensor, Shape::Tensor) => Shape::Tensor,
            (Shape::Tensor, Shape::Vector) => Shape::Vector,
            (Shape::Vector, Shape::Tensor) => Shape::Vector,
            (Shape::Vector, Shape::Vector) => Shape::Scalar,
            _ => return Err("dot product requires vector or tensor operands"),
        };
        if self.is_zero(a) || self.is_zero(b) {
            return Ok(self.zero(shape));
        }
        Ok(self.push(Node::Dot(a, b), shape))
    }

    /// Returns the full contraction a : b
    pub fn inner(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        if self.shape(a) != self.shape(b) {
            return Err("inner product requires operands with the same shape");
        }
        if self.is_zero(a) || self.is_zero(b) {
            return Ok(self.zero(Shape::Scalar));
        }
        Ok(self.push(Node::Inner(a, b), Shape::Scalar))
    }

    /// Returns the transpose of a tensor
    pub fn transpose(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        self.check_tensor(a)?;
        if self.is_zero(a) {
            return Ok(a);
        }
        Ok(self.push(Node::Transpose(a), Shape::Tensor))
    }

    /// Returns the trace of a tensor
    pub fn trace(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        self.check_tensor(a)?;
        if self.is_zero(a) {
            return Ok(self.zero(Shape::Scalar));
        }
        Ok(self.push(Node::Trace(a), Shape::Scalar))
    }

    /// Returns the deviatoric part of a tensor
    pub fn dev(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        self.check_tensor(a)?;
        if self.is_zero(a) {
            return Ok(a);
        }
        Ok(self.push(Node::Deviatoric(a), Shape::Tensor))
    }

    /// Returns the component (i, j) of a tensor or the component i of a vector
    pub fn component(&mut self, a: ExprId, i: usize, j: usize) -> Result<ExprId, StrError> {
        if i > 2 || j > 2 {
            return Err("component index is out of bounds");
        }
        let j = match self.shape(a) {
            Shape::Scalar => return Err("cannot extract component of a scalar"),
            Shape::Vector => 0,
            Shape::Tensor => j,
        };
        if self.is_zero(a) {
            return Ok(self.zero(Shape::Scalar));
        }
        Ok(self.push(Node::Component(a, i, j), Shape::Scalar))
    }

    /// Returns the tensor with the given scalar components (row-major)
    pub fn as_tensor(&mut self, components: [ExprId; 9]) -> Result<ExprId, StrError> {
        if components.iter().any(|c| self.shape(*c) != Shape::Scalar) {
            return Err("tensor components must be scalars");
        }
        if components.iter().all(|c| self.is_zero(*c)) {
            return Ok(self.zero(Shape::Tensor));
        }
        Ok(self.push(Node::AsTensor(components), Shape::Tensor))
    }

    /// Returns the square root of a scalar
    pub fn sqrt(&mut self, a: ExprId) -> Result<ExprId, StrError> {
        self.check_scalar(a)?;
        if self.is_zero(a) {
            return Ok(a);
        }
        Ok(self.push(Node::Sqrt(a), Shape::Scalar))
    }

    /// Returns max(a, b) of scalars
    pub fn max_value(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, StrError> {
        self.check_scalar(a)?;
        self.check_scalar(b)?;
        if self.is_zero(a) && self.is_zero(b) {
            return Ok(a);
        }
        Ok(self.push(Node::MaxValue(a, b), Shape::Scalar))
    }

    /// Returns `if lhs < rhs { then } else { otherwise }`
    pub fn conditional(
        &mut self,
        lhs: ExprId,
        rhs: ExprId,
        then: ExprId,
        otherwise: ExprId,
    ) -> Result<ExprId, StrError> {
        self.check_scalar(lhs)?;
        self.check_scalar(rhs)?;
        let shape = self.shape(then);
        if self.shape(otherwise) != shape {
            return Err("conditional branches must have the same shape");
        }
        if self.is_zero(then) && self.is_zero(otherwise) {
            return Ok(then);
        }
        Ok(self.push(
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            },
            shape,
        ))
    }

    /// Rebuilds a node with new operands through the build rules
    ///
    /// Returns the original id if the operands are unchanged (reuse if untouched).
    pub fn reconstruct(&mut self, id: ExprId, operands: &[ExprId]) -> Result<ExprId, StrError> {
        let node = self.nodes[id.0];
        let old = node.operands();
        if old.len() != operands.len() {
            return Err("number of operands does not match the node");
        }
        if old.as_slice() == operands {
            return Ok(id);
        }
        let o = operands;
        match node {
            Node::Zero(..) | Node::Literal(..) | Node::Identity => Ok(id),
            Node::Coefficient { .. } | Node::Argument { .. } => Ok(id),
            Node::Variable { label, .. } => {
                let shape = self.shape(o[0]);
                Ok(self.push(Node::Variable { expr: o[0], label }, shape))
            }
            Node::Grad(..) => self.grad(o[0]),
            Node::Sum(..) => self.sum(o[0], o[1]),
            Node::Product(..) => self.product(o[0], o[1]),
            Node::Division(..) => self.division(o[0], o[1]),
            Node::Dot(..) => self.dot(o[0], o[1]),
            Node::Inner(..) => self.inner(o[0], o[1]),
            Node::Transpose(..) => self.transpose(o[0]),
            Node::Trace(..) => self.trace(o[0]),
            Node::Deviatoric(..) => self.dev(o[0]),
            Node::Component(_, i, j) => self.component(o[0], i, j),
            Node::AsTensor(..) => {
                let mut c = [o[0]; 9];
                c.copy_from_slice(o);
                self.as_tensor(c)
            }
            Node::Sqrt(..) => self.sqrt(o[0]),
            Node::MaxValue(..) => self.max_value(o[0], o[1]),
            Node::Conditional { .. } => self.conditional(o[0], o[1], o[2], o[3]),
        }
    }

    /// Returns a compact textual representation of an expression (for debugging)
    pub fn format(&self, id: ExprId) -> String {
        match self.nodes[id.0] {
            Node::Zero(..) => "0".to_string(),
            Node::Literal(lit) => match lit.value() {
                Value::Scalar(s) => format!("{}", s),
                v => format!("{:?}", v),
            },
            Node::Identity => "I".to_string(),
            Node::Coefficient { id, .. } => format!("w{}", id),
            Node::Argument { number, field, .. } => match number {
                ArgNumber::Test => format!("v{}", field),
                ArgNumber::Trial => format!("du{}", field),
            },
            Node::Variable { expr, label } => format!("var{}[{}]", label, self.format(expr)),
            Node::Grad(a) => format!("grad({})", self.format(a)),
            Node::Sum(a, b) => format!("({} + {})", self.format(a), self.format(b)),
            Node::Product(a, b) => format!("{} * {}", self.format(a), self.format(b)),
            Node::Division(a, b) => format!("{} / {}", self.format(a), self.format(b)),
            Node::Dot(a, b) => format!("dot({}, {})", self.format(a), self.format(b)),
            Node::Inner(a, b) => format!("inner({}, {})", self.format(a), self.format(b)),
            Node::Transpose(a) => format!("{}ᵀ", self.format(a)),
            Node::Trace(a) => format!("tr({})", self.format(a)),
            Node::Deviatoric(a) => format!("dev({})", self.format(a)),
            Node::Component(a, i, j) => format!("{}[{},{}]", self.format(a), i, j),
            Node::AsTensor(..) => "as_tensor(..)".to_string(),
            Node::Sqrt(a) => format!("sqrt({})", self.format(a)),
            Node::MaxValue(a, b) => format!("max({}, {})", self.format(a), self.format(b)),
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            } => format!(
                "({} < {} ? {} : {})",
                self.format(lhs),
                self.format(rhs),
                self.format(then),
                self.format(otherwise)
            ),
        }
    }

    fn check_scalar(&self, a: ExprId) -> Result<(), StrError> {
        if self.shape(a) != Shape::Scalar {
            return Err("operand must be a scalar");
        }
        Ok(())
    }

    fn check_tensor(&self, a: ExprId) -> Result<(), StrError> {
        if self.shape(a) != Shape::Tensor {
            return Err("operand must be a tensor");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
