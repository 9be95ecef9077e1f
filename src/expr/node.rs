use super::{Tensor3, Value};

/// Defines the shape of an expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Vector,
    Tensor,
}

impl Shape {
    /// Returns the shape of the gradient of an expression with this shape
    pub fn grad(&self) -> Option<Shape> {
        match self {
            Shape::Scalar => Some(Shape::Vector),
            Shape::Vector => Some(Shape::Tensor),
            Shape::Tensor => None,
        }
    }
}

/// Identifies a node in the expression arena
///
/// Nodes are hash-consed, thus two structurally identical expressions share the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) usize);

impl ExprId {
    /// Returns the index of the node in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Distinguishes test functions from trial functions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgNumber {
    Test,
    Trial,
}

/// Holds a constant number, vector, or tensor as raw bits (to make nodes hashable)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Scalar(u64),
    Vector([u64; 3]),
    Tensor([u64; 9]),
}

impl Literal {
    /// Converts a value into a literal
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Scalar(s) => Literal::Scalar(s.to_bits()),
            Value::Vector(v) => Literal::Vector([v[0].to_bits(), v[1].to_bits(), v[2].to_bits()]),
            Value::Tensor(t) => {
                let mut bits = [0; 9];
                for i in 0..3 {
                    for j in 0..3 {
                        bits[i * 3 + j] = t[i][j].to_bits();
                    }
                }
                Literal::Tensor(bits)
            }
        }
    }

    /// Returns the numeric value
    pub fn value(&self) -> Value {
        match self {
            Literal::Scalar(s) => Value::Scalar(f64::from_bits(*s)),
            Literal::Vector(v) => Value::Vector([f64::from_bits(v[0]), f64::from_bits(v[1]), f64::from_bits(v[2])]),
            Literal::Tensor(bits) => {
                let mut t: Tensor3 = [[0.0; 3]; 3];
                for i in 0..3 {
                    for j in 0..3 {
                        t[i][j] = f64::from_bits(bits[i * 3 + j]);
                    }
                }
                Value::Tensor(t)
            }
        }
    }
}

/// Defines the kinds of nodes in the expression graph
///
/// Terminals are `Zero`, `Literal`, `Identity`, `Coefficient`, and `Argument`.
/// All other variants refer to their operands by [ExprId].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// Zero of a given shape (absorbing/neutral element of the algebra)
    Zero(Shape),

    /// Constant value
    Literal(Literal),

    /// Identity tensor
    Identity,

    /// Current value of a discrete field
    Coefficient { id: usize, shape: Shape },

    /// Test or trial function associated with a discrete field
    Argument { number: ArgNumber, field: usize, shape: Shape },

    /// Labelled wrapper around an expression, used as differentiation variable
    Variable { expr: ExprId, label: usize },

    /// Spatial gradient of a terminal
    Grad(ExprId),

    /// a + b
    Sum(ExprId, ExprId),

    /// scalar × any (or any × scalar)
    Product(ExprId, ExprId),

    /// any / scalar
    Division(ExprId, ExprId),

    /// Single contraction a · b
    Dot(ExprId, ExprId),

    /// Full contraction a : b
    Inner(ExprId, ExprId),

    /// Transpose of a tensor
    Transpose(ExprId),

    /// Trace of a tensor
    Trace(ExprId),

    /// Deviatoric part of a tensor
    Deviatoric(ExprId),

    /// Component (i, j) of a tensor or i of a vector
    Component(ExprId, usize, usize),

    /// Tensor assembled from nine scalar components (row-major)
    AsTensor([ExprId; 9]),

    /// Square root of a scalar
    Sqrt(ExprId),

    /// max(a, b) of scalars
    MaxValue(ExprId, ExprId),

    /// if lhs < rhs { then } else { otherwise }
    Conditional {
        lhs: ExprId,
        rhs: ExprId,
        then: ExprId,
        otherwise: ExprId,
    },
}

impl Node {
    /// Returns the operands of this node (empty for terminals)
    pub fn operands(&self) -> Vec<ExprId> {
        match *self {
            Node::Zero(..) | Node::Literal(..) | Node::Identity => Vec::new(),
            Node::Coefficient { .. } | Node::Argument { .. } => Vec::new(),
            Node::Variable { expr, .. } => vec![expr],
            Node::Grad(a) | Node::Transpose(a) | Node::Trace(a) | Node::Deviatoric(a) | Node::Sqrt(a) => vec![a],
            Node::Component(a, _, _) => vec![a],
            Node::Sum(a, b) | Node::Product(a, b) | Node::Division(a, b) => vec![a, b],
            Node::Dot(a, b) | Node::Inner(a, b) | Node::MaxValue(a, b) => vec![a, b],
            Node::AsTensor(c) => c.to_vec(),
            Node::Conditional {
                lhs,
                rhs,
                then,
                otherwise,
            } => vec![lhs, rhs, then, otherwise],
        }
    }

    /// Returns true if this node is a zero
    pub fn is_zero(&self) -> bool {
        matches!(self, Node::Zero(..))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
