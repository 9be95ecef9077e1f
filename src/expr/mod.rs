//! Implements the symbolic expression graph used to write weak forms
//!
//! Expressions live in an [ExprArena] and refer to each other by [ExprId]. The module
//! provides automatic differentiation ([derivative], [diff]), structural substitution
//! ([replace]), block extraction ([extract_forms], [extract_blocks]), and numeric
//! evaluation at integration points ([Evaluator]).

mod arena;
mod blocks;
mod derivative;
mod evaluator;
mod node;
mod replace;
mod value;
pub use crate::expr::arena::*;
pub use crate::expr::blocks::*;
pub use crate::expr::derivative::*;
pub use crate::expr::evaluator::*;
pub use crate::expr::node::*;
pub use crate::expr::replace::*;
pub use crate::expr::value::*;
