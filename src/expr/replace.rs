use super::{ExprArena, ExprId};
use crate::StrError;
use std::collections::HashMap;

/// Substitutes sub-expressions and rebuilds the graph bottom-up
///
/// Every node found in `mapping` is replaced by its image; all other nodes are rebuilt
/// from their (possibly replaced) operands through the build rules of the arena, thus
/// zeros propagate. Sub-graphs without any replaced node are reused untouched. Results
/// are memoized per node id, so shared sub-expressions are visited once.
pub fn replace(arena: &mut ExprArena, root: ExprId, mapping: &HashMap<ExprId, ExprId>) -> Result<ExprId, StrError> {
    for (from, to) in mapping {
        if arena.shape(*from) != arena.shape(*to) {
            return Err("replacement must have the same shape as the replaced expression");
        }
    }
    let mut memo = HashMap::new();
    replace_node(arena, root, mapping, &mut memo)
}

fn replace_node(
    arena: &mut ExprArena,
    id: ExprId,
    mapping: &HashMap<ExprId, ExprId>,
    memo: &mut HashMap<ExprId, ExprId>,
) -> Result<ExprId, StrError> {
    if let Some(to) = mapping.get(&id) {
        return Ok(*to);
    }
    if let Some(done) = memo.get(&id) {
        return Ok(*done);
    }
    let operands = arena.node(id).operands();
    let mut new_operands = Vec::with_capacity(operands.len());
    for op in operands {
        new_operands.push(replace_node(arena, op, mapping, memo)?);
    }
    let res = arena.reconstruct(id, &new_operands)?;
    memo.insert(id, res);
    Ok(res)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::replace;
    use crate::expr::{ArgNumber, ExprArena, Shape};
    use std::collections::HashMap;

    #[test]
    fn replace_captures_errors() {
        let mut arena = ExprArena::new();
        let a = arena.coefficient(0, Shape::Scalar);
        let b = arena.coefficient(1, Shape::Vector);
        let mapping = HashMap::from([(a, b)]);
        assert_eq!(
            replace(&mut arena, a, &mapping).err(),
            Some("replacement must have the same shape as the replaced expression")
        );
    }

    #[test]
    fn replace_propagates_zeros() {
        // inner(grad(v), S) + q * h  with v → 0  gives  q * h
        let mut arena = ExprArena::new();
        let v = arena.argument(ArgNumber::Test, 0, Shape::Vector);
        let q = arena.argument(ArgNumber::Test, 1, Shape::Scalar);
        let s = arena.coefficient(0, Shape::Tensor);
        let h = arena.coefficient(1, Shape::Scalar);
        let gv = arena.grad(v).unwrap();
        let t1 = arena.inner(gv, s).unwrap();
        let t2 = arena.product(q, h).unwrap();
        let form = arena.sum(t1, t2).unwrap();
        let zero = arena.zero(Shape::Vector);
        let res = replace(&mut arena, form, &HashMap::from([(v, zero)])).unwrap();
        assert_eq!(res, t2);
        // untouched graphs are reused
        let other = arena.argument(ArgNumber::Test, 7, Shape::Vector);
        let zero_other = arena.zero(Shape::Vector);
        let res = replace(&mut arena, form, &HashMap::from([(other, zero_other)])).unwrap();
        assert_eq!(res, form);
    }

    #[test]
    fn replace_keeps_variable_labels() {
        let mut arena = ExprArena::new();
        let a = arena.coefficient(0, Shape::Scalar);
        let b = arena.coefficient(1, Shape::Scalar);
        let ab = arena.sum(a, b).unwrap();
        let x = arena.variable(ab);
        let c = arena.coefficient(2, Shape::Scalar);
        let res = replace(&mut arena, x, &HashMap::from([(b, c)])).unwrap();
        assert_ne!(res, x);
        assert_eq!(arena.variable_label(res), arena.variable_label(x));
    }
}
