use super::{replace, ExprArena, ExprId};
use crate::StrError;
use std::collections::HashMap;

/// Defines the integration domain of a form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Measure {
    /// All cells of the mesh
    All,

    /// Only cells with the given attribute (e.g., the gauge region)
    Subdomain(usize),
}

/// Holds an integrand together with its integration measure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Form {
    pub integrand: ExprId,
    pub measure: Measure,
}

impl Form {
    /// Allocates a new instance integrating over the whole mesh
    pub fn new(integrand: ExprId) -> Self {
        Form {
            integrand,
            measure: Measure::All,
        }
    }

    /// Allocates a new instance integrating over a subdomain
    pub fn subdomain(integrand: ExprId, attribute: usize) -> Self {
        Form {
            integrand,
            measure: Measure::Subdomain(attribute),
        }
    }

    /// Returns true if the integrand is structurally zero
    pub fn is_zero(&self, arena: &ExprArena) -> bool {
        arena.is_zero(self.integrand)
    }
}

/// Splits a form into one form per test function
///
/// Block `i` keeps `tests[i]` and replaces every other test function by a zero of
/// matching shape. A test function that does not appear in `form` yields a block equal
/// to `form` with the other functions zeroed.
pub fn extract_forms(arena: &mut ExprArena, form: &Form, tests: &[ExprId]) -> Result<Vec<Form>, StrError> {
    let mut forms = Vec::with_capacity(tests.len());
    for i in 0..tests.len() {
        let mapping = zero_others(arena, tests, i);
        let integrand = replace(arena, form.integrand, &mapping)?;
        forms.push(Form {
            integrand,
            measure: form.measure,
        });
    }
    Ok(forms)
}

/// Splits a bilinear form into a matrix of blocks indexed by (test, trial)
///
/// Block `(i, j)` keeps `tests[i]` and `trials[j]` only. Blocks without any dependency on
/// the pair are structurally zero.
pub fn extract_blocks(
    arena: &mut ExprArena,
    form: &Form,
    tests: &[ExprId],
    trials: &[ExprId],
) -> Result<Vec<Vec<Form>>, StrError> {
    let mut blocks = Vec::with_capacity(tests.len());
    for i in 0..tests.len() {
        let mut row = Vec::with_capacity(trials.len());
        for j in 0..trials.len() {
            let mut mapping = zero_others(arena, tests, i);
            mapping.extend(zero_others(arena, trials, j));
            let integrand = replace(arena, form.integrand, &mapping)?;
            row.push(Form {
                integrand,
                measure: form.measure,
            });
        }
        blocks.push(row);
    }
    Ok(blocks)
}

/// Maps all functions but `keep` to zeros
fn zero_others(arena: &mut ExprArena, functions: &[ExprId], keep: usize) -> HashMap<ExprId, ExprId> {
    let mut mapping = HashMap::new();
    for (k, f) in functions.iter().enumerate() {
        if k != keep {
            let shape = arena.shape(*f);
            mapping.insert(*f, arena.zero(shape));
        }
    }
    mapping
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{extract_blocks, extract_forms, Form, Measure};
    use crate::expr::{derivative, ArgNumber, ExprArena, ExprId, Shape};

    // F = inner(grad(v), S(u)) + q * (h - h0 - u·u)
    fn coupled(arena: &mut ExprArena) -> (Form, Vec<ExprId>, Vec<ExprId>, Vec<ExprId>) {
        let u = arena.coefficient(0, Shape::Vector);
        let h = arena.coefficient(1, Shape::Scalar);
        let h0 = arena.coefficient(2, Shape::Scalar);
        let v = arena.argument(ArgNumber::Test, 0, Shape::Vector);
        let q = arena.argument(ArgNumber::Test, 1, Shape::Scalar);
        let du = arena.argument(ArgNumber::Trial, 0, Shape::Vector);
        let dh = arena.argument(ArgNumber::Trial, 1, Shape::Scalar);
        let gu = arena.grad(u).unwrap();
        let gut = arena.transpose(gu).unwrap();
        let s = arena.sum(gu, gut).unwrap();
        let gv = arena.grad(v).unwrap();
        let t1 = arena.inner(gv, s).unwrap();
        let uu = arena.dot(u, u).unwrap();
        let a = arena.sub(h, h0).unwrap();
        let b = arena.sub(a, uu).unwrap();
        let t2 = arena.product(q, b).unwrap();
        let integrand = arena.sum(t1, t2).unwrap();
        (Form::new(integrand), vec![u, h], vec![v, q], vec![du, dh])
    }

    #[test]
    fn extract_forms_works() {
        let mut arena = ExprArena::new();
        let (form, _, tests, _) = coupled(&mut arena);
        let forms = extract_forms(&mut arena, &form, &tests).unwrap();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].measure, Measure::All);
        assert_eq!(arena.format(forms[0].integrand), "inner(grad(v0), (grad(w0) + grad(w0)ᵀ))");
        assert_eq!(
            arena.format(forms[1].integrand),
            "v1 * ((w1 + -1 * w2) + -1 * dot(w0, w0))"
        );
        // row sum reconstructs the form
        let sum = arena.sum(forms[0].integrand, forms[1].integrand).unwrap();
        assert_eq!(sum, form.integrand);
    }

    #[test]
    fn extract_blocks_works() {
        let mut arena = ExprArena::new();
        let (form, coefs, tests, trials) = coupled(&mut arena);
        let jac = derivative(&mut arena, form.integrand, &coefs, &trials).unwrap();
        let blocks = extract_blocks(&mut arena, &Form::new(jac), &tests, &trials).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert!(!blocks[0][0].is_zero(&arena));
        assert!(blocks[0][1].is_zero(&arena)); // the u-equation does not depend on h
        assert!(!blocks[1][0].is_zero(&arena));
        assert!(!blocks[1][1].is_zero(&arena));
        assert_eq!(arena.format(blocks[1][1].integrand), "v1 * du1");
    }

    #[test]
    fn absent_function_gives_unchanged_block() {
        let mut arena = ExprArena::new();
        let (form, _, mut tests, _) = coupled(&mut arena);
        let alien = arena.argument(ArgNumber::Test, 9, Shape::Scalar);
        tests.push(alien);
        let forms = extract_forms(&mut arena, &form, &tests).unwrap();
        assert!(forms[2].is_zero(&arena));
        let forms = extract_forms(&mut arena, &form, &[alien]).unwrap();
        assert_eq!(forms[0].integrand, form.integrand);
    }
}
