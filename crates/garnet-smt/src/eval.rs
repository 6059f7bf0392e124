//! Partial evaluation of terms under a (possibly incomplete) assignment.
//!
//! Evaluation is three-valued: a result of `None` means the value depends on
//! an unassigned symbol. Boolean connectives short-circuit, so
//! `false ∧ unknown` is `false` and `true ∨ unknown` is `true`. This is what
//! lets the bounded solver prune partial assignments and lets the trace
//! builder evaluate guards that mention sliced-away symbols.

use crate::solver::ModelValue;
use crate::terms::SmtTerm;

/// Evaluate `term`, resolving variables through `lookup`.
///
/// Integer overflow and sort mismatches evaluate to `None`.
pub fn eval(term: &SmtTerm, lookup: &dyn Fn(&str) -> Option<ModelValue>) -> Option<ModelValue> {
    match term {
        SmtTerm::Var(name) => lookup(name),
        SmtTerm::IntLit(n) => Some(ModelValue::Int(*n)),
        SmtTerm::BoolLit(b) => Some(ModelValue::Bool(*b)),
        SmtTerm::Add(lhs, rhs) => int_op(lhs, rhs, lookup, i64::checked_add),
        SmtTerm::Sub(lhs, rhs) => int_op(lhs, rhs, lookup, i64::checked_sub),
        SmtTerm::Mul(lhs, rhs) => int_op(lhs, rhs, lookup, i64::checked_mul),
        SmtTerm::Eq(lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            let r = eval(rhs, lookup)?;
            if l.sort() != r.sort() {
                return None;
            }
            Some(ModelValue::Bool(l == r))
        }
        SmtTerm::Lt(lhs, rhs) => cmp_op(lhs, rhs, lookup, |a, b| a < b),
        SmtTerm::Le(lhs, rhs) => cmp_op(lhs, rhs, lookup, |a, b| a <= b),
        SmtTerm::Gt(lhs, rhs) => cmp_op(lhs, rhs, lookup, |a, b| a > b),
        SmtTerm::Ge(lhs, rhs) => cmp_op(lhs, rhs, lookup, |a, b| a >= b),
        SmtTerm::And(terms) => {
            let mut unknown = false;
            for t in terms {
                match eval_bool(t, lookup) {
                    Some(false) => return Some(ModelValue::Bool(false)),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            (!unknown).then_some(ModelValue::Bool(true))
        }
        SmtTerm::Or(terms) => {
            let mut unknown = false;
            for t in terms {
                match eval_bool(t, lookup) {
                    Some(true) => return Some(ModelValue::Bool(true)),
                    Some(false) => {}
                    None => unknown = true,
                }
            }
            (!unknown).then_some(ModelValue::Bool(false))
        }
        SmtTerm::Not(inner) => eval_bool(inner, lookup).map(|b| ModelValue::Bool(!b)),
        SmtTerm::Implies(lhs, rhs) => match (eval_bool(lhs, lookup), eval_bool(rhs, lookup)) {
            (Some(false), _) | (_, Some(true)) => Some(ModelValue::Bool(true)),
            (Some(true), Some(false)) => Some(ModelValue::Bool(false)),
            _ => None,
        },
        SmtTerm::Ite(cond, then, els) => match eval_bool(cond, lookup) {
            Some(true) => eval(then, lookup),
            Some(false) => eval(els, lookup),
            None => {
                let t = eval(then, lookup)?;
                let e = eval(els, lookup)?;
                (t == e).then_some(t)
            }
        },
    }
}

/// Evaluate a Boolean term; `None` for unknown or non-Boolean results.
pub fn eval_bool(term: &SmtTerm, lookup: &dyn Fn(&str) -> Option<ModelValue>) -> Option<bool> {
    eval(term, lookup).and_then(|v| v.as_bool())
}

fn int_op(
    lhs: &SmtTerm,
    rhs: &SmtTerm,
    lookup: &dyn Fn(&str) -> Option<ModelValue>,
    op: fn(i64, i64) -> Option<i64>,
) -> Option<ModelValue> {
    let l = eval(lhs, lookup)?.as_int()?;
    let r = eval(rhs, lookup)?.as_int()?;
    op(l, r).map(ModelValue::Int)
}

fn cmp_op(
    lhs: &SmtTerm,
    rhs: &SmtTerm,
    lookup: &dyn Fn(&str) -> Option<ModelValue>,
    op: fn(i64, i64) -> bool,
) -> Option<ModelValue> {
    let l = eval(lhs, lookup)?.as_int()?;
    let r = eval(rhs, lookup)?.as_int()?;
    Some(ModelValue::Bool(op(l, r)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<ModelValue> {
        None
    }

    #[test]
    fn connectives_short_circuit_over_unknowns() {
        let unknown = SmtTerm::var("u");
        let f = SmtTerm::and(vec![unknown.clone(), SmtTerm::bool(false)]);
        assert_eq!(eval_bool(&f, &none), Some(false));

        let t = SmtTerm::or(vec![unknown.clone(), SmtTerm::bool(true)]);
        assert_eq!(eval_bool(&t, &none), Some(true));

        let open = SmtTerm::and(vec![unknown.clone(), SmtTerm::bool(true)]);
        assert_eq!(eval_bool(&open, &none), None);

        let vacuous = SmtTerm::bool(false).implies(unknown);
        assert_eq!(eval_bool(&vacuous, &none), Some(true));
    }

    #[test]
    fn arithmetic_uses_lookup_and_rejects_overflow() {
        let lookup = |name: &str| match name {
            "x" => Some(ModelValue::Int(4)),
            "big" => Some(ModelValue::Int(i64::MAX)),
            _ => None,
        };
        let sum = SmtTerm::var("x").mul(SmtTerm::int(3)).sub(SmtTerm::int(2));
        assert_eq!(eval(&sum, &lookup), Some(ModelValue::Int(10)));

        let overflow = SmtTerm::var("big").add(SmtTerm::int(1));
        assert_eq!(eval(&overflow, &lookup), None);
    }

    #[test]
    fn sort_mismatch_is_unknown() {
        let bad = SmtTerm::int(1).eq(SmtTerm::bool(true));
        assert_eq!(eval(&bad, &none), None);
        let bad_cmp = SmtTerm::bool(true).lt(SmtTerm::int(0));
        assert_eq!(eval(&bad_cmp, &none), None);
    }

    #[test]
    fn ite_with_unknown_condition_resolves_when_branches_agree() {
        let same = SmtTerm::ite(SmtTerm::var("c"), SmtTerm::int(7), SmtTerm::int(7));
        assert_eq!(eval(&same, &none), Some(ModelValue::Int(7)));
        let differ = SmtTerm::ite(SmtTerm::var("c"), SmtTerm::int(7), SmtTerm::int(8));
        assert_eq!(eval(&differ, &none), None);
    }
}
