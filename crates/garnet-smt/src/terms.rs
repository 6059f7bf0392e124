use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Quantifier-free integer terms, independent of any backend.
///
/// SSA symbols of the equation appear as [`SmtTerm::Var`]; the same terms are
/// handed to every backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),

    // Arithmetic
    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),

    // Comparison
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

macro_rules! binary_builders {
    ($($(#[$doc:meta])* $method:ident => $variant:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(self, rhs: SmtTerm) -> Self {
                SmtTerm::$variant(Box::new(self), Box::new(rhs))
            }
        )*
    };
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    binary_builders! {
        add => Add;
        sub => Sub;
        mul => Mul;
        eq => Eq;
        lt => Lt;
        le => Le;
        gt => Gt;
        ge => Ge;
        /// Material implication `self => rhs`.
        implies => Implies;
    }

    /// Disequality, encoded as `(not (= self rhs))`.
    pub fn ne(self, rhs: SmtTerm) -> Self {
        self.eq(rhs).not()
    }

    pub fn and(conjuncts: Vec<SmtTerm>) -> Self {
        SmtTerm::And(conjuncts)
    }

    pub fn or(disjuncts: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(disjuncts)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, SmtTerm::BoolLit(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, SmtTerm::BoolLit(false))
    }

    /// Collect the variable names occurring in this term, in first-occurrence
    /// order.
    pub fn collect_vars(&self, out: &mut IndexSet<String>) {
        match self {
            SmtTerm::Var(name) => {
                if !out.contains(name.as_str()) {
                    out.insert(name.clone());
                }
            }
            SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => {}
            SmtTerm::Add(lhs, rhs)
            | SmtTerm::Sub(lhs, rhs)
            | SmtTerm::Mul(lhs, rhs)
            | SmtTerm::Eq(lhs, rhs)
            | SmtTerm::Lt(lhs, rhs)
            | SmtTerm::Le(lhs, rhs)
            | SmtTerm::Gt(lhs, rhs)
            | SmtTerm::Ge(lhs, rhs)
            | SmtTerm::Implies(lhs, rhs) => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
            SmtTerm::And(terms) | SmtTerm::Or(terms) => {
                for t in terms {
                    t.collect_vars(out);
                }
            }
            SmtTerm::Not(inner) => inner.collect_vars(out),
            SmtTerm::Ite(cond, then, els) => {
                cond.collect_vars(out);
                then.collect_vars(out);
                els.collect_vars(out);
            }
        }
    }

    /// The variable names occurring in this term, in first-occurrence order.
    pub fn vars(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.collect_vars(&mut out);
        out
    }

    /// Constant-fold literals and flatten trivial Boolean structure.
    ///
    /// The result is equivalent to `self` under every assignment. Integer
    /// folding that would overflow `i64` is left unfolded.
    pub fn simplify(&self) -> SmtTerm {
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => self.clone(),
            SmtTerm::Add(lhs, rhs) => fold_int(lhs, rhs, i64::checked_add, SmtTerm::add),
            SmtTerm::Sub(lhs, rhs) => fold_int(lhs, rhs, i64::checked_sub, SmtTerm::sub),
            SmtTerm::Mul(lhs, rhs) => fold_int(lhs, rhs, i64::checked_mul, SmtTerm::mul),
            SmtTerm::Eq(lhs, rhs) => {
                let (l, r) = (lhs.simplify(), rhs.simplify());
                match (&l, &r) {
                    (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) => SmtTerm::bool(a == b),
                    (SmtTerm::BoolLit(a), SmtTerm::BoolLit(b)) => SmtTerm::bool(a == b),
                    _ if l == r => SmtTerm::bool(true),
                    _ => l.eq(r),
                }
            }
            SmtTerm::Lt(lhs, rhs) => fold_cmp(lhs, rhs, |a, b| a < b, SmtTerm::lt),
            SmtTerm::Le(lhs, rhs) => fold_cmp(lhs, rhs, |a, b| a <= b, SmtTerm::le),
            SmtTerm::Gt(lhs, rhs) => fold_cmp(lhs, rhs, |a, b| a > b, SmtTerm::gt),
            SmtTerm::Ge(lhs, rhs) => fold_cmp(lhs, rhs, |a, b| a >= b, SmtTerm::ge),
            SmtTerm::And(terms) => {
                let mut kept = Vec::with_capacity(terms.len());
                for t in terms {
                    match t.simplify() {
                        SmtTerm::BoolLit(true) => {}
                        SmtTerm::BoolLit(false) => return SmtTerm::bool(false),
                        SmtTerm::And(inner) => kept.extend(inner),
                        other => kept.push(other),
                    }
                }
                match kept.len() {
                    0 => SmtTerm::bool(true),
                    1 => kept.remove(0),
                    _ => SmtTerm::And(kept),
                }
            }
            SmtTerm::Or(terms) => {
                let mut kept = Vec::with_capacity(terms.len());
                for t in terms {
                    match t.simplify() {
                        SmtTerm::BoolLit(false) => {}
                        SmtTerm::BoolLit(true) => return SmtTerm::bool(true),
                        SmtTerm::Or(inner) => kept.extend(inner),
                        other => kept.push(other),
                    }
                }
                match kept.len() {
                    0 => SmtTerm::bool(false),
                    1 => kept.remove(0),
                    _ => SmtTerm::Or(kept),
                }
            }
            SmtTerm::Not(inner) => match inner.simplify() {
                SmtTerm::BoolLit(b) => SmtTerm::bool(!b),
                SmtTerm::Not(double) => *double,
                other => other.not(),
            },
            SmtTerm::Implies(lhs, rhs) => {
                let (l, r) = (lhs.simplify(), rhs.simplify());
                match (&l, &r) {
                    (SmtTerm::BoolLit(false), _) | (_, SmtTerm::BoolLit(true)) => {
                        SmtTerm::bool(true)
                    }
                    (SmtTerm::BoolLit(true), _) => r,
                    (_, SmtTerm::BoolLit(false)) => l.not().simplify(),
                    _ if l == r => SmtTerm::bool(true),
                    _ => l.implies(r),
                }
            }
            SmtTerm::Ite(cond, then, els) => {
                let (c, t, e) = (cond.simplify(), then.simplify(), els.simplify());
                match c {
                    SmtTerm::BoolLit(true) => t,
                    SmtTerm::BoolLit(false) => e,
                    _ if t == e => t,
                    _ => SmtTerm::ite(c, t, e),
                }
            }
        }
    }
}

fn fold_int(
    lhs: &SmtTerm,
    rhs: &SmtTerm,
    op: fn(i64, i64) -> Option<i64>,
    rebuild: fn(SmtTerm, SmtTerm) -> SmtTerm,
) -> SmtTerm {
    let (l, r) = (lhs.simplify(), rhs.simplify());
    if let (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) = (&l, &r) {
        if let Some(n) = op(*a, *b) {
            return SmtTerm::int(n);
        }
    }
    rebuild(l, r)
}

fn fold_cmp(
    lhs: &SmtTerm,
    rhs: &SmtTerm,
    op: fn(i64, i64) -> bool,
    rebuild: fn(SmtTerm, SmtTerm) -> SmtTerm,
) -> SmtTerm {
    let (l, r) = (lhs.simplify(), rhs.simplify());
    match (&l, &r) {
        (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) => SmtTerm::bool(op(*a, *b)),
        _ => rebuild(l, r),
    }
}

impl std::fmt::Display for SmtTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();
        crate::backends::smtlib_printer::write_term(&mut text, self);
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_are_collected_once_in_first_occurrence_order() {
        let term = SmtTerm::and(vec![
            SmtTerm::var("y#1").gt(SmtTerm::var("x#1")),
            SmtTerm::var("x#1").eq(SmtTerm::int(3)),
            SmtTerm::var("z#2"),
        ]);
        let vars: Vec<String> = term.vars().into_iter().collect();
        assert_eq!(vars, vec!["y#1", "x#1", "z#2"]);
    }

    #[test]
    fn simplify_folds_constant_guards() {
        let guard = SmtTerm::bool(true).implies(SmtTerm::int(2).add(SmtTerm::int(3)).eq(SmtTerm::int(5)));
        assert!(guard.simplify().is_true());

        let dead = SmtTerm::and(vec![SmtTerm::var("g"), SmtTerm::int(1).gt(SmtTerm::int(2))]);
        assert!(dead.simplify().is_false());
    }

    #[test]
    fn simplify_keeps_symbolic_structure() {
        let term = SmtTerm::and(vec![
            SmtTerm::bool(true),
            SmtTerm::var("a").not().not(),
            SmtTerm::and(vec![SmtTerm::var("b")]),
        ]);
        assert_eq!(
            term.simplify(),
            SmtTerm::And(vec![SmtTerm::var("a"), SmtTerm::var("b")])
        );
    }

    #[test]
    fn simplify_does_not_fold_overflowing_arithmetic() {
        let term = SmtTerm::int(i64::MAX).add(SmtTerm::int(1));
        assert_eq!(term.simplify(), term);
    }

    #[test]
    fn implication_with_identical_sides_is_true() {
        let x = SmtTerm::var("x").ge(SmtTerm::int(0));
        assert!(x.clone().implies(x).simplify().is_true());
    }
}
