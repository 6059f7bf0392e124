use std::borrow::Cow;
use std::fmt::Write;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    let mut out = String::new();
    write_term(&mut out, term);
    out
}

/// Append the SMT-LIB2 rendering of `term` to `out`.
pub fn write_term(out: &mut String, term: &SmtTerm) {
    match term {
        SmtTerm::Var(name) => out.push_str(&symbol_to_smtlib(name)),
        // unsigned_abs keeps i64::MIN printable
        SmtTerm::IntLit(n) if *n < 0 => {
            let _ = write!(out, "(- {})", n.unsigned_abs());
        }
        SmtTerm::IntLit(n) => {
            let _ = write!(out, "{n}");
        }
        SmtTerm::BoolLit(b) => out.push_str(if *b { "true" } else { "false" }),
        SmtTerm::Add(l, r) => apply(out, "+", [l, r]),
        SmtTerm::Sub(l, r) => apply(out, "-", [l, r]),
        SmtTerm::Mul(l, r) => apply(out, "*", [l, r]),
        SmtTerm::Eq(l, r) => apply(out, "=", [l, r]),
        SmtTerm::Lt(l, r) => apply(out, "<", [l, r]),
        SmtTerm::Le(l, r) => apply(out, "<=", [l, r]),
        SmtTerm::Gt(l, r) => apply(out, ">", [l, r]),
        SmtTerm::Ge(l, r) => apply(out, ">=", [l, r]),
        SmtTerm::Implies(l, r) => apply(out, "=>", [l, r]),
        SmtTerm::Not(inner) => apply(out, "not", [inner]),
        SmtTerm::Ite(c, t, e) => apply(out, "ite", [c, t, e]),
        SmtTerm::And(args) => connective(out, "and", "true", args),
        SmtTerm::Or(args) => connective(out, "or", "false", args),
    }
}

fn apply<'a, I>(out: &mut String, op: &str, args: I)
where
    I: IntoIterator<Item = &'a Box<SmtTerm>>,
{
    out.push('(');
    out.push_str(op);
    for arg in args {
        out.push(' ');
        write_term(out, arg);
    }
    out.push(')');
}

// Empty and singleton connectives collapse to their unit or operand.
fn connective(out: &mut String, op: &str, unit: &str, args: &[SmtTerm]) {
    match args {
        [] => out.push_str(unit),
        [only] => write_term(out, only),
        _ => {
            out.push('(');
            out.push_str(op);
            for arg in args {
                out.push(' ');
                write_term(out, arg);
            }
            out.push(')');
        }
    }
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}

/// Render a symbol, quoting it with `|...|` when it is not a simple symbol.
///
/// SSA names such as `x#3` contain characters outside the simple-symbol
/// alphabet and must be quoted.
pub fn symbol_to_smtlib(name: &str) -> Cow<'_, str> {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c));
    if simple {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("|{name}|"))
    }
}

/// Render a complete, self-contained SMT-LIB2 script: logic, declarations,
/// assertions and a final `(check-sat)`.
pub fn script_to_smtlib(decls: &[(String, SmtSort)], assertions: &[SmtTerm]) -> String {
    let mut out = String::from("(set-logic QF_LIA)\n");
    for (name, sort) in decls {
        let _ = writeln!(
            out,
            "(declare-const {} {})",
            symbol_to_smtlib(name),
            sort_to_smtlib(sort)
        );
    }
    for term in assertions {
        out.push_str("(assert ");
        write_term(&mut out, term);
        out.push_str(")\n");
    }
    out.push_str("(check-sat)\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_simple_term() {
        let term = SmtTerm::var("x").add(SmtTerm::int(1)).ge(SmtTerm::int(0));
        assert_eq!(to_smtlib(&term), "(>= (+ x 1) 0)");
    }

    #[test]
    fn print_and_term() {
        let term = SmtTerm::and(vec![
            SmtTerm::var("a").gt(SmtTerm::int(0)),
            SmtTerm::var("b").lt(SmtTerm::int(10)),
        ]);
        assert_eq!(to_smtlib(&term), "(and (> a 0) (< b 10))");
    }

    #[test]
    fn ssa_names_are_quoted() {
        let term = SmtTerm::var("x#2").eq(SmtTerm::int(-4));
        assert_eq!(to_smtlib(&term), "(= |x#2| (- 4))");
        assert_eq!(symbol_to_smtlib("clock_3"), "clock_3");
        assert_eq!(symbol_to_smtlib("3x"), "|3x|");
    }

    #[test]
    fn script_declares_before_asserting() {
        let script = script_to_smtlib(
            &[("x#1".to_string(), SmtSort::Int)],
            &[SmtTerm::var("x#1").gt(SmtTerm::int(0))],
        );
        assert_eq!(
            script,
            "(set-logic QF_LIA)\n(declare-const |x#1| Int)\n(assert (> |x#1| 0))\n(check-sat)\n"
        );
    }
}
