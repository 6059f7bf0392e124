//! Proptest strategies for generating well-formed single-threaded equations.

use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;
use proptest::prelude::*;

use crate::equation::{Equation, SourceLocation, Step};
use crate::namespace::Namespace;

/// Integer constants stay inside this range so that every value an equation
/// can compute is either a constant or a copy of an input.
const CONST_RANGE: std::ops::RangeInclusive<i64> = -3..=3;

/// Shared accesses beyond this many become plain copies, so the clocks of a
/// memory-model encoding fit in the constant range.
const MAX_SHARED: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    /// `t#1 := ite(a < b, c, d)` or a plain copy, picked by the flag.
    Assign {
        cmp: (usize, usize),
        then: Operand,
        els: Operand,
        plain: bool,
    },
    Assume(Cond),
    Assert(Cond),
    /// Write `value` to, or read from, the shared location `g`.
    Shared { write: bool, value: Operand },
}

#[derive(Debug, Clone)]
enum Operand {
    Const(i64),
    Symbol(usize),
}

#[derive(Debug, Clone)]
struct Cond {
    lhs: usize,
    rhs: Operand,
    le: bool,
    guarded: Option<usize>,
}

fn arb_operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        CONST_RANGE.prop_map(Operand::Const),
        (0..64usize).prop_map(Operand::Symbol),
    ]
}

fn arb_cond() -> impl Strategy<Value = Cond> {
    (
        0..64usize,
        arb_operand(),
        any::<bool>(),
        proptest::option::of(0..64usize),
    )
        .prop_map(|(lhs, rhs, le, guarded)| Cond {
            lhs,
            rhs,
            le,
            guarded,
        })
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => ((0..64usize, 0..64usize), arb_operand(), arb_operand(), any::<bool>())
            .prop_map(|(cmp, then, els, plain)| Op::Assign { cmp, then, els, plain }),
        1 => arb_cond().prop_map(Op::Assume),
        2 => arb_cond().prop_map(Op::Assert),
        1 => (any::<bool>(), arb_operand()).prop_map(|(write, value)| Op::Shared { write, value }),
    ]
}

/// Strategy for a single-threaded equation and the namespace declaring its
/// symbols.
///
/// Generated equations have:
/// - 1–3 unconstrained integer inputs
/// - 1–10 further steps mixing assignments, assumptions and assertions
/// - only comparisons, copies and `ite`, never arithmetic, so every
///   computed value is a constant from `-3..=3` or an input value
/// - at most three accesses to the shared location `g`, so that a memory
///   model adds `Constraint` steps
/// - every symbol defined before it is read
pub fn arb_equation() -> impl Strategy<Value = (Namespace, Equation)> {
    (1..=3usize, proptest::collection::vec(arb_op(), 1..=10)).prop_map(|(ninputs, ops)| {
        let mut ns = Namespace::new();
        ns.declare_shared("g", SmtSort::Int);
        let mut eq = Equation::new();
        let mut defined: Vec<String> = Vec::new();
        let mut shared = 0;

        for i in 0..ninputs {
            let base = format!("in{i}");
            ns.declare(base.as_str(), SmtSort::Int);
            let ssa = format!("{base}#1");
            eq.push(Step::input(ssa.as_str()).at(SourceLocation::new("gen.c", "main", i as u32 + 1)));
            defined.push(ssa);
        }

        let pick = |defined: &[String], i: usize| SmtTerm::var(defined[i % defined.len()].clone());
        let operand = |defined: &[String], o: &Operand| match o {
            Operand::Const(n) => SmtTerm::int(*n),
            Operand::Symbol(i) => pick(defined, *i),
        };
        let cond = |defined: &[String], c: &Cond| {
            let lhs = pick(defined, c.lhs);
            let rhs = operand(defined, &c.rhs);
            if c.le {
                lhs.le(rhs)
            } else {
                lhs.eq(rhs)
            }
        };

        let mut asserts = 0;
        for (k, op) in ops.iter().enumerate() {
            let line = (ninputs + k) as u32 + 1;
            let source = SourceLocation::new("gen.c", "main", line);
            let step = match op {
                Op::Assign {
                    cmp,
                    then,
                    els,
                    plain,
                } => {
                    let rhs = if *plain {
                        operand(&defined, then)
                    } else {
                        SmtTerm::ite(
                            pick(&defined, cmp.0).lt(pick(&defined, cmp.1)),
                            operand(&defined, then),
                            operand(&defined, els),
                        )
                    };
                    let base = format!("t{k}");
                    ns.declare(base.as_str(), SmtSort::Int);
                    let ssa = format!("{base}#1");
                    let step = Step::assignment(ssa.as_str(), rhs);
                    defined.push(ssa);
                    step
                }
                Op::Shared { write, value } if shared < MAX_SHARED => {
                    shared += 1;
                    if *write {
                        let ssa = format!("g#{shared}");
                        eq.push(
                            Step::assignment(ssa.as_str(), operand(&defined, value))
                                .at(source.clone()),
                        );
                        Step::shared_write(ssa, "g")
                    } else {
                        let base = format!("t{k}");
                        ns.declare(base.as_str(), SmtSort::Int);
                        let ssa = format!("{base}#1");
                        let step = Step::shared_read(ssa.as_str(), "g");
                        defined.push(ssa);
                        step
                    }
                }
                Op::Shared { value, .. } => {
                    let base = format!("t{k}");
                    ns.declare(base.as_str(), SmtSort::Int);
                    let ssa = format!("{base}#1");
                    let step = Step::assignment(ssa.as_str(), operand(&defined, value));
                    defined.push(ssa);
                    step
                }
                Op::Assume(c) => Step::assumption(cond(&defined, c)),
                Op::Assert(c) => {
                    asserts += 1;
                    let step = Step::assertion(format!("main.assertion.{asserts}"), cond(&defined, c));
                    match c.guarded {
                        Some(g) => step.with_guard(pick(&defined, g).ge(SmtTerm::int(0))),
                        None => step,
                    }
                }
            };
            eq.push(step.at(source));
        }
        (ns, eq)
    })
}
