//! Backend parity tests: the z3 and cvc5 process backends must agree on
//! SAT/UNSAT verdicts and on models for quoted SSA symbols.
//!
//! Both solvers are external binaries, so every test is `#[ignore]`d. Run with
//! `cargo test -p garnet-smt -- --ignored` on a machine that has them.

use garnet_smt::backends::process::{ProcessSolver, SolverCommand};
use garnet_smt::solver::{SatResult, SmtSolver};
use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;

fn check_with(command: SolverCommand, setup: impl FnOnce(&mut ProcessSolver)) -> SatResult {
    let mut solver = ProcessSolver::new(command).expect("solver binary should be on PATH");
    setup(&mut solver);
    solver.check_sat().unwrap()
}

fn both(setup: impl Fn(&mut ProcessSolver)) -> (SatResult, SatResult) {
    (
        check_with(SolverCommand::Z3, &setup),
        check_with(SolverCommand::Cvc5, &setup),
    )
}

#[test]
#[ignore = "requires z3 and cvc5 binaries"]
fn parity_simple_sat() {
    let (z3, cvc5) = both(|s| {
        s.declare_var("x#1", &SmtSort::Int).unwrap();
        s.assert(&SmtTerm::and(vec![
            SmtTerm::var("x#1").gt(SmtTerm::int(0)),
            SmtTerm::var("x#1").lt(SmtTerm::int(10)),
        ]))
        .unwrap();
    });
    assert_eq!(z3, SatResult::Sat);
    assert_eq!(z3, cvc5);
}

#[test]
#[ignore = "requires z3 and cvc5 binaries"]
fn parity_simple_unsat() {
    let (z3, cvc5) = both(|s| {
        s.declare_var("x#1", &SmtSort::Int).unwrap();
        s.assert(&SmtTerm::var("x#1").gt(SmtTerm::int(0))).unwrap();
        s.assert(&SmtTerm::var("x#1").lt(SmtTerm::int(0))).unwrap();
    });
    assert_eq!(z3, SatResult::Unsat);
    assert_eq!(z3, cvc5);
}

#[test]
#[ignore = "requires z3 and cvc5 binaries"]
fn parity_models_for_quoted_symbols() {
    for command in [SolverCommand::Z3, SolverCommand::Cvc5] {
        let mut solver = ProcessSolver::new(command).unwrap();
        solver.declare_var("x#2", &SmtSort::Int).unwrap();
        solver.declare_var("rf#3#1", &SmtSort::Bool).unwrap();
        solver
            .assert(&SmtTerm::var("x#2").eq(SmtTerm::int(-5)))
            .unwrap();
        solver.assert(&SmtTerm::var("rf#3#1")).unwrap();

        let (result, model) = solver
            .check_sat_with_model(&[("x#2", &SmtSort::Int), ("rf#3#1", &SmtSort::Bool)])
            .unwrap();
        assert_eq!(result, SatResult::Sat);
        let model = model.unwrap();
        assert_eq!(model.get_int("x#2"), Some(-5));
        assert_eq!(model.get_bool("rf#3#1"), Some(true));
    }
}

#[test]
#[ignore = "requires z3 and cvc5 binaries"]
fn parity_push_pop() {
    let (z3, cvc5) = both(|s| {
        s.declare_var("b", &SmtSort::Bool).unwrap();
        s.push().unwrap();
        s.assert(&SmtTerm::bool(false)).unwrap();
        s.pop().unwrap();
        s.assert(&SmtTerm::var("b")).unwrap();
    });
    assert_eq!(z3, SatResult::Sat);
    assert_eq!(z3, cvc5);
}
