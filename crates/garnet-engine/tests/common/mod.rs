#![allow(dead_code)]

use garnet_engine::config::{BmcOptions, MemoryModelKind};
use garnet_engine::pipeline::{BmcRound, RoundOutcome};
use garnet_engine::properties::PropertyTable;
use garnet_ir::{Equation, Namespace, SourceLocation, Step};
use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;
use garnet_smt::testing::BoundedSolver;

/// Clock values only need to separate the events of a litmus test.
pub fn litmus_solver() -> BoundedSolver {
    BoundedSolver::with_int_domain(0..=5)
}

pub fn options(mm: MemoryModelKind) -> BmcOptions {
    BmcOptions {
        memory_model: mm,
        ..BmcOptions::default()
    }
}

pub fn run(
    options: &BmcOptions,
    ns: &Namespace,
    mut equation: Equation,
    solver: &mut BoundedSolver,
) -> (RoundOutcome, PropertyTable, Equation) {
    let mut properties = PropertyTable::new();
    let outcome = BmcRound::run(options, ns, &mut equation, &mut properties, solver)
        .unwrap_or_else(|e| panic!("round failed: {e}"));
    (outcome, properties, equation)
}

pub fn at(line: u32) -> SourceLocation {
    SourceLocation::new("litmus.c", "main", line)
}

/// `address := value` on `thread`, as SSA version `n`.
pub fn write(eq: &mut Equation, thread: u32, address: &str, n: u32, value: i64) {
    let ssa = format!("{address}#{n}");
    eq.push(Step::assignment(ssa.as_str(), SmtTerm::int(value)).on_thread(thread));
    eq.push(Step::shared_write(ssa, address).on_thread(thread));
}

/// `into := address` on `thread`.
pub fn read(eq: &mut Equation, thread: u32, address: &str, into: &str) {
    eq.push(Step::shared_read(into, address).on_thread(thread));
}

/// Store buffering: each thread writes one location and reads the other.
/// `r1 == 0 && r2 == 0` is forbidden under SC and allowed under TSO.
pub fn store_buffering() -> (Namespace, Equation) {
    let mut ns = Namespace::new();
    ns.declare_shared("x", SmtSort::Int)
        .declare_shared("y", SmtSort::Int)
        .declare("r1", SmtSort::Int)
        .declare("r2", SmtSort::Int);

    let mut eq = Equation::new();
    write(&mut eq, 0, "x", 1, 0);
    write(&mut eq, 0, "y", 1, 0);
    write(&mut eq, 1, "x", 2, 1);
    read(&mut eq, 1, "y", "r1#1");
    write(&mut eq, 2, "y", 2, 1);
    read(&mut eq, 2, "x", "r2#1");
    eq.push(
        Step::assertion(
            "main.assertion.1",
            SmtTerm::or(vec![
                SmtTerm::var("r1#1").ne(SmtTerm::int(0)),
                SmtTerm::var("r2#1").ne(SmtTerm::int(0)),
            ]),
        )
        .on_thread(2)
        .at(at(20))
        .with_comment("not both zero"),
    );
    (ns, eq)
}

/// Message passing: thread 1 writes data then flag, thread 2 reads flag then
/// data. Seeing the flag but stale data is forbidden under SC and TSO and
/// allowed under PSO. With `fence`, thread 1 separates its writes by a
/// barrier.
pub fn message_passing(fence: bool) -> (Namespace, Equation) {
    let mut ns = Namespace::new();
    ns.declare_shared("data", SmtSort::Int)
        .declare_shared("flag", SmtSort::Int)
        .declare("r1", SmtSort::Int)
        .declare("r2", SmtSort::Int);

    let mut eq = Equation::new();
    write(&mut eq, 0, "data", 1, 0);
    write(&mut eq, 0, "flag", 1, 0);
    write(&mut eq, 1, "data", 2, 1);
    if fence {
        eq.push(Step::memory_barrier().on_thread(1));
    }
    write(&mut eq, 1, "flag", 2, 1);
    read(&mut eq, 2, "flag", "r1#1");
    read(&mut eq, 2, "data", "r2#1");
    eq.push(
        Step::assertion(
            "main.assertion.1",
            SmtTerm::or(vec![
                SmtTerm::var("r1#1").ne(SmtTerm::int(1)),
                SmtTerm::var("r2#1").ne(SmtTerm::int(0)),
            ]),
        )
        .on_thread(2)
        .at(at(30)),
    );
    (ns, eq)
}

/// Store forwarding (n6): each thread writes one location, reads it back and
/// then reads the other. `r1 == 1 && r2 == 0 && r3 == 1 && r4 == 0` needs both
/// threads to read their own buffered write, so TSO allows it and SC does not.
pub fn store_forwarding() -> (Namespace, Equation) {
    let mut ns = Namespace::new();
    ns.declare_shared("x", SmtSort::Int).declare_shared("y", SmtSort::Int);
    for r in ["r1", "r2", "r3", "r4"] {
        ns.declare(r, SmtSort::Int);
    }

    let mut eq = Equation::new();
    write(&mut eq, 0, "x", 1, 0);
    write(&mut eq, 0, "y", 1, 0);
    write(&mut eq, 1, "x", 2, 1);
    read(&mut eq, 1, "x", "r1#1");
    read(&mut eq, 1, "y", "r2#1");
    write(&mut eq, 2, "y", 2, 1);
    read(&mut eq, 2, "y", "r3#1");
    read(&mut eq, 2, "x", "r4#1");
    let is = |name: &str, value: i64| SmtTerm::var(name).eq(SmtTerm::int(value));
    eq.push(
        Step::assertion(
            "main.assertion.1",
            SmtTerm::and(vec![is("r1#1", 1), is("r2#1", 0), is("r3#1", 1), is("r4#1", 0)]).not(),
        )
        .on_thread(2)
        .at(at(40)),
    );
    (ns, eq)
}

/// Coherence of two writers (n5): each thread writes `x` and reads it back.
/// Each seeing the other's value would need both writes to come last, which
/// no model allows.
pub fn crossed_writers() -> (Namespace, Equation) {
    let mut ns = Namespace::new();
    ns.declare_shared("x", SmtSort::Int)
        .declare("r1", SmtSort::Int)
        .declare("r2", SmtSort::Int);

    let mut eq = Equation::new();
    write(&mut eq, 0, "x", 1, 0);
    write(&mut eq, 1, "x", 2, 1);
    read(&mut eq, 1, "x", "r1#1");
    write(&mut eq, 2, "x", 3, 2);
    read(&mut eq, 2, "x", "r2#1");
    eq.push(
        Step::assertion(
            "main.assertion.1",
            SmtTerm::and(vec![
                SmtTerm::var("r1#1").eq(SmtTerm::int(2)),
                SmtTerm::var("r2#1").eq(SmtTerm::int(1)),
            ])
            .not(),
        )
        .on_thread(2)
        .at(at(50)),
    );
    (ns, eq)
}

/// CoRW: a read never sees a write that follows it in its own thread, even
/// with a relaxed store buffer.
pub fn read_then_own_write() -> (Namespace, Equation) {
    let mut ns = Namespace::new();
    ns.declare_shared("x", SmtSort::Int).declare("r1", SmtSort::Int);

    let mut eq = Equation::new();
    write(&mut eq, 0, "x", 1, 0);
    read(&mut eq, 1, "x", "r1#1");
    write(&mut eq, 1, "x", 2, 1);
    eq.push(
        Step::assertion("main.assertion.1", SmtTerm::var("r1#1").ne(SmtTerm::int(1)))
            .on_thread(1)
            .at(at(60)),
    );
    (ns, eq)
}

pub fn int_namespace(bases: &[&str]) -> Namespace {
    let mut ns = Namespace::new();
    for base in bases {
        ns.declare(*base, SmtSort::Int);
    }
    ns
}
