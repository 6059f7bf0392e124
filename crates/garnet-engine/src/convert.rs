//! Conversion of the equation into solver constraints, and solver dispatch.

use std::time::Instant;

use garnet_ir::{Equation, Namespace, StepKind};
use garnet_smt::backends::smtlib_printer::script_to_smtlib;
use garnet_smt::solver::{Model, SatResult, SmtSolver};
use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("symbol '{0}' is not declared in the namespace")]
    UndeclaredSymbol(String),
    #[error("equation converted before a memory model was applied")]
    MemoryModelNotApplied,
    #[error("solver error: {0}")]
    Solver(String),
}

/// Outcome of one satisfiability query over a converted equation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum SolverVerdict {
    /// Some assertion can fail; the model is a counterexample.
    Sat(Model),
    /// No assertion can fail.
    Unsat,
    /// The solver gave up (timeout, resource limit).
    Inconclusive(String),
}

impl SolverVerdict {
    pub fn name(&self) -> &'static str {
        match self {
            SolverVerdict::Sat(_) => "sat",
            SolverVerdict::Unsat => "unsat",
            SolverVerdict::Inconclusive(_) => "inconclusive",
        }
    }
}

/// Solver input produced from an equation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    declarations: IndexMap<String, SmtSort>,
    constraints: Vec<SmtTerm>,
    /// Assertion step index to its literal.
    literals: IndexMap<usize, String>,
}

impl Conversion {
    pub fn declarations(&self) -> impl Iterator<Item = (&str, SmtSort)> {
        self.declarations.iter().map(|(n, s)| (n.as_str(), *s))
    }

    pub fn constraints(&self) -> &[SmtTerm] {
        &self.constraints
    }

    pub fn literal_for(&self, step: usize) -> Option<&str> {
        self.literals.get(&step).map(String::as_str)
    }

    pub fn assertion_count(&self) -> usize {
        self.literals.len()
    }

    pub fn literals(&self) -> impl Iterator<Item = (usize, &str)> {
        self.literals.iter().map(|(i, l)| (*i, l.as_str()))
    }

    /// "Some assertion fails": the disjunction of the negated literals.
    pub fn goal(&self) -> SmtTerm {
        self.goal_over(self.literals.values().map(String::as_str))
    }

    /// Failure goal restricted to `literals`; `false` when there are none.
    pub fn goal_over<'a>(&self, literals: impl IntoIterator<Item = &'a str>) -> SmtTerm {
        let mut failures: Vec<SmtTerm> = literals
            .into_iter()
            .map(|l| SmtTerm::var(l).not())
            .collect();
        match failures.len() {
            0 => SmtTerm::bool(false),
            1 => failures.remove(0),
            _ => SmtTerm::or(failures),
        }
    }

    /// Self-contained SMT-LIB2 script of the query.
    pub fn to_smtlib(&self) -> String {
        let decls: Vec<(String, SmtSort)> = self
            .declarations
            .iter()
            .map(|(n, s)| (n.clone(), *s))
            .collect();
        let mut assertions = self.constraints.clone();
        assertions.push(self.goal());
        script_to_smtlib(&decls, &assertions)
    }
}

struct Converter<'a> {
    equation: &'a Equation,
    ns: &'a Namespace,
    out: Conversion,
}

impl Converter<'_> {
    fn declare(&mut self, name: &str) -> Result<(), ConvertError> {
        if self.out.declarations.contains_key(name) {
            return Ok(());
        }
        let sort = self
            .equation
            .aux_sort(name)
            .or_else(|| self.ns.sort_of(name))
            .ok_or_else(|| ConvertError::UndeclaredSymbol(name.to_string()))?;
        self.out.declarations.insert(name.to_string(), sort);
        Ok(())
    }

    fn literal(&mut self, name: String) -> SmtTerm {
        self.out.declarations.insert(name.clone(), SmtSort::Bool);
        SmtTerm::var(name)
    }
}

/// Convert the non-ignored steps of `equation` into solver constraints.
///
/// Every non-ignored assertion gets a literal `assert#<step>`, recorded on the
/// step, that is true exactly when the assertion holds under the assumptions
/// preceding it. The constraints only define the literals; the query itself
/// is [`Conversion::goal`].
pub fn convert(equation: &mut Equation, ns: &Namespace) -> Result<Conversion, ConvertError> {
    if equation.memory_model().is_none() {
        return Err(ConvertError::MemoryModelNotApplied);
    }
    info!(steps = equation.len(), "converting SSA");

    let mut literals: Vec<(usize, Option<String>)> = Vec::new();
    let conversion = {
        let eq: &Equation = equation;
        let mut cx = Converter {
            equation: eq,
            ns,
            out: Conversion::default(),
        };
        let mut context: Vec<SmtTerm> = Vec::new();

        for (i, step) in eq.steps().iter().enumerate() {
            if step.ignored {
                if step.is_assert() {
                    literals.push((i, None));
                }
                continue;
            }
            for name in step.read_symbols() {
                cx.declare(&name)?;
            }
            if let Some(lhs) = step.lhs() {
                cx.declare(lhs)?;
            }

            match &step.kind {
                StepKind::Assignment { lhs, rhs } => {
                    let lhs = SmtTerm::var(lhs.clone());
                    cx.out.constraints.push(lhs.eq(rhs.clone()));
                }
                StepKind::Input { .. }
                | StepKind::SharedRead { .. }
                | StepKind::SharedWrite { .. }
                | StepKind::MemoryBarrier => {}
                StepKind::Constraint => cx.out.constraints.push(step.vcc()),
                StepKind::Assumption => {
                    let literal = cx.literal(format!("assume#{i}"));
                    cx.out.constraints.push(literal.clone().eq(step.vcc()));
                    context.push(literal);
                }
                StepKind::Assertion => {
                    let name = format!("assert#{i}");
                    let literal = cx.literal(name.clone());
                    let holds = if context.is_empty() {
                        step.vcc()
                    } else {
                        SmtTerm::and(context.clone()).implies(step.vcc())
                    };
                    cx.out.constraints.push(literal.clone().eq(holds));
                    cx.out.literals.insert(i, name.clone());
                    literals.push((i, Some(name)));
                }
            }
        }
        cx.out
    };

    for (i, literal) in literals {
        equation.steps_mut()[i].literal = literal;
    }
    debug!(
        symbols = conversion.declarations.len(),
        constraints = conversion.constraints.len(),
        assertions = conversion.literals.len(),
        "converted equation"
    );
    Ok(conversion)
}

/// Declare the symbols of `conversion` and assert its literal definitions.
pub fn load<S: SmtSolver>(conversion: &Conversion, solver: &mut S) -> Result<(), ConvertError> {
    for (name, sort) in conversion.declarations() {
        solver
            .declare_var(name, &sort)
            .map_err(|e| ConvertError::Solver(e.to_string()))?;
    }
    for term in &conversion.constraints {
        solver
            .assert(term)
            .map_err(|e| ConvertError::Solver(e.to_string()))?;
    }
    Ok(())
}

/// Check `goal` in a fresh scope on top of a loaded conversion. The scope is
/// popped again, so the solver can be queried repeatedly.
pub fn check_goal<S: SmtSolver>(
    conversion: &Conversion,
    solver: &mut S,
    goal: &SmtTerm,
) -> Result<SolverVerdict, ConvertError> {
    let backend = |e: S::Error| ConvertError::Solver(e.to_string());

    solver.push().map_err(backend)?;
    solver.assert(goal).map_err(backend)?;

    info!(solver = solver.name(), "Running decision procedure");
    let started = Instant::now();
    let vars: Vec<(&str, &SmtSort)> = conversion
        .declarations
        .iter()
        .map(|(n, s)| (n.as_str(), s))
        .collect();
    let answer = solver.check_sat_with_model(&vars).map_err(backend);
    let elapsed = started.elapsed();
    solver.pop().map_err(backend)?;
    let (result, model) = answer?;

    let verdict = match result {
        SatResult::Sat => SolverVerdict::Sat(model.unwrap_or_default()),
        SatResult::Unsat => SolverVerdict::Unsat,
        SatResult::Unknown(reason) => SolverVerdict::Inconclusive(reason),
    };
    info!(
        verdict = verdict.name(),
        elapsed_ms = elapsed.as_millis() as u64,
        "decision procedure finished"
    );
    Ok(verdict)
}

/// Hand `conversion` to `solver` and classify the answer to "some assertion
/// fails".
pub fn solve<S: SmtSolver>(
    conversion: &Conversion,
    solver: &mut S,
) -> Result<SolverVerdict, ConvertError> {
    load(conversion, solver)?;
    check_goal(conversion, solver, &conversion.goal())
}
