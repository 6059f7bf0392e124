//! One BMC round: memory model, slicing, status pass, conversion, solving,
//! trace building and status update from the solver.

use garnet_ir::{Equation, Namespace, PropertyId};
use garnet_smt::solver::SmtSolver;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BmcOptions, ConfigError};
use crate::convert::{self, ConvertError, SolverVerdict};
use crate::memory_model::{self, EncodingStats, MemoryModelError};
use crate::properties::{PropertyStatus, PropertyTable};
use crate::slice::{self, SliceReport};
use crate::trace::{build_trace, Trace, TraceError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Memory model error: {0}")]
    MemoryModel(#[from] MemoryModelError),
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
}

/// Verdict of a round over all its assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RoundVerdict {
    /// No assertion can fail within the bounds of the equation.
    Safe,
    /// At least one assertion fails.
    Unsafe,
    /// The solver gave up before any assertion was refuted.
    Unknown { reason: String },
}

impl RoundVerdict {
    /// Stable, machine-readable verdict class.
    pub fn verdict_class(&self) -> &'static str {
        match self {
            RoundVerdict::Safe => "safe",
            RoundVerdict::Unsafe => "unsafe",
            RoundVerdict::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundOutcome {
    pub verdict: RoundVerdict,
    /// Counterexample for the first violated assertion in program order.
    pub trace: Option<Trace>,
    pub slice: SliceReport,
    #[serde(skip)]
    pub encoding: EncodingStats,
    /// Properties whose status changed during the round, in first-change
    /// order.
    pub changed: Vec<PropertyId>,
    /// Solver queries issued.
    pub queries: usize,
}

/// Driver for a single round over one equation.
///
/// Repeated rounds (for instance with growing unwinding bounds) share one
/// [`PropertyTable`], so verdicts accumulate monotonically.
pub struct BmcRound;

impl BmcRound {
    pub fn run<S: SmtSolver>(
        options: &BmcOptions,
        ns: &Namespace,
        equation: &mut Equation,
        properties: &mut PropertyTable,
        solver: &mut S,
    ) -> Result<RoundOutcome, RunError> {
        let mm = memory_model::for_kind(options.memory_model);
        properties.register_from_equation(equation);

        let encoding = memory_model::apply(mm.as_ref(), equation, ns)?;
        let slice = slice::slice(equation, options);

        let mut changed: IndexSet<PropertyId> =
            properties.update_from_equation(equation).into_iter().collect();

        let conversion = convert::convert(equation, ns)?;
        let equation: &Equation = equation;
        convert::load(&conversion, solver)?;

        let mut open: IndexMap<usize, &str> = conversion.literals().collect();
        let mut trace: Option<Trace> = None;
        let mut refuted = false;
        let mut gave_up: Option<String> = None;
        let mut queries = 0;

        // resolve open assertions until none can fail; each model refutes at
        // least one of them
        loop {
            let goal = conversion.goal_over(open.values().copied());
            let verdict = convert::check_goal(&conversion, solver, &goal)?;
            queries += 1;
            changed.extend(properties.update_from_verdict(equation, &verdict));

            match &verdict {
                SolverVerdict::Sat(model) => {
                    refuted = true;
                    if trace.is_none() {
                        trace = Some(build_trace(equation, model)?);
                    }
                    let before = open.len();
                    open.retain(|&step, literal| {
                        let failed = equation.steps()[step]
                            .property_id
                            .as_ref()
                            .and_then(|id| properties.get(id))
                            .is_some_and(|info| info.status == PropertyStatus::Fail);
                        model.get_bool(*literal) != Some(false) && !failed
                    });
                    if options.stop_on_fail || open.is_empty() {
                        break;
                    }
                    if open.len() == before {
                        warn!("model refutes no open assertion; stopping");
                        break;
                    }
                }
                SolverVerdict::Unsat => break,
                SolverVerdict::Inconclusive(reason) => {
                    gave_up = Some(reason.clone());
                    break;
                }
            }
        }

        let verdict = match (refuted, gave_up) {
            (true, _) => RoundVerdict::Unsafe,
            (false, Some(reason)) => RoundVerdict::Unknown { reason },
            (false, None) => RoundVerdict::Safe,
        };
        info!(
            verdict = verdict.verdict_class(),
            queries,
            failed = properties.count(PropertyStatus::Fail),
            passed = properties.count(PropertyStatus::Pass),
            unknown = properties.count(PropertyStatus::Unknown),
            "round finished"
        );

        Ok(RoundOutcome {
            verdict,
            trace,
            slice,
            encoding,
            changed: changed.into_iter().collect(),
            queries,
        })
    }
}
