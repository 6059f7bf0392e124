// Command handler for: Check
//
// Runs one BMC round against an external SMT-LIB2 solver and renders the
// outcome.

use std::io;
use std::path::PathBuf;

use garnet_engine::pipeline::{BmcRound, RoundOutcome, RoundVerdict};
use garnet_engine::properties::PropertyTable;
use garnet_smt::backends::process::{ProcessSolver, SolverCommand};
use miette::{miette, IntoDiagnostic};
use tracing::{debug, info};

use super::{bmc_options, load_problem, Problem};
use crate::cli::{BmcArgs, OutputFormat, SolverChoice};
use crate::format::{self, Reporter};

fn solver_command(choice: SolverChoice) -> SolverCommand {
    match choice {
        SolverChoice::Z3 => SolverCommand::Z3,
        SolverChoice::Cvc5 => SolverCommand::Cvc5,
    }
}

pub(crate) fn run_check_command(
    file: PathBuf,
    bmc: BmcArgs,
    solver: SolverChoice,
    timeout: u64,
    stop_on_fail: bool,
    format: OutputFormat,
) -> miette::Result<RoundVerdict> {
    let problem = load_problem(&file)?;
    let options = bmc_options(
        &bmc,
        &[
            ("timeout", timeout.to_string()),
            ("stop-on-fail", stop_on_fail.to_string()),
        ],
    )?;
    debug!(?options, "resolved options");
    info!(
        file = %file.display(),
        mm = %options.memory_model,
        steps = problem.equation.len(),
        "Starting Bounded Model Checking"
    );

    let mut properties = problem.property_table();
    let Problem {
        namespace,
        mut equation,
        ..
    } = problem;

    let mut backend = ProcessSolver::with_timeout_secs(
        solver_command(solver),
        options.solver_timeout_secs,
    )
    .map_err(|e| miette!("Failed to start solver: {e}"))?;
    let outcome = BmcRound::run(
        &options,
        &namespace,
        &mut equation,
        &mut properties,
        &mut backend,
    )
    .map_err(|e| miette!("{e}"))?;

    let reporter = format::reporter(format);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(reporter.as_ref(), &mut out, &outcome, &properties).into_diagnostic()?;
    Ok(outcome.verdict)
}

fn render(
    reporter: &dyn Reporter,
    out: &mut dyn io::Write,
    outcome: &RoundOutcome,
    properties: &PropertyTable,
) -> io::Result<()> {
    reporter.write_slice(out, &outcome.slice)?;
    reporter.write_progress(out, properties, &outcome.changed)?;
    if let Some(trace) = &outcome.trace {
        reporter.write_trace(out, trace)?;
    }
    reporter.write_summary(out, properties)?;
    reporter.write_verdict(out, outcome)
}
