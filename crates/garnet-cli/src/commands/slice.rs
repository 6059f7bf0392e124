// Command handler for: Slice
//
// Applies the memory model and slices, then reports what the status pass can
// already decide. No solver is launched.

use std::io;
use std::path::PathBuf;

use garnet_engine::memory_model;
use miette::{miette, IntoDiagnostic};
use tracing::info;

use super::{bmc_options, load_problem, Problem};
use crate::cli::{BmcArgs, OutputFormat};
use crate::format;

pub(crate) fn run_slice_command(
    file: PathBuf,
    bmc: BmcArgs,
    emit_equation: bool,
    format: OutputFormat,
) -> miette::Result<()> {
    let problem = load_problem(&file)?;
    let options = bmc_options(&bmc, &[])?;
    let mut properties = problem.property_table();
    let Problem {
        namespace,
        mut equation,
        ..
    } = problem;

    properties.register_from_equation(&equation);
    let model = memory_model::for_kind(options.memory_model);
    let encoding = memory_model::apply(model.as_ref(), &mut equation, &namespace)
        .map_err(|e| miette!("{e}"))?;
    info!(
        events = encoding.events,
        choices = encoding.choices,
        "memory model encoded"
    );
    let report = garnet_engine::slice::slice(&mut equation, &options);
    let changed = properties.update_from_equation(&equation);

    let reporter = format::reporter(format);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    reporter.write_slice(&mut out, &report).into_diagnostic()?;
    reporter
        .write_progress(&mut out, &properties, &changed)
        .into_diagnostic()?;
    if emit_equation {
        reporter.write_equation(&mut out, &equation).into_diagnostic()?;
    }
    reporter.write_summary(&mut out, &properties).into_diagnostic()?;
    Ok(())
}
