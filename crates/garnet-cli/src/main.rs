#![doc = include_str!("../README.md")]

mod cli;
mod commands;
mod format;

use clap::Parser;
use garnet_engine::pipeline::RoundVerdict;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

/// Exit status when a property fails.
const EXIT_UNSAFE: i32 = 10;
/// Exit status when the solver gave up before refuting anything.
const EXIT_INCONCLUSIVE: i32 = 5;

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            file,
            bmc,
            solver,
            timeout,
            stop_on_fail,
        } => {
            let verdict = commands::check::run_check_command(
                file,
                bmc,
                solver,
                timeout,
                stop_on_fail,
                cli.format,
            )?;
            match verdict {
                RoundVerdict::Safe => {}
                RoundVerdict::Unsafe => std::process::exit(EXIT_UNSAFE),
                RoundVerdict::Unknown { .. } => std::process::exit(EXIT_INCONCLUSIVE),
            }
        }
        Commands::Slice {
            file,
            bmc,
            emit_equation,
        } => {
            commands::slice::run_slice_command(file, bmc, emit_equation, cli.format)?;
        }
    }

    Ok(())
}
