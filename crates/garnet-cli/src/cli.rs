//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Bounded model checking backend for SSA equations produced by symbolic execution.\n\n\
    The input is a JSON document with a `namespace` (symbol sorts and sharing),\n\
    an `equation` (SSA steps in program order) and optionally `properties`\n\
    known before symbolic execution.\n\n\
    Typical use:\n  \
    1. garnet slice problem.json            (inspect what slicing keeps)\n  \
    2. garnet check problem.json --solver z3 (solve and print a counterexample)";

#[derive(Parser)]
#[command(name = "garnet")]
#[command(about = "Bounded model checking backend for SSA equations")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Plain)]
    pub(crate) format: OutputFormat,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run one BMC round: memory model, slicing, solving, trace
    Check {
        /// Problem file (JSON)
        file: PathBuf,

        #[command(flatten)]
        bmc: BmcArgs,

        /// SMT solver to launch
        #[arg(long, value_enum, default_value_t = SolverChoice::Z3)]
        solver: SolverChoice,

        /// Per-query solver timeout in seconds (0 disables the limit)
        #[arg(long, default_value_t = 0)]
        timeout: u64,

        /// Stop at the first failing property
        #[arg(long)]
        stop_on_fail: bool,
    },
    /// Apply the memory model and slice, without solving
    Slice {
        /// Problem file (JSON)
        file: PathBuf,

        #[command(flatten)]
        bmc: BmcArgs,

        /// Also print the sliced equation
        #[arg(long)]
        emit_equation: bool,
    },
}

/// Options shared by every command that prepares an equation.
#[derive(Args, Debug, Clone)]
pub(crate) struct BmcArgs {
    /// Memory model: sc | tso | pso
    #[arg(long, default_value = "sc")]
    pub(crate) mm: String,

    /// Global loop unwinding bound
    #[arg(long)]
    pub(crate) unwind: Option<u32>,

    /// Per-loop unwinding bounds: [thread:]loop:N,...
    #[arg(long)]
    pub(crate) unwindset: Vec<String>,

    /// Use full (dependency) slicing instead of simple slicing
    #[arg(long)]
    pub(crate) slice_formula: bool,

    /// Coverage goals; disables simple slicing
    #[arg(long, value_delimiter = ',')]
    pub(crate) cover: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SolverChoice {
    Z3,
    Cvc5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Plain,
    Json,
}
