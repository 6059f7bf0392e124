//! Equation slicing.
//!
//! Slicing never removes steps; it only sets their `ignored` flag. Steps that
//! are already ignored stay ignored.

use std::collections::HashSet;
use std::fmt;

use garnet_ir::{Equation, StepKind};
use serde::Serialize;
use tracing::info;

use crate::config::BmcOptions;

/// Why a slicing request was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Steps from more than one thread: cross-thread dependencies are not
    /// tracked, so nothing may be dropped.
    Threads,
    /// Coverage goals need every step.
    Coverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStrategy {
    Full,
    Simple,
    Skipped(SkipReason),
}

impl fmt::Display for SliceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceStrategy::Full => f.write_str("full"),
            SliceStrategy::Simple => f.write_str("simple"),
            SliceStrategy::Skipped(SkipReason::Threads) => f.write_str("skipped (threads)"),
            SliceStrategy::Skipped(SkipReason::Coverage) => f.write_str("skipped (coverage)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceReport {
    pub strategy: SliceStrategy,
    /// Steps this call turned ignored.
    pub newly_ignored: usize,
    /// Non-ignored assertion steps after slicing.
    pub remaining_assertions: usize,
    /// Non-ignored assertion steps whose condition does not simplify to
    /// `true`.
    pub open_vccs: usize,
    /// All assertion steps, ignored or not.
    pub total_vccs: usize,
}

/// Slice `equation` according to `options` and record that slicing ran.
///
/// Multi-threaded equations are never sliced. Otherwise `slice_formula`
/// selects full slicing, and simple slicing runs unless coverage goals are
/// configured.
pub fn slice(equation: &mut Equation, options: &BmcOptions) -> SliceReport {
    let (strategy, newly_ignored) = if equation.has_threads() {
        info!("no slicing due to threads");
        (SliceStrategy::Skipped(SkipReason::Threads), 0)
    } else if options.slice_formula {
        let removed = full_slice(equation);
        info!(ignored = removed, "slicing removed {removed} assignments");
        (SliceStrategy::Full, removed)
    } else if options.cover.is_empty() {
        let removed = simple_slice(equation);
        info!(ignored = removed, "simple slicing removed {removed} assignments");
        (SliceStrategy::Simple, removed)
    } else {
        info!(goals = options.cover.len(), "no slicing due to coverage goals");
        (SliceStrategy::Skipped(SkipReason::Coverage), 0)
    };
    equation.mark_sliced();

    let report = SliceReport {
        strategy,
        newly_ignored,
        remaining_assertions: equation.count_remaining_assertions(),
        open_vccs: equation
            .iter()
            .filter(|s| s.is_assert() && !s.ignored && !s.vcc().simplify().is_true())
            .count(),
        total_vccs: equation.count_assertions(),
    };
    info!(
        total = report.total_vccs,
        remaining = report.open_vccs,
        "Generated {} VCC(s), {} remaining after simplification",
        report.total_vccs,
        report.open_vccs
    );
    report
}

/// Backward dependency slicing. Keeps every assertion, assumption and
/// constraint, and every defining step whose symbol they transitively read.
/// Returns the number of steps newly ignored.
pub fn full_slice(equation: &mut Equation) -> usize {
    let mut depends: HashSet<String> = HashSet::new();
    let mut removed = 0;

    for step in equation.steps_mut().iter_mut().rev() {
        if step.ignored {
            continue;
        }
        let keep = match &step.kind {
            StepKind::Assertion | StepKind::Assumption | StepKind::Constraint => true,
            StepKind::MemoryBarrier => false,
            StepKind::Assignment { lhs, .. }
            | StepKind::Input { lhs }
            | StepKind::SharedRead { lhs, .. }
            | StepKind::SharedWrite { lhs, .. } => depends.contains(lhs),
        };
        if keep {
            depends.extend(step.read_symbols());
        } else {
            step.ignored = true;
            removed += 1;
        }
    }
    removed
}

/// Ignore every step after the last assertion except memory-model
/// constraints. Assumptions only restrict the assertions that follow them, so
/// nothing after the last assertion can affect a verdict.
pub fn simple_slice(equation: &mut Equation) -> usize {
    let last_assertion = equation
        .steps()
        .iter()
        .rposition(|s| s.is_assert() && !s.ignored);
    let first_dead = last_assertion.map_or(0, |i| i + 1);

    let mut removed = 0;
    for step in &mut equation.steps_mut()[first_dead..] {
        if !step.ignored && !step.is_constraint() {
            step.ignored = true;
            removed += 1;
        }
    }
    removed
}
