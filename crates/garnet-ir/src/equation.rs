use std::collections::BTreeSet;
use std::fmt;

use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a thread of the program under verification.
///
/// Thread 0 is the main thread.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Stable identifier of a checked property, e.g. `main.assertion.1`.
///
/// Several assertion steps may share one identifier (one per unwinding).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    pub fn new(id: impl Into<String>) -> Self {
        PropertyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(id: &str) -> Self {
        PropertyId::new(id)
    }
}

impl From<String> for PropertyId {
    fn from(id: String) -> Self {
        PropertyId(id)
    }
}

/// Where a step originates in the program under verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.file.is_empty() && self.function.is_empty() && self.line == 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return f.write_str("<unknown>");
        }
        write!(f, "{}:{}", self.file, self.line)?;
        if !self.function.is_empty() {
            write!(f, " ({})", self.function)?;
        }
        Ok(())
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// `lhs := rhs` in SSA form.
    Assignment { lhs: String, rhs: SmtTerm },
    /// Restricts the paths considered by later assertions.
    Assumption,
    /// A checked condition.
    Assertion,
    /// `lhs` receives an unconstrained input value.
    Input { lhs: String },
    /// `lhs` receives the value of shared location `address`.
    SharedRead { lhs: String, address: String },
    /// `lhs` is the value written to shared location `address`.
    SharedWrite { lhs: String, address: String },
    /// A fence: memory models never relax ordering across it.
    MemoryBarrier,
    /// An ordering constraint appended by a memory model.
    Constraint,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Assignment { .. } => "assignment",
            StepKind::Assumption => "assumption",
            StepKind::Assertion => "assertion",
            StepKind::Input { .. } => "input",
            StepKind::SharedRead { .. } => "shared_read",
            StepKind::SharedWrite { .. } => "shared_write",
            StepKind::MemoryBarrier => "memory_barrier",
            StepKind::Constraint => "constraint",
        }
    }
}

fn true_term() -> SmtTerm {
    SmtTerm::bool(true)
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One step of the equation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub kind: StepKind,
    /// Path condition under which the step executes.
    #[serde(default = "true_term")]
    pub guard: SmtTerm,
    /// Assumed or asserted condition; `true` for other kinds.
    #[serde(default = "true_term")]
    pub cond: SmtTerm,
    #[serde(default)]
    pub source: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<PropertyId>,
    /// Property description for assertions, origin note for constraints.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default)]
    pub thread: ThreadId,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignored: bool,
    /// Solver literal bound to this assertion by conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Step {
    fn with_kind(kind: StepKind) -> Self {
        Self {
            kind,
            guard: true_term(),
            cond: true_term(),
            source: SourceLocation::default(),
            property_id: None,
            comment: String::new(),
            thread: ThreadId::default(),
            ignored: false,
            literal: None,
        }
    }

    pub fn assignment(lhs: impl Into<String>, rhs: SmtTerm) -> Self {
        Self::with_kind(StepKind::Assignment {
            lhs: lhs.into(),
            rhs,
        })
    }

    pub fn assumption(cond: SmtTerm) -> Self {
        Self {
            cond,
            ..Self::with_kind(StepKind::Assumption)
        }
    }

    pub fn assertion(property_id: impl Into<PropertyId>, cond: SmtTerm) -> Self {
        Self {
            cond,
            property_id: Some(property_id.into()),
            ..Self::with_kind(StepKind::Assertion)
        }
    }

    pub fn input(lhs: impl Into<String>) -> Self {
        Self::with_kind(StepKind::Input { lhs: lhs.into() })
    }

    pub fn shared_read(lhs: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_kind(StepKind::SharedRead {
            lhs: lhs.into(),
            address: address.into(),
        })
    }

    pub fn shared_write(lhs: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_kind(StepKind::SharedWrite {
            lhs: lhs.into(),
            address: address.into(),
        })
    }

    pub fn memory_barrier() -> Self {
        Self::with_kind(StepKind::MemoryBarrier)
    }

    pub fn constraint(cond: SmtTerm, comment: impl Into<String>) -> Self {
        Self {
            cond,
            comment: comment.into(),
            ..Self::with_kind(StepKind::Constraint)
        }
    }

    pub fn with_guard(mut self, guard: SmtTerm) -> Self {
        self.guard = guard;
        self
    }

    pub fn at(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }

    pub fn on_thread(mut self, thread: u32) -> Self {
        self.thread = ThreadId(thread);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn is_assert(&self) -> bool {
        matches!(self.kind, StepKind::Assertion)
    }

    pub fn is_assume(&self) -> bool {
        matches!(self.kind, StepKind::Assumption)
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self.kind, StepKind::Constraint)
    }

    pub fn is_shared_access(&self) -> bool {
        matches!(
            self.kind,
            StepKind::SharedRead { .. } | StepKind::SharedWrite { .. }
        )
    }

    /// The SSA symbol this step defines, if any.
    pub fn lhs(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Assignment { lhs, .. }
            | StepKind::Input { lhs }
            | StepKind::SharedRead { lhs, .. }
            | StepKind::SharedWrite { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    /// The verification condition of an assumption, assertion or constraint:
    /// `guard ⇒ cond`.
    pub fn vcc(&self) -> SmtTerm {
        if self.guard.is_true() {
            self.cond.clone()
        } else {
            self.guard.clone().implies(self.cond.clone())
        }
    }

    /// Symbols read by this step: guard, condition and right-hand side.
    pub fn read_symbols(&self) -> Vec<String> {
        let mut out = self.guard.vars();
        self.cond.collect_vars(&mut out);
        if let StepKind::Assignment { rhs, .. } = &self.kind {
            rhs.collect_vars(&mut out);
        }
        out.into_iter().collect()
    }
}

/// The SSA equation: steps in program order plus bookkeeping for the passes
/// that have run over it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    steps: Vec<Step>,
    /// Sorts of symbols introduced after symbolic execution (memory-model
    /// clocks and choices).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    aux_symbols: IndexMap<String, SmtSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memory_model: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    sliced: bool,
}

impl Equation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Append a step and return its index.
    pub fn push(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Mutable access to the steps. The slice cannot grow or shrink, so
    /// program order is preserved.
    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Threads that contribute at least one step.
    pub fn threads(&self) -> BTreeSet<ThreadId> {
        self.steps.iter().map(|s| s.thread).collect()
    }

    pub fn has_threads(&self) -> bool {
        let mut threads = self.steps.iter().map(|s| s.thread);
        match threads.next() {
            Some(first) => threads.any(|t| t != first),
            None => false,
        }
    }

    pub fn count_ignored(&self) -> usize {
        self.steps.iter().filter(|s| s.ignored).count()
    }

    /// Assertion steps still taking part in solving.
    pub fn count_remaining_assertions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.is_assert() && !s.ignored)
            .count()
    }

    pub fn count_assertions(&self) -> usize {
        self.steps.iter().filter(|s| s.is_assert()).count()
    }

    pub fn declare_aux(&mut self, name: impl Into<String>, sort: SmtSort) {
        self.aux_symbols.insert(name.into(), sort);
    }

    pub fn aux_sort(&self, name: &str) -> Option<SmtSort> {
        self.aux_symbols.get(name).copied()
    }

    pub fn aux_symbols(&self) -> &IndexMap<String, SmtSort> {
        &self.aux_symbols
    }

    /// Name of the memory model applied to this equation, if any.
    pub fn memory_model(&self) -> Option<&str> {
        self.memory_model.as_deref()
    }

    pub fn mark_memory_model(&mut self, name: impl Into<String>) {
        self.memory_model = Some(name.into());
    }

    pub fn is_sliced(&self) -> bool {
        self.sliced
    }

    pub fn mark_sliced(&mut self) {
        self.sliced = true;
    }
}

impl<'a> IntoIterator for &'a Equation {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
