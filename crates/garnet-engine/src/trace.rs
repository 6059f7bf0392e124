//! Counterexample traces rebuilt from a satisfying model.

use garnet_ir::{Equation, PropertyId, SourceLocation, Step, StepKind, ThreadId};
use garnet_smt::solver::{Model, ModelValue};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::convert::SolverVerdict;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("no error trace: solver answered {0}, not sat")]
    NoModel(&'static str),
    #[error("model violates no assertion of the equation")]
    NoViolatedAssertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepKind {
    Assignment,
    Input,
    SharedRead,
    SharedWrite,
    Assumption,
    Assertion,
}

impl TraceStepKind {
    fn of(kind: &StepKind) -> Option<Self> {
        match kind {
            StepKind::Assignment { .. } => Some(TraceStepKind::Assignment),
            StepKind::Input { .. } => Some(TraceStepKind::Input),
            StepKind::SharedRead { .. } => Some(TraceStepKind::SharedRead),
            StepKind::SharedWrite { .. } => Some(TraceStepKind::SharedWrite),
            StepKind::Assumption => Some(TraceStepKind::Assumption),
            StepKind::Assertion => Some(TraceStepKind::Assertion),
            StepKind::MemoryBarrier | StepKind::Constraint => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    /// Index of the originating equation step.
    pub step: usize,
    pub kind: TraceStepKind,
    pub thread: ThreadId,
    pub source: SourceLocation,
    /// Concrete values: the defined symbol for assignments and memory
    /// accesses, the condition's symbols (sorted by name) otherwise.
    pub values: Vec<(String, ModelValue)>,
    /// Evaluated condition of assumptions and assertions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cond_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<PropertyId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl TraceStep {
    /// The first recorded value, if any.
    pub fn value(&self) -> Option<ModelValue> {
        self.values.first().map(|(_, v)| *v)
    }

    pub fn value_of(&self, symbol: &str) -> Option<ModelValue> {
        self.values
            .iter()
            .find(|(name, _)| name == symbol)
            .map(|(_, v)| *v)
    }
}

/// A counterexample: steps in program order, ending at the violated
/// assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn steps(&self) -> std::slice::Iter<'_, TraceStep> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The violated assertion that ends the trace.
    pub fn violation(&self) -> Option<&TraceStep> {
        self.steps.last()
    }

    /// Build the trace of a `Sat` verdict; any other verdict is an error.
    pub fn from_verdict(equation: &Equation, verdict: &SolverVerdict) -> Result<Self, TraceError> {
        match verdict {
            SolverVerdict::Sat(model) => build_trace(equation, model),
            other => Err(TraceError::NoModel(other.name())),
        }
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceStep;
    type IntoIter = std::slice::Iter<'a, TraceStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

fn violates(step: &Step, model: &Model) -> bool {
    let literal = step.literal.as_deref().and_then(|l| model.get_bool(l));
    match literal {
        Some(holds) => !holds,
        None => model.eval_bool(&step.vcc()) == Some(false),
    }
}

fn values_of(step: &Step, model: &Model) -> Vec<(String, ModelValue)> {
    if let Some(lhs) = step.lhs() {
        return model
            .get(lhs)
            .map(|v| vec![(lhs.to_string(), v)])
            .unwrap_or_default();
    }
    let mut symbols: Vec<String> = step.cond.vars().into_iter().collect();
    symbols.sort();
    symbols
        .into_iter()
        .filter_map(|name| model.get(&name).map(|v| (name, v)))
        .collect()
}

/// Walk the non-ignored steps of `equation` in program order and record the
/// ones on the counterexample path of `model`, up to and including the first
/// violated assertion.
pub fn build_trace(equation: &Equation, model: &Model) -> Result<Trace, TraceError> {
    info!("Building error trace");
    let mut steps = Vec::new();

    for (i, step) in equation.iter().enumerate() {
        if step.ignored {
            continue;
        }
        let Some(kind) = TraceStepKind::of(&step.kind) else {
            continue;
        };
        let violated = step.is_assert() && violates(step, model);
        if !violated && model.eval_bool(&step.guard) != Some(true) {
            continue;
        }

        let values = values_of(step, model);
        if values.is_empty() && !violated {
            continue;
        }
        let checks_cond = matches!(kind, TraceStepKind::Assumption | TraceStepKind::Assertion);
        steps.push(TraceStep {
            step: i,
            kind,
            thread: step.thread,
            source: step.source.clone(),
            values,
            cond_value: checks_cond.then(|| model.eval_bool(&step.cond)).flatten(),
            property_id: step.property_id.clone(),
            comment: step.comment.clone(),
        });
        if violated {
            debug!(steps = steps.len(), step = i, "error trace complete");
            return Ok(Trace { steps });
        }
    }
    Err(TraceError::NoViolatedAssertion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_smt::terms::SmtTerm;

    fn model(values: &[(&str, ModelValue)]) -> Model {
        values.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn trace_ends_at_violated_assertion() {
        let eq = Equation::from_steps(vec![
            Step::assumption(SmtTerm::var("x").eq(SmtTerm::int(1)))
                .at(SourceLocation::new("main.c", "main", 3)),
            Step::assertion("main.assertion.1", SmtTerm::var("x").ne(SmtTerm::int(1)))
                .at(SourceLocation::new("main.c", "main", 4)),
            Step::assignment("y#1", SmtTerm::int(2)),
        ]);
        let trace = build_trace(&eq, &model(&[("x", ModelValue::Int(1))])).unwrap();

        assert_eq!(trace.len(), 2);
        let last = trace.violation().unwrap();
        assert_eq!(last.source.line, 4);
        assert_eq!(last.kind, TraceStepKind::Assertion);
        assert_eq!(last.value_of("x"), Some(ModelValue::Int(1)));
        assert_eq!(last.cond_value, Some(false));
        assert_eq!(last.property_id, Some(PropertyId::new("main.assertion.1")));
    }

    #[test]
    fn steps_off_the_path_are_skipped() {
        let eq = Equation::from_steps(vec![
            Step::input("c#1"),
            Step::assignment("x#1", SmtTerm::int(5)).with_guard(SmtTerm::var("c#1")),
            Step::assignment("x#2", SmtTerm::int(6)).with_guard(SmtTerm::var("c#1").not()),
            Step::assertion("p", SmtTerm::bool(false)),
        ]);
        let m = model(&[
            ("c#1", ModelValue::Bool(false)),
            ("x#1", ModelValue::Int(0)),
            ("x#2", ModelValue::Int(6)),
        ]);
        let trace = build_trace(&eq, &m).unwrap();
        let indices: Vec<usize> = trace.steps().map(|s| s.step).collect();
        assert_eq!(indices, [0, 2, 3]);
    }

    #[test]
    fn literal_decides_violation_when_present() {
        let mut eq = Equation::from_steps(vec![
            Step::assertion("a", SmtTerm::var("x#1").gt(SmtTerm::int(0))),
            Step::assertion("b", SmtTerm::var("x#1").gt(SmtTerm::int(5))),
        ]);
        eq.steps_mut()[0].literal = Some("assert#0".into());
        eq.steps_mut()[1].literal = Some("assert#1".into());
        let m = model(&[
            ("x#1", ModelValue::Int(3)),
            ("assert#0", ModelValue::Bool(true)),
            ("assert#1", ModelValue::Bool(false)),
        ]);
        let trace = build_trace(&eq, &m).unwrap();
        assert_eq!(trace.violation().map(|s| s.step), Some(1));
    }

    #[test]
    fn ignored_steps_never_appear() {
        let mut eq = Equation::from_steps(vec![
            Step::assignment("x#1", SmtTerm::int(1)),
            Step::assertion("p", SmtTerm::var("x#1").eq(SmtTerm::int(2))),
        ]);
        eq.steps_mut()[0].ignored = true;
        let trace = build_trace(&eq, &model(&[("x#1", ModelValue::Int(1))])).unwrap();
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn model_without_violation_is_an_error() {
        let eq = Equation::from_steps(vec![Step::assertion(
            "p",
            SmtTerm::var("x").eq(SmtTerm::int(1)),
        )]);
        assert_eq!(
            build_trace(&eq, &model(&[("x", ModelValue::Int(1))])),
            Err(TraceError::NoViolatedAssertion)
        );
    }

    #[test]
    fn only_sat_verdicts_have_traces() {
        let eq = Equation::new();
        assert_eq!(
            Trace::from_verdict(&eq, &SolverVerdict::Unsat),
            Err(TraceError::NoModel("unsat"))
        );
        assert_eq!(
            Trace::from_verdict(&eq, &SolverVerdict::Inconclusive("timeout".into())),
            Err(TraceError::NoModel("inconclusive"))
        );
    }
}
