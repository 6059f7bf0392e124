//! Per-property verification status, merged across passes and rounds.

use std::fmt;

use garnet_ir::{Equation, PropertyId, SourceLocation};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::convert::SolverVerdict;

/// Verification status of a property.
///
/// Statuses are totally ordered and merge by maximum:
/// `NotChecked < Unknown < NotReachable < Pass < Fail`. An inconclusive
/// result never weakens an established verdict, and a counterexample found
/// in a later round overrides an earlier `Pass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyStatus {
    NotChecked,
    Unknown,
    NotReachable,
    Pass,
    Fail,
}

impl PropertyStatus {
    pub fn merge(self, other: PropertyStatus) -> PropertyStatus {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::NotChecked => "NOT_CHECKED",
            PropertyStatus::Unknown => "UNKNOWN",
            PropertyStatus::NotReachable => "NOT_REACHABLE",
            PropertyStatus::Pass => "PASS",
            PropertyStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a status was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// No verdict yet.
    Unresolved,
    /// Every instance of the assertion simplified to `true`.
    Trivial,
    /// Decided by a solver answer.
    Solver,
    /// Set because the property no longer occurs in the (possibly sliced)
    /// equation. Not a proof: re-check without slicing for a definitive
    /// verdict.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyInfo {
    pub status: PropertyStatus,
    pub confidence: Confidence,
    /// Location of the first step seen for this property.
    pub location: SourceLocation,
    pub description: String,
}

impl PropertyInfo {
    pub fn new(location: SourceLocation, description: impl Into<String>) -> Self {
        Self {
            status: PropertyStatus::NotChecked,
            confidence: Confidence::Unresolved,
            location,
            description: description.into(),
        }
    }

    /// Whether the status may be reported as proven (or refuted).
    pub fn is_definitive(&self) -> bool {
        matches!(self.confidence, Confidence::Solver | Confidence::Trivial)
    }

    /// Merge `status` in. A repeated status backed by a proof replaces a
    /// heuristic one. Returns whether status or confidence changed.
    fn absorb(&mut self, status: PropertyStatus, confidence: Confidence) -> bool {
        let merged = self.status.merge(status);
        if merged != self.status {
            self.status = merged;
            self.confidence = confidence;
            return true;
        }
        let proven = matches!(confidence, Confidence::Solver | Confidence::Trivial);
        if status == self.status && proven && !self.is_definitive() {
            self.confidence = confidence;
            return true;
        }
        false
    }
}

/// Property identifier to status, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyTable {
    properties: IndexMap<PropertyId, PropertyInfo>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property as `NotChecked` unless it is already tracked.
    pub fn register(
        &mut self,
        id: impl Into<PropertyId>,
        location: SourceLocation,
        description: impl Into<String>,
    ) {
        self.properties
            .entry(id.into())
            .or_insert_with(|| PropertyInfo::new(location, description));
    }

    /// Register every property labelling an assertion of `equation`, ignored
    /// or not.
    pub fn register_from_equation(&mut self, equation: &Equation) {
        for step in equation.iter().filter(|s| s.is_assert()) {
            if let Some(id) = step.property_id.as_ref().filter(|id| !id.as_str().is_empty()) {
                self.register(id.clone(), step.source.clone(), step.comment.clone());
            }
        }
    }

    pub fn get(&self, id: &PropertyId) -> Option<&PropertyInfo> {
        self.properties.get(id)
    }

    pub fn status(&self, id: &str) -> Option<PropertyStatus> {
        self.properties
            .get(&PropertyId::new(id))
            .map(|info| info.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyId, &PropertyInfo)> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn count(&self, status: PropertyStatus) -> usize {
        self.properties
            .values()
            .filter(|info| info.status == status)
            .count()
    }

    /// Status pass over the non-ignored assertions of `equation`.
    ///
    /// A property is `Pass` for this pass when every one of its assertion
    /// steps is trivially true, `Unknown` otherwise; that status is merged
    /// into the table. Tracked properties still `NotChecked` afterwards did
    /// not occur in the equation and are set to `Pass` with
    /// [`Confidence::Heuristic`]. Returns the identifiers whose status
    /// changed, in first-change order.
    pub fn update_from_equation(&mut self, equation: &Equation) -> Vec<PropertyId> {
        let mut local: IndexMap<&PropertyId, (PropertyStatus, &SourceLocation, &str)> =
            IndexMap::new();
        for step in equation.iter().filter(|s| s.is_assert() && !s.ignored) {
            let Some(id) = step.property_id.as_ref().filter(|id| !id.as_str().is_empty()) else {
                continue;
            };
            let status = if step.vcc().simplify().is_true() {
                PropertyStatus::Pass
            } else {
                PropertyStatus::Unknown
            };
            local
                .entry(id)
                .and_modify(|(s, _, _)| *s = (*s).min(status))
                .or_insert((status, &step.source, step.comment.as_str()));
        }

        let mut changed = IndexSet::new();
        for (id, (status, location, description)) in local {
            let confidence = match status {
                PropertyStatus::Pass => Confidence::Trivial,
                _ => Confidence::Unresolved,
            };
            match self.properties.get_mut(id) {
                Some(info) => {
                    if info.location.is_nil() {
                        info.location = location.clone();
                    }
                    if info.description.is_empty() {
                        info.description = description.to_string();
                    }
                    if info.absorb(status, confidence) {
                        changed.insert(id.clone());
                    }
                }
                None => {
                    self.properties.insert(
                        id.clone(),
                        PropertyInfo {
                            status,
                            confidence,
                            location: location.clone(),
                            description: description.to_string(),
                        },
                    );
                    changed.insert(id.clone());
                }
            }
        }

        for (id, info) in &mut self.properties {
            if info.status == PropertyStatus::NotChecked {
                info.status = PropertyStatus::Pass;
                info.confidence = Confidence::Heuristic;
                changed.insert(id.clone());
            }
        }

        debug!(changed = changed.len(), "updated property status from equation");
        changed.into_iter().collect()
    }

    /// Fold a solver answer about `equation` into the table.
    ///
    /// On `Sat`, properties with an assertion whose literal is false in the
    /// model become `Fail`. On `Unsat`, properties with a non-ignored
    /// assertion that are still `Unknown`, or only heuristically `Pass`,
    /// become a proven `Pass`. An inconclusive
    /// answer changes nothing.
    pub fn update_from_verdict(
        &mut self,
        equation: &Equation,
        verdict: &SolverVerdict,
    ) -> Vec<PropertyId> {
        let mut changed = IndexSet::new();
        for step in equation.iter().filter(|s| s.is_assert() && !s.ignored) {
            let Some(id) = step.property_id.as_ref() else {
                continue;
            };
            let Some(info) = self.properties.get_mut(id) else {
                continue;
            };
            let outcome = match verdict {
                SolverVerdict::Sat(model) => step
                    .literal
                    .as_deref()
                    .and_then(|l| model.get_bool(l))
                    .filter(|holds| !holds)
                    .map(|_| PropertyStatus::Fail),
                SolverVerdict::Unsat => {
                    let open = info.status == PropertyStatus::Unknown
                        || (info.status == PropertyStatus::Pass && !info.is_definitive());
                    open.then_some(PropertyStatus::Pass)
                }
                SolverVerdict::Inconclusive(_) => None,
            };
            if let Some(status) = outcome {
                if info.absorb(status, Confidence::Solver) {
                    changed.insert(id.clone());
                }
            }
        }
        debug!(
            verdict = verdict.name(),
            changed = changed.len(),
            "updated property status from solver"
        );
        changed.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_ir::Step;
    use garnet_smt::solver::{Model, ModelValue};
    use garnet_smt::terms::SmtTerm;
    use super::PropertyStatus::*;

    fn unknown_assert(id: &str) -> Step {
        Step::assertion(id, SmtTerm::var("x#1").gt(SmtTerm::int(0)))
    }

    fn trivial_assert(id: &str) -> Step {
        Step::assertion(id, SmtTerm::int(1).lt(SmtTerm::int(2)))
    }

    #[test]
    fn merge_order_table() {
        let order = [NotChecked, Unknown, NotReachable, Pass, Fail];
        // rows: old status, columns: new status
        let expected = [
            [NotChecked, Unknown, NotReachable, Pass, Fail],
            [Unknown, Unknown, NotReachable, Pass, Fail],
            [NotReachable, NotReachable, NotReachable, Pass, Fail],
            [Pass, Pass, Pass, Pass, Fail],
            [Fail, Fail, Fail, Fail, Fail],
        ];
        for (i, old) in order.iter().enumerate() {
            for (j, new) in order.iter().enumerate() {
                assert_eq!(old.merge(*new), expected[i][j], "{old} merged with {new}");
            }
        }
    }

    #[test]
    fn unknown_pass_unknown_sequence_ends_at_pass() {
        let mut table = PropertyTable::new();

        let first = table.update_from_equation(&Equation::from_steps(vec![unknown_assert("p")]));
        assert_eq!(first, vec![PropertyId::new("p")]);
        assert_eq!(table.status("p"), Some(Unknown));

        let second = table.update_from_equation(&Equation::from_steps(vec![trivial_assert("p")]));
        assert_eq!(second, vec![PropertyId::new("p")]);
        assert_eq!(table.status("p"), Some(Pass));

        let third = table.update_from_equation(&Equation::from_steps(vec![unknown_assert("p")]));
        assert!(third.is_empty());
        assert_eq!(table.status("p"), Some(Pass));
    }

    #[test]
    fn absent_property_becomes_heuristic_pass_once() {
        let mut table = PropertyTable::new();
        table.register("gone", SourceLocation::default(), "sliced away");

        let changed = table.update_from_equation(&Equation::new());
        assert_eq!(changed, vec![PropertyId::new("gone")]);
        let info = table.get(&PropertyId::new("gone")).unwrap();
        assert_eq!(info.status, Pass);
        assert_eq!(info.confidence, Confidence::Heuristic);
        assert!(!info.is_definitive());

        assert!(table.update_from_equation(&Equation::new()).is_empty());
    }

    #[test]
    fn heuristic_pass_is_upgraded_by_a_later_proof() {
        let mut table = PropertyTable::new();
        table.register("p", SourceLocation::default(), "");
        table.update_from_equation(&Equation::new());

        // a deeper round reaches the assertion and the solver proves it
        let eq = converted(vec![unknown_assert("p")]);
        assert!(table.update_from_equation(&eq).is_empty());
        let changed = table.update_from_verdict(&eq, &SolverVerdict::Unsat);
        assert_eq!(changed, vec![PropertyId::new("p")]);
        let info = table.get(&PropertyId::new("p")).unwrap();
        assert_eq!((info.status, info.confidence), (Pass, Confidence::Solver));
        assert!(info.is_definitive());

        assert!(table
            .update_from_verdict(&eq, &SolverVerdict::Unsat)
            .is_empty());
    }

    #[test]
    fn heuristic_pass_is_upgraded_when_found_trivial() {
        let mut table = PropertyTable::new();
        table.register("b", SourceLocation::default(), "");
        table.update_from_equation(&Equation::new());

        let eq = Equation::from_steps(vec![trivial_assert("b")]);
        assert_eq!(table.update_from_equation(&eq), vec![PropertyId::new("b")]);
        let info = table.get(&PropertyId::new("b")).unwrap();
        assert_eq!(info.confidence, Confidence::Trivial);
    }

    #[test]
    fn status_pass_is_idempotent() {
        let eq = Equation::from_steps(vec![unknown_assert("a"), trivial_assert("b")]);
        let mut table = PropertyTable::new();
        assert_eq!(table.update_from_equation(&eq).len(), 2);
        assert!(table.update_from_equation(&eq).is_empty());
    }

    #[test]
    fn one_open_instance_keeps_property_unknown() {
        let eq = Equation::from_steps(vec![trivial_assert("loop"), unknown_assert("loop")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);
        assert_eq!(table.status("loop"), Some(Unknown));
    }

    #[test]
    fn ignored_steps_are_skipped() {
        let mut eq = Equation::from_steps(vec![unknown_assert("p")]);
        eq.steps_mut()[0].ignored = true;
        let mut table = PropertyTable::new();
        table.register_from_equation(&eq);
        table.update_from_equation(&eq);
        assert_eq!(table.status("p"), Some(Pass));
        assert_eq!(
            table.get(&PropertyId::new("p")).map(|i| i.confidence),
            Some(Confidence::Heuristic)
        );
    }

    #[test]
    fn first_sight_records_location_and_description() {
        let eq = Equation::from_steps(vec![unknown_assert("p")
            .at(SourceLocation::new("main.c", "main", 9))
            .with_comment("x positive")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);
        let info = table.get(&PropertyId::new("p")).unwrap();
        assert_eq!(info.location.line, 9);
        assert_eq!(info.description, "x positive");
    }

    fn converted(steps: Vec<Step>) -> Equation {
        let mut eq = Equation::from_steps(steps);
        for (i, step) in eq.steps_mut().iter_mut().enumerate() {
            if step.is_assert() {
                step.literal = Some(format!("assert#{i}"));
            }
        }
        eq
    }

    #[test]
    fn sat_marks_false_literals_failed() {
        let eq = converted(vec![unknown_assert("a"), unknown_assert("b")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);

        let model: Model = [
            ("assert#0".to_string(), ModelValue::Bool(true)),
            ("assert#1".to_string(), ModelValue::Bool(false)),
        ]
        .into_iter()
        .collect();
        let changed = table.update_from_verdict(&eq, &SolverVerdict::Sat(model));
        assert_eq!(changed, vec![PropertyId::new("b")]);
        assert_eq!(table.status("a"), Some(Unknown));
        let b = table.get(&PropertyId::new("b")).unwrap();
        assert_eq!((b.status, b.confidence), (Fail, Confidence::Solver));
    }

    #[test]
    fn unsat_resolves_unknown_to_pass() {
        let eq = converted(vec![unknown_assert("a")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);
        assert_eq!(
            table.update_from_verdict(&eq, &SolverVerdict::Unsat),
            vec![PropertyId::new("a")]
        );
        assert!(table.get(&PropertyId::new("a")).unwrap().is_definitive());
    }

    #[test]
    fn inconclusive_changes_nothing() {
        let eq = converted(vec![unknown_assert("a"), trivial_assert("b")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);
        let before = table.clone();
        let changed =
            table.update_from_verdict(&eq, &SolverVerdict::Inconclusive("timeout".into()));
        assert!(changed.is_empty());
        assert_eq!(table, before);
    }

    #[test]
    fn later_counterexample_overrides_pass() {
        let eq = converted(vec![unknown_assert("a")]);
        let mut table = PropertyTable::new();
        table.update_from_equation(&eq);
        table.update_from_verdict(&eq, &SolverVerdict::Unsat);
        assert_eq!(table.status("a"), Some(Pass));

        let model: Model = [("assert#0".to_string(), ModelValue::Bool(false))]
            .into_iter()
            .collect();
        table.update_from_verdict(&eq, &SolverVerdict::Sat(model));
        assert_eq!(table.status("a"), Some(Fail));

        table.update_from_verdict(&eq, &SolverVerdict::Unsat);
        assert_eq!(table.status("a"), Some(Fail));
    }
}
