//! A bounded, exhaustive finite-domain solver for tests.
//!
//! Integer symbols range over a small closed interval and Boolean symbols over
//! `{false, true}`. Search assigns symbols in declaration order and checks
//! each assertion as soon as its last symbol is assigned. The verdict is exact
//! only relative to the chosen domain, which is enough for the litmus-sized
//! equations the engine test-suite uses. An optional node budget turns long
//! searches into `SatResult::Unknown`, which stands in for a solver timeout.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use indexmap::IndexMap;
use thiserror::Error;

use crate::eval::eval_bool;
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum BoundedSolverError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("pop without matching push")]
    EmptyScopeStack,
}

pub struct BoundedSolver {
    int_domain: RangeInclusive<i64>,
    node_budget: Option<u64>,
    decls: IndexMap<String, SmtSort>,
    assertions: Vec<SmtTerm>,
    scopes: Vec<(usize, usize)>,
}

enum Search {
    Sat(Vec<ModelValue>),
    Unsat,
    Exhausted,
}

impl BoundedSolver {
    /// Integers range over `-8..=8`.
    pub fn new() -> Self {
        Self::with_int_domain(-8..=8)
    }

    pub fn with_int_domain(int_domain: RangeInclusive<i64>) -> Self {
        Self {
            int_domain,
            node_budget: None,
            decls: IndexMap::new(),
            assertions: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Give up with `SatResult::Unknown` after visiting `budget` search nodes.
    pub fn with_node_budget(mut self, budget: u64) -> Self {
        self.node_budget = Some(budget);
        self
    }

    pub fn assertions(&self) -> &[SmtTerm] {
        &self.assertions
    }

    fn domain(&self, sort: SmtSort) -> Vec<ModelValue> {
        match sort {
            SmtSort::Bool => vec![ModelValue::Bool(false), ModelValue::Bool(true)],
            SmtSort::Int => self.int_domain.clone().map(ModelValue::Int).collect(),
        }
    }

    fn search(&self) -> Search {
        let names: Vec<&str> = self.decls.keys().map(String::as_str).collect();
        let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        // bucket 0 holds ground assertions, bucket i+1 those whose last symbol is i
        let mut buckets: Vec<Vec<&SmtTerm>> = vec![Vec::new(); names.len() + 1];
        for assertion in &self.assertions {
            let last = assertion
                .vars()
                .iter()
                .filter_map(|v| index.get(v.as_str()).copied())
                .max();
            buckets[last.map_or(0, |i| i + 1)].push(assertion);
        }

        let no_symbols = |_: &str| -> Option<ModelValue> { None };
        if !buckets[0].iter().all(|a| eval_bool(a, &no_symbols) == Some(true)) {
            return Search::Unsat;
        }

        let domains: Vec<Vec<ModelValue>> = self.decls.values().map(|s| self.domain(*s)).collect();
        let mut values: Vec<Option<ModelValue>> = vec![None; names.len()];
        let mut nodes = 0u64;
        match self.extend(0, &domains, &buckets, &index, &mut values, &mut nodes) {
            Some(true) => Search::Sat(values.into_iter().flatten().collect()),
            Some(false) => Search::Unsat,
            None => Search::Exhausted,
        }
    }

    /// `Some(found)` when the subtree was fully explored, `None` when the node
    /// budget ran out.
    fn extend(
        &self,
        depth: usize,
        domains: &[Vec<ModelValue>],
        buckets: &[Vec<&SmtTerm>],
        index: &HashMap<&str, usize>,
        values: &mut Vec<Option<ModelValue>>,
        nodes: &mut u64,
    ) -> Option<bool> {
        if depth == domains.len() {
            return Some(true);
        }
        for candidate in &domains[depth] {
            *nodes += 1;
            if self.node_budget.is_some_and(|budget| *nodes > budget) {
                return None;
            }
            values[depth] = Some(*candidate);
            let consistent = {
                let lookup = |name: &str| index.get(name).and_then(|&i| values[i]);
                buckets[depth + 1]
                    .iter()
                    .all(|a| eval_bool(a, &lookup) == Some(true))
            };
            if consistent && self.extend(depth + 1, domains, buckets, index, values, nodes)? {
                return Some(true);
            }
        }
        values[depth] = None;
        Some(false)
    }
}

impl Default for BoundedSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for BoundedSolver {
    type Error = BoundedSolverError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), BoundedSolverError> {
        self.decls.insert(name.to_string(), *sort);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), BoundedSolverError> {
        if let Some(missing) = term.vars().into_iter().find(|v| !self.decls.contains_key(v)) {
            return Err(BoundedSolverError::UnknownVariable(missing));
        }
        self.assertions.push(term.clone());
        Ok(())
    }

    fn push(&mut self) -> Result<(), BoundedSolverError> {
        self.scopes.push((self.decls.len(), self.assertions.len()));
        Ok(())
    }

    fn pop(&mut self) -> Result<(), BoundedSolverError> {
        let (decls, assertions) = self
            .scopes
            .pop()
            .ok_or(BoundedSolverError::EmptyScopeStack)?;
        self.decls.truncate(decls);
        self.assertions.truncate(assertions);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, BoundedSolverError> {
        Ok(self.check_sat_with_model(&[])?.0)
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), BoundedSolverError> {
        match self.search() {
            Search::Sat(values) => {
                let mut model = Model::new();
                for &(name, _) in var_names {
                    let Some(i) = self.decls.get_index_of(name) else {
                        return Err(BoundedSolverError::UnknownVariable(name.to_string()));
                    };
                    model.insert(name, values[i]);
                }
                Ok((SatResult::Sat, Some(model)))
            }
            Search::Unsat => Ok((SatResult::Unsat, None)),
            Search::Exhausted => Ok((
                SatResult::Unknown("bounded search budget exhausted".into()),
                None,
            )),
        }
    }

    fn name(&self) -> &str {
        "bounded"
    }

    fn reset(&mut self) -> Result<(), BoundedSolverError> {
        self.decls.clear();
        self.assertions.clear();
        self.scopes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn bounded_basic_sat_with_model() -> TestResult {
        let mut solver = BoundedSolver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.declare_var("y", &SmtSort::Int)?;
        solver.assert(&SmtTerm::and(vec![
            SmtTerm::var("x").gt(SmtTerm::int(0)),
            SmtTerm::var("y").gt(SmtTerm::int(0)),
            SmtTerm::var("x").add(SmtTerm::var("y")).eq(SmtTerm::int(10)),
        ]))?;

        let (result, model) =
            solver.check_sat_with_model(&[("x", &SmtSort::Int), ("y", &SmtSort::Int)])?;
        assert_eq!(result, SatResult::Sat);
        let model = model.ok_or("expected model for SAT result")?;
        let (x, y) = (model.get_int("x"), model.get_int("y"));
        assert_eq!(x.zip(y).map(|(x, y)| x + y), Some(10));
        Ok(())
    }

    #[test]
    fn bounded_basic_unsat() -> TestResult {
        let mut solver = BoundedSolver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").gt(SmtTerm::int(0)))?;
        solver.assert(&SmtTerm::var("x").lt(SmtTerm::int(0)))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn ground_false_assertion_is_unsat() -> TestResult {
        let mut solver = BoundedSolver::new();
        solver.assert(&SmtTerm::bool(false))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn push_pop_restores_scope() -> TestResult {
        let mut solver = BoundedSolver::new();
        solver.declare_var("b", &SmtSort::Bool)?;
        solver.push()?;
        solver.assert(&SmtTerm::var("b"))?;
        solver.assert(&SmtTerm::var("b").not())?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        solver.pop()?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        assert!(solver.pop().is_err());
        Ok(())
    }

    #[test]
    fn undeclared_symbols_are_rejected() {
        let mut solver = BoundedSolver::new();
        assert!(matches!(
            solver.assert(&SmtTerm::var("ghost")),
            Err(BoundedSolverError::UnknownVariable(name)) if name == "ghost"
        ));
    }

    #[test]
    fn node_budget_yields_unknown() -> TestResult {
        let mut solver = BoundedSolver::with_int_domain(0..=100).with_node_budget(10);
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(99)))?;
        assert!(matches!(solver.check_sat()?, SatResult::Unknown(_)));
        Ok(())
    }
}
