use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::eval::eval;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Answer to a `check-sat` query.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// The backend gave up (timeout, resource limit, incompleteness).
    Unknown(String),
}

/// Values a backend assigned to the requested symbols after `Sat`.
///
/// Keys are kept sorted so that rendering a model is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub values: BTreeMap<String, ModelValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
}

impl ModelValue {
    pub fn sort(&self) -> SmtSort {
        match self {
            ModelValue::Int(_) => SmtSort::Int,
            ModelValue::Bool(_) => SmtSort::Bool,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            ModelValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ModelValue::Int(n) => Some(*n),
            ModelValue::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for ModelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelValue::Int(n) => write!(f, "{n}"),
            ModelValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ModelValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<ModelValue> {
        self.values.get(name).copied()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_int()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    /// Evaluate `term` under this model. `None` when the value depends on a
    /// symbol the model does not assign.
    pub fn eval(&self, term: &SmtTerm) -> Option<ModelValue> {
        eval(term, &|name: &str| self.get(name))
    }

    /// Evaluate a Boolean term under this model.
    pub fn eval_bool(&self, term: &SmtTerm) -> Option<bool> {
        self.eval(term).and_then(|v| v.as_bool())
    }
}

impl FromIterator<(String, ModelValue)> for Model {
    fn from_iter<I: IntoIterator<Item = (String, ModelValue)>>(iter: I) -> Self {
        Model {
            values: iter.into_iter().collect(),
        }
    }
}

/// Incremental SMT backend, as used by one BMC round.
///
/// Rounds declare every symbol up front, assert the base formula once and
/// then query each goal inside a `push`/`pop` pair.
pub trait SmtSolver {
    type Error: std::error::Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    fn push(&mut self) -> Result<(), Self::Error>;

    /// Discard every assertion made since the matching `push`.
    fn pop(&mut self) -> Result<(), Self::Error>;

    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Like [`SmtSolver::check_sat`], also reading back `var_names` when the
    /// answer is `Sat`.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Human-readable backend name for diagnostics.
    fn name(&self) -> &str {
        "smt"
    }

    /// Forget all declarations and assertions.
    fn reset(&mut self) -> Result<(), Self::Error>;
}
