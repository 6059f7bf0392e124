use garnet_smt::sorts::SmtSort;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A program variable as known to symbolic execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub sort: SmtSort,
    /// Shared between threads, hence subject to the memory model.
    #[serde(default)]
    pub shared: bool,
}

/// Maps program variable base names to their symbols.
///
/// SSA names carry a `#n` suffix on top of the base name (`x#3` is the third
/// version of `x`); lookups by SSA name strip it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace {
    symbols: IndexMap<String, Symbol>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, base: impl Into<String>, sort: SmtSort) -> &mut Self {
        self.symbols.insert(
            base.into(),
            Symbol {
                sort,
                shared: false,
            },
        );
        self
    }

    pub fn declare_shared(&mut self, base: impl Into<String>, sort: SmtSort) -> &mut Self {
        self.symbols
            .insert(base.into(), Symbol { sort, shared: true });
        self
    }

    /// Resolve a base or SSA name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .get(name)
            .or_else(|| self.symbols.get(base_name(name)))
    }

    pub fn sort_of(&self, name: &str) -> Option<SmtSort> {
        self.lookup(name).map(|s| s.sort)
    }

    pub fn is_shared(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|s| s.shared)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Strip the SSA suffix: `x#3` becomes `x`, `x` stays `x`.
pub fn base_name(ssa_name: &str) -> &str {
    ssa_name
        .split_once('#')
        .map_or(ssa_name, |(base, _)| base)
}
