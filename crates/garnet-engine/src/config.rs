//! Run configuration: memory model choice, unwinding bounds and slicing
//! switches.

use std::fmt;

use garnet_ir::ThreadId;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid memory model '{0}': use one of sc, tso, pso")]
    UnknownMemoryModel(String),
    #[error("invalid value '{value}' for option '{option}'")]
    InvalidValue { option: String, value: String },
    #[error("malformed unwindset entry '{0}': expected [thread:]loop-id:N")]
    MalformedUnwindset(String),
    #[error("unknown option '{0}'")]
    UnknownOption(String),
}

/// The memory model a run is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryModelKind {
    /// Sequential consistency.
    #[default]
    Sc,
    /// Total store order: stores are buffered per thread.
    Tso,
    /// Partial store order: stores are buffered per thread and address.
    Pso,
}

impl MemoryModelKind {
    /// Parse a memory model name. The empty string selects the default.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "" | "sc" => Ok(MemoryModelKind::Sc),
            "tso" => Ok(MemoryModelKind::Tso),
            "pso" => Ok(MemoryModelKind::Pso),
            other => Err(ConfigError::UnknownMemoryModel(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MemoryModelKind::Sc => "sc",
            MemoryModelKind::Tso => "tso",
            MemoryModelKind::Pso => "pso",
        }
    }
}

impl fmt::Display for MemoryModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loop unwinding bounds: a global bound plus per-loop overrides, optionally
/// restricted to one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnwindSet {
    global: Option<u32>,
    #[serde(serialize_with = "serialize_overrides")]
    overrides: IndexMap<(Option<u32>, String), u32>,
}

fn serialize_overrides<S: serde::Serializer>(
    overrides: &IndexMap<(Option<u32>, String), u32>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(overrides.iter().map(|((thread, loop_id), n)| {
        let key = match thread {
            Some(t) => format!("{t}:{loop_id}"),
            None => loop_id.clone(),
        };
        (key, *n)
    }))
}

impl UnwindSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(limit: u32) -> Self {
        Self {
            global: Some(limit),
            ..Self::default()
        }
    }

    pub fn global(&self) -> Option<u32> {
        self.global
    }

    pub fn set_global(&mut self, limit: u32) {
        self.global = Some(limit);
    }

    /// Parse `unwindset` entries (`loop-id:N` or `thread:loop-id:N`,
    /// comma-separated) and add them, later entries overriding earlier ones.
    pub fn parse_unwindset(&mut self, entries: &str) -> Result<(), ConfigError> {
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let malformed = || ConfigError::MalformedUnwindset(entry.to_string());
            let (rest, limit) = entry.rsplit_once(':').ok_or_else(malformed)?;
            let limit: u32 = limit.trim().parse().map_err(|_| malformed())?;
            let (thread, loop_id) = match rest.split_once(':') {
                Some((thread, loop_id)) => match thread.parse::<u32>() {
                    Ok(t) => (Some(t), loop_id),
                    Err(_) => (None, rest),
                },
                None => (None, rest),
            };
            if loop_id.is_empty() {
                return Err(malformed());
            }
            self.overrides.insert((thread, loop_id.to_string()), limit);
        }
        Ok(())
    }

    /// Unwinding bound for `loop_id` in `thread`. A thread-specific entry wins
    /// over a thread-agnostic one, which wins over the global bound.
    pub fn limit_for(&self, thread: ThreadId, loop_id: &str) -> Option<u32> {
        self.overrides
            .get(&(Some(thread.0), loop_id.to_string()))
            .or_else(|| self.overrides.get(&(None, loop_id.to_string())))
            .copied()
            .or(self.global)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.overrides.is_empty()
    }
}

/// Options controlling one BMC run.
#[derive(Debug, Clone, Serialize)]
pub struct BmcOptions {
    pub memory_model: MemoryModelKind,
    pub unwind: Option<u32>,
    pub unwindset: UnwindSet,
    /// Use full slicing instead of simple slicing.
    pub slice_formula: bool,
    /// Coverage goals. A non-empty list disables simple slicing.
    pub cover: Vec<String>,
    /// Per-query solver timeout in seconds; `0` disables it.
    pub solver_timeout_secs: u64,
    pub stop_on_fail: bool,
}

impl Default for BmcOptions {
    fn default() -> Self {
        Self {
            memory_model: MemoryModelKind::Sc,
            unwind: None,
            unwindset: UnwindSet::new(),
            slice_formula: false,
            cover: Vec::new(),
            solver_timeout_secs: 0,
            stop_on_fail: false,
        }
    }
}

impl BmcOptions {
    /// Build options from `(name, value)` pairs keyed by the external option
    /// names. Later pairs override earlier ones; `unwindset` and `cover`
    /// accumulate.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = BmcOptions::default();
        for (name, value) in pairs {
            let invalid = || ConfigError::InvalidValue {
                option: name.to_string(),
                value: value.to_string(),
            };
            match name {
                "mm" => options.memory_model = MemoryModelKind::parse(value)?,
                "unwind" => {
                    let limit = value.parse().map_err(|_| invalid())?;
                    options.unwind = Some(limit);
                    options.unwindset.set_global(limit);
                }
                "unwindset" => options.unwindset.parse_unwindset(value)?,
                "slice-formula" => options.slice_formula = parse_flag(value).ok_or_else(invalid)?,
                "cover" => options.cover.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string),
                ),
                "timeout" => options.solver_timeout_secs = value.parse().map_err(|_| invalid())?,
                "stop-on-fail" => options.stop_on_fail = parse_flag(value).ok_or_else(invalid)?,
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }
        Ok(options)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "" | "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
