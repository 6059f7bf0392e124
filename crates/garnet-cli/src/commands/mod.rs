pub(crate) mod check;
pub(crate) mod slice;

use std::fs;
use std::path::Path;

use garnet_engine::config::BmcOptions;
use garnet_engine::properties::PropertyTable;
use garnet_ir::{Equation, Namespace, PropertyId, SourceLocation};
use miette::{miette, IntoDiagnostic, WrapErr};
use serde::Deserialize;

use crate::cli::BmcArgs;

/// A serialized BMC problem: what symbolic execution hands over.
#[derive(Debug, Deserialize)]
pub(crate) struct Problem {
    pub(crate) namespace: Namespace,
    pub(crate) equation: Equation,
    /// Properties of the program known before symbolic execution. Those that
    /// never reach the equation end up passing heuristically.
    #[serde(default)]
    pub(crate) properties: Vec<KnownProperty>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KnownProperty {
    pub(crate) id: PropertyId,
    #[serde(default)]
    pub(crate) location: SourceLocation,
    #[serde(default)]
    pub(crate) description: String,
}

impl Problem {
    pub(crate) fn property_table(&self) -> PropertyTable {
        let mut table = PropertyTable::new();
        for known in &self.properties {
            table.register(
                known.id.clone(),
                known.location.clone(),
                known.description.clone(),
            );
        }
        table
    }
}

pub(crate) fn load_problem(path: &Path) -> miette::Result<Problem> {
    let source = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read problem file {}", path.display()))?;
    serde_json::from_str(&source)
        .map_err(|e| miette!("{}: malformed problem: {e}", path.display()))
}

/// Validate the shared flags through the engine's option parser, so the CLI
/// and library reject exactly the same inputs.
pub(crate) fn bmc_options(
    args: &BmcArgs,
    extra: &[(&'static str, String)],
) -> miette::Result<BmcOptions> {
    let mut pairs: Vec<(&str, String)> = vec![("mm", args.mm.clone())];
    if let Some(unwind) = args.unwind {
        pairs.push(("unwind", unwind.to_string()));
    }
    for entry in &args.unwindset {
        pairs.push(("unwindset", entry.clone()));
    }
    if args.slice_formula {
        pairs.push(("slice-formula", "true".to_string()));
    }
    if !args.cover.is_empty() {
        pairs.push(("cover", args.cover.join(",")));
    }
    pairs.extend(extra.iter().cloned());

    BmcOptions::from_pairs(pairs.iter().map(|(name, value)| (*name, value.as_str())))
        .map_err(|e| miette!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_engine::config::MemoryModelKind;
    use garnet_ir::ThreadId;

    fn args(mm: &str) -> BmcArgs {
        BmcArgs {
            mm: mm.to_string(),
            unwind: None,
            unwindset: Vec::new(),
            slice_formula: false,
            cover: Vec::new(),
        }
    }

    #[test]
    fn flags_map_onto_engine_options() {
        let mut a = args("pso");
        a.unwind = Some(4);
        a.unwindset = vec!["1:main.0:2".into(), "main.1:7".into()];
        a.cover = vec!["g1".into(), "g2".into()];
        let options = bmc_options(&a, &[("stop-on-fail", "true".into())]).unwrap();

        assert_eq!(options.memory_model, MemoryModelKind::Pso);
        assert_eq!(options.unwind, Some(4));
        assert_eq!(options.unwindset.limit_for(ThreadId(1), "main.0"), Some(2));
        assert_eq!(options.unwindset.limit_for(ThreadId(0), "main.1"), Some(7));
        assert_eq!(options.unwindset.limit_for(ThreadId(0), "main.9"), Some(4));
        assert_eq!(options.cover, ["g1", "g2"]);
        assert!(options.stop_on_fail);
    }

    #[test]
    fn bad_memory_model_is_rejected() {
        let err = bmc_options(&args("arm"), &[]).unwrap_err();
        assert!(err.to_string().contains("invalid memory model 'arm'"));
    }

    #[test]
    fn known_properties_start_unchecked() {
        let problem: Problem = serde_json::from_str(
            r#"{
                "namespace": {"x": {"sort": "int"}},
                "equation": {"steps": []},
                "properties": [{"id": "main.assertion.3", "description": "dead code"}]
            }"#,
        )
        .unwrap();
        let table = problem.property_table();
        assert_eq!(
            table.status("main.assertion.3"),
            Some(garnet_engine::properties::PropertyStatus::NotChecked)
        );
    }
}
