//! Formatter capabilities injected at the boundary.
//!
//! The engine never chooses an output encoding. Front ends implement these
//! traits (plain text, JSON, ...) and hand them to whatever drives a round.

use std::io;

use garnet_ir::PropertyId;

use crate::properties::PropertyTable;
use crate::trace::Trace;

/// Renders a counterexample trace.
pub trait TraceFormatter {
    fn write_trace(&self, out: &mut dyn io::Write, trace: &Trace) -> io::Result<()>;
}

/// Renders property status: incremental progress and the final summary.
pub trait PropertyReporter {
    /// Called after each status pass with the identifiers that changed.
    fn write_progress(
        &self,
        out: &mut dyn io::Write,
        properties: &PropertyTable,
        changed: &[PropertyId],
    ) -> io::Result<()>;

    fn write_summary(&self, out: &mut dyn io::Write, properties: &PropertyTable) -> io::Result<()>;
}
