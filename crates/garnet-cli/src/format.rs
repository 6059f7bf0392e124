//! Plain-text and JSON renderings of round results.
//!
//! JSON output is one object per line so that progress can be streamed
//! before the round finishes.

use std::io::{self, Write};

use garnet_engine::pipeline::{RoundOutcome, RoundVerdict};
use garnet_engine::properties::{PropertyInfo, PropertyStatus, PropertyTable};
use garnet_engine::report::{PropertyReporter, TraceFormatter};
use garnet_engine::slice::SliceReport;
use garnet_engine::trace::{Trace, TraceStep, TraceStepKind};
use garnet_ir::{Equation, PropertyId};
use serde_json::json;

use crate::cli::OutputFormat;

/// Everything a command renders.
pub(crate) trait Reporter: TraceFormatter + PropertyReporter {
    fn write_slice(&self, out: &mut dyn Write, report: &SliceReport) -> io::Result<()>;

    fn write_verdict(&self, out: &mut dyn Write, outcome: &RoundOutcome) -> io::Result<()>;

    fn write_equation(&self, out: &mut dyn Write, equation: &Equation) -> io::Result<()>;
}

pub(crate) fn reporter(format: OutputFormat) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Plain => Box::new(PlainFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

pub(crate) struct PlainFormatter;

const RULE: &str = "----------------------------------------------------";

fn property_line(id: &PropertyId, info: &PropertyInfo) -> String {
    let mut line = format!("[{id}] {}", info.location);
    if !info.description.is_empty() {
        line.push_str(": ");
        line.push_str(&info.description);
    }
    line.push_str(": ");
    line.push_str(info.status.as_str());
    line
}

fn values_line(step: &TraceStep) -> String {
    step.values
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl TraceFormatter for PlainFormatter {
    fn write_trace(&self, out: &mut dyn Write, trace: &Trace) -> io::Result<()> {
        writeln!(out, "Counterexample:")?;
        for step in trace {
            writeln!(out)?;
            match step.kind {
                TraceStepKind::Assertion => {
                    writeln!(out, "Violated property:")?;
                    writeln!(out, "  {} thread {}", step.source, step.thread)?;
                    if let Some(id) = &step.property_id {
                        writeln!(out, "  [{id}] {}", step.comment)?;
                    }
                    writeln!(out, "  {}", values_line(step))?;
                }
                TraceStepKind::Assumption => {
                    writeln!(out, "Assumption:")?;
                    writeln!(out, "  {} thread {}", step.source, step.thread)?;
                    writeln!(out, "  {}", values_line(step))?;
                }
                kind => {
                    writeln!(out, "State {} {} thread {}", step.step, step.source, step.thread)?;
                    writeln!(out, "{RULE}")?;
                    let note = match kind {
                        TraceStepKind::Input => " (input)",
                        TraceStepKind::SharedRead => " (shared read)",
                        TraceStepKind::SharedWrite => " (shared write)",
                        _ => "",
                    };
                    writeln!(out, "  {}{note}", values_line(step))?;
                }
            }
        }
        writeln!(out)
    }
}

impl PropertyReporter for PlainFormatter {
    fn write_progress(
        &self,
        out: &mut dyn Write,
        properties: &PropertyTable,
        changed: &[PropertyId],
    ) -> io::Result<()> {
        for id in changed {
            if let Some(info) = properties.get(id) {
                writeln!(out, "{}", property_line(id, info))?;
            }
        }
        Ok(())
    }

    fn write_summary(&self, out: &mut dyn Write, properties: &PropertyTable) -> io::Result<()> {
        writeln!(out, "** Results:")?;
        for (id, info) in properties.iter() {
            writeln!(out, "{}", property_line(id, info))?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "** {} of {} failed",
            properties.count(PropertyStatus::Fail),
            properties.len()
        )
    }
}

impl Reporter for PlainFormatter {
    fn write_slice(&self, out: &mut dyn Write, report: &SliceReport) -> io::Result<()> {
        writeln!(
            out,
            "Slicing: {}, {} step(s) ignored",
            report.strategy, report.newly_ignored
        )?;
        writeln!(
            out,
            "Generated {} VCC(s), {} remaining after simplification",
            report.total_vccs, report.open_vccs
        )
    }

    fn write_verdict(&self, out: &mut dyn Write, outcome: &RoundOutcome) -> io::Result<()> {
        match &outcome.verdict {
            RoundVerdict::Safe => writeln!(out, "VERIFICATION SUCCESSFUL"),
            RoundVerdict::Unsafe => writeln!(out, "VERIFICATION FAILED"),
            RoundVerdict::Unknown { reason } => {
                writeln!(out, "VERIFICATION INCONCLUSIVE ({reason})")
            }
        }
    }

    fn write_equation(&self, out: &mut dyn Write, equation: &Equation) -> io::Result<()> {
        for (i, step) in equation.iter().enumerate() {
            let marker = if step.ignored { "-" } else { "+" };
            let target = step.lhs().unwrap_or(step.comment.as_str());
            writeln!(
                out,
                "{marker} {i:>4} {} {:<13} {target}",
                step.thread,
                step.kind.name()
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

pub(crate) struct JsonFormatter;

fn json_line(out: &mut dyn Write, value: &serde_json::Value) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)
}

impl TraceFormatter for JsonFormatter {
    fn write_trace(&self, out: &mut dyn Write, trace: &Trace) -> io::Result<()> {
        json_line(out, &json!({ "trace": trace }))
    }
}

impl PropertyReporter for JsonFormatter {
    fn write_progress(
        &self,
        out: &mut dyn Write,
        properties: &PropertyTable,
        changed: &[PropertyId],
    ) -> io::Result<()> {
        let changed: Vec<_> = changed
            .iter()
            .filter_map(|id| properties.get(id).map(|info| json!({ "property": id, "status": info.status })))
            .collect();
        json_line(out, &json!({ "changed": changed }))
    }

    fn write_summary(&self, out: &mut dyn Write, properties: &PropertyTable) -> io::Result<()> {
        json_line(out, &json!({ "properties": properties }))
    }
}

impl Reporter for JsonFormatter {
    fn write_slice(&self, out: &mut dyn Write, report: &SliceReport) -> io::Result<()> {
        json_line(out, &json!({ "slice": report }))
    }

    fn write_verdict(&self, out: &mut dyn Write, outcome: &RoundOutcome) -> io::Result<()> {
        json_line(
            out,
            &json!({ "verdict": outcome.verdict, "queries": outcome.queries }),
        )
    }

    fn write_equation(&self, out: &mut dyn Write, equation: &Equation) -> io::Result<()> {
        json_line(out, &json!({ "equation": equation }))
    }
}
