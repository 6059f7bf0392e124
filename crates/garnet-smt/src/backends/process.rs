use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::backends::smtlib_printer::{sort_to_smtlib, symbol_to_smtlib, write_term};
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum ProcessSolverError {
    #[error("solver pipe: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} closed its output after `{command}`{stderr}")]
    Silent {
        program: String,
        command: String,
        stderr: String,
    },
    #[error("unexpected solver answer: {0}")]
    Answer(String),
    #[error("unreadable model value: {0}")]
    Value(String),
}

/// Which external SMT-LIB2 solver to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverCommand {
    Cvc5,
    Z3,
    /// Any incremental SMT-LIB2 solver reading commands from stdin.
    Custom { program: String, args: Vec<String> },
}

impl SolverCommand {
    fn program(&self) -> &str {
        match self {
            SolverCommand::Cvc5 => "cvc5",
            SolverCommand::Z3 => "z3",
            SolverCommand::Custom { program, .. } => program,
        }
    }

    fn args(&self, timeout_ms: Option<u64>) -> Vec<String> {
        let mut args: Vec<String> = match self {
            SolverCommand::Cvc5 => vec![
                "--lang".into(),
                "smt2".into(),
                "--incremental".into(),
                "--produce-models".into(),
            ],
            SolverCommand::Z3 => vec!["-in".into(), "-smt2".into()],
            SolverCommand::Custom { args, .. } => args.clone(),
        };
        if let Some(ms) = timeout_ms {
            match self {
                SolverCommand::Cvc5 => args.push(format!("--tlimit-per={ms}")),
                SolverCommand::Z3 => args.push(format!("-t:{ms}")),
                SolverCommand::Custom { .. } => {}
            }
        }
        args
    }
}

/// An SMT-LIB2 solver driven as a child process over stdin/stdout.
pub struct ProcessSolver {
    command: SolverCommand,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    vars: HashMap<String, SmtSort>,
}

impl ProcessSolver {
    pub fn new(command: SolverCommand) -> Result<Self, ProcessSolverError> {
        Self::with_timeout_secs(command, 0)
    }

    /// Launch `command` with a per-query timeout; `0` disables the limit.
    pub fn with_timeout_secs(
        command: SolverCommand,
        timeout_secs: u64,
    ) -> Result<Self, ProcessSolverError> {
        let timeout_ms = (timeout_secs > 0).then(|| timeout_secs.saturating_mul(1000));
        let program = command.program().to_string();
        let args = command.args(timeout_ms);
        debug!(program = %program, ?args, "launching SMT-LIB2 solver");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessSolverError::Launch {
                program: program.clone(),
                source,
            })?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            let _ = child.kill();
            return Err(ProcessSolverError::Answer(format!(
                "{program} started without piped stdio"
            )));
        };

        let mut solver = Self {
            command,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            vars: HashMap::new(),
        };
        solver.preamble()?;
        Ok(solver)
    }

    fn preamble(&mut self) -> Result<(), ProcessSolverError> {
        self.emit("(set-option :produce-models true)")?;
        self.emit("(set-logic QF_LIA)")
    }

    /// Write one command that produces no output.
    fn emit(&mut self, command: &str) -> Result<(), ProcessSolverError> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Write one command and read its single-line answer.
    fn query(&mut self, command: &str) -> Result<String, ProcessSolverError> {
        self.emit(command)?;
        let mut answer = String::new();
        if self.stdout.read_line(&mut answer)? == 0 {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            let stderr = stderr.trim();
            return Err(ProcessSolverError::Silent {
                program: self.command.program().to_string(),
                command: command.to_string(),
                stderr: if stderr.is_empty() {
                    String::new()
                } else {
                    format!(" ({stderr})")
                },
            });
        }
        Ok(answer.trim_end().to_string())
    }
}

impl Drop for ProcessSolver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for ProcessSolver {
    type Error = ProcessSolverError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), ProcessSolverError> {
        self.emit(&format!(
            "(declare-const {} {})",
            symbol_to_smtlib(name),
            sort_to_smtlib(sort)
        ))?;
        self.vars.insert(name.to_string(), *sort);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), ProcessSolverError> {
        let mut command = String::from("(assert ");
        write_term(&mut command, term);
        command.push(')');
        self.emit(&command)
    }

    fn push(&mut self) -> Result<(), ProcessSolverError> {
        self.emit("(push 1)")
    }

    fn pop(&mut self) -> Result<(), ProcessSolverError> {
        self.emit("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, ProcessSolverError> {
        let answer = self.query("(check-sat)")?;
        match answer.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" | "timeout" => Ok(SatResult::Unknown(format!(
                "{} answered {answer}",
                self.command.program()
            ))),
            _ => Err(ProcessSolverError::Answer(answer)),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), ProcessSolverError> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }

        let mut model = Model::new();
        for &(name, sort) in var_names {
            // the solver rejects get-value on undeclared names
            if !self.vars.contains_key(name) {
                continue;
            }
            let answer = self.query(&format!("(get-value ({}))", symbol_to_smtlib(name)))?;
            let value = parse_value(&answer, sort).ok_or(ProcessSolverError::Value(answer))?;
            model.insert(name, value);
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn name(&self) -> &str {
        self.command.program()
    }

    fn reset(&mut self) -> Result<(), ProcessSolverError> {
        self.emit("(reset)")?;
        self.vars.clear();
        self.preamble()
    }
}

/// Parse a single-binding `get-value` answer: `((name value))`.
fn parse_value(answer: &str, sort: &SmtSort) -> Option<ModelValue> {
    let binding = answer.trim().strip_prefix("((")?.strip_suffix("))")?;
    let value = skip_symbol(binding)?.trim();
    match sort {
        SmtSort::Bool => value.parse::<bool>().ok().map(ModelValue::Bool),
        SmtSort::Int => {
            let n = match value.strip_prefix("(-").and_then(|v| v.strip_suffix(')')) {
                Some(magnitude) => magnitude.trim().parse::<i64>().ok()?.checked_neg()?,
                None => value.parse::<i64>().ok()?,
            };
            Some(ModelValue::Int(n))
        }
    }
}

/// Drop the leading (possibly `|quoted|`) symbol of a binding.
fn skip_symbol(binding: &str) -> Option<&str> {
    let binding = binding.trim_start();
    if let Some(quoted) = binding.strip_prefix('|') {
        let close = quoted.find('|')?;
        Some(&quoted[close + 1..])
    } else {
        let end = binding.find(char::is_whitespace)?;
        Some(&binding[end..])
    }
}
