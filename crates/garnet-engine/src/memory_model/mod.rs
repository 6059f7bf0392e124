//! Memory models as partial-order constraints over shared-memory events.
//!
//! Every shared read and write gets an integer clock. Program order, spawn
//! order, read-from, write serialization and from-read are expressed as
//! constraints between clocks and appended to the equation as `Constraint`
//! steps. A write's clock is the moment it becomes globally visible; a read's
//! clock is the moment it executes. The three models differ only in which
//! program-order pairs they relax and in whether a read of a thread's own
//! write must wait for it to become globally visible.
//!
//! A read takes the coherence-latest write among those globally visible
//! before it and those earlier in its own thread. Under TSO and PSO the
//! latter may still sit in the store buffer, so forwarding needs no clock
//! edge.

mod pso;
mod sc;
mod tso;

use std::collections::BTreeSet;

use garnet_ir::{Equation, Namespace, Step, StepKind, ThreadId};
use garnet_smt::sorts::SmtSort;
use garnet_smt::terms::SmtTerm;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

pub use pso::Pso;
pub use sc::Sc;
pub use tso::Tso;

use crate::config::{ConfigError, MemoryModelKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryModelError {
    #[error("memory model already applied ({0})")]
    AlreadyApplied(String),
    #[error("memory model must be applied before slicing")]
    AppliedAfterSlicing,
}

/// A shared-memory event: one non-ignored shared read or write.
#[derive(Debug, Clone)]
pub struct Event {
    pub step: usize,
    pub thread: ThreadId,
    pub address: String,
    pub lhs: String,
    pub guard: SmtTerm,
    pub is_write: bool,
}

impl Event {
    pub fn same_address(&self, other: &Event) -> bool {
        self.address == other.address
    }
}

pub trait MemoryModel {
    fn kind(&self) -> MemoryModelKind;

    /// Whether `later` may take effect before `earlier`. Both belong to the
    /// same thread, `earlier` first in program order, with no barrier between.
    fn relaxes(&self, earlier: &Event, later: &Event) -> bool;

    /// Whether a read taking its value from an earlier write of its own thread
    /// is ordered after that write. Models with store buffers forward the
    /// value before the write is globally visible.
    fn orders_own_reads_from(&self) -> bool;
}

/// Select a memory model by name. The empty name selects sequential
/// consistency.
pub fn select(name: &str) -> Result<Box<dyn MemoryModel>, ConfigError> {
    MemoryModelKind::parse(name).map(for_kind)
}

pub fn for_kind(kind: MemoryModelKind) -> Box<dyn MemoryModel> {
    match kind {
        MemoryModelKind::Sc => Box::new(Sc),
        MemoryModelKind::Tso => Box::new(Tso),
        MemoryModelKind::Pso => Box::new(Pso),
    }
}

/// Counts reported by [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingStats {
    pub events: usize,
    pub constraints: usize,
    pub choices: usize,
}

/// Augment `equation` with the ordering constraints of `model`.
///
/// Must run exactly once per equation and before slicing. On error the
/// equation is left untouched.
pub fn apply(
    model: &dyn MemoryModel,
    equation: &mut Equation,
    ns: &Namespace,
) -> Result<EncodingStats, MemoryModelError> {
    if let Some(applied) = equation.memory_model() {
        return Err(MemoryModelError::AlreadyApplied(applied.to_string()));
    }
    if equation.is_sliced() {
        return Err(MemoryModelError::AppliedAfterSlicing);
    }

    let events = collect_events(equation, ns);
    let barriers: Vec<(ThreadId, usize)> = equation
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.ignored && matches!(s.kind, StepKind::MemoryBarrier))
        .map(|(i, s)| (s.thread, i))
        .collect();

    let mut encoder = Encoder::default();
    let program_order = encoder.program_order(model, &events, &barriers);
    encoder.spawn_order(&events, &program_order);
    encoder.read_from(model, &events);

    let stats = EncodingStats {
        events: events.len(),
        constraints: encoder.constraints.len(),
        choices: encoder.aux.values().filter(|s| **s == SmtSort::Bool).count(),
    };
    for (name, sort) in encoder.aux {
        equation.declare_aux(name, sort);
    }
    for (thread, term, comment) in encoder.constraints {
        let mut step = Step::constraint(term, comment);
        step.thread = thread;
        equation.push(step);
    }
    equation.mark_memory_model(model.kind().name());

    info!(
        model = model.kind().name(),
        events = stats.events,
        constraints = stats.constraints,
        "applied memory model"
    );
    Ok(stats)
}

fn collect_events(equation: &Equation, ns: &Namespace) -> Vec<Event> {
    equation
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.ignored)
        .filter_map(|(i, s)| {
            let (lhs, address, is_write) = match &s.kind {
                StepKind::SharedRead { lhs, address } => (lhs, address, false),
                StepKind::SharedWrite { lhs, address } => (lhs, address, true),
                _ => return None,
            };
            if !ns.is_shared(address) {
                debug!(step = i, address = %address, "access to unshared address ignored by memory model");
                return None;
            }
            Some(Event {
                step: i,
                thread: s.thread,
                address: address.clone(),
                lhs: lhs.clone(),
                guard: s.guard.clone(),
                is_write,
            })
        })
        .collect()
}

fn clock(event: &Event) -> SmtTerm {
    SmtTerm::var(format!("clock#{}", event.step))
}

fn before(a: &Event, b: &Event) -> SmtTerm {
    clock(a).lt(clock(b))
}

#[derive(Default)]
struct Encoder {
    aux: IndexMap<String, SmtSort>,
    constraints: Vec<(ThreadId, SmtTerm, String)>,
}

/// Per-thread program order after relaxation: for each event index, the
/// indices of events of the same thread ordered before it.
struct ProgramOrder {
    ordered_before: Vec<BTreeSet<usize>>,
}

impl Encoder {
    fn choice(&mut self, name: String) -> SmtTerm {
        self.aux.insert(name.clone(), SmtSort::Bool);
        SmtTerm::var(name)
    }

    fn emit(&mut self, thread: ThreadId, term: SmtTerm, comment: &str) {
        self.constraints.push((thread, term, comment.to_string()));
    }

    fn program_order(
        &mut self,
        model: &dyn MemoryModel,
        events: &[Event],
        barriers: &[(ThreadId, usize)],
    ) -> ProgramOrder {
        for e in events {
            self.aux.insert(format!("clock#{}", e.step), SmtSort::Int);
        }

        let fenced = |a: &Event, b: &Event| {
            barriers
                .iter()
                .any(|&(t, i)| t == a.thread && a.step < i && i < b.step)
        };

        let mut ordered_before = vec![BTreeSet::new(); events.len()];
        for (j, later) in events.iter().enumerate() {
            let mut covered = BTreeSet::new();
            for i in (0..j).rev() {
                let earlier = &events[i];
                if earlier.thread != later.thread || covered.contains(&i) {
                    continue;
                }
                if model.relaxes(earlier, later) && !fenced(earlier, later) {
                    continue;
                }
                self.emit(later.thread, before(earlier, later), "po");
                covered.insert(i);
                covered.extend(ordered_before[i].iter().copied());
            }
            ordered_before[j] = covered;
        }
        ProgramOrder { ordered_before }
    }

    fn spawn_order(&mut self, events: &[Event], po: &ProgramOrder) {
        let main = ThreadId::default();
        let mut first_step: IndexMap<ThreadId, usize> = IndexMap::new();
        for e in events.iter().filter(|e| e.thread != main) {
            first_step.entry(e.thread).or_insert(e.step);
        }

        for (&thread, &spawn_at) in &first_step {
            let parents: Vec<usize> = (0..events.len())
                .filter(|&i| events[i].thread == main && events[i].step < spawn_at)
                .collect();
            // only the latest main events and the earliest child events need
            // an explicit edge, transitivity covers the rest
            let maximal = parents.iter().copied().filter(|&i| {
                !parents
                    .iter()
                    .any(|&k| po.ordered_before[k].contains(&i))
            });
            let maximal: Vec<usize> = maximal.collect();
            let minimal: Vec<usize> = (0..events.len())
                .filter(|&j| events[j].thread == thread && po.ordered_before[j].is_empty())
                .collect();
            for &i in &maximal {
                for &j in &minimal {
                    self.emit(thread, before(&events[i], &events[j]), "spawn");
                }
            }
        }
    }

    fn read_from(&mut self, model: &dyn MemoryModel, events: &[Event]) {
        let mut by_address: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (i, e) in events.iter().enumerate() {
            by_address.entry(e.address.as_str()).or_default().push(i);
        }

        for indices in by_address.values() {
            let writes: Vec<&Event> = indices
                .iter()
                .map(|&i| &events[i])
                .filter(|e| e.is_write)
                .collect();

            // write serialization between threads
            let mut ws: IndexMap<(usize, usize), SmtTerm> = IndexMap::new();
            for (k, a) in writes.iter().enumerate() {
                for b in writes.iter().skip(k + 1) {
                    if a.thread == b.thread {
                        continue;
                    }
                    let choice = self.choice(format!("ws#{}#{}", a.step, b.step));
                    self.emit(b.thread, choice.clone().implies(before(a, b)), "ws");
                    self.emit(b.thread, choice.clone().not().implies(before(b, a)), "ws");
                    ws.insert((a.step, b.step), choice);
                }
            }
            // `a` precedes `b` in the coherence order of this address
            let coherent = |a: &Event, b: &Event| -> SmtTerm {
                if a.thread == b.thread {
                    return SmtTerm::bool(a.step < b.step);
                }
                let (key, forward) = if a.step < b.step {
                    ((a.step, b.step), true)
                } else {
                    ((b.step, a.step), false)
                };
                match ws.get(&key) {
                    Some(c) if forward => c.clone(),
                    Some(c) => c.clone().not(),
                    None => before(a, b),
                }
            };

            for read in indices.iter().map(|&i| &events[i]).filter(|e| !e.is_write) {
                let candidates: Vec<&Event> = writes
                    .iter()
                    .copied()
                    .filter(|w| w.thread != read.thread || w.step < read.step)
                    .collect();
                if candidates.is_empty() {
                    continue;
                }

                let mut choices = Vec::with_capacity(candidates.len());
                for &w in &candidates {
                    let rf = self.choice(format!("rf#{}#{}", read.step, w.step));
                    let mut effect = vec![
                        w.guard.clone(),
                        SmtTerm::var(read.lhs.clone()).eq(SmtTerm::var(w.lhs.clone())),
                    ];
                    if w.thread != read.thread || model.orders_own_reads_from() {
                        effect.push(before(w, read));
                    }
                    self.emit(read.thread, rf.clone().implies(SmtTerm::and(effect)), "rf");

                    for &w2 in writes.iter().filter(|w2| w2.step != w.step) {
                        if w2.thread == read.thread && w2.step < read.step {
                            // A read sees the latest store of its own thread,
                            // buffered or not, unless `w` is coherence-later.
                            let latest = coherent(w2, w);
                            if latest.is_true() {
                                continue;
                            }
                            let premise = SmtTerm::and(vec![rf.clone(), w2.guard.clone()]);
                            self.emit(read.thread, premise.simplify().implies(latest), "rf-own");
                        } else {
                            let premise =
                                SmtTerm::and(vec![rf.clone(), coherent(w, w2), w2.guard.clone()])
                                    .simplify();
                            if premise.is_false() {
                                continue;
                            }
                            self.emit(read.thread, premise.implies(before(read, w2)), "fr");
                        }
                    }
                    choices.push(rf);
                }
                self.emit(
                    read.thread,
                    read.guard.clone().implies(SmtTerm::or(choices)),
                    "rf-some",
                );
            }
        }
    }
}
