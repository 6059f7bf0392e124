#![doc = include_str!("../README.md")]

//! Equation data model for the garnet BMC backend.
//!
//! This crate defines the SSA steps produced by symbolic execution, the
//! equation that owns them, and the namespace used to resolve symbol sorts
//! and sharing.

pub mod equation;
pub mod namespace;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;

pub use equation::{Equation, PropertyId, SourceLocation, Step, StepKind, ThreadId};
pub use namespace::{Namespace, Symbol};
