#![doc = include_str!("../README.md")]

//! SMT terms and solver integration for the garnet BMC backend.
//!
//! The equation produced by symbolic execution is expressed directly in
//! [`terms::SmtTerm`]; this crate knows nothing about programs, threads or
//! properties.

pub mod backends;
pub mod eval;
pub mod solver;
pub mod sorts;
pub mod terms;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
