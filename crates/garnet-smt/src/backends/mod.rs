//! Solver backends and SMT-LIB2 rendering.

pub mod process;
pub mod smtlib_printer;
