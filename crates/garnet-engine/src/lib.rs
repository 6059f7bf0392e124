#![doc = include_str!("../README.md")]

//! Garnet BMC engine.
//!
//! The passes run in a fixed order within a round: memory model, slicing,
//! property status from the equation, conversion, solving, trace building and
//! property status from the verdict. [`pipeline::BmcRound`] enforces that
//! order; the individual passes are public for callers that drive them by
//! hand.

pub mod config;
pub mod convert;
pub mod memory_model;
pub mod pipeline;
pub mod properties;
pub mod report;
pub mod slice;
pub mod trace;
