//! Z3 encoding layer for subsumption checking.
//!
//! Defines the tagged JSON value sort and its recognizers/accessors, lifts
//! JSON literals into equality predicates, translates the supported regex
//! subset into Z3's regex theory, builds the built-in `format` constraints,
//! and drives the solver (timeouts, sat outcomes, witness minimization).

pub mod formats;
pub mod lift;
pub mod regex;
pub mod solver;
pub mod sort;

pub use lift::{lift_eq, LiftError};
pub use regex::{CompiledPattern, RegexError};
pub use solver::{SatOutcome, SolverDriver};
pub use sort::JsonSort;
