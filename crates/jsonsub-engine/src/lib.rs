//! Subsumption checking engine.
//!
//! Orchestrates the full pipeline: reference resolution, key-universe
//! sealing, schema compilation to Z3 predicates with labeled leaf
//! constraints, the `P(x) ∧ ¬C(x)` solver query, and on SAT the
//! model-driven witness extraction, minimization, and diagnosis.

pub mod compile;
pub mod explain;
pub mod labels;
pub mod pipeline;
pub mod result;
pub mod validate;
pub mod witness;

pub use pipeline::{check_subsumption, find_counterexample, is_compatible, run_check, CheckOptions, RefResolution};
pub use result::{CheckError, SubsumptionResult};
