use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use jsonsub_schema::ResolveError;
use jsonsub_smt::{LiftError, RegexError};

/// Result of one subsumption check.
///
/// `compatible == true` means every JSON value accepted by the producer is
/// accepted by the consumer, within the configured bounds. On
/// incompatibility the counterexample is a concrete value accepted by the
/// producer and rejected by the consumer; the diagnosis fields are populated
/// when explanations are enabled. `error` is set (and `compatible` is false)
/// when no verdict could be established.
#[derive(Debug, Clone, Serialize)]
pub struct SubsumptionResult {
    pub compatible: bool,
    pub counterexample: Option<Value>,
    pub explanation: Option<String>,
    pub failed_constraints: Vec<String>,
    pub recommendations: Vec<String>,
    pub solver_time_seconds: f64,
    pub error: Option<String>,
    /// True when the check failed because the schema is cyclic and only a
    /// simulation-based strategy could decide it.
    pub requires_simulation: bool,
}

impl SubsumptionResult {
    pub fn compatible(solver_time_seconds: f64) -> Self {
        Self {
            compatible: true,
            counterexample: None,
            explanation: None,
            failed_constraints: Vec::new(),
            recommendations: Vec::new(),
            solver_time_seconds,
            error: None,
            requires_simulation: false,
        }
    }

    pub fn incompatible(counterexample: Value, solver_time_seconds: f64) -> Self {
        Self {
            compatible: false,
            counterexample: Some(counterexample),
            explanation: None,
            failed_constraints: Vec::new(),
            recommendations: Vec::new(),
            solver_time_seconds,
            error: None,
            requires_simulation: false,
        }
    }

    pub fn from_error(error: &CheckError, solver_time_seconds: f64) -> Self {
        Self {
            compatible: false,
            counterexample: None,
            explanation: None,
            failed_constraints: Vec::new(),
            recommendations: Vec::new(),
            solver_time_seconds,
            error: Some(error.to_string()),
            requires_simulation: matches!(
                error,
                CheckError::Resolve(ResolveError::CyclicSchema { .. })
            ),
        }
    }

    /// Stable verdict class for machine consumers.
    pub fn verdict_class(&self) -> &'static str {
        if self.error.is_some() {
            "error"
        } else if self.compatible {
            "compatible"
        } else {
            "incompatible"
        }
    }
}

impl fmt::Display for SubsumptionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "RESULT: ERROR")?;
            return write!(f, "Reason: {error}");
        }
        if self.compatible {
            writeln!(f, "RESULT: COMPATIBLE")?;
            return write!(f, "Producer schema is subsumed by consumer schema.");
        }
        writeln!(f, "RESULT: INCOMPATIBLE")?;
        if let Some(witness) = &self.counterexample {
            writeln!(f, "Counterexample: {witness}")?;
        }
        if let Some(explanation) = &self.explanation {
            writeln!(f, "Explanation: {explanation}")?;
        }
        for constraint in &self.failed_constraints {
            writeln!(f, "  failed: {constraint}")?;
        }
        for rec in &self.recommendations {
            writeln!(f, "  suggestion: {rec}")?;
        }
        Ok(())
    }
}

/// Everything that can prevent a verdict.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error("solver could not decide within the budget: {reason}")]
    #[diagnostic(
        code(jsonsub::check::solver_timeout),
        help("retry with a larger --timeout")
    )]
    SolverTimeout { reason: String },

    #[error("deadline exceeded during {stage}")]
    #[diagnostic(code(jsonsub::check::deadline))]
    DeadlineExceeded { stage: &'static str },

    #[error("internal invariant violated: {message}")]
    #[diagnostic(code(jsonsub::check::internal))]
    Internal { message: String },
}

/// Structured rejections raised while translating a schema.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("unsupported keyword `{keyword}` at {path}")]
    #[diagnostic(code(jsonsub::compile::unsupported_keyword))]
    UnsupportedKeyword { keyword: String, path: String },

    #[error("invalid value for keyword `{keyword}` at {path}")]
    #[diagnostic(code(jsonsub::compile::invalid_keyword_value))]
    InvalidKeywordValue { keyword: String, path: String },

    #[error("schema at {path} must be an object or boolean")]
    #[diagnostic(code(jsonsub::compile::invalid_schema))]
    InvalidSchema { path: String },

    #[error("unresolved $ref at {path}; the document must be inlined before compilation")]
    #[diagnostic(code(jsonsub::compile::unresolved_ref))]
    UnresolvedRef { path: String },

    #[error("schema nesting at {path} exceeds the depth limit ({limit})")]
    #[diagnostic(code(jsonsub::compile::nesting_too_deep))]
    NestingTooDeep { path: String, limit: usize },

    #[error("unsupported regex at {path}: {source}")]
    #[diagnostic(code(jsonsub::compile::unsupported_regex))]
    UnsupportedRegex {
        path: String,
        #[source]
        source: RegexError,
    },

    #[error("bound exceeded at {path}: {source}")]
    #[diagnostic(code(jsonsub::compile::bound_exceeded))]
    BoundExceeded {
        path: String,
        #[source]
        source: LiftError,
    },
}
