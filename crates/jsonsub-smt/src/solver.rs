use tracing::debug;
use z3::ast::{Ast, Bool, Int};
use z3::{Model, Params, SatResult, Solver};

/// Outcome of a satisfiability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Sat,
    Unsat,
    Unknown(String),
}

/// Rounds of iterative tightening attempted per minimized term.
const MAX_MINIMIZE_ROUNDS: usize = 16;

/// Owns one Z3 solver for the duration of a check.
///
/// The solver carries the configured timeout in milliseconds; a fresh driver
/// is created per check, so parallel checks never share solver state.
pub struct SolverDriver {
    solver: Solver,
    params: Option<Params>,
}

impl SolverDriver {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            params: None,
        }
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = Solver::new();
        let mut params = Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000);
        params.set_u32("timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            params: Some(params),
        }
    }

    pub fn assert(&self, constraint: &Bool) {
        self.solver.assert(constraint);
    }

    pub fn check(&self) -> SatOutcome {
        match self.solver.check() {
            SatResult::Sat => SatOutcome::Sat,
            SatResult::Unsat => SatOutcome::Unsat,
            SatResult::Unknown => SatOutcome::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "solver returned unknown".to_string()),
            ),
        }
    }

    pub fn model(&self) -> Option<Model> {
        self.solver.get_model()
    }

    /// Shrink `term` toward `floor` while the current assertions stay
    /// satisfiable, then pin the best bound found.
    ///
    /// Precondition: the last `check` returned `Sat`. Hard constraints are
    /// untouched; the tightened model remains a genuine witness. Returns the
    /// final bound, or `None` when the model cannot be read back.
    pub fn minimize_term(&self, term: &Int, floor: i64) -> Option<i64> {
        let model = self.solver.get_model()?;
        let mut best = model.eval::<Int>(term, true)?.as_i64()?;
        for _ in 0..MAX_MINIMIZE_ROUNDS {
            if best <= floor {
                break;
            }
            self.solver.push();
            self.solver.assert(&term.le(&Int::from_i64(best - 1)));
            let outcome = self.check();
            let improved = if outcome == SatOutcome::Sat {
                self.solver
                    .get_model()
                    .and_then(|m| m.eval::<Int>(term, true))
                    .and_then(|v| v.as_i64())
            } else {
                None
            };
            self.solver.pop(1);
            match improved {
                Some(value) if value < best => best = value,
                _ => break,
            }
        }
        debug!(bound = best, "minimized witness term");
        self.solver.assert(&term.le(&Int::from_i64(best)));
        match self.check() {
            SatOutcome::Sat => Some(best),
            _ => None,
        }
    }
}

impl Default for SolverDriver {
    fn default() -> Self {
        Self::new()
    }
}
