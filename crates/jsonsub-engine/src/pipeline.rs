use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};
use z3::ast::{Bool, Datatype, Int};

use jsonsub_schema::{unfold, KeyUniverse};
use jsonsub_smt::{regex, JsonSort, SatOutcome, SolverDriver};

use crate::compile::SchemaCompiler;
use crate::explain::diagnose;
use crate::labels::Side;
use crate::result::{CheckError, SubsumptionResult};
use crate::witness::WitnessExtractor;

/// Strategy for `$ref` handling. Unfolding is the only supported strategy;
/// cyclic schemas are rejected with a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefResolution {
    #[default]
    Unfold,
}

/// Options for one subsumption check.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Bound on array reasoning; arrays longer than this are outside the
    /// sealed universe.
    pub max_array_len: i64,
    /// Bound on subschema nesting during compilation.
    pub max_recursion_depth: usize,
    /// Solver budget in seconds; also the cooperative deadline between
    /// stages.
    pub timeout_secs: u64,
    pub ref_resolution: RefResolution,
    /// Run the labeled evaluation and minimization pass on SAT.
    pub explanations: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_array_len: 8,
            max_recursion_depth: 32,
            timeout_secs: 30,
            ref_resolution: RefResolution::Unfold,
            explanations: true,
        }
    }
}

struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(timeout_secs: u64) -> Self {
        Self {
            start: Instant::now(),
            budget: Duration::from_secs(timeout_secs),
        }
    }

    fn ensure(&self, stage: &'static str) -> Result<(), CheckError> {
        if self.start.elapsed() >= self.budget {
            Err(CheckError::DeadlineExceeded { stage })
        } else {
            Ok(())
        }
    }

    fn remaining_secs(&self) -> u64 {
        self.budget
            .saturating_sub(self.start.elapsed())
            .as_secs()
            .max(1)
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Decide `producer ⊆ consumer`, capturing failures into the result record.
///
/// Reentrant: each call owns its solver, JSON sort, and universes, so
/// parallel checks share no mutable state.
pub fn check_subsumption(
    producer: &Value,
    consumer: &Value,
    options: &CheckOptions,
) -> SubsumptionResult {
    let start = Instant::now();
    match run_check(producer, consumer, options) {
        Ok(result) => result,
        Err(error) => {
            debug!(%error, "check ended with error verdict");
            SubsumptionResult::from_error(&error, start.elapsed().as_secs_f64())
        }
    }
}

/// Boolean-only convenience wrapper.
pub fn is_compatible(producer: &Value, consumer: &Value, options: &CheckOptions) -> bool {
    check_subsumption(producer, consumer, options).compatible
}

/// Counterexample-only convenience wrapper.
pub fn find_counterexample(
    producer: &Value,
    consumer: &Value,
    options: &CheckOptions,
) -> Option<Value> {
    check_subsumption(producer, consumer, options).counterexample
}

/// The strict-error variant of [`check_subsumption`].
pub fn run_check(
    producer: &Value,
    consumer: &Value,
    options: &CheckOptions,
) -> Result<SubsumptionResult, CheckError> {
    let RefResolution::Unfold = options.ref_resolution;
    let deadline = Deadline::new(options.timeout_secs);

    let producer_inlined = unfold(producer)?;
    let consumer_inlined = unfold(consumer)?;
    deadline.ensure("reference resolution")?;

    let mut universe = KeyUniverse::new();
    universe.add_from_schema(&producer_inlined);
    universe.add_from_schema(&consumer_inlined);
    seal_pattern_probes(&mut universe);
    info!(
        keys = universe.len(),
        max_array_len = options.max_array_len,
        "sealed finite universes"
    );

    let sort = JsonSort::new(options.max_array_len.max(1));
    let x = sort.new_const("x");

    let producer_compiled =
        SchemaCompiler::new(&sort, &universe, Side::Producer, options.max_recursion_depth)
            .compile(&producer_inlined, &x)?;
    let consumer_compiled =
        SchemaCompiler::new(&sort, &universe, Side::Consumer, options.max_recursion_depth)
            .compile(&consumer_inlined, &x)?;
    deadline.ensure("compilation")?;
    debug!(
        producer_labels = producer_compiled.labels.len(),
        consumer_labels = consumer_compiled.labels.len(),
        "schemas compiled"
    );

    let driver = SolverDriver::with_timeout_secs(deadline.remaining_secs());
    driver.assert(&sort.well_formed(&x));
    for constraint in &producer_compiled.side_constraints {
        driver.assert(constraint);
    }
    for constraint in &consumer_compiled.side_constraints {
        driver.assert(constraint);
    }
    driver.assert(&producer_compiled.formula);
    driver.assert(&consumer_compiled.formula.not());

    let outcome = driver.check();
    info!(?outcome, elapsed = deadline.elapsed_seconds(), "solver verdict");
    match outcome {
        SatOutcome::Unsat => Ok(SubsumptionResult::compatible(deadline.elapsed_seconds())),
        SatOutcome::Unknown(reason) => Err(CheckError::SolverTimeout { reason }),
        SatOutcome::Sat => {
            if options.explanations {
                minimize_witness(&driver, &sort, &x, &universe);
            }
            let model = driver.model().ok_or_else(|| CheckError::Internal {
                message: "solver reported SAT without a model".to_string(),
            })?;
            let witness = WitnessExtractor::new(&sort, &universe).extract(&model, &x)?;
            let mut result =
                SubsumptionResult::incompatible(witness.clone(), deadline.elapsed_seconds());
            if options.explanations {
                let diagnosis = diagnose(
                    &model,
                    &producer_compiled.labels,
                    &consumer_compiled.labels,
                    &witness,
                    &producer_inlined,
                    &consumer_inlined,
                );
                result.explanation = Some(diagnosis.explanation);
                result.failed_constraints = diagnosis.failed_constraints;
                result.recommendations = diagnosis.recommendations;
            }
            Ok(result)
        }
    }
}

/// Extend the universe with an exemplar key per `patternProperties` pattern
/// that no existing key matches. Probes come from the union of both
/// schemas' patterns, before either side is compiled, so the extension is
/// consistent across the check. Unparseable patterns are left for the
/// compiler's structured rejection.
fn seal_pattern_probes(universe: &mut KeyUniverse) {
    let patterns: Vec<String> = universe.patterns().map(str::to_string).collect();
    let mut probes = Vec::new();
    for pattern in &patterns {
        let Ok(compiled) = regex::parse(pattern) else {
            continue;
        };
        if universe.keys().any(|key| compiled.matches(key)) {
            continue;
        }
        if let Some(probe) = compiled.exemplar() {
            probes.push(probe);
        }
    }
    for probe in probes {
        debug!(probe = %probe, "added pattern-property probe key");
        universe.add_key(probe);
    }
}

// Soft preference pass: shrink the witness while the hard constraints stay
// satisfied. Root-level only; nested structures keep whatever the model
// picked.
fn minimize_witness(driver: &SolverDriver, sort: &JsonSort, x: &Datatype, universe: &KeyUniverse) {
    let Some(model) = driver.model() else {
        return;
    };
    let holds = |term: &Bool| {
        model
            .eval::<Bool>(term, true)
            .and_then(|b| b.as_bool())
            .unwrap_or(false)
    };
    if holds(&sort.is_arr(x)) {
        driver.minimize_term(&sort.len(x), 0);
    } else if holds(&sort.is_str(x)) {
        driver.minimize_term(&sort.str_val(x).length(), 0);
    } else if holds(&sort.is_obj(x)) && !universe.is_empty() {
        let zero = Int::from_i64(0);
        let one = Int::from_i64(1);
        let present = universe.keys().fold(Int::from_i64(0), |acc, key| {
            &acc + &sort.has(x, key).ite(&one, &zero)
        });
        driver.minimize_term(&present, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_scalar_schemas_are_compatible() {
        let schema = json!({ "type": "integer", "minimum": 0 });
        let result = check_subsumption(&schema, &schema, &CheckOptions::default());
        assert!(result.compatible, "error: {:?}", result.error);
    }

    #[test]
    fn widening_is_compatible_narrowing_is_not() {
        let narrow = json!({ "type": "integer" });
        let wide = json!({ "type": "number" });
        let options = CheckOptions::default();
        assert!(is_compatible(&narrow, &wide, &options));
        let result = check_subsumption(&wide, &narrow, &options);
        assert!(!result.compatible);
        assert!(result.counterexample.is_some());
    }

    #[test]
    fn cyclic_schema_yields_error_with_simulation_hint() {
        let cyclic = json!({
            "$ref": "#/$defs/N",
            "$defs": { "N": { "properties": { "n": { "$ref": "#/$defs/N" } } } },
        });
        let result = check_subsumption(&cyclic, &json!(true), &CheckOptions::default());
        assert!(result.error.is_some());
        assert!(result.requires_simulation);
    }

    #[test]
    fn unsupported_keyword_is_an_error_verdict() {
        let producer = json!({ "unevaluatedItems": false });
        let result = check_subsumption(&producer, &json!(true), &CheckOptions::default());
        assert!(result.error.unwrap().contains("unevaluatedItems"));
    }

    #[test]
    fn pattern_probe_reaches_undeclared_pattern_keys() {
        // The consumer constrains x_-prefixed keys to integers, the
        // producer allows strings there; without a probe key neither side
        // declares a concrete property, and the mismatch would be missed.
        let producer = json!({
            "type": "object",
            "patternProperties": { "^x_": { "type": "string" } },
            "required": [],
        });
        let consumer = json!({
            "type": "object",
            "patternProperties": { "^x_": { "type": "integer" } },
        });
        let result = check_subsumption(&producer, &consumer, &CheckOptions::default());
        // Compatible verdict would be wrong only if a witness exists within
        // bounds; with the probe key the solver can build one.
        assert!(!result.compatible, "probe key should expose the mismatch");
    }
}
