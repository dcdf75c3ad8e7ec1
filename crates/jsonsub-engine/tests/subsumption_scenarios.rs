//! End-to-end subsumption scenarios.
//!
//! Each incompatible case also asserts witness soundness: the extracted
//! counterexample validates against the producer and fails against the
//! consumer under the reference validator.

use serde_json::{json, Value};

use jsonsub_engine::validate::validates;
use jsonsub_engine::{check_subsumption, CheckOptions, SubsumptionResult};

fn check(producer: Value, consumer: Value) -> SubsumptionResult {
    let result = check_subsumption(&producer, &consumer, &CheckOptions::default());
    if !result.compatible && result.error.is_none() {
        let witness = result
            .counterexample
            .as_ref()
            .expect("incompatible verdict carries a witness");
        assert!(
            validates(witness, &producer),
            "witness {witness} must validate against producer {producer}"
        );
        assert!(
            !validates(witness, &consumer),
            "witness {witness} must fail against consumer {consumer}"
        );
    }
    result
}

fn assert_compatible(producer: Value, consumer: Value) {
    let result = check(producer.clone(), consumer.clone());
    assert!(
        result.compatible,
        "{producer} should be subsumed by {consumer}; error: {:?}",
        result.error
    );
}

fn assert_incompatible(producer: Value, consumer: Value) -> SubsumptionResult {
    let result = check(producer.clone(), consumer.clone());
    assert!(
        !result.compatible,
        "{producer} should NOT be subsumed by {consumer}"
    );
    assert!(result.error.is_none(), "error: {:?}", result.error);
    result
}

// ---------------------------------------------------------------------------
// The six pinned scenarios
// ---------------------------------------------------------------------------

#[test]
fn integer_producer_into_number_consumer() {
    assert_compatible(json!({ "type": "integer" }), json!({ "type": "number" }));
}

#[test]
fn number_producer_into_integer_consumer_yields_real_witness() {
    let result = assert_incompatible(json!({ "type": "number" }), json!({ "type": "integer" }));
    let witness = result.counterexample.unwrap();
    assert!(witness.is_number());
}

#[test]
fn longer_strings_into_unbounded_strings() {
    assert_compatible(
        json!({ "type": "string", "minLength": 5 }),
        json!({ "type": "string" }),
    );
}

#[test]
fn string_or_number_into_string_only() {
    let result = assert_incompatible(
        json!({ "type": ["string", "number"] }),
        json!({ "type": "string" }),
    );
    let witness = result.counterexample.unwrap();
    assert!(witness.is_number(), "witness should be the numeric branch");
}

#[test]
fn email_pattern_into_url_pattern() {
    let result = assert_incompatible(
        json!({
            "type": "object",
            "required": ["contact"],
            "properties": { "contact": { "type": "string", "pattern": ".*@.*" } },
        }),
        json!({
            "type": "object",
            "required": ["contact"],
            "properties": { "contact": { "type": "string", "pattern": "^https?://.*" } },
        }),
    );
    let witness = result.counterexample.unwrap();
    let contact = witness["contact"].as_str().expect("contact present");
    assert!(contact.contains('@'));
}

#[test]
fn extra_required_keys_restrict() {
    assert_compatible(
        json!({ "type": "object", "required": ["a", "b"] }),
        json!({ "type": "object", "required": ["a"] }),
    );
}

// ---------------------------------------------------------------------------
// Boundary cases
// ---------------------------------------------------------------------------

#[test]
fn disjoint_types_are_incompatible_with_typed_witness() {
    let result = assert_incompatible(json!({ "type": "string" }), json!({ "type": "number" }));
    assert!(result.counterexample.unwrap().is_string());
}

#[test]
fn string_arrays_are_not_number_arrays() {
    // A one-element string array separates the schemas.
    let result = assert_incompatible(
        json!({ "type": "array", "items": { "type": "string" }, "minItems": 1 }),
        json!({ "type": "array", "items": { "type": "number" } }),
    );
    let witness = result.counterexample.unwrap();
    let items = witness.as_array().expect("array witness");
    assert!(items.iter().any(|v| v.is_string()));
}

#[test]
fn required_converse_does_not_hold() {
    assert_incompatible(
        json!({ "type": "object", "required": ["a"] }),
        json!({ "type": "object", "required": ["a", "b", "c"] }),
    );
}

#[test]
fn closed_consumer_rejects_undeclared_producer_key() {
    assert_incompatible(
        json!({
            "type": "object",
            "required": ["extra"],
            "properties": { "extra": { "type": "integer" } },
        }),
        json!({
            "type": "object",
            "properties": { "known": {} },
            "additionalProperties": false,
        }),
    );
}

#[test]
fn const_into_covering_enum() {
    assert_compatible(json!({ "const": "x" }), json!({ "enum": ["x", "y"] }));
    assert_incompatible(json!({ "const": "z" }), json!({ "enum": ["x", "y"] }));
}

#[test]
fn reflexivity_over_a_mixed_schema() {
    let schema = json!({
        "type": "object",
        "required": ["name", "tags"],
        "properties": {
            "name": { "type": "string", "minLength": 1, "maxLength": 64 },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true,
                "maxItems": 4,
            },
            "age": { "type": "integer", "minimum": 0 },
        },
        "additionalProperties": false,
    });
    assert_compatible(schema.clone(), schema);
}

#[test]
fn reflexivity_through_references() {
    let schema = json!({
        "type": "object",
        "properties": { "id": { "$ref": "#/$defs/Id" } },
        "$defs": { "Id": { "type": "string", "pattern": "^[a-z]+$" } },
    });
    assert_compatible(schema.clone(), schema);
}

// ---------------------------------------------------------------------------
// Numeric and conditional interplay
// ---------------------------------------------------------------------------

#[test]
fn tighter_numeric_bounds_are_subsumed() {
    assert_compatible(
        json!({ "type": "integer", "minimum": 10, "maximum": 20 }),
        json!({ "type": "integer", "minimum": 0, "maximum": 100 }),
    );
    assert_incompatible(
        json!({ "type": "integer", "minimum": 0, "maximum": 100 }),
        json!({ "type": "integer", "minimum": 10, "maximum": 20 }),
    );
}

#[test]
fn exclusive_bound_separates_at_the_edge() {
    let result = assert_incompatible(
        json!({ "type": "integer", "minimum": 3 }),
        json!({ "type": "integer", "exclusiveMinimum": 3 }),
    );
    assert_eq!(result.counterexample.unwrap(), json!(3));
}

#[test]
fn multiple_of_refinement() {
    assert_compatible(
        json!({ "type": "integer", "multipleOf": 6 }),
        json!({ "type": "integer", "multipleOf": 3 }),
    );
    assert_incompatible(
        json!({ "type": "integer", "multipleOf": 3 }),
        json!({ "type": "integer", "multipleOf": 6 }),
    );
}

#[test]
fn conditional_consumer_accepts_conforming_producer() {
    assert_compatible(
        json!({ "type": "integer", "minimum": 0 }),
        json!({ "if": { "type": "integer" }, "then": { "minimum": 0 } }),
    );
    assert_incompatible(
        json!({ "type": "integer" }),
        json!({ "if": { "type": "integer" }, "then": { "minimum": 0 } }),
    );
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

#[test]
fn any_of_branch_membership() {
    assert_compatible(
        json!({ "type": "string" }),
        json!({ "anyOf": [ { "type": "string" }, { "type": "number" } ] }),
    );
    assert_incompatible(
        json!({ "type": "boolean" }),
        json!({ "anyOf": [ { "type": "string" }, { "type": "number" } ] }),
    );
}

#[test]
fn all_of_conjunction_restricts() {
    assert_compatible(
        json!({ "type": "integer", "minimum": 5, "maximum": 10 }),
        json!({ "allOf": [ { "minimum": 0 }, { "maximum": 100 } ] }),
    );
}

#[test]
fn one_of_double_match_breaks_subsumption() {
    // Producer values >= 0 match both consumer branches.
    assert_incompatible(
        json!({ "type": "integer", "minimum": 0 }),
        json!({ "oneOf": [ { "type": "integer" }, { "minimum": 0 } ] }),
    );
}

#[test]
fn negation_excludes_values() {
    assert_compatible(
        json!({ "type": "string" }),
        json!({ "not": { "type": "number" } }),
    );
    assert_incompatible(
        json!({ "type": "number" }),
        json!({ "not": { "type": "integer" } }),
    );
}

// ---------------------------------------------------------------------------
// Diagnosis & options
// ---------------------------------------------------------------------------

#[test]
fn explanations_surface_failed_constraints_and_recommendations() {
    let result = assert_incompatible(
        json!({ "type": "object", "required": ["a"] }),
        json!({ "type": "object", "required": ["a", "b"] }),
    );
    assert!(result.explanation.is_some());
    assert!(result
        .failed_constraints
        .iter()
        .any(|c| c.contains("required:b")));
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("`b`")));
}

#[test]
fn explanations_can_be_disabled() {
    let options = CheckOptions {
        explanations: false,
        ..CheckOptions::default()
    };
    let result = check_subsumption(
        &json!({ "type": "number" }),
        &json!({ "type": "integer" }),
        &options,
    );
    assert!(!result.compatible);
    assert!(result.explanation.is_none());
    assert!(result.failed_constraints.is_empty());
}

#[test]
fn minimized_witnesses_prefer_small_arrays() {
    let result = assert_incompatible(
        json!({ "type": "array", "items": { "type": "string" } }),
        json!({ "type": "array", "items": { "type": "number" } }),
    );
    let witness = result.counterexample.unwrap();
    let items = witness.as_array().unwrap();
    assert!(
        items.len() <= 2,
        "minimization should keep the witness small, got {items:?}"
    );
}

#[test]
fn bound_monotonicity_on_compatible_pairs() {
    let producer = json!({ "type": "array", "items": { "type": "integer" }, "maxItems": 3 });
    let consumer = json!({ "type": "array", "items": { "type": "number" } });
    for max_array_len in [4, 8, 16] {
        let options = CheckOptions {
            max_array_len,
            ..CheckOptions::default()
        };
        let result = check_subsumption(&producer, &consumer, &options);
        assert!(
            result.compatible,
            "bounds {max_array_len}: {:?}",
            result.error
        );
    }
}

#[test]
fn solver_time_is_reported() {
    let result = check(json!({ "type": "integer" }), json!({ "type": "number" }));
    assert!(result.solver_time_seconds >= 0.0);
}
