use indexmap::IndexSet;
use serde_json::Value;
use z3::Model;

use jsonsub_smt::regex;

use crate::labels::{recommendation_for, LabelEvaluation, LabelTable};
use crate::validate::validates;

/// Structured diagnosis of an incompatibility.
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub explanation: String,
    pub failed_constraints: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Assemble the diagnosis for a SAT verdict.
///
/// Labeled handles are evaluated under the witness model: consumer labels
/// that came out false are the constraints the witness violates, producer
/// labels that came out true are the constraints that admitted it. The raw
/// label sets are then sharpened by shape analyses of the concrete
/// counterexample (array lengths, duplicate elements, missing required
/// keys, `oneOf` match counting) carried out against the input schemas.
pub fn diagnose(
    model: &Model,
    producer_labels: &LabelTable,
    consumer_labels: &LabelTable,
    counterexample: &Value,
    producer_schema: &Value,
    consumer_schema: &Value,
) -> Diagnosis {
    let producer_evals = dedupe(producer_labels.evaluate(model));
    let consumer_evals = dedupe(consumer_labels.evaluate(model));

    let failed_consumer: Vec<&LabelEvaluation> =
        consumer_evals.iter().filter(|e| !e.satisfied).collect();
    let satisfied_producer: Vec<&LabelEvaluation> =
        producer_evals.iter().filter(|e| e.satisfied).collect();

    let mut failed: IndexSet<String> = IndexSet::new();
    let mut recommendations: IndexSet<String> = IndexSet::new();
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("Counterexample: {counterexample}"));

    for eval in failed_consumer.iter().take(3) {
        parts.push(format!("Consumer requires: {}", describe(eval)));
    }
    for eval in &failed_consumer {
        failed.insert(constraint_id(eval));
        if let Some(rec) = recommendation_for(&eval.keyword, &eval.path) {
            recommendations.insert(rec);
        }
    }
    for eval in relevant_producer(&failed_consumer, &satisfied_producer)
        .iter()
        .take(2)
    {
        parts.push(format!("Producer allows: {}", describe(eval)));
    }

    analyze_shape(
        counterexample,
        producer_schema,
        consumer_schema,
        &mut parts,
        &mut failed,
        &mut recommendations,
    );

    Diagnosis {
        explanation: parts.join(" | "),
        failed_constraints: failed.into_iter().collect(),
        recommendations: recommendations.into_iter().collect(),
    }
}

// Unrolled element constraints produce one label per index; collapse them.
fn dedupe(evals: Vec<LabelEvaluation>) -> Vec<LabelEvaluation> {
    let mut seen = IndexSet::new();
    let mut out = Vec::new();
    for eval in evals {
        if seen.insert((eval.path.clone(), eval.keyword.clone(), eval.satisfied)) {
            out.push(eval);
        }
    }
    out
}

fn constraint_id(eval: &LabelEvaluation) -> String {
    if eval.path.is_empty() {
        eval.keyword.clone()
    } else {
        format!("{}:{}", eval.path, eval.keyword)
    }
}

fn describe(eval: &LabelEvaluation) -> String {
    let head = eval.keyword.split(':').next().unwrap_or(&eval.keyword);
    let at = if eval.path.is_empty() {
        "the root".to_string()
    } else {
        eval.path.clone()
    };
    let noun = match head {
        "type" => "type constraint",
        "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" => {
            "numeric bound"
        }
        "multipleOf" => "divisibility constraint",
        "minLength" | "maxLength" => "string length constraint",
        "pattern" => "string pattern constraint",
        "format" => "string format constraint",
        "minItems" | "maxItems" => "array length constraint",
        "uniqueItems" => "array uniqueness constraint",
        "required" => "required property constraint",
        "additionalProperties" => "closed-object constraint",
        "dependentRequired" => "property dependency constraint",
        "minProperties" | "maxProperties" => "property count constraint",
        "const" | "enum" => "allowed-value constraint",
        other => return format!("{other} constraint at {at}"),
    };
    format!("{noun} at {at} ({})", eval.keyword)
}

// Producer constraints sharing a keyword head or path tail with a failed
// consumer constraint are the ones that plausibly admitted the witness.
fn relevant_producer<'a>(
    failed_consumer: &[&'a LabelEvaluation],
    satisfied_producer: &[&'a LabelEvaluation],
) -> Vec<&'a LabelEvaluation> {
    let mut out: Vec<&LabelEvaluation> = Vec::new();
    for failed in failed_consumer {
        let failed_head = failed.keyword.split(':').next().unwrap_or("");
        let failed_tail = failed.path.rsplit('/').next().unwrap_or("");
        for candidate in satisfied_producer {
            let head = candidate.keyword.split(':').next().unwrap_or("");
            let tail = candidate.path.rsplit('/').next().unwrap_or("");
            if (head == failed_head || (!failed_tail.is_empty() && tail == failed_tail))
                && !out.iter().any(|e| e.name == candidate.name)
            {
                out.push(candidate);
            }
        }
    }
    out
}

fn analyze_shape(
    counterexample: &Value,
    producer: &Value,
    consumer: &Value,
    parts: &mut Vec<String>,
    failed: &mut IndexSet<String>,
    recommendations: &mut IndexSet<String>,
) {
    match counterexample {
        Value::Array(items) => {
            analyze_array(items, producer, consumer, parts, failed, recommendations)
        }
        Value::Object(map) => {
            analyze_object(map, producer, consumer, parts, failed, recommendations)
        }
        _ => {}
    }
    analyze_one_of(counterexample, consumer, parts, failed, recommendations);
}

fn analyze_array(
    items: &[Value],
    producer: &Value,
    consumer: &Value,
    parts: &mut Vec<String>,
    failed: &mut IndexSet<String>,
    recommendations: &mut IndexSet<String>,
) {
    let Some(consumer_map) = consumer.as_object() else {
        return;
    };

    if let Some(contains_schema) = consumer_map.get("contains") {
        if !items.iter().any(|item| validates(item, contains_schema)) {
            parts.push(format!(
                "Array contains no elements satisfying {contains_schema}"
            ));
            failed.insert(format!("contains:{contains_schema}"));
            if producer.get("items").is_some() {
                recommendations.insert(
                    "Constrain producer items so at least one element satisfies the consumer's contains schema"
                        .to_string(),
                );
            }
        }
    }

    if let Some(min_items) = consumer_map.get("minItems").and_then(Value::as_u64) {
        if (items.len() as u64) < min_items {
            parts.push(format!(
                "Array too short: has {} items, needs >= {min_items}",
                items.len()
            ));
            failed.insert(format!("minItems:{min_items}"));
            recommendations.insert(format!("Add minItems: {min_items} to the producer schema"));
        }
    }

    let consumer_unique = consumer_map.get("uniqueItems") == Some(&Value::Bool(true));
    let producer_unique = producer.get("uniqueItems") == Some(&Value::Bool(true));
    if consumer_unique && !producer_unique {
        for (element, indices) in duplicate_elements(items) {
            let rendered: Vec<String> = indices.iter().map(usize::to_string).collect();
            parts.push(format!(
                "Array has duplicate elements at indices {}: {element}",
                rendered.join(", ")
            ));
            failed.insert("uniqueItems:true".to_string());
            recommendations.insert(
                "Add uniqueItems: true to the producer schema or deduplicate elements".to_string(),
            );
        }
    }
}

fn duplicate_elements(items: &[Value]) -> Vec<(&Value, Vec<usize>)> {
    let mut out: Vec<(&Value, Vec<usize>)> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if let Some((_, indices)) = out.iter_mut().find(|(v, _)| *v == item) {
            indices.push(i);
        } else {
            out.push((item, vec![i]));
        }
    }
    out.retain(|(_, indices)| indices.len() > 1);
    out
}

fn analyze_object(
    object: &serde_json::Map<String, Value>,
    producer: &Value,
    consumer: &Value,
    parts: &mut Vec<String>,
    failed: &mut IndexSet<String>,
    recommendations: &mut IndexSet<String>,
) {
    let Some(consumer_map) = consumer.as_object() else {
        return;
    };

    if let Some(required) = consumer_map.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                parts.push(format!("Missing required property `{name}`"));
                failed.insert(format!("required:{name}"));
                recommendations
                    .insert(format!("Add `{name}` to the producer's required properties"));
            }
        }
    }

    let producer_props = producer.get("properties").and_then(Value::as_object);
    let consumer_props = consumer_map.get("properties").and_then(Value::as_object);
    if let (Some(producer_props), Some(consumer_props)) = (producer_props, consumer_props) {
        for key in object.keys() {
            let (Some(prod_prop), Some(cons_prop)) =
                (producer_props.get(key), consumer_props.get(key))
            else {
                continue;
            };
            let prod_format = prod_prop.get("format").and_then(Value::as_str);
            let cons_format = cons_prop.get("format").and_then(Value::as_str);
            match (prod_format, cons_format) {
                (Some(pf), Some(cf)) if pf != cf => {
                    parts.push(format!(
                        "Property `{key}` format mismatch: producer has `{pf}`, consumer requires `{cf}`"
                    ));
                    failed.insert(format!("format:{key}:{pf}->{cf}"));
                    recommendations.insert(format!(
                        "Change producer property `{key}` format from `{pf}` to `{cf}`"
                    ));
                }
                (None, Some(cf)) => {
                    parts.push(format!(
                        "Property `{key}` lacks a format constraint; consumer requires `{cf}`"
                    ));
                    failed.insert(format!("format:{key}:missing->{cf}"));
                    recommendations.insert(format!(
                        "Add format: `{cf}` to producer property `{key}`"
                    ));
                }
                _ => {}
            }
        }
    }

    let producer_patterns = producer.get("patternProperties").and_then(Value::as_object);
    if let Some(consumer_patterns) = consumer_map.get("patternProperties").and_then(Value::as_object)
    {
        for (pattern, cons_sub) in consumer_patterns {
            let Ok(compiled) = regex::parse(pattern) else {
                continue;
            };
            for (key, value) in object.iter().filter(|(key, _)| compiled.matches(key)) {
                if validates(value, cons_sub) {
                    continue;
                }
                let admitted_by_producer = producer_patterns.is_some_and(|patterns| {
                    patterns.iter().any(|(prod_pattern, prod_sub)| {
                        regex::parse(prod_pattern)
                            .map(|c| c.matches(key))
                            .unwrap_or(false)
                            && validates(value, prod_sub)
                    })
                });
                if admitted_by_producer {
                    parts.push(format!(
                        "Property `{key}` matches pattern `{pattern}` but violates the consumer's pattern schema"
                    ));
                    failed.insert(format!("patternProperties:{pattern}"));
                    recommendations.insert(format!(
                        "Align the producer pattern schema admitting `{key}` with the consumer's `{pattern}` schema"
                    ));
                }
            }
        }
    }

    if consumer_map.get("additionalProperties") == Some(&Value::Bool(false)) {
        let declared: Vec<&str> = consumer_props
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let extras: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|key| !declared.contains(key))
            .collect();
        if !extras.is_empty() {
            parts.push(format!(
                "Extra properties not allowed by consumer: {}",
                extras.join(", ")
            ));
            failed.insert("additionalProperties:false".to_string());
            recommendations.insert(
                "Declare the extra properties in the consumer schema or stop emitting them"
                    .to_string(),
            );
        }
    }
}

fn analyze_one_of(
    counterexample: &Value,
    consumer: &Value,
    parts: &mut Vec<String>,
    failed: &mut IndexSet<String>,
    recommendations: &mut IndexSet<String>,
) {
    let Some(branches) = consumer.get("oneOf").and_then(Value::as_array) else {
        return;
    };
    let matches: Vec<usize> = branches
        .iter()
        .enumerate()
        .filter(|(_, sub)| validates(counterexample, sub))
        .map(|(i, _)| i)
        .collect();
    match matches.len() {
        0 => {
            parts.push("Value matches no consumer oneOf branch".to_string());
            failed.insert("oneOf:no_match".to_string());
            recommendations.insert(
                "Add a consumer oneOf branch covering the producer's values".to_string(),
            );
        }
        1 => {}
        _ => {
            let rendered: Vec<String> = matches.iter().map(usize::to_string).collect();
            parts.push(format!(
                "Value matches multiple consumer oneOf branches ({}), violating exactly-one",
                rendered.join(", ")
            ));
            failed.insert("oneOf:multiple_matches".to_string());
            recommendations.insert(
                "Make consumer oneOf branches mutually exclusive".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_sets() -> (Vec<String>, IndexSet<String>, IndexSet<String>) {
        (Vec::new(), IndexSet::new(), IndexSet::new())
    }

    #[test]
    fn array_analysis_reports_duplicates_with_indices() {
        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_array(
            &[json!(1), json!(2), json!(1)],
            &json!({}),
            &json!({ "uniqueItems": true }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert!(parts[0].contains("indices 0, 2"));
        assert!(failed.contains("uniqueItems:true"));
    }

    #[test]
    fn object_analysis_reports_missing_required() {
        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_object(
            json!({ "a": 1 }).as_object().unwrap(),
            &json!({}),
            &json!({ "required": ["a", "b"] }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert_eq!(parts.len(), 1);
        assert!(failed.contains("required:b"));
        assert!(recs.iter().any(|r| r.contains("`b`")));
    }

    #[test]
    fn object_analysis_flags_format_mismatch() {
        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_object(
            json!({ "contact": "a@b.com" }).as_object().unwrap(),
            &json!({ "properties": { "contact": { "format": "email" } } }),
            &json!({ "properties": { "contact": { "format": "uri" } } }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert!(failed.contains("format:contact:email->uri"));
    }

    #[test]
    fn object_analysis_flags_pattern_property_conflicts() {
        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_object(
            json!({ "x_a": "text" }).as_object().unwrap(),
            &json!({ "patternProperties": { "^x_": { "type": "string" } } }),
            &json!({ "patternProperties": { "^x_": { "type": "integer" } } }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert!(failed.contains("patternProperties:^x_"));
        assert!(parts.iter().any(|p| p.contains("x_a")));
    }

    #[test]
    fn one_of_analysis_counts_matches() {
        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_one_of(
            &json!("text"),
            &json!({ "oneOf": [ { "type": "integer" } ] }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert!(failed.contains("oneOf:no_match"));

        let (mut parts, mut failed, mut recs) = empty_sets();
        analyze_one_of(
            &json!(5),
            &json!({ "oneOf": [ { "type": "integer" }, { "minimum": 0 } ] }),
            &mut parts,
            &mut failed,
            &mut recs,
        );
        assert!(failed.contains("oneOf:multiple_matches"));
        assert!(!parts.is_empty());
        assert!(!recs.is_empty());
    }
}
