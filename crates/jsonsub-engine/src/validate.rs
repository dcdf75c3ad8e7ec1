//! Reference validation over the supported keyword subset.
//!
//! Used by the diagnosis layer (e.g. counting `oneOf` branch matches for a
//! concrete witness) and by the integration tests to assert witness
//! soundness: an extracted counterexample must validate against the
//! producer and fail against the consumer. Keywords outside the supported
//! subset are treated as satisfied; the compiler has already rejected them
//! before a witness can exist.

use serde_json::Value;

use jsonsub_smt::{formats, regex};

pub fn validates(value: &Value, schema: &Value) -> bool {
    match schema {
        Value::Bool(accept_all) => *accept_all,
        Value::Object(map) => map.iter().all(|(keyword, arg)| {
            keyword_holds(value, keyword, arg, map)
        }),
        _ => true,
    }
}

fn keyword_holds(value: &Value, keyword: &str, arg: &Value, schema: &serde_json::Map<String, Value>) -> bool {
    match keyword {
        "type" => type_matches(value, arg),
        "const" => value == arg,
        "enum" => arg
            .as_array()
            .map(|options| options.contains(value))
            .unwrap_or(true),
        "allOf" => arg
            .as_array()
            .map(|subs| subs.iter().all(|sub| validates(value, sub)))
            .unwrap_or(true),
        "anyOf" => arg
            .as_array()
            .map(|subs| subs.iter().any(|sub| validates(value, sub)))
            .unwrap_or(true),
        "oneOf" => arg
            .as_array()
            .map(|subs| subs.iter().filter(|sub| validates(value, sub)).count() == 1)
            .unwrap_or(true),
        "not" => !validates(value, arg),
        "if" => {
            if validates(value, arg) {
                schema
                    .get("then")
                    .map(|then| validates(value, then))
                    .unwrap_or(true)
            } else {
                schema
                    .get("else")
                    .map(|alt| validates(value, alt))
                    .unwrap_or(true)
            }
        }
        // Consumed by `if`.
        "then" | "else" => true,
        "minimum" => numeric_cmp(value, arg, |v, b| {
            if draft7_exclusive(schema, "exclusiveMinimum") {
                v > b
            } else {
                v >= b
            }
        }),
        "maximum" => numeric_cmp(value, arg, |v, b| {
            if draft7_exclusive(schema, "exclusiveMaximum") {
                v < b
            } else {
                v <= b
            }
        }),
        "exclusiveMinimum" => {
            arg.is_boolean() || numeric_cmp(value, arg, |v, b| v > b)
        }
        "exclusiveMaximum" => {
            arg.is_boolean() || numeric_cmp(value, arg, |v, b| v < b)
        }
        "multipleOf" => match (value.as_i64(), arg.as_i64()) {
            (Some(v), Some(k)) if k > 0 => v % k == 0,
            _ => true,
        },
        "minLength" => string_len_cmp(value, arg, |len, bound| len >= bound),
        "maxLength" => string_len_cmp(value, arg, |len, bound| len <= bound),
        "pattern" => match (value.as_str(), arg.as_str()) {
            (Some(s), Some(pattern)) => regex::parse(pattern)
                .map(|compiled| compiled.matches(s))
                .unwrap_or(true),
            _ => true,
        },
        "format" => format_holds(value, arg),
        "items" => match (value.as_array(), arg) {
            (Some(items), Value::Array(prefix)) => {
                prefix_holds(items, prefix) && items.len() <= prefix.len()
            }
            (Some(items), sub) => items.iter().all(|item| validates(item, sub)),
            _ => true,
        },
        "prefixItems" => match (value.as_array(), arg.as_array()) {
            (Some(items), Some(prefix)) => {
                prefix_holds(items, prefix)
                    && (schema.contains_key("items") || items.len() <= prefix.len())
            }
            _ => true,
        },
        "minItems" => array_len_cmp(value, arg, |len, bound| len >= bound),
        "maxItems" => array_len_cmp(value, arg, |len, bound| len <= bound),
        "contains" => value
            .as_array()
            .map(|items| items.iter().any(|item| validates(item, arg)))
            .unwrap_or(true),
        "uniqueItems" => match (value.as_array(), arg) {
            (Some(items), Value::Bool(true)) => {
                for (i, a) in items.iter().enumerate() {
                    if items.iter().skip(i + 1).any(|b| a == b) {
                        return false;
                    }
                }
                true
            }
            _ => true,
        },
        "required" => match (value.as_object(), arg.as_array()) {
            (Some(object), Some(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .all(|name| object.contains_key(name)),
            _ => true,
        },
        "properties" => match (value.as_object(), arg.as_object()) {
            (Some(object), Some(props)) => props.iter().all(|(key, sub)| {
                object.get(key).map(|v| validates(v, sub)).unwrap_or(true)
            }),
            _ => true,
        },
        "patternProperties" => match (value.as_object(), arg.as_object()) {
            (Some(object), Some(patterns)) => patterns.iter().all(|(pattern, sub)| {
                let Ok(compiled) = regex::parse(pattern) else {
                    return true;
                };
                object
                    .iter()
                    .filter(|(key, _)| compiled.matches(key))
                    .all(|(_, v)| validates(v, sub))
            }),
            _ => true,
        },
        "additionalProperties" => match value.as_object() {
            Some(object) => {
                let declared = schema
                    .get("properties")
                    .and_then(Value::as_object);
                let patterns: Vec<_> = schema
                    .get("patternProperties")
                    .and_then(Value::as_object)
                    .map(|m| {
                        m.keys()
                            .filter_map(|p| regex::parse(p).ok())
                            .collect()
                    })
                    .unwrap_or_default();
                let is_additional = |key: &str| {
                    declared.map(|d| !d.contains_key(key)).unwrap_or(true)
                        && !patterns.iter().any(|p: &regex::CompiledPattern| p.matches(key))
                };
                match arg {
                    Value::Bool(false) => {
                        object.keys().all(|key| !is_additional(key))
                    }
                    Value::Bool(true) => true,
                    sub => object
                        .iter()
                        .filter(|(key, _)| is_additional(key))
                        .all(|(_, v)| validates(v, sub)),
                }
            }
            None => true,
        },
        "dependentRequired" => match (value.as_object(), arg.as_object()) {
            (Some(object), Some(deps)) => deps.iter().all(|(trigger, names)| {
                !object.contains_key(trigger)
                    || names
                        .as_array()
                        .map(|names| {
                            names
                                .iter()
                                .filter_map(Value::as_str)
                                .all(|name| object.contains_key(name))
                        })
                        .unwrap_or(true)
            }),
            _ => true,
        },
        "dependentSchemas" => match (value.as_object(), arg.as_object()) {
            (Some(object), Some(deps)) => deps.iter().all(|(trigger, sub)| {
                !object.contains_key(trigger) || validates(value, sub)
            }),
            _ => true,
        },
        "minProperties" => object_count_cmp(value, arg, |count, bound| count >= bound),
        "maxProperties" => object_count_cmp(value, arg, |count, bound| count <= bound),
        // Annotations and anything else: no constraint here.
        _ => true,
    }
}

// Mirrors the shapes `jsonsub_smt::formats` asserts on the solver side:
// same alphabet per format, same length floors. Non-strings and unknown
// formats pass, exactly as the compiled constraint does.
fn format_holds(value: &Value, name: &Value) -> bool {
    let (Some(s), Some(name)) = (value.as_str(), name.as_str()) else {
        return true;
    };
    if !formats::is_builtin_format(name) {
        return true;
    }
    let (pattern, min_len) = match name {
        "email" => ("^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9._%+-]+$", 5),
        "uri" => ("^(https?|ftp)://[a-zA-Z0-9./_-]*$", 0),
        "uuid" => (
            "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            36,
        ),
        "date" => ("^[0-9]{4}-[0-9]{2}-[0-9]{2}$", 10),
        // Trailing fraction/zone text is allowed past the skeleton.
        "date-time" => ("^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}", 19),
        "time" => ("^[0-9]{2}:[0-9]{2}:[0-9]{2}", 8),
        "ipv4" => ("^[0-9]+\\.[0-9]+\\.[0-9]+\\.[0-9]+$", 7),
        "ipv6" => ("^[0-9a-fA-F]+(:[0-9a-fA-F]+)*$", 2),
        _ => return true,
    };
    s.chars().count() >= min_len
        && regex::parse(pattern)
            .map(|compiled| compiled.matches(s))
            .unwrap_or(true)
}

fn prefix_holds(items: &[Value], prefix: &[Value]) -> bool {
    items
        .iter()
        .zip(prefix.iter())
        .all(|(item, sub)| validates(item, sub))
}

fn type_matches(value: &Value, spec: &Value) -> bool {
    match spec {
        Value::String(name) => single_type_matches(value, name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| single_type_matches(value, name)),
        _ => true,
    }
}

fn single_type_matches(value: &Value, name: &str) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "integer" => {
            value.as_i64().is_some()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "number" => value.is_number(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

fn numeric_cmp(value: &Value, bound: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (value.as_f64(), bound.as_f64()) {
        (Some(v), Some(b)) if value.is_number() => cmp(v, b),
        _ => true,
    }
}

fn draft7_exclusive(schema: &serde_json::Map<String, Value>, keyword: &str) -> bool {
    matches!(schema.get(keyword), Some(Value::Bool(true)))
}

fn string_len_cmp(value: &Value, bound: &Value, cmp: impl Fn(u64, u64) -> bool) -> bool {
    match (value.as_str(), bound.as_u64()) {
        (Some(s), Some(b)) => cmp(s.chars().count() as u64, b),
        _ => true,
    }
}

fn array_len_cmp(value: &Value, bound: &Value, cmp: impl Fn(u64, u64) -> bool) -> bool {
    match (value.as_array(), bound.as_u64()) {
        (Some(items), Some(b)) => cmp(items.len() as u64, b),
        _ => true,
    }
}

fn object_count_cmp(value: &Value, bound: &Value, cmp: impl Fn(u64, u64) -> bool) -> bool {
    match (value.as_object(), bound.as_u64()) {
        (Some(object), Some(b)) => cmp(object.len() as u64, b),
        _ => true,
    }
}
