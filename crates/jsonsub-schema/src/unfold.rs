use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::errors::ResolveError;
use crate::registry::SchemaRegistry;

/// Safety net against cycles that evade graph analysis (e.g. through
/// general-pointer references); ordinary schemas sit far below this.
const MAX_EXPANSION_DEPTH: usize = 128;

/// Fully inline every `$ref` in `schema`, or reject the document.
///
/// Cyclic registries are rejected up front with the complete cycle listing.
/// On success the returned schema contains no `$ref` and no `$defs`/
/// `definitions` sections; the operation is idempotent on acyclic input.
pub fn unfold(schema: &Value) -> Result<Value, ResolveError> {
    let registry = SchemaRegistry::new(schema);
    unfold_with(&registry, schema)
}

/// Like [`unfold`], reusing an already-constructed registry.
pub fn unfold_with(registry: &SchemaRegistry, schema: &Value) -> Result<Value, ResolveError> {
    if registry.has_cycles() {
        return Err(ResolveError::CyclicSchema {
            cycles: registry.cycles().to_vec(),
        });
    }
    let mut cache = IndexMap::new();
    let mut unfolded = expand(registry, schema, &mut cache, 0)?;
    if let Some(map) = unfolded.as_object_mut() {
        map.remove("$defs");
        map.remove("definitions");
    }
    debug!(cached_refs = cache.len(), "schema unfolded");
    Ok(unfolded)
}

fn expand(
    registry: &SchemaRegistry,
    node: &Value,
    cache: &mut IndexMap<String, Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    if depth > MAX_EXPANSION_DEPTH {
        return Err(ResolveError::DepthExceeded {
            limit: MAX_EXPANSION_DEPTH,
        });
    }
    match node {
        Value::Object(map) if map.contains_key("$ref") => {
            let uri = match map.get("$ref") {
                Some(Value::String(uri)) => uri,
                _ => {
                    return Err(ResolveError::MalformedReference {
                        pointer: "$ref".to_string(),
                    })
                }
            };
            if let Some(cached) = cache.get(uri) {
                return Ok(cached.clone());
            }
            let target = registry.resolve_ref(uri)?;
            // Sibling keywords next to $ref are dropped; the node is
            // replaced wholesale by the expanded target.
            let expanded = expand(registry, target, cache, depth + 1)?;
            cache.insert(uri.clone(), expanded.clone());
            Ok(expanded)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), expand(registry, value, cache, depth + 1)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let expanded = items
                .iter()
                .map(|item| expand(registry, item, cache, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(expanded))
        }
        other => Ok(other.clone()),
    }
}

/// True when no `$ref` remains anywhere in the document.
pub fn is_fully_unfolded(schema: &Value) -> bool {
    match schema {
        Value::Object(map) => {
            !map.contains_key("$ref") && map.values().all(is_fully_unfolded)
        }
        Value::Array(items) => items.iter().all(is_fully_unfolded),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inlines_a_simple_reference() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "$ref": "#/$defs/Name" } },
            "$defs": { "Name": { "type": "string", "minLength": 1 } },
        });
        let unfolded = unfold(&schema).unwrap();
        assert_eq!(
            unfolded,
            json!({
                "type": "object",
                "properties": { "name": { "type": "string", "minLength": 1 } },
            })
        );
        assert!(is_fully_unfolded(&unfolded));
    }

    #[test]
    fn inlines_transitive_references() {
        let schema = json!({
            "$ref": "#/$defs/Outer",
            "$defs": {
                "Outer": { "type": "array", "items": { "$ref": "#/$defs/Inner" } },
                "Inner": { "type": "integer" },
            },
        });
        let unfolded = unfold(&schema).unwrap();
        assert_eq!(
            unfolded,
            json!({ "type": "array", "items": { "type": "integer" } })
        );
    }

    #[test]
    fn unfolding_is_idempotent() {
        let schema = json!({
            "properties": {
                "a": { "$ref": "#/$defs/A" },
                "b": { "$ref": "#/$defs/A" },
            },
            "$defs": { "A": { "type": "number", "minimum": 0 } },
        });
        let once = unfold(&schema).unwrap();
        let twice = unfold(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_cyclic_schemas_with_cycle_listing() {
        let schema = json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/$defs/Node" } },
                },
            },
        });
        let err = unfold(&schema).unwrap_err();
        match err {
            ResolveError::CyclicSchema { cycles } => {
                assert_eq!(cycles, vec![vec!["#/$defs/Node".to_string()]]);
            }
            other => panic!("expected CyclicSchema, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_reference_target() {
        let schema = json!({ "$ref": "#/$defs/Ghost", "$defs": {} });
        let err = unfold(&schema).unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedReference { .. }));
    }

    #[test]
    fn schema_without_refs_passes_through_minus_defs() {
        let schema = json!({
            "type": "string",
            "$defs": { "Unused": { "type": "null" } },
        });
        let unfolded = unfold(&schema).unwrap();
        assert_eq!(unfolded, json!({ "type": "string" }));
    }

    #[test]
    fn general_pointer_references_resolve() {
        let schema = json!({
            "properties": {
                "x": { "type": "boolean" },
                "y": { "$ref": "#/properties/x" },
            },
        });
        let unfolded = unfold(&schema).unwrap();
        assert_eq!(unfolded["properties"]["y"], json!({ "type": "boolean" }));
    }
}
