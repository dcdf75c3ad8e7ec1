use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::errors::ResolveError;

/// Conceptual node name for the document root in the reference graph.
pub const ROOT_NODE: &str = "#";

/// Definition registry for one schema document.
///
/// Collects every `$defs`/`definitions` entry keyed by its JSON Pointer,
/// records the `$ref` edges between definitions (the document root
/// participates as node `#`), and runs strongly-connected-components over
/// that graph so cyclic schemas can be rejected before unfolding.
pub struct SchemaRegistry {
    root: Value,
    definitions: IndexMap<String, Value>,
    ref_graph: IndexMap<String, IndexSet<String>>,
    cycles: Vec<Vec<String>>,
}

impl SchemaRegistry {
    pub fn new(root: &Value) -> Self {
        let definitions = extract_definitions(root);
        let ref_graph = build_ref_graph(root, &definitions);
        let cycles = detect_cycles(&ref_graph, &definitions);
        Self {
            root: root.clone(),
            definitions,
            ref_graph,
            cycles,
        }
    }

    pub fn definitions(&self) -> &IndexMap<String, Value> {
        &self.definitions
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Every reference cycle found, as the ordered list of definitions on it.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Outgoing `$ref` edges per graph node.
    pub fn ref_graph(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.ref_graph
    }

    /// Resolve a `$ref` URI to its target schema body.
    ///
    /// `#/$defs/X` and `#/definitions/X` hit the registry directly; any other
    /// same-document pointer (e.g. `#/properties/x`) is resolved by general
    /// JSON Pointer lookup into the root document.
    pub fn resolve_ref(&self, uri: &str) -> Result<&Value, ResolveError> {
        if let Some(target) = self.definitions.get(uri) {
            return Ok(target);
        }
        if let Some(pointer) = uri.strip_prefix('#') {
            return self
                .root
                .pointer(pointer)
                .ok_or_else(|| ResolveError::UnresolvedReference {
                    pointer: uri.to_string(),
                });
        }
        Err(ResolveError::ExternalReference {
            uri: uri.to_string(),
        })
    }
}

fn extract_definitions(root: &Value) -> IndexMap<String, Value> {
    let mut definitions = IndexMap::new();
    let Some(map) = root.as_object() else {
        return definitions;
    };
    for (section, prefix) in [("$defs", "#/$defs/"), ("definitions", "#/definitions/")] {
        if let Some(defs) = map.get(section).and_then(Value::as_object) {
            for (name, body) in defs {
                definitions.insert(format!("{prefix}{name}"), body.clone());
            }
        }
    }
    definitions
}

fn build_ref_graph(
    root: &Value,
    definitions: &IndexMap<String, Value>,
) -> IndexMap<String, IndexSet<String>> {
    let mut graph = IndexMap::new();
    for (uri, body) in definitions {
        let mut refs = IndexSet::new();
        collect_refs(body, &mut refs);
        graph.insert(uri.clone(), refs);
    }
    let mut root_refs = IndexSet::new();
    if let Some(map) = root.as_object() {
        if let Some(Value::String(uri)) = map.get("$ref") {
            root_refs.insert(uri.clone());
        }
        for (key, value) in map {
            // Definition bodies are already their own nodes.
            if key == "$defs" || key == "definitions" {
                continue;
            }
            collect_refs(value, &mut root_refs);
        }
    }
    graph.insert(ROOT_NODE.to_string(), root_refs);
    graph
}

fn collect_refs(node: &Value, refs: &mut IndexSet<String>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(uri)) = map.get("$ref") {
                refs.insert(uri.clone());
            }
            for value in map.values() {
                collect_refs(value, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, refs);
            }
        }
        _ => {}
    }
}

/// Iterative Tarjan SCC over the reference graph.
///
/// A component of size > 1, or a single node with a self-edge, is a cycle.
/// Edges to targets that are neither registered definitions nor the root
/// node are skipped here; they are diagnosed during unfolding instead.
fn detect_cycles(
    graph: &IndexMap<String, IndexSet<String>>,
    definitions: &IndexMap<String, Value>,
) -> Vec<Vec<String>> {
    struct Frame<'a> {
        node: &'a str,
        successors: Vec<&'a str>,
        next: usize,
    }

    let mut index: IndexMap<&str, usize> = IndexMap::new();
    let mut lowlink: IndexMap<&str, usize> = IndexMap::new();
    let mut on_stack: IndexSet<&str> = IndexSet::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut counter = 0usize;
    let mut cycles = Vec::new();

    let successors_of = |node: &str| -> Vec<&str> {
        graph
            .get(node)
            .map(|succ| {
                succ.iter()
                    .map(String::as_str)
                    .filter(|s| definitions.contains_key(*s) || *s == ROOT_NODE)
                    .collect()
            })
            .unwrap_or_default()
    };

    for start in graph.keys() {
        if index.contains_key(start.as_str()) {
            continue;
        }
        let mut frames = vec![Frame {
            node: start,
            successors: successors_of(start),
            next: 0,
        }];
        index.insert(start, counter);
        lowlink.insert(start, counter);
        counter += 1;
        stack.push(start);
        on_stack.insert(start);

        while let Some(frame) = frames.last_mut() {
            if frame.next < frame.successors.len() {
                let succ = frame.successors[frame.next];
                frame.next += 1;
                if !index.contains_key(succ) {
                    index.insert(succ, counter);
                    lowlink.insert(succ, counter);
                    counter += 1;
                    stack.push(succ);
                    on_stack.insert(succ);
                    frames.push(Frame {
                        node: succ,
                        successors: successors_of(succ),
                        next: 0,
                    });
                } else if on_stack.contains(succ) {
                    let node = frame.node;
                    let low = lowlink[node].min(index[succ]);
                    lowlink.insert(node, low);
                }
            } else {
                let frame = frames.pop().expect("frame stack is non-empty");
                let node = frame.node;
                if let Some(parent) = frames.last() {
                    let low = lowlink[parent.node].min(lowlink[node]);
                    lowlink.insert(parent.node, low);
                }
                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    loop {
                        let popped = stack.pop().expect("SCC stack is non-empty");
                        on_stack.swap_remove(popped);
                        component.push(popped.to_string());
                        if popped == node {
                            break;
                        }
                    }
                    component.reverse();
                    let self_loop = component.len() == 1
                        && graph
                            .get(node)
                            .map(|succ| succ.contains(node))
                            .unwrap_or(false);
                    if component.len() > 1 || self_loop {
                        cycles.push(component);
                    }
                }
            }
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_defs_and_definitions_sections() {
        let schema = json!({
            "$defs": { "A": { "type": "string" } },
            "definitions": { "B": { "type": "integer" } },
        });
        let registry = SchemaRegistry::new(&schema);
        assert!(registry.definitions().contains_key("#/$defs/A"));
        assert!(registry.definitions().contains_key("#/definitions/B"));
        assert_eq!(registry.definitions().len(), 2);
    }

    #[test]
    fn acyclic_chain_has_no_cycles() {
        let schema = json!({
            "$ref": "#/$defs/A",
            "$defs": {
                "A": { "properties": { "b": { "$ref": "#/$defs/B" } } },
                "B": { "type": "string" },
            },
        });
        let registry = SchemaRegistry::new(&schema);
        assert!(!registry.has_cycles());
    }

    #[test]
    fn self_referential_definition_is_a_cycle() {
        let schema = json!({
            "$defs": {
                "Tree": {
                    "type": "object",
                    "properties": { "child": { "$ref": "#/$defs/Tree" } },
                },
            },
        });
        let registry = SchemaRegistry::new(&schema);
        assert!(registry.has_cycles());
        assert_eq!(registry.cycles(), &[vec!["#/$defs/Tree".to_string()]]);
    }

    #[test]
    fn mutual_recursion_is_reported_as_one_component() {
        let schema = json!({
            "$defs": {
                "A": { "properties": { "b": { "$ref": "#/$defs/B" } } },
                "B": { "properties": { "a": { "$ref": "#/$defs/A" } } },
            },
        });
        let registry = SchemaRegistry::new(&schema);
        assert_eq!(registry.cycles().len(), 1);
        let cycle = &registry.cycles()[0];
        assert!(cycle.contains(&"#/$defs/A".to_string()));
        assert!(cycle.contains(&"#/$defs/B".to_string()));
    }

    #[test]
    fn cycle_through_the_document_root_is_detected() {
        let schema = json!({
            "$ref": "#/$defs/A",
            "$defs": { "A": { "properties": { "again": { "$ref": "#" } } } },
        });
        let registry = SchemaRegistry::new(&schema);
        assert!(registry.has_cycles());
        let cycle = &registry.cycles()[0];
        assert!(cycle.contains(&"#".to_string()));
        assert!(cycle.contains(&"#/$defs/A".to_string()));
    }

    #[test]
    fn resolve_ref_falls_back_to_json_pointer_lookup() {
        let schema = json!({
            "properties": { "x": { "type": "boolean" } },
        });
        let registry = SchemaRegistry::new(&schema);
        let target = registry.resolve_ref("#/properties/x").unwrap();
        assert_eq!(target, &json!({ "type": "boolean" }));
    }

    #[test]
    fn resolve_ref_rejects_external_uris() {
        let registry = SchemaRegistry::new(&json!({}));
        let err = registry
            .resolve_ref("https://example.com/schema.json")
            .unwrap_err();
        assert!(matches!(err, ResolveError::ExternalReference { .. }));
    }

    #[test]
    fn resolve_ref_reports_missing_target_pointer() {
        let registry = SchemaRegistry::new(&json!({ "$defs": {} }));
        let err = registry.resolve_ref("#/$defs/Nope").unwrap_err();
        match err {
            ResolveError::UnresolvedReference { pointer } => {
                assert_eq!(pointer, "#/$defs/Nope");
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }
}
