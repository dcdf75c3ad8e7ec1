use indexmap::IndexSet;
use serde_json::Value;

const MAX_WALK_DEPTH: usize = 64;

/// The finite set of property names object reasoning ranges over.
///
/// Built from every property name occurring in either schema of a check
/// (after inlining), plus the names listed under `required` and
/// `dependentRequired` so that a key can be forced present even when it has
/// no declared subschema. `patternProperties` patterns are collected
/// separately; the caller may synthesize probe keys from them before the
/// universe is sealed.
#[derive(Debug, Default)]
pub struct KeyUniverse {
    keys: IndexSet<String>,
    patterns: IndexSet<String>,
}

impl KeyUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_from_schema(&mut self, schema: &Value) {
        self.walk(schema, 0);
    }

    pub fn add_key(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Every `patternProperties` pattern seen while walking.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn walk(&mut self, node: &Value, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        let Some(map) = node.as_object() else {
            return;
        };

        if let Some(props) = map.get("properties").and_then(Value::as_object) {
            for (name, subschema) in props {
                self.keys.insert(name.clone());
                self.walk(subschema, depth + 1);
            }
        }
        if let Some(patterns) = map.get("patternProperties").and_then(Value::as_object) {
            for (pattern, subschema) in patterns {
                self.patterns.insert(pattern.clone());
                self.walk(subschema, depth + 1);
            }
        }
        if let Some(required) = map.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                self.keys.insert(name.to_string());
            }
        }
        if let Some(deps) = map.get("dependentRequired").and_then(Value::as_object) {
            for (trigger, names) in deps {
                self.keys.insert(trigger.clone());
                if let Some(names) = names.as_array() {
                    for name in names.iter().filter_map(Value::as_str) {
                        self.keys.insert(name.to_string());
                    }
                }
            }
        }
        if let Some(deps) = map.get("dependentSchemas").and_then(Value::as_object) {
            for (trigger, subschema) in deps {
                self.keys.insert(trigger.clone());
                self.walk(subschema, depth + 1);
            }
        }

        for keyword in ["allOf", "anyOf", "oneOf", "prefixItems"] {
            if let Some(subschemas) = map.get(keyword).and_then(Value::as_array) {
                for subschema in subschemas {
                    self.walk(subschema, depth + 1);
                }
            }
        }
        for keyword in [
            "not",
            "items",
            "contains",
            "additionalProperties",
            "if",
            "then",
            "else",
        ] {
            if let Some(subschema) = map.get(keyword) {
                self.walk(subschema, depth + 1);
            }
        }
        // `items` in its pre-2020 array form.
        if let Some(items) = map.get("items").and_then(Value::as_array) {
            for subschema in items {
                self.walk(subschema, depth + 1);
            }
        }
        if let Some(values) = map.get("enum").and_then(Value::as_array) {
            for value in values {
                self.add_literal_keys(value, depth + 1);
            }
        }
        if let Some(value) = map.get("const") {
            self.add_literal_keys(value, depth + 1);
        }
    }

    // Object literals in const/enum must be expressible: every key they
    // mention has to live in the universe.
    fn add_literal_keys(&mut self, value: &Value, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    self.keys.insert(key.clone());
                    self.add_literal_keys(inner, depth + 1);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.add_literal_keys(item, depth + 1);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_property_names_recursively() {
        let schema = json!({
            "type": "object",
            "properties": {
                "outer": {
                    "type": "object",
                    "properties": { "inner": { "type": "string" } },
                },
            },
        });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        assert!(universe.contains("outer"));
        assert!(universe.contains("inner"));
        assert_eq!(universe.len(), 2);
    }

    #[test]
    fn collects_required_names_without_declared_properties() {
        let schema = json!({ "type": "object", "required": ["a", "b"] });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        assert!(universe.contains("a"));
        assert!(universe.contains("b"));
    }

    #[test]
    fn collects_names_through_applicators() {
        let schema = json!({
            "anyOf": [
                { "properties": { "left": {} } },
                { "not": { "properties": { "right": {} } } },
            ],
            "items": { "properties": { "element": {} } },
            "if": { "properties": { "cond": {} } },
            "then": { "required": ["conseq"] },
        });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        for key in ["left", "right", "element", "cond", "conseq"] {
            assert!(universe.contains(key), "missing {key}");
        }
    }

    #[test]
    fn records_pattern_properties_patterns_separately() {
        let schema = json!({
            "patternProperties": { "^x_": { "type": "integer" } },
        });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        assert!(universe.is_empty());
        assert_eq!(universe.patterns().collect::<Vec<_>>(), vec!["^x_"]);
    }

    #[test]
    fn collects_keys_of_object_literals_in_const_and_enum() {
        let schema = json!({
            "enum": [ { "tag": "a" }, { "tag": "b", "extra": 1 } ],
            "properties": { "wrap": { "const": { "nested": true } } },
        });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        for key in ["tag", "extra", "wrap", "nested"] {
            assert!(universe.contains(key), "missing {key}");
        }
    }

    #[test]
    fn dependent_required_adds_trigger_and_targets() {
        let schema = json!({
            "dependentRequired": { "credit_card": ["billing_address"] },
        });
        let mut universe = KeyUniverse::new();
        universe.add_from_schema(&schema);
        assert!(universe.contains("credit_card"));
        assert!(universe.contains("billing_address"));
    }
}
