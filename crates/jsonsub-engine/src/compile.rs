use serde_json::{Map, Value};
use z3::ast::{Ast, Bool, Datatype, Int};

use jsonsub_schema::dialect::{classify, KeywordClass};
use jsonsub_schema::KeyUniverse;
use jsonsub_smt::regex::CompiledPattern;
use jsonsub_smt::{formats, lift_eq, regex, JsonSort};

use crate::labels::{LabelTable, Side};
use crate::result::CompileError;

/// Output of compiling one schema against one JSON variable.
pub struct CompiledSchema {
    /// The schema predicate `⟦S⟧(x)`.
    pub formula: Bool,
    /// Top-level assertions accompanying the predicate: label definitions
    /// and well-formedness bounds. Asserted positively even when the
    /// predicate itself is negated.
    pub side_constraints: Vec<Bool>,
    pub labels: LabelTable,
}

/// Translates an inlined schema into a Z3 predicate over a JSON value.
///
/// Every supported keyword becomes a constraint; every leaf constraint is
/// tied to a fresh labeled handle for later diagnosis. Type-specific
/// keywords are guarded by their recognizer, so `{"minLength": 5}` admits
/// `42` just as JSON Schema prescribes. Unknown assertions and unsupported
/// feature corners are structured rejections, never silent approximations.
pub struct SchemaCompiler<'a> {
    sort: &'a JsonSort,
    universe: &'a KeyUniverse,
    max_depth: usize,
    labels: LabelTable,
    side_constraints: Vec<Bool>,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(sort: &'a JsonSort, universe: &'a KeyUniverse, side: Side, max_depth: usize) -> Self {
        Self {
            sort,
            universe,
            max_depth,
            labels: LabelTable::new(side),
            side_constraints: Vec::new(),
        }
    }

    pub fn compile(mut self, schema: &Value, x: &Datatype) -> Result<CompiledSchema, CompileError> {
        let formula = self.compile_value(schema, x, "", 0)?;
        Ok(CompiledSchema {
            formula,
            side_constraints: self.side_constraints,
            labels: self.labels,
        })
    }

    fn compile_value(
        &mut self,
        schema: &Value,
        x: &Datatype,
        path: &str,
        depth: usize,
    ) -> Result<Bool, CompileError> {
        if depth > self.max_depth {
            return Err(CompileError::NestingTooDeep {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }
        self.side_constraints.push(self.sort.well_formed(x));
        match schema {
            Value::Bool(accept_all) => Ok(Bool::from_bool(*accept_all)),
            Value::Object(map) => self.compile_map(map, x, path, depth),
            _ => Err(CompileError::InvalidSchema {
                path: path.to_string(),
            }),
        }
    }

    fn compile_map(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        depth: usize,
    ) -> Result<Bool, CompileError> {
        if map.contains_key("$ref") {
            return Err(CompileError::UnresolvedRef {
                path: path.to_string(),
            });
        }
        for keyword in map.keys() {
            if classify(keyword) == KeywordClass::Unknown {
                return Err(CompileError::UnsupportedKeyword {
                    keyword: keyword.clone(),
                    path: path.to_string(),
                });
            }
        }

        let mut parts: Vec<Bool> = Vec::new();
        self.compile_type(map, x, path, &mut parts)?;
        self.compile_const_enum(map, x, path, &mut parts)?;
        self.compile_combinators(map, x, path, depth, &mut parts)?;
        self.compile_conditionals(map, x, path, depth, &mut parts)?;
        self.compile_numbers(map, x, path, &mut parts)?;
        self.compile_strings(map, x, path, &mut parts)?;
        self.compile_arrays(map, x, path, depth, &mut parts)?;
        self.compile_objects(map, x, path, depth, &mut parts)?;
        Ok(and_all(parts))
    }

    fn label(&mut self, path: &str, keyword: &str, leaf: Bool) -> Bool {
        let definition = self.labels.label(path, keyword, &leaf);
        self.side_constraints.push(definition);
        leaf
    }

    // ---- type / const / enum ----

    fn compile_type(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        let Some(spec) = map.get("type") else {
            return Ok(());
        };
        let leaf = self.type_predicate(spec, x, path)?;
        parts.push(self.label(path, "type", leaf));
        Ok(())
    }

    fn type_predicate(&self, spec: &Value, x: &Datatype, path: &str) -> Result<Bool, CompileError> {
        match spec {
            Value::String(name) => self.single_type(name, x, path),
            Value::Array(names) => {
                let mut alternatives = Vec::with_capacity(names.len());
                for name in names {
                    let name = name.as_str().ok_or_else(|| CompileError::InvalidKeywordValue {
                        keyword: "type".to_string(),
                        path: path.to_string(),
                    })?;
                    alternatives.push(self.single_type(name, x, path)?);
                }
                Ok(or_all(alternatives))
            }
            _ => Err(CompileError::InvalidKeywordValue {
                keyword: "type".to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn single_type(&self, name: &str, x: &Datatype, path: &str) -> Result<Bool, CompileError> {
        let sort = self.sort;
        match name {
            "null" => Ok(sort.is_null(x)),
            "boolean" => Ok(sort.is_bool(x)),
            "integer" => Ok(sort.is_int(x)),
            "number" => Ok(Bool::or(&[&sort.is_int(x), &sort.is_real(x)])),
            "string" => Ok(sort.is_str(x)),
            "array" => Ok(sort.is_arr(x)),
            "object" => Ok(sort.is_obj(x)),
            other => Err(CompileError::UnsupportedKeyword {
                keyword: format!("type:{other}"),
                path: path.to_string(),
            }),
        }
    }

    fn compile_const_enum(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        if let Some(value) = map.get("const") {
            let leaf = lift_eq(self.sort, x, value, self.universe).map_err(|source| {
                CompileError::BoundExceeded {
                    path: path.to_string(),
                    source,
                }
            })?;
            parts.push(self.label(path, "const", leaf));
        } else if let Some(values) = map.get("enum") {
            let values = values.as_array().ok_or_else(|| CompileError::InvalidKeywordValue {
                keyword: "enum".to_string(),
                path: path.to_string(),
            })?;
            let mut alternatives = Vec::with_capacity(values.len());
            for value in values {
                alternatives.push(lift_eq(self.sort, x, value, self.universe).map_err(
                    |source| CompileError::BoundExceeded {
                        path: path.to_string(),
                        source,
                    },
                )?);
            }
            let leaf = or_all(alternatives);
            parts.push(self.label(path, "enum", leaf));
        }
        Ok(())
    }

    // ---- combinators and conditionals ----

    fn compile_combinators(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        depth: usize,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        for (keyword, combine) in [
            ("allOf", Combine::All),
            ("anyOf", Combine::Any),
            ("oneOf", Combine::One),
        ] {
            let Some(subschemas) = map.get(keyword) else {
                continue;
            };
            let subschemas =
                subschemas
                    .as_array()
                    .ok_or_else(|| CompileError::InvalidKeywordValue {
                        keyword: keyword.to_string(),
                        path: path.to_string(),
                    })?;
            let mut compiled = Vec::with_capacity(subschemas.len());
            for (i, sub) in subschemas.iter().enumerate() {
                compiled.push(self.compile_value(sub, x, &format!("{path}/{keyword}/{i}"), depth + 1)?);
            }
            match combine {
                Combine::All => parts.push(and_all(compiled)),
                Combine::Any => parts.push(or_all(compiled)),
                Combine::One => {
                    let refs: Vec<&Bool> = compiled.iter().collect();
                    let at_least_one = Bool::or(&refs);
                    let mut exclusions = Vec::new();
                    for i in 0..compiled.len() {
                        for j in i + 1..compiled.len() {
                            exclusions
                                .push(Bool::and(&[&compiled[i], &compiled[j]]).not());
                        }
                    }
                    exclusions.push(at_least_one);
                    parts.push(and_all(exclusions));
                }
            }
        }
        if let Some(sub) = map.get("not") {
            let inner = self.compile_value(sub, x, &format!("{path}/not"), depth + 1)?;
            parts.push(inner.not());
        }
        Ok(())
    }

    fn compile_conditionals(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        depth: usize,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        // `then`/`else` without `if` carry no constraint.
        let Some(if_schema) = map.get("if") else {
            return Ok(());
        };
        let condition = self.compile_value(if_schema, x, &format!("{path}/if"), depth + 1)?;
        if let Some(then_schema) = map.get("then") {
            let conseq = self.compile_value(then_schema, x, &format!("{path}/then"), depth + 1)?;
            parts.push(condition.implies(&conseq));
        }
        if let Some(else_schema) = map.get("else") {
            let alt = self.compile_value(else_schema, x, &format!("{path}/else"), depth + 1)?;
            parts.push(condition.not().implies(&alt));
        }
        Ok(())
    }

    // ---- numbers ----

    fn compile_numbers(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        // Draft 7 spells exclusivity as booleans modifying minimum/maximum;
        // Draft 6+ uses standalone numeric keywords. Both are accepted.
        let exclusive_min_flag = matches!(map.get("exclusiveMinimum"), Some(Value::Bool(true)));
        let exclusive_max_flag = matches!(map.get("exclusiveMaximum"), Some(Value::Bool(true)));

        if let Some(value) = map.get("minimum") {
            let number = require_number(value, "minimum", path)?;
            let leaf = self.numeric_bound(x, number, exclusive_min_flag, BoundSide::Lower, path)?;
            parts.push(self.label(path, "minimum", leaf));
        }
        if let Some(value) = map.get("maximum") {
            let number = require_number(value, "maximum", path)?;
            let leaf = self.numeric_bound(x, number, exclusive_max_flag, BoundSide::Upper, path)?;
            parts.push(self.label(path, "maximum", leaf));
        }
        if let Some(value) = map.get("exclusiveMinimum") {
            if !value.is_boolean() {
                let number = require_number(value, "exclusiveMinimum", path)?;
                let leaf = self.numeric_bound(x, number, true, BoundSide::Lower, path)?;
                parts.push(self.label(path, "exclusiveMinimum", leaf));
            }
        }
        if let Some(value) = map.get("exclusiveMaximum") {
            if !value.is_boolean() {
                let number = require_number(value, "exclusiveMaximum", path)?;
                let leaf = self.numeric_bound(x, number, true, BoundSide::Upper, path)?;
                parts.push(self.label(path, "exclusiveMaximum", leaf));
            }
        }
        if let Some(value) = map.get("multipleOf") {
            let number = require_number(value, "multipleOf", path)?;
            let Some(k) = number.as_i64().filter(|k| *k > 0) else {
                // Real-valued multiples have no sound quantifier-free
                // encoding here.
                return Err(CompileError::UnsupportedKeyword {
                    keyword: "multipleOf".to_string(),
                    path: path.to_string(),
                });
            };
            // Without an integer-only type the instance may be a real, and
            // reals carry no divisibility constraint in this encoding, so
            // accepting the keyword would silently widen the schema.
            if !type_is_integer_only(map) {
                return Err(CompileError::UnsupportedKeyword {
                    keyword: "multipleOf".to_string(),
                    path: path.to_string(),
                });
            }
            let zero = Int::from_i64(0);
            let divides = self
                .sort
                .int_val(x)
                .modulo(&Int::from_i64(k))
                ._eq(&zero);
            let leaf = self.sort.is_int(x).implies(&divides);
            parts.push(self.label(path, &format!("multipleOf:{k}"), leaf));
        }
        Ok(())
    }

    fn numeric_bound(
        &self,
        x: &Datatype,
        number: &serde_json::Number,
        strict: bool,
        side: BoundSide,
        path: &str,
    ) -> Result<Bool, CompileError> {
        let sort = self.sort;
        let int_val = sort.int_val(x);
        let real_val = sort.real_val(x);

        let (int_cmp, real_cmp) = if let Some(i) = number.as_i64() {
            let bound = Int::from_i64(i);
            let int_cmp = match (side, strict) {
                (BoundSide::Lower, false) => int_val.ge(&bound),
                (BoundSide::Lower, true) => int_val.gt(&bound),
                (BoundSide::Upper, false) => int_val.le(&bound),
                (BoundSide::Upper, true) => int_val.lt(&bound),
            };
            let real_bound = Int::from_i64(i).to_real();
            let real_cmp = match (side, strict) {
                (BoundSide::Lower, false) => real_val.ge(&real_bound),
                (BoundSide::Lower, true) => real_val.gt(&real_bound),
                (BoundSide::Upper, false) => real_val.le(&real_bound),
                (BoundSide::Upper, true) => real_val.lt(&real_bound),
            };
            (int_cmp, real_cmp)
        } else {
            let f = number.as_f64().ok_or_else(|| CompileError::InvalidKeywordValue {
                keyword: "numeric bound".to_string(),
                path: path.to_string(),
            })?;
            let (num, den) =
                jsonsub_smt::lift::rational_of_f64(f).ok_or_else(|| {
                    CompileError::InvalidKeywordValue {
                        keyword: "numeric bound".to_string(),
                        path: path.to_string(),
                    }
                })?;
            let real_bound = z3::ast::Real::from_real(num, den);
            let real_cmp = match (side, strict) {
                (BoundSide::Lower, false) => real_val.ge(&real_bound),
                (BoundSide::Lower, true) => real_val.gt(&real_bound),
                (BoundSide::Upper, false) => real_val.le(&real_bound),
                (BoundSide::Upper, true) => real_val.lt(&real_bound),
            };
            // Integer instances round to the nearest admissible integer.
            let int_bound = match (side, strict) {
                (BoundSide::Lower, false) => Int::from_i64(f.ceil() as i64),
                (BoundSide::Lower, true) => Int::from_i64(f.floor() as i64 + 1),
                (BoundSide::Upper, false) => Int::from_i64(f.floor() as i64),
                (BoundSide::Upper, true) => Int::from_i64(f.ceil() as i64 - 1),
            };
            let int_cmp = match side {
                BoundSide::Lower => int_val.ge(&int_bound),
                BoundSide::Upper => int_val.le(&int_bound),
            };
            (int_cmp, real_cmp)
        };

        Ok(Bool::and(&[
            &sort.is_int(x).implies(&int_cmp),
            &sort.is_real(x).implies(&real_cmp),
        ]))
    }

    // ---- strings ----

    fn compile_strings(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        let sort = self.sort;
        let is_str = sort.is_str(x);

        if let Some(value) = map.get("minLength") {
            let n = require_u64(value, "minLength", path)?;
            let leaf = is_str.implies(&sort.str_val(x).length().ge(&Int::from_i64(n as i64)));
            parts.push(self.label(path, &format!("minLength:{n}"), leaf));
        }
        if let Some(value) = map.get("maxLength") {
            let n = require_u64(value, "maxLength", path)?;
            let leaf = is_str.implies(&sort.str_val(x).length().le(&Int::from_i64(n as i64)));
            parts.push(self.label(path, &format!("maxLength:{n}"), leaf));
        }
        if let Some(value) = map.get("pattern") {
            let pattern = value.as_str().ok_or_else(|| CompileError::InvalidKeywordValue {
                keyword: "pattern".to_string(),
                path: path.to_string(),
            })?;
            let compiled = regex::parse(pattern).map_err(|source| CompileError::UnsupportedRegex {
                path: path.to_string(),
                source,
            })?;
            let re = compiled
                .to_regexp()
                .map_err(|source| CompileError::UnsupportedRegex {
                    path: path.to_string(),
                    source,
                })?;
            let leaf = is_str.implies(&sort.str_val(x).regex_matches(&re));
            parts.push(self.label(path, "pattern", leaf));
        }
        if let Some(value) = map.get("format") {
            let name = value.as_str().ok_or_else(|| CompileError::InvalidKeywordValue {
                keyword: "format".to_string(),
                path: path.to_string(),
            })?;
            match formats::format_constraint(&sort.str_val(x), name) {
                Some(constraint) => {
                    let leaf = is_str.implies(&constraint);
                    parts.push(self.label(path, &format!("format:{name}"), leaf));
                }
                None => {
                    tracing::debug!(format = name, path, "unknown format treated as annotation");
                }
            }
        }
        Ok(())
    }

    // ---- arrays ----

    fn compile_arrays(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        depth: usize,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        let sort = self.sort;
        let is_arr = sort.is_arr(x);
        let len = sort.len(x);
        let max_len = sort.max_array_len();

        if let Some(value) = map.get("minItems") {
            let n = require_u64(value, "minItems", path)?;
            let leaf = is_arr.implies(&len.ge(&Int::from_i64(n as i64)));
            parts.push(self.label(path, &format!("minItems:{n}"), leaf));
        }
        if let Some(value) = map.get("maxItems") {
            let n = require_u64(value, "maxItems", path)?;
            let leaf = is_arr.implies(&len.le(&Int::from_i64(n as i64)));
            parts.push(self.label(path, &format!("maxItems:{n}"), leaf));
        }

        // `prefixItems` with an optional `items` tail; the pre-2020 array
        // form of `items` is handled identically to `prefixItems`.
        let prefix: Option<&Vec<Value>> = map
            .get("prefixItems")
            .and_then(Value::as_array)
            .or_else(|| map.get("items").and_then(Value::as_array));
        if map.get("prefixItems").is_some_and(|v| !v.is_array()) {
            return Err(CompileError::InvalidKeywordValue {
                keyword: "prefixItems".to_string(),
                path: path.to_string(),
            });
        }

        if let Some(prefix_schemas) = prefix {
            let prefix_key = if map.contains_key("prefixItems") {
                "prefixItems"
            } else {
                "items"
            };
            let k = prefix_schemas.len() as i64;
            for (i, sub) in prefix_schemas.iter().enumerate() {
                let element = sort.elem(x, i as i64);
                let satisfied =
                    self.compile_value(sub, &element, &format!("{path}/{prefix_key}/{i}"), depth + 1)?;
                let in_range = Bool::and(&[&is_arr, &Int::from_i64(i as i64).lt(&len)]);
                parts.push(in_range.implies(&satisfied));
            }
            let tail = if map.contains_key("prefixItems") {
                map.get("items")
            } else {
                None
            };
            match tail {
                Some(tail_schema) => {
                    for i in k..max_len {
                        let element = sort.elem(x, i);
                        let satisfied = self.compile_value(
                            tail_schema,
                            &element,
                            &format!("{path}/items"),
                            depth + 1,
                        )?;
                        let in_range = Bool::and(&[&is_arr, &Int::from_i64(i).lt(&len)]);
                        parts.push(in_range.implies(&satisfied));
                    }
                }
                None => {
                    let leaf = is_arr.implies(&len.le(&Int::from_i64(k)));
                    parts.push(self.label(path, prefix_key, leaf));
                }
            }
        } else if let Some(items_schema) = map.get("items") {
            for i in 0..max_len {
                let element = sort.elem(x, i);
                let satisfied =
                    self.compile_value(items_schema, &element, &format!("{path}/items"), depth + 1)?;
                let in_range = Bool::and(&[&is_arr, &Int::from_i64(i).lt(&len)]);
                parts.push(in_range.implies(&satisfied));
            }
        }

        if let Some(contains_schema) = map.get("contains") {
            let mut witnesses = Vec::with_capacity(max_len as usize);
            for i in 0..max_len {
                let element = sort.elem(x, i);
                let satisfied =
                    self.compile_value(contains_schema, &element, &format!("{path}/contains"), depth + 1)?;
                witnesses.push(Bool::and(&[&Int::from_i64(i).lt(&len), &satisfied]));
            }
            parts.push(is_arr.implies(&or_all(witnesses)));
        }

        if matches!(map.get("uniqueItems"), Some(Value::Bool(true))) {
            let mut pairs = Vec::new();
            for i in 0..max_len {
                for j in i + 1..max_len {
                    let both_in_range = Bool::and(&[
                        &Int::from_i64(i).lt(&len),
                        &Int::from_i64(j).lt(&len),
                    ]);
                    let distinct = sort.elem(x, i)._eq(&sort.elem(x, j)).not();
                    pairs.push(both_in_range.implies(&distinct));
                }
            }
            let leaf = is_arr.implies(&and_all(pairs));
            parts.push(self.label(path, "uniqueItems:true", leaf));
        }
        Ok(())
    }

    // ---- objects ----

    fn compile_objects(
        &mut self,
        map: &Map<String, Value>,
        x: &Datatype,
        path: &str,
        depth: usize,
        parts: &mut Vec<Bool>,
    ) -> Result<(), CompileError> {
        let sort = self.sort;
        let is_obj = sort.is_obj(x);

        if let Some(required) = map.get("required") {
            let required = required
                .as_array()
                .ok_or_else(|| CompileError::InvalidKeywordValue {
                    keyword: "required".to_string(),
                    path: path.to_string(),
                })?;
            for name in required {
                let name = name.as_str().ok_or_else(|| CompileError::InvalidKeywordValue {
                    keyword: "required".to_string(),
                    path: path.to_string(),
                })?;
                let leaf = is_obj.implies(&sort.has(x, name));
                parts.push(self.label(path, &format!("required:{name}"), leaf));
            }
        }

        if let Some(properties) = map.get("properties") {
            let properties =
                properties
                    .as_object()
                    .ok_or_else(|| CompileError::InvalidKeywordValue {
                        keyword: "properties".to_string(),
                        path: path.to_string(),
                    })?;
            for (key, subschema) in properties {
                let slot = sort.val(x, key);
                let satisfied = self.compile_value(
                    subschema,
                    &slot,
                    &format!("{path}/properties/{key}"),
                    depth + 1,
                )?;
                let present = Bool::and(&[&is_obj, &sort.has(x, key)]);
                parts.push(present.implies(&satisfied));
            }
        }

        let mut pattern_matchers: Vec<CompiledPattern> = Vec::new();
        if let Some(patterns) = map.get("patternProperties") {
            let patterns = patterns
                .as_object()
                .ok_or_else(|| CompileError::InvalidKeywordValue {
                    keyword: "patternProperties".to_string(),
                    path: path.to_string(),
                })?;
            for (pattern, subschema) in patterns {
                let compiled =
                    regex::parse(pattern).map_err(|source| CompileError::UnsupportedRegex {
                        path: path.to_string(),
                        source,
                    })?;
                let matching: Vec<String> = self
                    .universe
                    .keys()
                    .filter(|key| compiled.matches(key))
                    .map(str::to_string)
                    .collect();
                for key in matching {
                    let slot = sort.val(x, &key);
                    let satisfied = self.compile_value(
                        subschema,
                        &slot,
                        &format!("{path}/patternProperties/{pattern}"),
                        depth + 1,
                    )?;
                    let present = Bool::and(&[&is_obj, &sort.has(x, &key)]);
                    parts.push(present.implies(&satisfied));
                }
                pattern_matchers.push(compiled);
            }
        }

        if let Some(additional) = map.get("additionalProperties") {
            let declared: Vec<&str> = map
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().map(String::as_str).collect())
                .unwrap_or_default();
            let undeclared: Vec<String> = self
                .universe
                .keys()
                .filter(|key| {
                    !declared.contains(key)
                        && !pattern_matchers.iter().any(|p| p.matches(key))
                })
                .map(str::to_string)
                .collect();
            match additional {
                Value::Bool(false) => {
                    let absences: Vec<Bool> = undeclared
                        .iter()
                        .map(|key| sort.has(x, key).not())
                        .collect();
                    let leaf = is_obj.implies(&and_all(absences));
                    parts.push(self.label(path, "additionalProperties:false", leaf));
                }
                Value::Bool(true) => {}
                schema => {
                    for key in &undeclared {
                        let slot = sort.val(x, key);
                        let satisfied = self.compile_value(
                            schema,
                            &slot,
                            &format!("{path}/additionalProperties"),
                            depth + 1,
                        )?;
                        let present = Bool::and(&[&is_obj, &sort.has(x, key)]);
                        parts.push(present.implies(&satisfied));
                    }
                }
            }
        }

        if let Some(deps) = map.get("dependentRequired") {
            let deps = deps
                .as_object()
                .ok_or_else(|| CompileError::InvalidKeywordValue {
                    keyword: "dependentRequired".to_string(),
                    path: path.to_string(),
                })?;
            for (trigger, names) in deps {
                let names = names
                    .as_array()
                    .ok_or_else(|| CompileError::InvalidKeywordValue {
                        keyword: "dependentRequired".to_string(),
                        path: path.to_string(),
                    })?;
                let mut consequents = Vec::with_capacity(names.len());
                for name in names {
                    let name =
                        name.as_str()
                            .ok_or_else(|| CompileError::InvalidKeywordValue {
                                keyword: "dependentRequired".to_string(),
                                path: path.to_string(),
                            })?;
                    consequents.push(sort.has(x, name));
                }
                let trigger_present = Bool::and(&[&is_obj, &sort.has(x, trigger)]);
                let leaf = trigger_present.implies(&and_all(consequents));
                parts.push(self.label(path, &format!("dependentRequired:{trigger}"), leaf));
            }
        }

        if let Some(deps) = map.get("dependentSchemas") {
            let deps = deps
                .as_object()
                .ok_or_else(|| CompileError::InvalidKeywordValue {
                    keyword: "dependentSchemas".to_string(),
                    path: path.to_string(),
                })?;
            for (trigger, subschema) in deps {
                let satisfied = self.compile_value(
                    subschema,
                    x,
                    &format!("{path}/dependentSchemas/{trigger}"),
                    depth + 1,
                )?;
                let trigger_present = Bool::and(&[&is_obj, &sort.has(x, trigger)]);
                parts.push(trigger_present.implies(&satisfied));
            }
        }

        // Property counts are sums of presence indicators over the sealed
        // key universe.
        if map.contains_key("minProperties") || map.contains_key("maxProperties") {
            let zero = Int::from_i64(0);
            let one = Int::from_i64(1);
            let count = self
                .universe
                .keys()
                .fold(Int::from_i64(0), |acc, key| {
                    &acc + &sort.has(x, key).ite(&one, &zero)
                });
            if let Some(value) = map.get("minProperties") {
                let n = require_u64(value, "minProperties", path)?;
                let leaf = is_obj.implies(&count.ge(&Int::from_i64(n as i64)));
                parts.push(self.label(path, &format!("minProperties:{n}"), leaf));
            }
            if let Some(value) = map.get("maxProperties") {
                let n = require_u64(value, "maxProperties", path)?;
                let leaf = is_obj.implies(&count.le(&Int::from_i64(n as i64)));
                parts.push(self.label(path, &format!("maxProperties:{n}"), leaf));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Combine {
    All,
    Any,
    One,
}

#[derive(Clone, Copy)]
enum BoundSide {
    Lower,
    Upper,
}

fn and_all(parts: Vec<Bool>) -> Bool {
    match parts.len() {
        0 => Bool::from_bool(true),
        1 => parts.into_iter().next().expect("single part"),
        _ => {
            let refs: Vec<&Bool> = parts.iter().collect();
            Bool::and(&refs)
        }
    }
}

fn or_all(parts: Vec<Bool>) -> Bool {
    match parts.len() {
        0 => Bool::from_bool(false),
        1 => parts.into_iter().next().expect("single part"),
        _ => {
            let refs: Vec<&Bool> = parts.iter().collect();
            Bool::or(&refs)
        }
    }
}

fn require_number<'v>(
    value: &'v Value,
    keyword: &str,
    path: &str,
) -> Result<&'v serde_json::Number, CompileError> {
    value.as_number().ok_or_else(|| CompileError::InvalidKeywordValue {
        keyword: keyword.to_string(),
        path: path.to_string(),
    })
}

fn require_u64(value: &Value, keyword: &str, path: &str) -> Result<u64, CompileError> {
    value.as_u64().ok_or_else(|| CompileError::InvalidKeywordValue {
        keyword: keyword.to_string(),
        path: path.to_string(),
    })
}

fn type_is_integer_only(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(name)) => name == "integer",
        Some(Value::Array(names)) => {
            !names.is_empty() && names.iter().all(|n| n.as_str() == Some("integer"))
        }
        _ => false,
    }
}
