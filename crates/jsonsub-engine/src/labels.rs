use indexmap::IndexMap;
use z3::ast::{Ast, Bool};
use z3::Model;

/// Which schema of the check a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Producer,
    Consumer,
}

impl Side {
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Producer => "P",
            Side::Consumer => "C",
        }
    }
}

/// One labeled leaf constraint.
#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub name: String,
    pub path: String,
    pub keyword: String,
    pub handle: Bool,
}

/// Evaluation of a label under a model.
#[derive(Debug, Clone)]
pub struct LabelEvaluation {
    pub name: String,
    pub path: String,
    pub keyword: String,
    pub satisfied: bool,
}

/// Append-only table of labeled leaf constraints for one side.
///
/// Each leaf gets a fresh boolean handle named `{side}:{path}:{keyword}`
/// (a `#n` suffix disambiguates collisions). The biconditional tying the
/// handle to the leaf is returned to the caller to be asserted at the top
/// level — embedding it inside the (possibly negated) schema predicate
/// would let the solver satisfy `¬C` by flipping a label instead of
/// violating a real constraint.
pub struct LabelTable {
    side: Side,
    entries: IndexMap<String, LabelEntry>,
}

impl LabelTable {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            entries: IndexMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LabelEntry> {
        self.entries.values()
    }

    /// Allocate a handle for `leaf` and return the defining biconditional.
    pub fn label(&mut self, path: &str, keyword: &str, leaf: &Bool) -> Bool {
        let base = format!("{}:{}:{}", self.side.prefix(), path, keyword);
        let mut name = base.clone();
        let mut n = 1;
        while self.entries.contains_key(&name) {
            n += 1;
            name = format!("{base}#{n}");
        }
        let handle = Bool::new_const(name.clone());
        let definition = handle._eq(leaf);
        self.entries.insert(
            name.clone(),
            LabelEntry {
                name,
                path: path.to_string(),
                keyword: keyword.to_string(),
                handle,
            },
        );
        definition
    }

    /// Evaluate every handle under `model` (with completion).
    pub fn evaluate(&self, model: &Model) -> Vec<LabelEvaluation> {
        self.entries
            .values()
            .map(|entry| LabelEvaluation {
                name: entry.name.clone(),
                path: entry.path.clone(),
                keyword: entry.keyword.clone(),
                satisfied: model
                    .eval::<Bool>(&entry.handle, true)
                    .and_then(|b| b.as_bool())
                    .unwrap_or(false),
            })
            .collect()
    }
}

/// Static fix suggestion for a failed consumer keyword.
pub fn recommendation_for(keyword: &str, path: &str) -> Option<String> {
    let head = keyword.split(':').next().unwrap_or(keyword);
    let arg = keyword.split_once(':').map(|(_, arg)| arg);
    let at = if path.is_empty() { "the root" } else { path };
    match head {
        "type" => Some(format!(
            "Restrict the producer type at {at} to one the consumer accepts"
        )),
        "required" => arg.map(|key| {
            format!("Add `{key}` to the producer's required properties at {at}")
        }),
        "minimum" | "exclusiveMinimum" => Some(format!(
            "Raise the producer's lower numeric bound at {at} to match the consumer"
        )),
        "maximum" | "exclusiveMaximum" => Some(format!(
            "Lower the producer's upper numeric bound at {at} to match the consumer"
        )),
        "multipleOf" => Some(format!(
            "Constrain the producer at {at} to the consumer's multiple"
        )),
        "minLength" | "maxLength" => Some(format!(
            "Align the producer's string length bounds at {at} with the consumer"
        )),
        "pattern" => Some(format!(
            "Tighten the producer's pattern at {at} to a subset of the consumer's pattern"
        )),
        "format" => Some(format!(
            "Emit values matching the consumer's format at {at}"
        )),
        "minItems" | "maxItems" => Some(format!(
            "Align the producer's array length bounds at {at} with the consumer"
        )),
        "uniqueItems" => Some(format!(
            "Add uniqueItems to the producer at {at} or deduplicate elements"
        )),
        "contains" => Some(format!(
            "Guarantee at least one element satisfying the consumer's contains schema at {at}"
        )),
        "additionalProperties" => Some(format!(
            "Remove undeclared properties at {at} or declare them in the consumer"
        )),
        "const" | "enum" => Some(format!(
            "Restrict the producer at {at} to the consumer's allowed values"
        )),
        "prefixItems" => Some(format!(
            "Keep producer arrays at {at} within the consumer's declared prefix"
        )),
        "minProperties" | "maxProperties" => Some(format!(
            "Align the producer's property-count bounds at {at} with the consumer"
        )),
        "dependentRequired" => arg.map(|key| {
            format!("When `{key}` is present at {at}, also emit the properties it requires")
        }),
        _ => None,
    }
}
