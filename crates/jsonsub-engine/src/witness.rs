use serde_json::{Map, Number, Value};
use z3::ast::{Bool, Datatype, Int, Real};
use z3::Model;

use jsonsub_schema::KeyUniverse;
use jsonsub_smt::JsonSort;

use crate::result::CheckError;

const MAX_READ_DEPTH: usize = 64;

/// Reads a concrete JSON value out of a satisfying model.
///
/// Strictly model-driven: the variant comes from evaluating the
/// recognizers, array lengths are read before elements, and object keys are
/// emitted only when the presence map forces them. Reads use model
/// completion, so unconstrained sub-terms default to whatever the solver
/// picks; nothing is fabricated outside the model.
pub struct WitnessExtractor<'a> {
    sort: &'a JsonSort,
    universe: &'a KeyUniverse,
}

impl<'a> WitnessExtractor<'a> {
    pub fn new(sort: &'a JsonSort, universe: &'a KeyUniverse) -> Self {
        Self { sort, universe }
    }

    pub fn extract(&self, model: &Model, x: &Datatype) -> Result<Value, CheckError> {
        self.read_value(model, x, 0)
    }

    fn read_value(&self, model: &Model, term: &Datatype, depth: usize) -> Result<Value, CheckError> {
        if depth > MAX_READ_DEPTH {
            return Err(CheckError::Internal {
                message: format!("witness nesting exceeded {MAX_READ_DEPTH}"),
            });
        }
        let sort = self.sort;

        if self.eval_bool(model, &sort.is_null(term)) {
            return Ok(Value::Null);
        }
        if self.eval_bool(model, &sort.is_bool(term)) {
            return Ok(Value::Bool(self.eval_bool(model, &sort.bool_val(term))));
        }
        if self.eval_bool(model, &sort.is_int(term)) {
            let n = self.eval_int(model, &sort.int_val(term))?;
            return Ok(Value::Number(Number::from(n)));
        }
        if self.eval_bool(model, &sort.is_real(term)) {
            let value = model
                .eval::<Real>(&sort.real_val(term), true)
                .and_then(|r| r.as_real())
                .ok_or_else(|| CheckError::Internal {
                    message: "model assigned a real with no rational value".to_string(),
                })?;
            let (num, den) = value;
            if den == 0 {
                return Err(CheckError::Internal {
                    message: "model produced a zero-denominator rational".to_string(),
                });
            }
            let f = num as f64 / den as f64;
            let number = Number::from_f64(f).ok_or_else(|| CheckError::Internal {
                message: format!("rational {num}/{den} is not a finite f64"),
            })?;
            return Ok(Value::Number(number));
        }
        if self.eval_bool(model, &sort.is_str(term)) {
            let s = model
                .eval::<z3::ast::String>(&sort.str_val(term), true)
                .and_then(|s| s.as_string())
                .ok_or_else(|| CheckError::Internal {
                    message: "model assigned a string with no value".to_string(),
                })?;
            return Ok(Value::String(s));
        }
        if self.eval_bool(model, &sort.is_arr(term)) {
            let raw_len = self.eval_int(model, &sort.len(term))?;
            let len = raw_len.clamp(0, sort.max_array_len());
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                let element = sort.elem(term, i);
                items.push(self.read_value(model, &element, depth + 1)?);
            }
            return Ok(Value::Array(items));
        }
        if self.eval_bool(model, &sort.is_obj(term)) {
            let mut map = Map::new();
            for key in self.universe.keys() {
                if self.eval_bool(model, &sort.has(term, key)) {
                    let slot = sort.val(term, key);
                    map.insert(key.to_string(), self.read_value(model, &slot, depth + 1)?);
                }
            }
            return Ok(Value::Object(map));
        }
        Err(CheckError::Internal {
            message: "model assigned no variant to a JSON term".to_string(),
        })
    }

    fn eval_bool(&self, model: &Model, term: &Bool) -> bool {
        model
            .eval::<Bool>(term, true)
            .and_then(|b| b.as_bool())
            .unwrap_or(false)
    }

    fn eval_int(&self, model: &Model, term: &Int) -> Result<i64, CheckError> {
        model
            .eval::<Int>(term, true)
            .and_then(|n| n.as_i64())
            .ok_or_else(|| CheckError::Internal {
                message: "model assigned an integer with no value".to_string(),
            })
    }
}
