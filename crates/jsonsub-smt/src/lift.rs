use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;
use z3::ast::{Ast, Bool, Datatype, Int};

use jsonsub_schema::KeyUniverse;

use crate::sort::JsonSort;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum LiftError {
    #[error("array literal has {len} elements, exceeding the configured bound of {max}")]
    #[diagnostic(
        code(jsonsub::lift::array_too_long),
        help("retry with a larger --max-array-length")
    )]
    ArrayTooLong { len: usize, max: i64 },

    #[error("object literal uses key `{key}` outside the sealed key universe")]
    #[diagnostic(code(jsonsub::lift::key_outside_universe))]
    KeyOutsideUniverse { key: String },

    #[error("number {repr} cannot be represented in the solver theory")]
    #[diagnostic(code(jsonsub::lift::unrepresentable_number))]
    UnrepresentableNumber { repr: String },
}

/// Lift a JSON literal into the predicate "`x` equals this literal".
///
/// Scalars become constructor equalities. An array literal pins the length
/// and every element; an object literal pins `has` true plus the value for
/// each of its keys and `has` false for every other key in the universe
/// (without that, `const {}` would admit arbitrary objects).
pub fn lift_eq(
    sort: &JsonSort,
    x: &Datatype,
    value: &Value,
    universe: &KeyUniverse,
) -> Result<Bool, LiftError> {
    match value {
        Value::Null => Ok(x._eq(&sort.null_lit())),
        Value::Bool(b) => Ok(x._eq(&sort.bool_lit(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(x._eq(&sort.int_lit(i)))
            } else if let Some(f) = n.as_f64() {
                let (num, den) = rational_of_f64(f).ok_or_else(|| {
                    LiftError::UnrepresentableNumber {
                        repr: n.to_string(),
                    }
                })?;
                Ok(x._eq(&sort.real_lit(num, den)))
            } else {
                Err(LiftError::UnrepresentableNumber {
                    repr: n.to_string(),
                })
            }
        }
        Value::String(s) => Ok(x._eq(&sort.str_lit(s))),
        Value::Array(items) => {
            if items.len() as i64 > sort.max_array_len() {
                return Err(LiftError::ArrayTooLong {
                    len: items.len(),
                    max: sort.max_array_len(),
                });
            }
            let mut parts = vec![
                sort.is_arr(x),
                sort.len(x)._eq(&Int::from_i64(items.len() as i64)),
            ];
            for (i, item) in items.iter().enumerate() {
                let element = sort.elem(x, i as i64);
                parts.push(lift_eq(sort, &element, item, universe)?);
            }
            let refs: Vec<&Bool> = parts.iter().collect();
            Ok(Bool::and(&refs))
        }
        Value::Object(map) => {
            let mut parts = vec![sort.is_obj(x)];
            for (key, inner) in map {
                if !universe.contains(key) {
                    return Err(LiftError::KeyOutsideUniverse { key: key.clone() });
                }
                parts.push(sort.has(x, key));
                let slot = sort.val(x, key);
                parts.push(lift_eq(sort, &slot, inner, universe)?);
            }
            for key in universe.keys() {
                if !map.contains_key(key) {
                    parts.push(sort.has(x, key).not());
                }
            }
            let refs: Vec<&Bool> = parts.iter().collect();
            Ok(Bool::and(&refs))
        }
    }
}

/// Approximate a finite `f64` as a small rational (up to 9 decimal digits).
pub fn rational_of_f64(f: f64) -> Option<(i32, i32)> {
    if !f.is_finite() {
        return None;
    }
    let mut den: i64 = 1;
    let mut scaled = f;
    while scaled.fract().abs() > 1e-9 && den < 1_000_000_000 {
        scaled *= 10.0;
        den *= 10;
    }
    let num = scaled.round();
    if num.abs() > i32::MAX as f64 || den > i32::MAX as i64 {
        return None;
    }
    Some((num as i32, den as i32))
}
