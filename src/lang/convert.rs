//! Bridging between runtime values and the [`DynamicValue`] tree that
//! crosses the process boundary.

use std::collections::BTreeMap;

use crate::lang::value::{format_float, py_repr, range_len, Dict, EvalResult, PyExc, Value};
use crate::types::DynamicValue;

/// Largest range the worker will expand into a sequence when returned
/// from an entry point.
const MAX_RANGE_RESULT: i64 = 1_000_000;

/// Test inputs become runtime values on the way into the entry point.
pub fn dynamic_to_value(value: &DynamicValue) -> Value {
    match value {
        DynamicValue::Unit => Value::None,
        DynamicValue::Bool(b) => Value::Bool(*b),
        DynamicValue::Int(i) => Value::Int(*i),
        DynamicValue::Float(f) => Value::Float(*f),
        DynamicValue::Text(s) => Value::str(s.clone()),
        DynamicValue::Seq(items) => Value::list(items.iter().map(dynamic_to_value).collect()),
        DynamicValue::Map(entries) => {
            let mut dict = Dict::default();
            for (key, value) in entries {
                dict.insert(Value::str(key.clone()), dynamic_to_value(value));
            }
            Value::dict(dict)
        }
    }
}

/// Entry-point return values become DynamicValues on the way out.
///
/// Tuples, sets and ranges flatten to sequences; mapping keys that are
/// not text are rendered with their repr. Values with no data shape
/// (functions, iterators, classes) are a TypeError, reported as a
/// runtime failure of the test.
pub fn value_to_dynamic(value: &Value) -> EvalResult<DynamicValue> {
    match value {
        Value::None => Ok(DynamicValue::Unit),
        Value::Bool(b) => Ok(DynamicValue::Bool(*b)),
        Value::Int(i) => Ok(DynamicValue::Int(*i)),
        Value::Float(f) => {
            // The wire format has no encoding for non-finite floats; one
            // slipping through would decode as Unit on the far side.
            if f.is_finite() {
                Ok(DynamicValue::Float(*f))
            } else {
                Err(PyExc::value_error(format!(
                    "return value {} is not representable",
                    format_float(*f)
                )))
            }
        }
        Value::Str(s) => Ok(DynamicValue::Text(s.as_ref().clone())),
        Value::List(items) => seq_to_dynamic(items.borrow().iter()),
        Value::Tuple(items) => seq_to_dynamic(items.iter()),
        Value::Set(items) => seq_to_dynamic(items.borrow().iter()),
        Value::FrozenSet(items) => seq_to_dynamic(items.iter()),
        Value::Range { start, stop, step } => {
            if range_len(*start, *stop, *step) > MAX_RANGE_RESULT {
                return Err(PyExc::type_error("range result too large to return"));
            }
            let mut out = Vec::new();
            let mut current = *start;
            while if *step > 0 { current < *stop } else { current > *stop } {
                out.push(DynamicValue::Int(current));
                current += step;
            }
            Ok(DynamicValue::Seq(out))
        }
        Value::Bytes(bytes) => Ok(DynamicValue::Seq(
            bytes.iter().map(|&b| DynamicValue::Int(b as i64)).collect(),
        )),
        Value::ByteArray(bytes) => Ok(DynamicValue::Seq(
            bytes
                .borrow()
                .iter()
                .map(|&b| DynamicValue::Int(b as i64))
                .collect(),
        )),
        Value::Dict(dict) => {
            let mut out = BTreeMap::new();
            for (key, value) in &dict.borrow().entries {
                let key = match key {
                    Value::Str(s) => s.as_ref().clone(),
                    other => py_repr(other),
                };
                out.insert(key, value_to_dynamic(value)?);
            }
            Ok(DynamicValue::Map(out))
        }
        other => Err(PyExc::type_error(format!(
            "return value of type '{}' is not supported",
            other.type_name()
        ))),
    }
}

fn seq_to_dynamic<'a>(items: impl Iterator<Item = &'a Value>) -> EvalResult<DynamicValue> {
    let converted: EvalResult<Vec<DynamicValue>> = items.map(value_to_dynamic).collect();
    Ok(DynamicValue::Seq(converted?))
}

/// Kwargs for the entry-point invocation, in the caller's key order.
pub fn input_to_kwargs(input: &BTreeMap<String, DynamicValue>) -> Vec<(String, Value)> {
    input
        .iter()
        .map(|(name, value)| (name.clone(), dynamic_to_value(value)))
        .collect()
}
