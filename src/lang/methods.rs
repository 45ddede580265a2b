//! Built-in methods on the container and text types.
//!
//! Attribute access without a call produces a bound method value, so
//! `push = out.append` works the way submission authors expect.

use std::rc::Rc;

use crate::lang::interp::Interp;
use crate::lang::ops;
use crate::lang::value::{
    is_hashable, py_eq, py_str, BoundMethod, Dict, EvalResult, ExcType, PyExc, Value,
};

fn attribute_error(recv: &Value, name: &str) -> PyExc {
    PyExc::new(
        ExcType::AttributeError,
        format!("'{}' object has no attribute '{}'", recv.type_name(), name),
    )
}

fn arity(type_name: &str, method: &str, args: &[Value], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        return Err(PyExc::type_error(format!(
            "{}.{}() takes {} argument{} ({} given)",
            type_name,
            method,
            if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            },
            if max == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "startswith",
    "endswith", "find", "index", "count", "isdigit", "isalpha", "format", "zfill",
];
const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "remove", "pop", "index", "count", "sort", "reverse", "clear",
    "copy",
];
const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "setdefault", "update", "clear", "copy",
];
const SET_METHODS: &[&str] = &[
    "add", "remove", "discard", "union", "intersection", "difference",
    "symmetric_difference", "clear", "copy",
];
const TUPLE_METHODS: &[&str] = &["index", "count"];
const BYTEARRAY_METHODS: &[&str] = &["append", "extend", "clear"];

fn method_exists(recv: &Value, name: &str) -> bool {
    let table: &[&str] = match recv {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) | Value::FrozenSet(_) => SET_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::ByteArray(_) => BYTEARRAY_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

/// Attribute access that is not immediately called.
pub fn bind_method(recv: &Value, name: &str) -> EvalResult<Value> {
    if method_exists(recv, name) {
        return Ok(Value::BoundMethod(Rc::new(BoundMethod {
            recv: recv.clone(),
            name: name.to_string(),
        })));
    }
    Err(attribute_error(recv, name))
}

pub fn call_method(
    interp: &mut Interp,
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    match recv {
        Value::Str(_) => str_method(recv, name, args, kwargs),
        Value::List(_) => list_method(interp, recv, name, args, kwargs),
        Value::Dict(_) => dict_method(recv, name, args, kwargs),
        Value::Set(_) | Value::FrozenSet(_) => set_method(recv, name, args, kwargs),
        Value::Tuple(_) => tuple_method(recv, name, args, kwargs),
        Value::ByteArray(_) => bytearray_method(recv, name, args, kwargs),
        _ => Err(attribute_error(recv, name)),
    }
}

fn reject_kwargs(type_name: &str, method: &str, kwargs: &[(String, Value)]) -> EvalResult<()> {
    if let Some((key, _)) = kwargs.first() {
        return Err(PyExc::type_error(format!(
            "{}.{}() got an unexpected keyword argument '{}'",
            type_name, method, key
        )));
    }
    Ok(())
}

fn str_arg<'a>(method: &str, value: &'a Value) -> EvalResult<&'a str> {
    match value {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(PyExc::type_error(format!(
            "{}() argument must be str, not {}",
            method,
            other.type_name()
        ))),
    }
}

fn str_method(
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let Value::Str(text) = recv else { unreachable!() };
    reject_kwargs("str", name, &kwargs)?;
    match name {
        "upper" => {
            arity("str", name, &args, 0, 0)?;
            Ok(Value::str(text.to_uppercase()))
        }
        "lower" => {
            arity("str", name, &args, 0, 0)?;
            Ok(Value::str(text.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            arity("str", name, &args, 0, 1)?;
            let result = match args.first() {
                None => match name {
                    "strip" => text.trim(),
                    "lstrip" => text.trim_start(),
                    _ => text.trim_end(),
                }
                .to_string(),
                Some(chars_value) => {
                    let chars: Vec<char> = str_arg(name, chars_value)?.chars().collect();
                    let matcher = |c: char| chars.contains(&c);
                    match name {
                        "strip" => text.trim_matches(matcher),
                        "lstrip" => text.trim_start_matches(matcher),
                        _ => text.trim_end_matches(matcher),
                    }
                    .to_string()
                }
            };
            Ok(Value::str(result))
        }
        "split" => {
            arity("str", name, &args, 0, 2)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => text
                    .split_whitespace()
                    .map(|p| Value::str(p.to_string()))
                    .collect(),
                Some(sep_value) => {
                    let sep = str_arg(name, sep_value)?;
                    if sep.is_empty() {
                        return Err(PyExc::value_error("empty separator"));
                    }
                    match args.get(1) {
                        None => text.split(sep).map(|p| Value::str(p.to_string())).collect(),
                        Some(Value::Int(max)) if *max >= 0 => text
                            .splitn(*max as usize + 1, sep)
                            .map(|p| Value::str(p.to_string()))
                            .collect(),
                        Some(Value::Int(_)) => {
                            text.split(sep).map(|p| Value::str(p.to_string())).collect()
                        }
                        Some(other) => {
                            return Err(PyExc::type_error(format!(
                                "'{}' object cannot be interpreted as an integer",
                                other.type_name()
                            )));
                        }
                    }
                }
            };
            Ok(Value::list(parts))
        }
        "join" => {
            arity("str", name, &args, 1, 1)?;
            let items = ops::iter_to_vec(&args[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(s) => parts.push(s.as_ref().clone()),
                    other => {
                        return Err(PyExc::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(Value::str(parts.join(text.as_str())))
        }
        "replace" => {
            arity("str", name, &args, 2, 2)?;
            let old = str_arg(name, &args[0])?;
            let new = str_arg(name, &args[1])?;
            Ok(Value::str(text.replace(old, new)))
        }
        "startswith" | "endswith" => {
            arity("str", name, &args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            let hit = if name == "startswith" {
                text.starts_with(needle)
            } else {
                text.ends_with(needle)
            };
            Ok(Value::Bool(hit))
        }
        "find" | "index" => {
            arity("str", name, &args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            match text.find(needle) {
                Some(byte_pos) => Ok(Value::Int(text[..byte_pos].chars().count() as i64)),
                None if name == "find" => Ok(Value::Int(-1)),
                None => Err(PyExc::value_error("substring not found")),
            }
        }
        "count" => {
            arity("str", name, &args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            if needle.is_empty() {
                return Ok(Value::Int(text.chars().count() as i64 + 1));
            }
            Ok(Value::Int(text.matches(needle).count() as i64))
        }
        "isdigit" => {
            arity("str", name, &args, 0, 0)?;
            Ok(Value::Bool(
                !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()),
            ))
        }
        "isalpha" => {
            arity("str", name, &args, 0, 0)?;
            Ok(Value::Bool(
                !text.is_empty() && text.chars().all(|c| c.is_alphabetic()),
            ))
        }
        "zfill" => {
            arity("str", name, &args, 1, 1)?;
            let Value::Int(width) = &args[0] else {
                return Err(PyExc::type_error("zfill() width must be an integer"));
            };
            let width = (*width).max(0) as usize;
            let current = text.chars().count();
            if current >= width {
                return Ok(recv.clone());
            }
            let pad = "0".repeat(width - current);
            let result = match text.strip_prefix('-') {
                Some(rest) => format!("-{}{}", pad, rest),
                None => format!("{}{}", pad, text),
            };
            Ok(Value::str(result))
        }
        "format" => {
            // Sequential and indexed placeholders only; format specs are
            // out of scope for the subset.
            let mut out = String::new();
            let mut chars = text.chars().peekable();
            let mut auto_index = 0usize;
            while let Some(c) = chars.next() {
                match c {
                    '{' if chars.peek() == Some(&'{') => {
                        chars.next();
                        out.push('{');
                    }
                    '}' if chars.peek() == Some(&'}') => {
                        chars.next();
                        out.push('}');
                    }
                    '{' => {
                        let mut field = String::new();
                        for inner in chars.by_ref() {
                            if inner == '}' {
                                break;
                            }
                            field.push(inner);
                        }
                        let index = if field.is_empty() {
                            let i = auto_index;
                            auto_index += 1;
                            i
                        } else {
                            field.parse::<usize>().map_err(|_| {
                                PyExc::value_error("only positional {} fields are supported")
                            })?
                        };
                        let value = args.get(index).ok_or_else(|| {
                            PyExc::new(
                                ExcType::IndexError,
                                "Replacement index out of range for positional args tuple",
                            )
                        })?;
                        out.push_str(&py_str(value));
                    }
                    other => out.push(other),
                }
            }
            Ok(Value::str(out))
        }
        _ => Err(attribute_error(recv, name)),
    }
}

fn list_method(
    interp: &mut Interp,
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let Value::List(items) = recv else { unreachable!() };
    match name {
        "append" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 1, 1)?;
            items.borrow_mut().push(args[0].clone());
            Ok(Value::None)
        }
        "extend" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 1, 1)?;
            let additions = ops::iter_to_vec(&args[0])?;
            items.borrow_mut().extend(additions);
            Ok(Value::None)
        }
        "insert" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 2, 2)?;
            let Value::Int(at) = &args[0] else {
                return Err(PyExc::type_error(
                    "'list.insert' index must be an integer",
                ));
            };
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let index = (*at).clamp(-len, len);
            let index = if index < 0 { index + len } else { index } as usize;
            let clamped_index = index.min(items.len());
            items.insert(clamped_index, args[1].clone());
            Ok(Value::None)
        }
        "remove" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 1, 1)?;
            let mut items = items.borrow_mut();
            match items.iter().position(|v| py_eq(v, &args[0])) {
                Some(index) => {
                    items.remove(index);
                    Ok(Value::None)
                }
                None => Err(PyExc::value_error("list.remove(x): x not in list")),
            }
        }
        "pop" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(PyExc::new(ExcType::IndexError, "pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match args.first() {
                None => len - 1,
                Some(Value::Int(i)) => *i,
                Some(other) => {
                    return Err(PyExc::type_error(format!(
                        "'{}' object cannot be interpreted as an integer",
                        other.type_name()
                    )));
                }
            };
            let index = if index < 0 { index + len } else { index };
            if index < 0 || index >= len {
                return Err(PyExc::new(ExcType::IndexError, "pop index out of range"));
            }
            Ok(items.remove(index as usize))
        }
        "index" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 1, 1)?;
            let items = items.borrow();
            items
                .iter()
                .position(|v| py_eq(v, &args[0]))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    PyExc::value_error(format!("{} is not in list", py_str(&args[0])))
                })
        }
        "count" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 1, 1)?;
            let count = items.borrow().iter().filter(|v| py_eq(v, &args[0])).count();
            Ok(Value::Int(count as i64))
        }
        "sort" => {
            arity("list", name, &args, 0, 0)?;
            let key_at = kwargs.iter().position(|(k, _)| k == "key");
            let key = key_at
                .map(|i| kwargs.remove(i).1)
                .filter(|v| !matches!(v, Value::None));
            let reverse_at = kwargs.iter().position(|(k, _)| k == "reverse");
            let reverse = reverse_at
                .map(|i| kwargs.remove(i).1.truthy())
                .unwrap_or(false);
            reject_kwargs("list", name, &kwargs)?;

            let snapshot = items.borrow().clone();
            let mut decorated = Vec::with_capacity(snapshot.len());
            for item in snapshot {
                let sort_key = match &key {
                    Some(f) => interp.call_callable(f, vec![item.clone()], Vec::new())?,
                    None => item.clone(),
                };
                decorated.push((sort_key, item));
            }
            let mut sorted = ops::sort_decorated(decorated)?;
            if reverse {
                sorted.reverse();
            }
            *items.borrow_mut() = sorted.into_iter().map(|(_, v)| v).collect();
            Ok(Value::None)
        }
        "reverse" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Value::None)
        }
        "clear" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 0, 0)?;
            items.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            reject_kwargs("list", name, &kwargs)?;
            arity("list", name, &args, 0, 0)?;
            let snapshot = items.borrow().clone();
            Ok(Value::list(snapshot))
        }
        _ => Err(attribute_error(recv, name)),
    }
}

fn dict_method(
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let Value::Dict(dict) = recv else { unreachable!() };
    reject_kwargs("dict", name, &kwargs)?;
    match name {
        "get" => {
            arity("dict", name, &args, 1, 2)?;
            let fallback = args.get(1).cloned().unwrap_or(Value::None);
            Ok(dict.borrow().get(&args[0]).unwrap_or(fallback))
        }
        "keys" => {
            arity("dict", name, &args, 0, 0)?;
            let keys = dict.borrow().entries.iter().map(|(k, _)| k.clone()).collect();
            Ok(Value::list(keys))
        }
        "values" => {
            arity("dict", name, &args, 0, 0)?;
            let values = dict.borrow().entries.iter().map(|(_, v)| v.clone()).collect();
            Ok(Value::list(values))
        }
        "items" => {
            arity("dict", name, &args, 0, 0)?;
            let items = dict
                .borrow()
                .entries
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                .collect();
            Ok(Value::list(items))
        }
        "pop" => {
            arity("dict", name, &args, 1, 2)?;
            match dict.borrow_mut().remove(&args[0]) {
                Some(value) => Ok(value),
                None => match args.get(1) {
                    Some(fallback) => Ok(fallback.clone()),
                    None => Err(PyExc::new(
                        ExcType::KeyError,
                        crate::lang::value::py_repr(&args[0]),
                    )),
                },
            }
        }
        "setdefault" => {
            arity("dict", name, &args, 1, 2)?;
            let mut dict = dict.borrow_mut();
            if let Some(existing) = dict.get(&args[0]) {
                return Ok(existing);
            }
            if !is_hashable(&args[0]) {
                return Err(PyExc::type_error(format!(
                    "unhashable type: '{}'",
                    args[0].type_name()
                )));
            }
            let fallback = args.get(1).cloned().unwrap_or(Value::None);
            dict.insert(args[0].clone(), fallback.clone());
            Ok(fallback)
        }
        "update" => {
            arity("dict", name, &args, 1, 1)?;
            let Value::Dict(other) = &args[0] else {
                return Err(PyExc::type_error(format!(
                    "dict.update() argument must be dict, not {}",
                    args[0].type_name()
                )));
            };
            let additions = other.borrow().entries.clone();
            let mut dict = dict.borrow_mut();
            for (key, value) in additions {
                dict.insert(key, value);
            }
            Ok(Value::None)
        }
        "clear" => {
            arity("dict", name, &args, 0, 0)?;
            dict.borrow_mut().entries.clear();
            Ok(Value::None)
        }
        "copy" => {
            arity("dict", name, &args, 0, 0)?;
            let mut copy = Dict::default();
            for (k, v) in &dict.borrow().entries {
                copy.insert(k.clone(), v.clone());
            }
            Ok(Value::dict(copy))
        }
        _ => Err(attribute_error(recv, name)),
    }
}

fn set_items_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Set(items) => items.borrow().clone(),
        Value::FrozenSet(items) => items.as_ref().clone(),
        _ => Vec::new(),
    }
}

/// Non-mutating set methods return the receiver's own type.
fn wrap_like(recv: &Value, items: Vec<Value>) -> Value {
    if matches!(recv, Value::FrozenSet(_)) {
        Value::FrozenSet(Rc::new(items))
    } else {
        Value::set(items)
    }
}

fn set_method(
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    reject_kwargs(recv.type_name(), name, &kwargs)?;
    let mutating = matches!(name, "add" | "remove" | "discard" | "clear");
    let items_cell = match recv {
        Value::Set(items) => Some(items),
        Value::FrozenSet(_) if mutating => {
            return Err(attribute_error(recv, name));
        }
        Value::FrozenSet(_) => None,
        _ => unreachable!(),
    };
    match name {
        "add" => {
            arity("set", name, &args, 1, 1)?;
            if !is_hashable(&args[0]) {
                return Err(PyExc::type_error(format!(
                    "unhashable type: '{}'",
                    args[0].type_name()
                )));
            }
            let items = items_cell.unwrap();
            let mut items = items.borrow_mut();
            if !items.iter().any(|v| py_eq(v, &args[0])) {
                items.push(args[0].clone());
            }
            Ok(Value::None)
        }
        "remove" | "discard" => {
            arity("set", name, &args, 1, 1)?;
            let items = items_cell.unwrap();
            let mut items = items.borrow_mut();
            match items.iter().position(|v| py_eq(v, &args[0])) {
                Some(index) => {
                    items.remove(index);
                    Ok(Value::None)
                }
                None if name == "discard" => Ok(Value::None),
                None => Err(PyExc::new(
                    ExcType::KeyError,
                    crate::lang::value::py_repr(&args[0]),
                )),
            }
        }
        "clear" => {
            arity("set", name, &args, 0, 0)?;
            items_cell.unwrap().borrow_mut().clear();
            Ok(Value::None)
        }
        "union" | "intersection" | "difference" | "symmetric_difference" => {
            arity("set", name, &args, 1, 1)?;
            let ours = set_items_of(recv);
            let theirs = ops::dedup_set_items(ops::iter_to_vec(&args[0])?)?;
            let result: Vec<Value> = match name {
                "union" => {
                    let mut out = ours;
                    for item in theirs {
                        if !out.iter().any(|v| py_eq(v, &item)) {
                            out.push(item);
                        }
                    }
                    out
                }
                "intersection" => ours
                    .into_iter()
                    .filter(|v| theirs.iter().any(|o| py_eq(o, v)))
                    .collect(),
                "symmetric_difference" => {
                    let mut out: Vec<Value> = ours
                        .iter()
                        .filter(|v| !theirs.iter().any(|o| py_eq(o, v)))
                        .cloned()
                        .collect();
                    for item in theirs {
                        if !ours.iter().any(|o| py_eq(o, &item)) {
                            out.push(item);
                        }
                    }
                    out
                }
                _ => ours
                    .into_iter()
                    .filter(|v| !theirs.iter().any(|o| py_eq(o, v)))
                    .collect(),
            };
            Ok(wrap_like(recv, result))
        }
        "copy" => {
            arity("set", name, &args, 0, 0)?;
            Ok(wrap_like(recv, set_items_of(recv)))
        }
        _ => Err(attribute_error(recv, name)),
    }
}

fn tuple_method(
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let Value::Tuple(items) = recv else { unreachable!() };
    reject_kwargs("tuple", name, &kwargs)?;
    match name {
        "index" => {
            arity("tuple", name, &args, 1, 1)?;
            items
                .iter()
                .position(|v| py_eq(v, &args[0]))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| PyExc::value_error("tuple.index(x): x not in tuple"))
        }
        "count" => {
            arity("tuple", name, &args, 1, 1)?;
            let count = items.iter().filter(|v| py_eq(v, &args[0])).count();
            Ok(Value::Int(count as i64))
        }
        _ => Err(attribute_error(recv, name)),
    }
}

fn bytearray_method(
    recv: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let Value::ByteArray(bytes) = recv else { unreachable!() };
    reject_kwargs("bytearray", name, &kwargs)?;
    let byte_of = |value: &Value| -> EvalResult<u8> {
        match value {
            Value::Int(i) if (0..=255).contains(i) => Ok(*i as u8),
            Value::Int(_) => Err(PyExc::value_error("byte must be in range(0, 256)")),
            other => Err(PyExc::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            ))),
        }
    };
    match name {
        "append" => {
            arity("bytearray", name, &args, 1, 1)?;
            let byte = byte_of(&args[0])?;
            bytes.borrow_mut().push(byte);
            Ok(Value::None)
        }
        "extend" => {
            arity("bytearray", name, &args, 1, 1)?;
            let additions = ops::iter_to_vec(&args[0])?;
            let mut out = Vec::with_capacity(additions.len());
            for item in &additions {
                out.push(byte_of(item)?);
            }
            bytes.borrow_mut().extend(out);
            Ok(Value::None)
        }
        "clear" => {
            arity("bytearray", name, &args, 0, 0)?;
            bytes.borrow_mut().clear();
            Ok(Value::None)
        }
        _ => Err(attribute_error(recv, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::interp::Interp;
    use crate::lang::parser::parse;
    use crate::lang::value::py_repr;

    fn run_expr(setup: &str, expr: &str) -> Value {
        let module = parse(&format!("{}\n__result__ = {}\n", setup, expr)).unwrap();
        let mut interp = Interp::new();
        interp.run_module(&module).unwrap();
        interp.global_lookup("__result__").unwrap()
    }

    fn assert_expr(setup: &str, expr: &str, expected: &Value) {
        let got = run_expr(setup, expr);
        assert!(
            py_eq(&got, expected),
            "{} => {}, expected {}",
            expr,
            py_repr(&got),
            py_repr(expected)
        );
    }

    #[test]
    fn string_methods() {
        assert_expr("", "'Hello'.upper()", &Value::str("HELLO"));
        assert_expr("", "'  x  '.strip()", &Value::str("x"));
        assert_expr(
            "",
            "'a,b,c'.split(',')",
            &Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")]),
        );
        assert_expr("", "'-'.join(['a', 'b'])", &Value::str("a-b"));
        assert_expr("", "'banana'.count('an')", &Value::Int(2));
        assert_expr("", "'banana'.find('na')", &Value::Int(2));
        assert_expr("", "'banana'.find('zz')", &Value::Int(-1));
        assert_expr("", "'abc'.startswith('ab')", &Value::Bool(true));
        assert_expr("", "'42'.isdigit()", &Value::Bool(true));
        assert_expr("", "'{} + {} = {}'.format(1, 2, 3)", &Value::str("1 + 2 = 3"));
        assert_expr("", "'7'.zfill(3)", &Value::str("007"));
    }

    #[test]
    fn list_methods_mutate_in_place() {
        assert_expr(
            "xs = [3, 1]\nxs.append(2)\nxs.sort()",
            "xs",
            &Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        assert_expr("xs = [1, 2, 3]\ny = xs.pop()", "(y, xs)", &Value::tuple(vec![
            Value::Int(3),
            Value::list(vec![Value::Int(1), Value::Int(2)]),
        ]));
        assert_expr(
            "xs = [5, 2]\nxs.sort(key=lambda v: -v)",
            "xs",
            &Value::list(vec![Value::Int(5), Value::Int(2)]),
        );
    }

    #[test]
    fn list_copy_is_independent() {
        assert_expr(
            "a = [1]\nb = a.copy()\nb.append(2)",
            "len(a)",
            &Value::Int(1),
        );
    }

    #[test]
    fn dict_methods() {
        assert_expr("d = {'a': 1}", "d.get('a')", &Value::Int(1));
        assert_expr("d = {'a': 1}", "d.get('b', 0)", &Value::Int(0));
        assert_expr(
            "d = {'a': 1, 'b': 2}",
            "d.keys()",
            &Value::list(vec![Value::str("a"), Value::str("b")]),
        );
        assert_expr(
            "d = {}\nd.setdefault('k', []).append(1)",
            "d['k']",
            &Value::list(vec![Value::Int(1)]),
        );
        assert_expr(
            "d = {'a': 1}\nd.update({'b': 2})",
            "len(d)",
            &Value::Int(2),
        );
    }

    #[test]
    fn missing_dict_pop_raises_key_error() {
        let module = parse("d = {}\nd.pop('missing')\n").unwrap();
        let mut interp = Interp::new();
        let exc = interp.run_module(&module).unwrap_err();
        assert_eq!(exc.ty, ExcType::KeyError);
    }

    #[test]
    fn set_methods() {
        assert_expr("s = {1, 2}\ns.add(3)\ns.add(2)", "len(s)", &Value::Int(3));
        assert_expr("s = {1, 2}\ns.discard(9)", "len(s)", &Value::Int(2));
        assert_expr(
            "a = {1, 2}\nb = {2, 3}",
            "a.union(b)",
            &Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        assert_expr(
            "a = {1, 2}\nb = {2, 3}",
            "a.intersection(b)",
            &Value::set(vec![Value::Int(2)]),
        );
        assert_expr(
            "a = {1, 2}\nb = {2, 3}",
            "a.symmetric_difference(b)",
            &Value::set(vec![Value::Int(1), Value::Int(3)]),
        );
    }

    #[test]
    fn frozenset_methods_return_frozensets() {
        let got = run_expr(
            "a = frozenset({1, 2})\nb = frozenset({2, 3})",
            "a.union(b)",
        );
        assert!(matches!(got, Value::FrozenSet(_)));
        assert!(py_eq(
            &got,
            &Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        ));
    }

    #[test]
    fn unknown_attribute_is_an_attribute_error() {
        let module = parse("x = [1]\nx.frobnicate()\n").unwrap();
        let mut interp = Interp::new();
        let exc = interp.run_module(&module).unwrap_err();
        assert_eq!(exc.ty, ExcType::AttributeError);
        assert!(exc.message.contains("frobnicate"));
    }

    #[test]
    fn bound_methods_can_be_stored_and_called() {
        assert_expr(
            "xs = []\npush = xs.append\npush(1)\npush(2)",
            "xs",
            &Value::list(vec![Value::Int(1), Value::Int(2)]),
        );
    }
}
