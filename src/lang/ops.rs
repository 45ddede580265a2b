//! Operator semantics over runtime values: arithmetic with the source
//! language's promotion and sign rules, membership, indexing and slicing,
//! and the iteration protocol.

use std::rc::Rc;

use crate::lang::ast::{BinOp, CmpOp, UnaryOp};
use crate::lang::value::{
    is_hashable, py_eq, py_lt, py_repr, range_len, Dict, EvalResult, ExcType, IterState, PyExc,
    Value,
};

/// Ceiling on eagerly materialized sequences. Anything bigger would only
/// die to the OOM killer and turn a per-test failure into a worker crash.
const MAX_MATERIALIZE: i64 = 10_000_000;

fn overflow() -> PyExc {
    PyExc::new(ExcType::OverflowError, "integer result too large")
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(if *b { 1 } else { 0 }),
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

fn as_complex(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Complex { re, im } => Some((*re, *im)),
        other => as_f64(other).map(|re| (re, 0.0)),
    }
}

fn bad_operands(op: BinOp, a: &Value, b: &Value) -> PyExc {
    PyExc::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        a.type_name(),
        b.type_name()
    ))
}

/// Floor division with the sign rules of the source language: the
/// quotient rounds toward negative infinity.
fn floor_div_i64(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(PyExc::new(
            ExcType::ZeroDivisionError,
            "integer division or modulo by zero",
        ));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder carrying the divisor's sign.
fn mod_i64(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(PyExc::new(
            ExcType::ZeroDivisionError,
            "integer division or modulo by zero",
        ));
    }
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn float_mod(a: f64, b: f64) -> EvalResult<f64> {
    if b == 0.0 {
        return Err(PyExc::new(ExcType::ZeroDivisionError, "float modulo"));
    }
    Ok(a - b * (a / b).floor())
}

fn repeat_seq<T: Clone>(items: &[T], count: i64) -> EvalResult<Vec<T>> {
    let count = count.max(0);
    if count.saturating_mul(items.len() as i64) > MAX_MATERIALIZE {
        return Err(overflow());
    }
    let mut out = Vec::with_capacity(items.len() * count as usize);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    Ok(out)
}

pub fn binary_op(op: BinOp, a: &Value, b: &Value) -> EvalResult<Value> {
    match op {
        BinOp::Add => add(a, b),
        BinOp::Sub => sub(a, b),
        BinOp::Mul => mul(a, b),
        BinOp::Div => div(a, b),
        BinOp::FloorDiv => floor_div(a, b),
        BinOp::Mod => modulo(a, b),
        BinOp::Pow => pow(a, b),
        BinOp::BitOr => bitwise(op, a, b, |x, y| x | y),
        BinOp::BitXor => bitwise(op, a, b, |x, y| x ^ y),
        BinOp::BitAnd => bitwise(op, a, b, |x, y| x & y),
        BinOp::Shl => shift(op, a, b, true),
        BinOp::Shr => shift(op, a, b, false),
    }
}

fn add(a: &Value, b: &Value) -> EvalResult<Value> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::str(format!("{}{}", x, y))),
        (Value::List(x), Value::List(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            let mut items = x.as_ref().clone();
            items.extend(y.iter().cloned());
            Ok(Value::tuple(items))
        }
        (Value::Bytes(x), Value::Bytes(y)) => {
            let mut bytes = x.as_ref().clone();
            bytes.extend_from_slice(y);
            Ok(Value::Bytes(Rc::new(bytes)))
        }
        _ => arith(BinOp::Add, a, b, i64::checked_add, |x, y| x + y),
    }
}

fn sub(a: &Value, b: &Value) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (set_like_items(a), set_like_items(b)) {
        let items = x
            .into_iter()
            .filter(|v| !y.iter().any(|other| py_eq(other, v)))
            .collect();
        return Ok(wrap_set_like(a, items));
    }
    arith(BinOp::Sub, a, b, i64::checked_sub, |x, y| x - y)
}

fn set_like_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Set(items) => Some(items.borrow().clone()),
        Value::FrozenSet(items) => Some(items.as_ref().clone()),
        _ => None,
    }
}

/// Set operations take the left operand's type.
fn wrap_set_like(left: &Value, items: Vec<Value>) -> Value {
    if matches!(left, Value::FrozenSet(_)) {
        Value::FrozenSet(Rc::new(items))
    } else {
        Value::set(items)
    }
}

fn arith(
    op: BinOp,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return int_op(x, y).map(Value::Int).ok_or_else(overflow);
    }
    if matches!(a, Value::Complex { .. }) || matches!(b, Value::Complex { .. }) {
        return complex_arith(op, a, b);
    }
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return Ok(Value::Float(float_op(x, y)));
    }
    Err(bad_operands(op, a, b))
}

fn complex_arith(op: BinOp, a: &Value, b: &Value) -> EvalResult<Value> {
    let (Some((ar, ai)), Some((br, bi))) = (as_complex(a), as_complex(b)) else {
        return Err(bad_operands(op, a, b));
    };
    let (re, im) = match op {
        BinOp::Add => (ar + br, ai + bi),
        BinOp::Sub => (ar - br, ai - bi),
        BinOp::Mul => (ar * br - ai * bi, ar * bi + ai * br),
        BinOp::Div => {
            let denom = br * br + bi * bi;
            if denom == 0.0 {
                return Err(PyExc::new(ExcType::ZeroDivisionError, "complex division by zero"));
            }
            ((ar * br + ai * bi) / denom, (ai * br - ar * bi) / denom)
        }
        _ => return Err(bad_operands(op, a, b)),
    };
    Ok(Value::Complex { re, im })
}

fn mul(a: &Value, b: &Value) -> EvalResult<Value> {
    match (a, b) {
        (Value::Str(s), n) | (n, Value::Str(s)) if as_int(n).is_some() => {
            let count = as_int(n).unwrap().max(0);
            if count.saturating_mul(s.chars().count() as i64) > MAX_MATERIALIZE {
                return Err(overflow());
            }
            Ok(Value::str(s.repeat(count as usize)))
        }
        (Value::List(items), n) | (n, Value::List(items)) if as_int(n).is_some() => {
            Ok(Value::list(repeat_seq(&items.borrow(), as_int(n).unwrap())?))
        }
        (Value::Tuple(items), n) | (n, Value::Tuple(items)) if as_int(n).is_some() => {
            Ok(Value::tuple(repeat_seq(items, as_int(n).unwrap())?))
        }
        (Value::Bytes(bytes), n) | (n, Value::Bytes(bytes)) if as_int(n).is_some() => {
            Ok(Value::Bytes(Rc::new(repeat_seq(bytes, as_int(n).unwrap())?)))
        }
        _ => arith(BinOp::Mul, a, b, i64::checked_mul, |x, y| x * y),
    }
}

fn div(a: &Value, b: &Value) -> EvalResult<Value> {
    if matches!(a, Value::Complex { .. }) || matches!(b, Value::Complex { .. }) {
        return complex_arith(BinOp::Div, a, b);
    }
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return Err(bad_operands(BinOp::Div, a, b));
    };
    if y == 0.0 {
        return Err(PyExc::new(ExcType::ZeroDivisionError, "division by zero"));
    }
    Ok(Value::Float(x / y))
}

fn floor_div(a: &Value, b: &Value) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return floor_div_i64(x, y).map(Value::Int);
    }
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return Err(bad_operands(BinOp::FloorDiv, a, b));
    };
    if y == 0.0 {
        return Err(PyExc::new(ExcType::ZeroDivisionError, "float floor division by zero"));
    }
    Ok(Value::Float((x / y).floor()))
}

fn modulo(a: &Value, b: &Value) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return mod_i64(x, y).map(Value::Int);
    }
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return Err(bad_operands(BinOp::Mod, a, b));
    };
    float_mod(x, y).map(Value::Float)
}

fn pow(a: &Value, b: &Value) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        if y >= 0 {
            let exp = u32::try_from(y).map_err(|_| overflow())?;
            return x.checked_pow(exp).map(Value::Int).ok_or_else(overflow);
        }
        if x == 0 {
            return Err(PyExc::new(
                ExcType::ZeroDivisionError,
                "0.0 cannot be raised to a negative power",
            ));
        }
        return Ok(Value::Float((x as f64).powi(y as i32)));
    }
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return Err(bad_operands(BinOp::Pow, a, b));
    };
    Ok(Value::Float(x.powf(y)))
}

fn bitwise(op: BinOp, a: &Value, b: &Value, f: fn(i64, i64) -> i64) -> EvalResult<Value> {
    if let (Some(x), Some(y)) = (set_like_items(a), set_like_items(b)) {
        let items = match op {
            BinOp::BitOr => {
                let mut out = x;
                for item in y {
                    if !out.iter().any(|existing| py_eq(existing, &item)) {
                        out.push(item);
                    }
                }
                out
            }
            BinOp::BitAnd => x
                .into_iter()
                .filter(|item| y.iter().any(|other| py_eq(other, item)))
                .collect(),
            BinOp::BitXor => {
                let mut out: Vec<Value> = x
                    .iter()
                    .filter(|item| !y.iter().any(|other| py_eq(other, item)))
                    .cloned()
                    .collect();
                for item in y {
                    if !x.iter().any(|other| py_eq(other, &item)) {
                        out.push(item);
                    }
                }
                out
            }
            _ => return Err(bad_operands(op, a, b)),
        };
        return Ok(wrap_set_like(a, items));
    }
    let (Some(x), Some(y)) = (as_int(a), as_int(b)) else {
        return Err(bad_operands(op, a, b));
    };
    Ok(Value::Int(f(x, y)))
}

fn shift(op: BinOp, a: &Value, b: &Value, left: bool) -> EvalResult<Value> {
    let (Some(x), Some(y)) = (as_int(a), as_int(b)) else {
        return Err(bad_operands(op, a, b));
    };
    if y < 0 {
        return Err(PyExc::value_error("negative shift count"));
    }
    if left {
        if y >= 63 {
            return Err(overflow());
        }
        x.checked_shl(y as u32).map(Value::Int).ok_or_else(overflow)
    } else {
        Ok(Value::Int(if y >= 63 {
            if x < 0 { -1 } else { 0 }
        } else {
            x >> y
        }))
    }
}

pub fn unary_op(op: UnaryOp, v: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
        UnaryOp::Neg => match v {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
            Value::Bool(b) => Ok(Value::Int(if *b { -1 } else { 0 })),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Complex { re, im } => Ok(Value::Complex { re: -re, im: -im }),
            _ => Err(PyExc::type_error(format!(
                "bad operand type for unary -: '{}'",
                v.type_name()
            ))),
        },
        UnaryOp::Pos => match v {
            Value::Int(_) | Value::Float(_) | Value::Complex { .. } => Ok(v.clone()),
            Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
            _ => Err(PyExc::type_error(format!(
                "bad operand type for unary +: '{}'",
                v.type_name()
            ))),
        },
        UnaryOp::Invert => match as_int(v) {
            Some(i) => Ok(Value::Int(!i)),
            None => Err(PyExc::type_error(format!(
                "bad operand type for unary ~: '{}'",
                v.type_name()
            ))),
        },
    }
}

pub fn compare_op(op: CmpOp, a: &Value, b: &Value) -> EvalResult<bool> {
    match op {
        CmpOp::Eq => Ok(py_eq(a, b)),
        CmpOp::NotEq => Ok(!py_eq(a, b)),
        CmpOp::Lt => py_lt(a, b),
        CmpOp::Gt => py_lt(b, a),
        CmpOp::LtE => py_lt(b, a).map(|gt| !gt),
        CmpOp::GtE => py_lt(a, b).map(|lt| !lt),
        CmpOp::In => contains(b, a),
        CmpOp::NotIn => contains(b, a).map(|c| !c),
        CmpOp::Is => Ok(a.is_same(b)),
        CmpOp::IsNot => Ok(!a.is_same(b)),
    }
}

/// Membership: `needle in haystack`.
pub fn contains(haystack: &Value, needle: &Value) -> EvalResult<bool> {
    match haystack {
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(s.contains(sub.as_str())),
            _ => Err(PyExc::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                needle.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|v| py_eq(v, needle))),
        Value::Tuple(items) => Ok(items.iter().any(|v| py_eq(v, needle))),
        Value::Set(items) => Ok(items.borrow().iter().any(|v| py_eq(v, needle))),
        Value::FrozenSet(items) => Ok(items.iter().any(|v| py_eq(v, needle))),
        Value::Dict(d) => Ok(d.borrow().contains(needle)),
        Value::Range { start, stop, step } => match needle {
            Value::Int(i) => {
                let hit = if *step > 0 {
                    *i >= *start && *i < *stop && (*i - *start) % *step == 0
                } else {
                    *i <= *start && *i > *stop && (*start - *i) % (-*step) == 0
                };
                Ok(hit)
            }
            _ => Ok(false),
        },
        Value::Bytes(bytes) => match needle {
            Value::Int(i) => Ok((0..=255).contains(i) && bytes.contains(&(*i as u8))),
            _ => Err(PyExc::type_error("a bytes-like object is required")),
        },
        _ => Err(PyExc::type_error(format!(
            "argument of type '{}' is not iterable",
            haystack.type_name()
        ))),
    }
}

/// Normalize a possibly negative index against a length; error text is
/// supplied by the caller so lists and strings keep their own phrasing.
fn normalize_index(i: i64, len: usize, what: &str) -> EvalResult<usize> {
    let len = len as i64;
    let idx = if i < 0 { i + len } else { i };
    if idx < 0 || idx >= len {
        return Err(PyExc::new(ExcType::IndexError, format!("{} index out of range", what)));
    }
    Ok(idx as usize)
}

fn index_as_int(index: &Value, container: &Value) -> EvalResult<i64> {
    as_int(index).ok_or_else(|| {
        PyExc::type_error(format!(
            "{} indices must be integers, not {}",
            container.type_name(),
            index.type_name()
        ))
    })
}

pub fn get_index(obj: &Value, index: &Value) -> EvalResult<Value> {
    match obj {
        Value::List(items) => {
            let items = items.borrow();
            let i = normalize_index(index_as_int(index, obj)?, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Tuple(items) => {
            let i = normalize_index(index_as_int(index, obj)?, items.len(), "tuple")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(index_as_int(index, obj)?, chars.len(), "string")?;
            Ok(Value::str(chars[i].to_string()))
        }
        Value::Bytes(bytes) => {
            let i = normalize_index(index_as_int(index, obj)?, bytes.len(), "index")?;
            Ok(Value::Int(bytes[i] as i64))
        }
        Value::ByteArray(bytes) => {
            let bytes = bytes.borrow();
            let i = normalize_index(index_as_int(index, obj)?, bytes.len(), "bytearray")?;
            Ok(Value::Int(bytes[i] as i64))
        }
        Value::Range { start, stop, step } => {
            let len = range_len(*start, *stop, *step);
            let i = normalize_index(index_as_int(index, obj)?, len as usize, "range")?;
            Ok(Value::Int(start + (i as i64) * step))
        }
        Value::Dict(d) => d
            .borrow()
            .get(index)
            .ok_or_else(|| PyExc::new(ExcType::KeyError, py_repr(index))),
        _ => Err(PyExc::type_error(format!(
            "'{}' object is not subscriptable",
            obj.type_name()
        ))),
    }
}

pub fn set_index(obj: &Value, index: Value, value: Value) -> EvalResult<()> {
    match obj {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let i = as_int(&index).ok_or_else(|| {
                PyExc::type_error(format!(
                    "list indices must be integers, not {}",
                    index.type_name()
                ))
            })?;
            let i = normalize_index(i, len, "list assignment")?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(d) => {
            if !is_hashable(&index) {
                return Err(PyExc::type_error(format!(
                    "unhashable type: '{}'",
                    index.type_name()
                )));
            }
            d.borrow_mut().insert(index, value);
            Ok(())
        }
        Value::ByteArray(bytes) => {
            let mut bytes = bytes.borrow_mut();
            let len = bytes.len();
            let i = normalize_index(index_as_int(&index, obj)?, len, "bytearray")?;
            let byte = as_int(&value)
                .filter(|v| (0..=255).contains(v))
                .ok_or_else(|| PyExc::value_error("byte must be in range(0, 256)"))?;
            bytes[i] = byte as u8;
            Ok(())
        }
        _ => Err(PyExc::type_error(format!(
            "'{}' object does not support item assignment",
            obj.type_name()
        ))),
    }
}

/// Slice bounds computation shared by every sliceable type.
fn slice_indices(
    len: i64,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> EvalResult<(i64, i64, i64)> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(PyExc::value_error("slice step cannot be zero"));
    }
    let clamp = |v: i64, lo: i64, hi: i64| v.max(lo).min(hi);
    let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let resolve = |v: Option<i64>, default: i64| -> i64 {
        match v {
            None => default,
            Some(v) if v < 0 => {
                if step > 0 {
                    clamp(v + len, 0, len)
                } else {
                    clamp(v + len, -1, len - 1)
                }
            }
            Some(v) => {
                if step > 0 {
                    clamp(v, 0, len)
                } else {
                    clamp(v, -1, len - 1)
                }
            }
        }
    };
    Ok((resolve(start, default_start), resolve(stop, default_stop), step))
}

fn slice_positions(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> EvalResult<Vec<usize>> {
    let (mut i, stop, step) = slice_indices(len as i64, start, stop, step)?;
    let mut out = Vec::new();
    if step > 0 {
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

pub fn get_slice(
    obj: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> EvalResult<Value> {
    match obj {
        Value::List(items) => {
            let items = items.borrow();
            let picked = slice_positions(items.len(), start, stop, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Value::list(picked))
        }
        Value::Tuple(items) => {
            let picked = slice_positions(items.len(), start, stop, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Value::tuple(picked))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked: String = slice_positions(chars.len(), start, stop, step)?
                .into_iter()
                .map(|i| chars[i])
                .collect();
            Ok(Value::str(picked))
        }
        Value::Bytes(bytes) => {
            let picked: Vec<u8> = slice_positions(bytes.len(), start, stop, step)?
                .into_iter()
                .map(|i| bytes[i])
                .collect();
            Ok(Value::Bytes(Rc::new(picked)))
        }
        Value::Range {
            start: rs,
            stop: rstop,
            step: rstep,
        } => {
            let len = range_len(*rs, *rstop, *rstep);
            let items = slice_positions(len as usize, start, stop, step)?
                .into_iter()
                .map(|i| Value::Int(rs + (i as i64) * rstep))
                .collect();
            Ok(Value::list(items))
        }
        _ => Err(PyExc::type_error(format!(
            "'{}' object is not subscriptable",
            obj.type_name()
        ))),
    }
}

/// Fresh iteration state over a value. `Iterator` values are handled by
/// the caller, which shares the existing state instead.
pub fn make_iter(value: &Value) -> EvalResult<IterState> {
    let items = match value {
        Value::Range { start, stop, step } => {
            return Ok(IterState::Range {
                next: *start,
                stop: *stop,
                step: *step,
            });
        }
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.as_ref().clone(),
        Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        Value::Bytes(bytes) => bytes.iter().map(|&b| Value::Int(b as i64)).collect(),
        Value::ByteArray(bytes) => bytes.borrow().iter().map(|&b| Value::Int(b as i64)).collect(),
        Value::Set(items) => items.borrow().clone(),
        Value::FrozenSet(items) => items.as_ref().clone(),
        Value::Dict(d) => d.borrow().entries.iter().map(|(k, _)| k.clone()).collect(),
        _ => {
            return Err(PyExc::type_error(format!(
                "'{}' object is not iterable",
                value.type_name()
            )));
        }
    };
    Ok(IterState::Seq { items, pos: 0 })
}

/// Materialize any iterable into a vector, bounded by `MAX_MATERIALIZE`.
pub fn iter_to_vec(value: &Value) -> EvalResult<Vec<Value>> {
    if let Value::Iterator(state) = value {
        let mut out = Vec::new();
        let mut state = state.borrow_mut();
        while let Some(item) = state.next_item() {
            if out.len() as i64 >= MAX_MATERIALIZE {
                return Err(overflow());
            }
            out.push(item);
        }
        return Ok(out);
    }
    if let Value::Range { start, stop, step } = value {
        if range_len(*start, *stop, *step) > MAX_MATERIALIZE {
            return Err(overflow());
        }
    }
    let mut state = make_iter(value)?;
    let mut out = Vec::new();
    while let Some(item) = state.next_item() {
        out.push(item);
    }
    Ok(out)
}

/// Dedup under `py_eq`, keeping first occurrence; used by set displays
/// and constructors.
pub fn dedup_set_items(items: Vec<Value>) -> EvalResult<Vec<Value>> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !is_hashable(&item) {
            return Err(PyExc::type_error(format!(
                "unhashable type: '{}'",
                item.type_name()
            )));
        }
        if !out.iter().any(|existing| py_eq(existing, &item)) {
            out.push(item);
        }
    }
    Ok(out)
}

/// Stable merge sort on (key, item) pairs, threading comparator errors
/// out so an unorderable pair aborts cleanly. Shared by `sorted()` and
/// `list.sort()`.
pub fn sort_decorated(items: Vec<(Value, Value)>) -> EvalResult<Vec<(Value, Value)>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mid = items.len() / 2;
    let mut right = items;
    let left = sort_decorated(right.drain(..mid).collect())?;
    let right = sort_decorated(right)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut li, mut ri) = (0, 0);
    while li < left.len() && ri < right.len() {
        // Take from the right only when strictly smaller: stability.
        if py_lt(&right[ri].0, &left[li].0)? {
            merged.push(right[ri].clone());
            ri += 1;
        } else {
            merged.push(left[li].clone());
            li += 1;
        }
    }
    merged.extend_from_slice(&left[li..]);
    merged.extend_from_slice(&right[ri..]);
    Ok(merged)
}

pub fn build_dict(pairs: Vec<(Value, Value)>) -> EvalResult<Dict> {
    let mut dict = Dict::default();
    for (key, value) in pairs {
        if !is_hashable(&key) {
            return Err(PyExc::type_error(format!(
                "unhashable type: '{}'",
                key.type_name()
            )));
        }
        dict.insert(key, value);
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_always_produces_float() {
        let v = binary_op(BinOp::Div, &Value::Int(7), &Value::Int(2)).unwrap();
        assert!(py_eq(&v, &Value::Float(3.5)));
    }

    #[test]
    fn division_by_zero_raises() {
        let err = binary_op(BinOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.ty, ExcType::ZeroDivisionError);
        assert_eq!(err.message, "division by zero");
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        let cases = [(-7, 2, -4), (7, -2, -4), (7, 2, 3), (-7, -2, 3)];
        for (a, b, want) in cases {
            let v = binary_op(BinOp::FloorDiv, &Value::Int(a), &Value::Int(b)).unwrap();
            assert!(py_eq(&v, &Value::Int(want)), "{} // {}", a, b);
        }
    }

    #[test]
    fn modulo_takes_the_divisor_sign() {
        let v = binary_op(BinOp::Mod, &Value::Int(-7), &Value::Int(3)).unwrap();
        assert!(py_eq(&v, &Value::Int(2)));
        let v = binary_op(BinOp::Mod, &Value::Int(7), &Value::Int(-3)).unwrap();
        assert!(py_eq(&v, &Value::Int(-2)));
    }

    #[test]
    fn integer_overflow_is_an_error_not_a_wrap() {
        let err = binary_op(BinOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)).unwrap_err();
        assert_eq!(err.ty, ExcType::OverflowError);
    }

    #[test]
    fn sequence_concat_and_repeat() {
        let v = binary_op(BinOp::Add, &Value::str("ab"), &Value::str("cd")).unwrap();
        assert!(py_eq(&v, &Value::str("abcd")));

        let v = binary_op(BinOp::Mul, &Value::str("ab"), &Value::Int(3)).unwrap();
        assert!(py_eq(&v, &Value::str("ababab")));

        let v = binary_op(
            BinOp::Add,
            &Value::list(vec![Value::Int(1)]),
            &Value::list(vec![Value::Int(2)]),
        )
        .unwrap();
        assert!(py_eq(&v, &Value::list(vec![Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let v = get_index(&list, &Value::Int(-1)).unwrap();
        assert!(py_eq(&v, &Value::Int(3)));
    }

    #[test]
    fn out_of_range_index_raises_index_error() {
        let list = Value::list(vec![Value::Int(1)]);
        let err = get_index(&list, &Value::Int(5)).unwrap_err();
        assert_eq!(err.ty, ExcType::IndexError);
        assert_eq!(err.message, "list index out of range");
    }

    #[test]
    fn missing_dict_key_raises_key_error_with_repr() {
        let dict = Value::dict(Dict::default());
        let err = get_index(&dict, &Value::str("missing")).unwrap_err();
        assert_eq!(err.ty, ExcType::KeyError);
        assert_eq!(err.message, "'missing'");
    }

    #[test]
    fn slices_follow_source_language_rules() {
        let list = Value::list((1..=5).map(Value::Int).collect());
        let v = get_slice(&list, Some(1), Some(3), None).unwrap();
        assert!(py_eq(&v, &Value::list(vec![Value::Int(2), Value::Int(3)])));

        let v = get_slice(&list, None, None, Some(-1)).unwrap();
        assert!(py_eq(
            &v,
            &Value::list((1..=5).rev().map(Value::Int).collect())
        ));

        let v = get_slice(&Value::str("hello"), None, None, Some(2)).unwrap();
        assert!(py_eq(&v, &Value::str("hlo")));

        let err = get_slice(&list, None, None, Some(0)).unwrap_err();
        assert_eq!(err.ty, ExcType::ValueError);
    }

    #[test]
    fn membership_covers_the_container_types() {
        let list = Value::list(vec![Value::Int(2)]);
        assert!(contains(&list, &Value::Int(2)).unwrap());
        assert!(contains(&Value::str("hello"), &Value::str("ell")).unwrap());
        let range = Value::Range { start: 0, stop: 10, step: 2 };
        assert!(contains(&range, &Value::Int(4)).unwrap());
        assert!(!contains(&range, &Value::Int(5)).unwrap());
        assert!(contains(&Value::Int(3), &Value::Int(3)).is_err());
    }

    #[test]
    fn range_iteration_is_lazy_and_bounded_materialization_errors() {
        let huge = Value::Range { start: 0, stop: i64::MAX, step: 1 };
        assert!(make_iter(&huge).is_ok());
        assert!(iter_to_vec(&huge).is_err());
    }

    #[test]
    fn set_operators_work_across_set_and_frozenset() {
        let a = Value::set(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::set(vec![Value::Int(2), Value::Int(3)]);

        let union = binary_op(BinOp::BitOr, &a, &b).unwrap();
        assert!(py_eq(
            &union,
            &Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        ));

        let both = binary_op(BinOp::BitAnd, &a, &b).unwrap();
        assert!(py_eq(&both, &Value::set(vec![Value::Int(2)])));

        let either = binary_op(BinOp::BitXor, &a, &b).unwrap();
        assert!(py_eq(
            &either,
            &Value::set(vec![Value::Int(1), Value::Int(3)])
        ));

        let diff = binary_op(BinOp::Sub, &a, &b).unwrap();
        assert!(py_eq(&diff, &Value::set(vec![Value::Int(1)])));

        let frozen_a = Value::FrozenSet(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        let frozen_b = Value::FrozenSet(Rc::new(vec![Value::Int(2), Value::Int(3)]));
        let union = binary_op(BinOp::BitOr, &frozen_a, &frozen_b).unwrap();
        assert!(matches!(union, Value::FrozenSet(_)));
        assert!(py_eq(
            &union,
            &Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        ));

        // Mixed operands take the left side's type.
        let mixed = binary_op(BinOp::BitXor, &frozen_a, &b).unwrap();
        assert!(matches!(mixed, Value::FrozenSet(_)));
        assert!(py_eq(
            &mixed,
            &Value::set(vec![Value::Int(1), Value::Int(3)])
        ));
    }

    #[test]
    fn shift_semantics() {
        let v = binary_op(BinOp::Shl, &Value::Int(1), &Value::Int(4)).unwrap();
        assert!(py_eq(&v, &Value::Int(16)));
        let err = binary_op(BinOp::Shl, &Value::Int(1), &Value::Int(-1)).unwrap_err();
        assert_eq!(err.ty, ExcType::ValueError);
    }
}
