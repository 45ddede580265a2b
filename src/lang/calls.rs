//! Invocation semantics for whitelisted builtins and type constructors.

use std::rc::Rc;

use crate::lang::builtins::Builtin;
use crate::lang::interp::Interp;
use crate::lang::ops;
use crate::lang::value::{
    is_hashable, py_lt, py_repr, py_str, range_len, ClassType, Dict, EvalResult, ExcType,
    IterState, PyExc, Value,
};

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("exactly {}", min)
        } else {
            format!("from {} to {}", min, max)
        };
        return Err(PyExc::type_error(format!(
            "{}() takes {} arguments ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn no_kwargs(name: &str, kwargs: &[(String, Value)]) -> EvalResult<()> {
    if let Some((key, _)) = kwargs.first() {
        return Err(PyExc::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            name, key
        )));
    }
    Ok(())
}

fn take_kwarg(kwargs: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let index = kwargs.iter().position(|(k, _)| k == name)?;
    Some(kwargs.remove(index).1)
}

fn as_int_arg(name: &str, value: &Value) -> EvalResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        other => Err(PyExc::type_error(format!(
            "'{}' object cannot be interpreted as an integer (in {}())",
            other.type_name(),
            name
        ))),
    }
}

pub fn call_builtin(
    interp: &mut Interp,
    builtin: Builtin,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let name = builtin.name();
    match builtin {
        Builtin::Abs => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| PyExc::new(ExcType::OverflowError, "integer result too large")),
                Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                Value::Complex { re, im } => Ok(Value::Float(re.hypot(*im))),
                other => Err(PyExc::type_error(format!(
                    "bad operand type for abs(): '{}'",
                    other.type_name()
                ))),
            }
        }
        Builtin::All | Builtin::Any => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            let state = interp.iter_state_of(&args[0])?;
            let want_any = builtin == Builtin::Any;
            loop {
                let item = state.borrow_mut().next_item();
                let Some(item) = item else { break };
                if item.truthy() == want_any {
                    return Ok(Value::Bool(want_any));
                }
            }
            Ok(Value::Bool(!want_any))
        }
        Builtin::Bin | Builtin::Hex | Builtin::Oct => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            let v = as_int_arg(name, &args[0])?;
            let sign = if v < 0 { "-" } else { "" };
            let magnitude = v.unsigned_abs();
            let text = match builtin {
                Builtin::Bin => format!("{}0b{:b}", sign, magnitude),
                Builtin::Hex => format!("{}0x{:x}", sign, magnitude),
                _ => format!("{}0o{:o}", sign, magnitude),
            };
            Ok(Value::str(text))
        }
        Builtin::Chr => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            let code = as_int_arg(name, &args[0])?;
            let c = u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| PyExc::value_error("chr() arg not in range(0x110000)"))?;
            Ok(Value::str(c.to_string()))
        }
        Builtin::Ord => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(s) if s.chars().count() == 1 => {
                    Ok(Value::Int(s.chars().next().unwrap() as i64))
                }
                Value::Str(s) => Err(PyExc::type_error(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                ))),
                other => Err(PyExc::type_error(format!(
                    "ord() expected string of length 1, but {} found",
                    other.type_name()
                ))),
            }
        }
        Builtin::Divmod => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 2, 2)?;
            let quotient = ops::binary_op(crate::lang::ast::BinOp::FloorDiv, &args[0], &args[1])?;
            let remainder = ops::binary_op(crate::lang::ast::BinOp::Mod, &args[0], &args[1])?;
            Ok(Value::tuple(vec![quotient, remainder]))
        }
        Builtin::Enumerate => {
            let start = match take_kwarg(&mut kwargs, "start") {
                Some(v) => as_int_arg(name, &v)?,
                None => {
                    if args.len() == 2 {
                        as_int_arg(name, &args[1])?
                    } else {
                        0
                    }
                }
            };
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 2)?;
            let items = ops::iter_to_vec(&args[0])?;
            let numbered = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Value::tuple(vec![Value::Int(start + i as i64), item]))
                .collect();
            Ok(iterator_over(numbered))
        }
        Builtin::Filter => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 2, 2)?;
            let items = ops::iter_to_vec(&args[1])?;
            let mut kept = Vec::new();
            for item in items {
                let keep = match &args[0] {
                    Value::None => item.truthy(),
                    func => interp.call_callable(func, vec![item.clone()], Vec::new())?.truthy(),
                };
                if keep {
                    kept.push(item);
                }
            }
            Ok(iterator_over(kept))
        }
        Builtin::Format => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 2)?;
            let spec = match args.get(1) {
                None => String::new(),
                Some(Value::Str(s)) => s.as_ref().clone(),
                Some(other) => {
                    return Err(PyExc::type_error(format!(
                        "format() argument 2 must be str, not {}",
                        other.type_name()
                    )));
                }
            };
            format_value(&args[0], &spec).map(Value::str)
        }
        Builtin::Hash => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            py_hash(&args[0]).map(Value::Int)
        }
        Builtin::Id => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            Ok(Value::Int(object_id(&args[0])))
        }
        Builtin::Isinstance => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 2, 2)?;
            class_check(&args[1], "isinstance() arg 2", |class| {
                value_matches_class(&args[0], class)
            })
            .map(Value::Bool)
        }
        Builtin::Issubclass => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 2, 2)?;
            let Value::Class(sub) = &args[0] else {
                return Err(PyExc::type_error("issubclass() arg 1 must be a class"));
            };
            class_check(&args[1], "issubclass() arg 2", |class| {
                is_subclass(*sub, class)
            })
            .map(Value::Bool)
        }
        Builtin::Iter => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            Ok(Value::Iterator(interp.iter_state_of(&args[0])?))
        }
        Builtin::Len => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count() as i64,
                Value::Bytes(b) => b.len() as i64,
                Value::ByteArray(b) => b.borrow().len() as i64,
                Value::List(items) => items.borrow().len() as i64,
                Value::Tuple(items) => items.len() as i64,
                Value::Set(items) => items.borrow().len() as i64,
                Value::FrozenSet(items) => items.len() as i64,
                Value::Dict(d) => d.borrow().len() as i64,
                Value::Range { start, stop, step } => range_len(*start, *stop, *step),
                other => {
                    return Err(PyExc::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::Int(len))
        }
        Builtin::Map => {
            no_kwargs(name, &kwargs)?;
            if args.len() < 2 {
                return Err(PyExc::type_error("map() must have at least two arguments."));
            }
            let mut columns = Vec::with_capacity(args.len() - 1);
            for iterable in &args[1..] {
                columns.push(ops::iter_to_vec(iterable)?);
            }
            let shortest = columns.iter().map(|c| c.len()).min().unwrap_or(0);
            let mut mapped = Vec::with_capacity(shortest);
            for row in 0..shortest {
                let call_args: Vec<Value> =
                    columns.iter().map(|c| c[row].clone()).collect();
                mapped.push(interp.call_callable(&args[0], call_args, Vec::new())?);
            }
            Ok(iterator_over(mapped))
        }
        Builtin::Max | Builtin::Min => {
            let key = take_kwarg(&mut kwargs, "key").filter(|v| !matches!(v, Value::None));
            let default = take_kwarg(&mut kwargs, "default");
            no_kwargs(name, &kwargs)?;
            if args.is_empty() {
                return Err(PyExc::type_error(format!(
                    "{}() expected at least 1 argument, got 0",
                    name
                )));
            }
            let items = if args.len() == 1 {
                ops::iter_to_vec(&args[0])?
            } else {
                args.clone()
            };
            if items.is_empty() {
                return match default {
                    Some(value) => Ok(value),
                    None => Err(PyExc::value_error(format!(
                        "{}() arg is an empty sequence",
                        name
                    ))),
                };
            }
            let want_max = builtin == Builtin::Max;
            let mut best = items[0].clone();
            let mut best_key = match &key {
                Some(f) => interp.call_callable(f, vec![best.clone()], Vec::new())?,
                None => best.clone(),
            };
            for item in &items[1..] {
                let item_key = match &key {
                    Some(f) => interp.call_callable(f, vec![item.clone()], Vec::new())?,
                    None => item.clone(),
                };
                let beats = if want_max {
                    py_lt(&best_key, &item_key)?
                } else {
                    py_lt(&item_key, &best_key)?
                };
                if beats {
                    best = item.clone();
                    best_key = item_key;
                }
            }
            Ok(best)
        }
        Builtin::Next => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 2)?;
            let Value::Iterator(state) = &args[0] else {
                return Err(PyExc::type_error(format!(
                    "'{}' object is not an iterator",
                    args[0].type_name()
                )));
            };
            let item = state.borrow_mut().next_item();
            match item {
                Some(item) => Ok(item),
                None => match args.get(1) {
                    Some(default) => Ok(default.clone()),
                    None => Err(PyExc::new(ExcType::StopIteration, "")),
                },
            }
        }
        Builtin::Pow => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 2, 3)?;
            match args.get(2) {
                None => ops::binary_op(crate::lang::ast::BinOp::Pow, &args[0], &args[1]),
                Some(modulus) => {
                    let (Value::Int(base), Value::Int(exp), Value::Int(modulus)) =
                        (&args[0], &args[1], modulus)
                    else {
                        return Err(PyExc::type_error(
                            "pow() 3rd argument not allowed unless all arguments are integers",
                        ));
                    };
                    if *modulus == 0 {
                        return Err(PyExc::value_error("pow() 3rd argument cannot be 0"));
                    }
                    if *exp < 0 {
                        return Err(PyExc::value_error(
                            "pow() 2nd argument cannot be negative when 3rd argument specified",
                        ));
                    }
                    Ok(Value::Int(mod_pow(*base, *exp, *modulus)))
                }
            }
        }
        Builtin::Print => {
            let sep = match take_kwarg(&mut kwargs, "sep") {
                Some(Value::Str(s)) => s.as_ref().clone(),
                Some(Value::None) | None => " ".to_string(),
                Some(other) => {
                    return Err(PyExc::type_error(format!(
                        "sep must be None or a string, not {}",
                        other.type_name()
                    )));
                }
            };
            let end = match take_kwarg(&mut kwargs, "end") {
                Some(Value::Str(s)) => s.as_ref().clone(),
                Some(Value::None) | None => "\n".to_string(),
                Some(other) => {
                    return Err(PyExc::type_error(format!(
                        "end must be None or a string, not {}",
                        other.type_name()
                    )));
                }
            };
            no_kwargs(name, &kwargs)?;
            let rendered: Vec<String> = args.iter().map(py_str).collect();
            interp.stdout.extend_from_slice(rendered.join(&sep).as_bytes());
            interp.stdout.extend_from_slice(end.as_bytes());
            Ok(Value::None)
        }
        Builtin::Repr => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            Ok(Value::str(py_repr(&args[0])))
        }
        Builtin::Reversed => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Range { start, stop, step } => {
                    let len = range_len(*start, *stop, *step);
                    if len == 0 {
                        return Ok(iterator_over(Vec::new()));
                    }
                    let last = start + (len - 1) * step;
                    Ok(Value::Iterator(Rc::new(std::cell::RefCell::new(
                        IterState::Range {
                            next: last,
                            stop: start - step.signum(),
                            step: -step,
                        },
                    ))))
                }
                Value::List(items) => {
                    let mut items = items.borrow().clone();
                    items.reverse();
                    Ok(iterator_over(items))
                }
                Value::Tuple(items) => {
                    let mut items = items.as_ref().clone();
                    items.reverse();
                    Ok(iterator_over(items))
                }
                Value::Str(s) => {
                    let items = s
                        .chars()
                        .rev()
                        .map(|c| Value::str(c.to_string()))
                        .collect();
                    Ok(iterator_over(items))
                }
                other => Err(PyExc::type_error(format!(
                    "'{}' object is not reversible",
                    other.type_name()
                ))),
            }
        }
        Builtin::Round => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 2)?;
            let ndigits = match args.get(1) {
                None | Some(Value::None) => None,
                Some(v) => Some(as_int_arg(name, v)?),
            };
            round_value(&args[0], ndigits)
        }
        Builtin::Sorted => {
            let key = take_kwarg(&mut kwargs, "key").filter(|v| !matches!(v, Value::None));
            let reverse = take_kwarg(&mut kwargs, "reverse")
                .map(|v| v.truthy())
                .unwrap_or(false);
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            let items = ops::iter_to_vec(&args[0])?;
            let mut decorated = Vec::with_capacity(items.len());
            for item in items {
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
            Ok(Value::list(sorted.into_iter().map(|(_, v)| v).collect()))
        }
        Builtin::Sum => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            if matches!(start, Value::Str(_)) {
                return Err(PyExc::type_error(
                    "sum() can't sum strings [use ''.join(seq) instead]",
                ));
            }
            let items = ops::iter_to_vec(&args[0])?;
            let mut total = start;
            for item in items {
                total = ops::binary_op(crate::lang::ast::BinOp::Add, &total, &item)?;
            }
            Ok(total)
        }
        Builtin::Zip => {
            no_kwargs(name, &kwargs)?;
            let mut columns = Vec::with_capacity(args.len());
            for iterable in &args {
                columns.push(ops::iter_to_vec(iterable)?);
            }
            let shortest = columns.iter().map(|c| c.len()).min().unwrap_or(0);
            let mut rows = Vec::with_capacity(shortest);
            for row in 0..shortest {
                rows.push(Value::tuple(
                    columns.iter().map(|c| c[row].clone()).collect(),
                ));
            }
            Ok(iterator_over(rows))
        }
    }
}

fn iterator_over(items: Vec<Value>) -> Value {
    Value::Iterator(Rc::new(std::cell::RefCell::new(IterState::Seq {
        items,
        pos: 0,
    })))
}

fn class_check(
    classinfo: &Value,
    what: &str,
    mut predicate: impl FnMut(ClassType) -> bool,
) -> EvalResult<bool> {
    match classinfo {
        Value::Class(class) => Ok(predicate(*class)),
        Value::Tuple(classes) => {
            for entry in classes.iter() {
                let Value::Class(class) = entry else {
                    return Err(PyExc::type_error(format!(
                        "{} must be a type or tuple of types",
                        what
                    )));
                };
                if predicate(*class) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(PyExc::type_error(format!(
            "{} must be a type or tuple of types",
            what
        ))),
    }
}

pub fn value_matches_class(value: &Value, class: ClassType) -> bool {
    match class {
        ClassType::Bool => matches!(value, Value::Bool(_)),
        // bool is a subtype of int.
        ClassType::Int => matches!(value, Value::Int(_) | Value::Bool(_)),
        ClassType::Float => matches!(value, Value::Float(_)),
        ClassType::Complex => matches!(value, Value::Complex { .. }),
        ClassType::Str => matches!(value, Value::Str(_)),
        ClassType::Bytes => matches!(value, Value::Bytes(_)),
        ClassType::ByteArray => matches!(value, Value::ByteArray(_)),
        ClassType::List => matches!(value, Value::List(_)),
        ClassType::Tuple => matches!(value, Value::Tuple(_)),
        ClassType::Set => matches!(value, Value::Set(_)),
        ClassType::FrozenSet => matches!(value, Value::FrozenSet(_)),
        ClassType::Dict => matches!(value, Value::Dict(_)),
        ClassType::Range => matches!(value, Value::Range { .. }),
        ClassType::Type => matches!(value, Value::Class(_)),
        ClassType::NoneType => matches!(value, Value::None),
        ClassType::Function => matches!(value, Value::Function(_) | Value::Builtin(_)),
        ClassType::Exc(handler) => match value {
            Value::Exception(exc) => exc.ty.is_caught_by(handler),
            _ => false,
        },
    }
}

fn is_subclass(sub: ClassType, of: ClassType) -> bool {
    if sub == of {
        return true;
    }
    match (sub, of) {
        (ClassType::Bool, ClassType::Int) => true,
        (ClassType::Exc(a), ClassType::Exc(b)) => a.is_caught_by(b),
        _ => false,
    }
}

fn mod_pow(base: i64, exp: i64, modulus: i64) -> i64 {
    let modulus = modulus as i128;
    let mut result: i128 = 1;
    let mut base = (base as i128).rem_euclid(modulus);
    let mut exp = exp as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }
    // The remainder carries the modulus sign, as floor-mod does.
    let mut out = result % modulus;
    if out != 0 && (out < 0) != (modulus < 0) {
        out += modulus;
    }
    out as i64
}

fn round_value(value: &Value, ndigits: Option<i64>) -> EvalResult<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Int(i) => match ndigits {
            None => Ok(Value::Int(*i)),
            Some(n) if n >= 0 => Ok(Value::Int(*i)),
            Some(n) => {
                let factor = 10i64
                    .checked_pow(u32::try_from(-n).map_err(|_| {
                        PyExc::new(ExcType::OverflowError, "integer result too large")
                    })?)
                    .ok_or_else(|| {
                        PyExc::new(ExcType::OverflowError, "integer result too large")
                    })?;
                let half = factor / 2;
                let rem = i.rem_euclid(factor);
                let down = i - rem;
                // Ties go to the even multiple.
                let rounded = if rem > half || (rem == half && (down / factor) % 2 != 0) {
                    down + factor
                } else {
                    down
                };
                Ok(Value::Int(rounded))
            }
        },
        Value::Float(f) => match ndigits {
            None => {
                if f.is_nan() {
                    return Err(PyExc::value_error("cannot convert float NaN to integer"));
                }
                if f.is_infinite() {
                    return Err(PyExc::new(
                        ExcType::OverflowError,
                        "cannot convert float infinity to integer",
                    ));
                }
                let rounded = f.round_ties_even();
                if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
                    return Err(PyExc::new(
                        ExcType::OverflowError,
                        "rounded value too large to represent",
                    ));
                }
                Ok(Value::Int(rounded as i64))
            }
            Some(n) => {
                let factor = 10f64.powi(n.clamp(-308, 308) as i32);
                Ok(Value::Float((f * factor).round_ties_even() / factor))
            }
        },
        other => Err(PyExc::type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn py_hash(value: &Value) -> EvalResult<i64> {
    if !is_hashable(value) {
        return Err(PyExc::type_error(format!(
            "unhashable type: '{}'",
            value.type_name()
        )));
    }
    Ok(hash_unchecked(value))
}

fn hash_unchecked(value: &Value) -> i64 {
    match value {
        Value::None => 0x5f3c_9d1a,
        Value::Bool(b) => {
            if *b {
                1
            } else {
                0
            }
        }
        Value::Int(i) => *i,
        Value::Float(f) => {
            if *f == f.trunc() && f.abs() < 9.2e18 {
                *f as i64
            } else {
                f.to_bits() as i64
            }
        }
        Value::Complex { re, im } => hash_unchecked(&Value::Float(*re))
            ^ hash_unchecked(&Value::Float(*im)).rotate_left(16),
        Value::Str(s) => fnv1a(s.as_bytes()),
        Value::Bytes(b) => fnv1a(b),
        Value::Tuple(items) => {
            let mut acc: i64 = 0x345678;
            for item in items.iter() {
                acc = acc.wrapping_mul(1_000_003) ^ hash_unchecked(item);
            }
            acc
        }
        Value::FrozenSet(items) => items.iter().map(hash_unchecked).fold(0, |a, h| a ^ h),
        Value::Range { start, stop, step } => {
            start.wrapping_mul(31) ^ stop.wrapping_mul(17) ^ *step
        }
        other => object_id(other),
    }
}

fn fnv1a(bytes: &[u8]) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash as i64
}

fn object_id(value: &Value) -> i64 {
    match value {
        Value::Str(s) => Rc::as_ptr(s) as i64,
        Value::Bytes(b) => Rc::as_ptr(b) as i64,
        Value::ByteArray(b) => Rc::as_ptr(b) as i64,
        Value::List(items) => Rc::as_ptr(items) as i64,
        Value::Tuple(items) => Rc::as_ptr(items) as i64,
        Value::Dict(d) => Rc::as_ptr(d) as i64,
        Value::Set(items) => Rc::as_ptr(items) as i64,
        Value::FrozenSet(items) => Rc::as_ptr(items) as i64,
        Value::Function(f) => Rc::as_ptr(f) as i64,
        Value::Exception(e) => Rc::as_ptr(e) as i64,
        Value::BoundMethod(m) => Rc::as_ptr(m) as i64,
        Value::Iterator(state) => Rc::as_ptr(state) as i64,
        other => hash_unchecked(other),
    }
}

fn format_value(value: &Value, spec: &str) -> EvalResult<String> {
    if spec.is_empty() {
        return Ok(py_str(value));
    }
    let int_of = |value: &Value| -> EvalResult<i64> { as_int_arg("format", value) };
    match spec {
        "d" => Ok(int_of(value)?.to_string()),
        "b" => Ok(format!("{:b}", int_of(value)?)),
        "o" => Ok(format!("{:o}", int_of(value)?)),
        "x" => Ok(format!("{:x}", int_of(value)?)),
        "X" => Ok(format!("{:X}", int_of(value)?)),
        _ => {
            // ".Nf" fixed-point form.
            if let Some(rest) = spec.strip_prefix('.') {
                if let Some(digits) = rest.strip_suffix('f') {
                    if let Ok(precision) = digits.parse::<usize>() {
                        let v = match value {
                            Value::Float(f) => *f,
                            Value::Int(i) => *i as f64,
                            Value::Bool(b) => {
                                if *b {
                                    1.0
                                } else {
                                    0.0
                                }
                            }
                            other => {
                                return Err(PyExc::type_error(format!(
                                    "unsupported format string passed to {}",
                                    other.type_name()
                                )));
                            }
                        };
                        return Ok(format!("{:.*}", precision, v));
                    }
                }
            }
            Err(PyExc::value_error(format!(
                "unsupported format specifier '{}'",
                spec
            )))
        }
    }
}

pub fn call_class(
    interp: &mut Interp,
    class: ClassType,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    let name = class.name();
    match class {
        ClassType::Bool => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().map(Value::truthy).unwrap_or(false)))
        }
        ClassType::Int => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 2)?;
            int_constructor(&args)
        }
        ClassType::Float => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            float_constructor(args.first())
        }
        ClassType::Complex => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 2)?;
            let part = |v: Option<&Value>| -> EvalResult<f64> {
                match v {
                    None => Ok(0.0),
                    Some(Value::Int(i)) => Ok(*i as f64),
                    Some(Value::Float(f)) => Ok(*f),
                    Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
                    Some(other) => Err(PyExc::type_error(format!(
                        "complex() argument must be a number, not '{}'",
                        other.type_name()
                    ))),
                }
            };
            if let Some(Value::Complex { re, im }) = args.first() {
                if args.len() == 1 {
                    return Ok(Value::Complex { re: *re, im: *im });
                }
            }
            Ok(Value::Complex {
                re: part(args.first())?,
                im: part(args.get(1))?,
            })
        }
        ClassType::Str => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            Ok(Value::str(args.first().map(py_str).unwrap_or_default()))
        }
        ClassType::Bytes | ClassType::ByteArray => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            let bytes = bytes_constructor(name, args.first())?;
            Ok(if class == ClassType::Bytes {
                Value::Bytes(Rc::new(bytes))
            } else {
                Value::ByteArray(Rc::new(std::cell::RefCell::new(bytes)))
            })
        }
        ClassType::List => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(v) => ops::iter_to_vec(v)?,
                None => Vec::new(),
            };
            Ok(Value::list(items))
        }
        ClassType::Tuple => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(v) => ops::iter_to_vec(v)?,
                None => Vec::new(),
            };
            Ok(Value::tuple(items))
        }
        ClassType::Set | ClassType::FrozenSet => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(v) => ops::dedup_set_items(ops::iter_to_vec(v)?)?,
                None => Vec::new(),
            };
            Ok(if class == ClassType::Set {
                Value::set(items)
            } else {
                Value::FrozenSet(Rc::new(items))
            })
        }
        ClassType::Dict => dict_constructor(interp, args, kwargs),
        ClassType::Range => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 3)?;
            let ints: Vec<i64> = args
                .iter()
                .map(|v| as_int_arg(name, v))
                .collect::<EvalResult<_>>()?;
            let (start, stop, step) = match ints.len() {
                1 => (0, ints[0], 1),
                2 => (ints[0], ints[1], 1),
                _ => (ints[0], ints[1], ints[2]),
            };
            if step == 0 {
                return Err(PyExc::value_error("range() arg 3 must not be zero"));
            }
            Ok(Value::Range { start, stop, step })
        }
        ClassType::Type => {
            no_kwargs(name, &kwargs)?;
            arity(name, &args, 1, 1)?;
            Ok(Value::Class(classify(&args[0])))
        }
        ClassType::NoneType | ClassType::Function => Err(PyExc::type_error(format!(
            "cannot create '{}' instances",
            name
        ))),
        ClassType::Exc(ty) => {
            no_kwargs(name, &kwargs)?;
            let message = match args.len() {
                0 => String::new(),
                1 => py_str(&args[0]),
                _ => py_repr(&Value::tuple(args.clone())),
            };
            Ok(Value::Exception(Rc::new(PyExc::new(ty, message))))
        }
    }
}

fn classify(value: &Value) -> ClassType {
    match value {
        Value::None => ClassType::NoneType,
        Value::Bool(_) => ClassType::Bool,
        Value::Int(_) => ClassType::Int,
        Value::Float(_) => ClassType::Float,
        Value::Complex { .. } => ClassType::Complex,
        Value::Str(_) => ClassType::Str,
        Value::Bytes(_) => ClassType::Bytes,
        Value::ByteArray(_) => ClassType::ByteArray,
        Value::List(_) => ClassType::List,
        Value::Tuple(_) => ClassType::Tuple,
        Value::Dict(_) => ClassType::Dict,
        Value::Set(_) => ClassType::Set,
        Value::FrozenSet(_) => ClassType::FrozenSet,
        Value::Range { .. } => ClassType::Range,
        Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(_) => ClassType::Function,
        Value::Class(_) => ClassType::Type,
        Value::Exception(exc) => ClassType::Exc(exc.ty),
        Value::Iterator(_) => ClassType::Type,
    }
}

fn int_constructor(args: &[Value]) -> EvalResult<Value> {
    let Some(first) = args.first() else {
        return Ok(Value::Int(0));
    };
    if let Some(base_arg) = args.get(1) {
        let (Value::Str(text), Value::Int(base)) = (first, base_arg) else {
            return Err(PyExc::type_error("int() can't convert non-string with explicit base"));
        };
        let base = u32::try_from(*base)
            .ok()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| PyExc::value_error("int() base must be >= 2 and <= 36, or 0"))?;
        return i64::from_str_radix(text.trim(), base)
            .map(Value::Int)
            .map_err(|_| {
                PyExc::value_error(format!(
                    "invalid literal for int() with base {}: {}",
                    base,
                    py_repr(&Value::str(text.as_ref().clone()))
                ))
            });
    }
    match first {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Float(f) => {
            if f.is_nan() {
                Err(PyExc::value_error("cannot convert float NaN to integer"))
            } else if f.is_infinite() {
                Err(PyExc::new(
                    ExcType::OverflowError,
                    "cannot convert float infinity to integer",
                ))
            } else {
                Ok(Value::Int(f.trunc() as i64))
            }
        }
        Value::Str(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            PyExc::value_error(format!(
                "invalid literal for int() with base 10: {}",
                py_repr(&Value::str(text.as_ref().clone()))
            ))
        }),
        other => Err(PyExc::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_constructor(arg: Option<&Value>) -> EvalResult<Value> {
    let Some(value) = arg else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(text) => {
            let trimmed = text.trim();
            let parsed = match trimmed.to_ascii_lowercase().as_str() {
                "inf" | "infinity" | "+inf" | "+infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" | "+nan" | "-nan" => Some(f64::NAN),
                _ => trimmed.parse::<f64>().ok(),
            };
            parsed.map(Value::Float).ok_or_else(|| {
                PyExc::value_error(format!(
                    "could not convert string to float: {}",
                    py_repr(&Value::str(text.as_ref().clone()))
                ))
            })
        }
        other => Err(PyExc::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn bytes_constructor(name: &str, arg: Option<&Value>) -> EvalResult<Vec<u8>> {
    match arg {
        None => Ok(Vec::new()),
        Some(Value::Int(n)) => {
            let n = usize::try_from(*n)
                .map_err(|_| PyExc::value_error("negative count"))?;
            if n > 10_000_000 {
                return Err(PyExc::new(ExcType::OverflowError, "byte count too large"));
            }
            Ok(vec![0; n])
        }
        Some(Value::Bytes(b)) => Ok(b.as_ref().clone()),
        Some(Value::ByteArray(b)) => Ok(b.borrow().clone()),
        Some(Value::Str(_)) => Err(PyExc::type_error("string argument without an encoding")),
        Some(iterable) => {
            let items = ops::iter_to_vec(iterable)?;
            items
                .iter()
                .map(|v| match v {
                    Value::Int(i) if (0..=255).contains(i) => Ok(*i as u8),
                    Value::Int(_) => Err(PyExc::value_error("bytes must be in range(0, 256)")),
                    other => Err(PyExc::type_error(format!(
                        "'{}' object cannot be interpreted as an integer (in {}())",
                        other.type_name(),
                        name
                    ))),
                })
                .collect()
        }
    }
}

fn dict_constructor(
    _interp: &mut Interp,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<Value> {
    arity("dict", &args, 0, 1)?;
    let mut dict = Dict::default();
    if let Some(source) = args.first() {
        match source {
            Value::Dict(d) => {
                for (k, v) in &d.borrow().entries {
                    dict.insert(k.clone(), v.clone());
                }
            }
            other => {
                let pairs = ops::iter_to_vec(other)?;
                for (index, pair) in pairs.into_iter().enumerate() {
                    let items = ops::iter_to_vec(&pair).map_err(|_| {
                        PyExc::type_error(format!(
                            "cannot convert dictionary update sequence element #{} to a sequence",
                            index
                        ))
                    })?;
                    if items.len() != 2 {
                        return Err(PyExc::value_error(format!(
                            "dictionary update sequence element #{} has length {}; 2 is required",
                            index,
                            items.len()
                        )));
                    }
                    if !is_hashable(&items[0]) {
                        return Err(PyExc::type_error(format!(
                            "unhashable type: '{}'",
                            items[0].type_name()
                        )));
                    }
                    dict.insert(items[0].clone(), items[1].clone());
                }
            }
        }
    }
    for (key, value) in kwargs {
        dict.insert(Value::str(key), value);
    }
    Ok(Value::dict(dict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parser::parse;
    use crate::lang::value::py_eq;

    fn run_expr(source: &str) -> Value {
        let module = parse(&format!("__result__ = {}\n", source)).unwrap();
        let mut interp = Interp::new();
        interp.run_module(&module).unwrap();
        interp.global_lookup("__result__").unwrap()
    }

    fn run_expr_err(source: &str) -> PyExc {
        let module = parse(&format!("__result__ = {}\n", source)).unwrap();
        let mut interp = Interp::new();
        interp.run_module(&module).unwrap_err()
    }

    fn assert_value(source: &str, expected: Value) {
        let got = run_expr(source);
        assert!(
            py_eq(&got, &expected),
            "{} evaluated to {}, expected {}",
            source,
            py_repr(&got),
            py_repr(&expected)
        );
    }

    #[test]
    fn conversions() {
        assert_value("int('42')", Value::Int(42));
        assert_value("int(' -7 ')", Value::Int(-7));
        assert_value("int(3.9)", Value::Int(3));
        assert_value("int('ff', 16)", Value::Int(255));
        assert_value("float('2.5')", Value::Float(2.5));
        assert_value("str(12)", Value::str("12"));
        assert_value("bool([])", Value::Bool(false));
        assert_value("bool([0])", Value::Bool(true));
    }

    #[test]
    fn bad_int_literal_raises_value_error() {
        let exc = run_expr_err("int('abc')");
        assert_eq!(exc.ty, ExcType::ValueError);
        assert!(exc.message.contains("invalid literal"));
    }

    #[test]
    fn aggregates() {
        assert_value("sum([1, 2, 3])", Value::Int(6));
        assert_value("sum(range(101))", Value::Int(5050));
        assert_value("max(3, 1, 2)", Value::Int(3));
        assert_value("min([5, 2, 9])", Value::Int(2));
        assert_value("max([], default=-1)", Value::Int(-1));
        assert_value("len('héllo')", Value::Int(5));
    }

    #[test]
    fn sorted_is_stable_and_supports_key_and_reverse() {
        assert_value(
            "sorted([3, 1, 2])",
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        assert_value(
            "sorted(['bb', 'a', 'ccc'], key=len, reverse=True)",
            Value::list(vec![Value::str("ccc"), Value::str("bb"), Value::str("a")]),
        );
        let exc = run_expr_err("sorted([1, 'a'])");
        assert_eq!(exc.ty, ExcType::TypeError);
    }

    #[test]
    fn iterator_pipeline() {
        assert_value(
            "list(map(lambda x: x * 2, [1, 2, 3]))",
            Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(6)]),
        );
        assert_value(
            "list(filter(lambda x: x % 2, range(6)))",
            Value::list(vec![Value::Int(1), Value::Int(3), Value::Int(5)]),
        );
        assert_value(
            "list(zip([1, 2], 'ab'))",
            Value::list(vec![
                Value::tuple(vec![Value::Int(1), Value::str("a")]),
                Value::tuple(vec![Value::Int(2), Value::str("b")]),
            ]),
        );
        assert_value("next(iter([7]))", Value::Int(7));
        assert_value("next(iter([]), 'done')", Value::str("done"));
    }

    #[test]
    fn exhausted_iterator_raises_stop_iteration() {
        let exc = run_expr_err("next(iter([]))");
        assert_eq!(exc.ty, ExcType::StopIteration);
    }

    #[test]
    fn numeric_helpers() {
        assert_value("abs(-5)", Value::Int(5));
        assert_value("abs(3 + 4j)", Value::Float(5.0));
        assert_value("divmod(7, 2)", Value::tuple(vec![Value::Int(3), Value::Int(1)]));
        assert_value("pow(2, 10)", Value::Int(1024));
        assert_value("pow(2, 10, 1000)", Value::Int(24));
        assert_value("round(2.5)", Value::Int(2));
        assert_value("round(3.5)", Value::Int(4));
        assert_value("round(2.675, 2)", Value::Float(2.67));
    }

    #[test]
    fn text_helpers() {
        assert_value("bin(10)", Value::str("0b1010"));
        assert_value("bin(-10)", Value::str("-0b1010"));
        assert_value("hex(255)", Value::str("0xff"));
        assert_value("oct(8)", Value::str("0o10"));
        assert_value("chr(97)", Value::str("a"));
        assert_value("ord('a')", Value::Int(97));
        assert_value("repr('hi')", Value::str("'hi'"));
        assert_value("format(3.14159, '.2f')", Value::str("3.14"));
    }

    #[test]
    fn type_predicates() {
        assert_value("isinstance(5, int)", Value::Bool(true));
        assert_value("isinstance(True, int)", Value::Bool(true));
        assert_value("isinstance('x', (int, str))", Value::Bool(true));
        assert_value("isinstance(5.0, int)", Value::Bool(false));
        assert_value("issubclass(bool, int)", Value::Bool(true));
        assert_value("issubclass(ZeroDivisionError, Exception)", Value::Bool(true));
        assert_value("type(3) == int", Value::Bool(true));
    }

    #[test]
    fn container_constructors() {
        assert_value("list(range(3))", Value::list(vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(2),
        ]));
        assert_value("len(set([1, 1, 2]))", Value::Int(2));
        assert_value("dict([('a', 1)])['a']", Value::Int(1));
        assert_value("dict(x=1)['x']", Value::Int(1));
        assert_value("len(tuple('abc'))", Value::Int(3));
    }

    #[test]
    fn enumerate_with_start() {
        assert_value(
            "list(enumerate('ab', 1))",
            Value::list(vec![
                Value::tuple(vec![Value::Int(1), Value::str("a")]),
                Value::tuple(vec![Value::Int(2), Value::str("b")]),
            ]),
        );
    }

    #[test]
    fn reversed_range_stays_lazy() {
        assert_value(
            "list(reversed(range(5)))",
            Value::list(vec![
                Value::Int(4),
                Value::Int(3),
                Value::Int(2),
                Value::Int(1),
                Value::Int(0),
            ]),
        );
    }
}
