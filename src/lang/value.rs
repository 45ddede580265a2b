//! Runtime values for the submission subset.
//!
//! Containers use shared interior mutability so aliasing behaves the way
//! submission authors expect: two names bound to one list observe each
//! other's mutations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::lang::ast::{Param, Stmt};
use crate::lang::builtins::Builtin;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(Rc<String>),
    Bytes(Rc<Vec<u8>>),
    ByteArray(Rc<RefCell<Vec<u8>>>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<Dict>>),
    Set(Rc<RefCell<Vec<Value>>>),
    FrozenSet(Rc<Vec<Value>>),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Class(ClassType),
    Exception(Rc<PyExc>),
    BoundMethod(Rc<BoundMethod>),
    Iterator(Rc<RefCell<IterState>>),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", py_repr(self))
    }
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(Rc::new(text.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn dict(d: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(d)))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::ByteArray(_) => "bytearray",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Class(_) => "type",
            Value::Exception(e) => e.ty.name(),
            Value::BoundMethod(_) => "builtin_function_or_method",
            Value::Iterator(_) => "iterator",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Complex { re, im } => *re != 0.0 || *im != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::ByteArray(b) => !b.borrow().is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(d) => !d.borrow().entries.is_empty(),
            Value::Set(items) => !items.borrow().is_empty(),
            Value::FrozenSet(items) => !items.is_empty(),
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            _ => true,
        }
    }

    /// Identity for `is` / `is not`. Shared containers compare by
    /// allocation, scalars by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// Insertion-ordered mapping with linear key lookup under `py_eq`.
/// Judge-scale inputs make the linear scan a non-issue, and it sidesteps
/// hashing mutable values entirely.
#[derive(Default)]
pub struct Dict {
    pub entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .iter()
            .find(|(k, _)| py_eq(k, key))
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        for (k, v) in &mut self.entries {
            if py_eq(k, &key) {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| py_eq(k, key))?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.entries.iter().any(|(k, _)| py_eq(k, key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A user-defined function or lambda. Parameter defaults are evaluated
/// once, at definition time.
pub struct FunctionValue {
    pub name: String,
    pub params: Vec<Param>,
    pub defaults: Vec<Option<Value>>,
    pub body: FunctionBody,
    pub closure: Rc<Scope>,
}

pub enum FunctionBody {
    Block(Rc<Vec<Stmt>>),
    Expr(Rc<crate::lang::ast::Expr>),
}

pub struct BoundMethod {
    pub recv: Value,
    pub name: String,
}

/// Lexical scope chain; the root scope is the sandbox global table.
pub struct Scope {
    pub vars: RefCell<HashMap<String, Value>>,
    pub parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root(vars: HashMap<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(vars),
            parent: None,
        })
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    pub fn assign(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassType {
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    ByteArray,
    List,
    Tuple,
    Set,
    FrozenSet,
    Dict,
    Range,
    Type,
    /// Not in the sandbox table; only produced by `type(...)`.
    NoneType,
    Function,
    Exc(ExcType),
}

impl ClassType {
    pub fn name(self) -> &'static str {
        match self {
            ClassType::Bool => "bool",
            ClassType::Int => "int",
            ClassType::Float => "float",
            ClassType::Complex => "complex",
            ClassType::Str => "str",
            ClassType::Bytes => "bytes",
            ClassType::ByteArray => "bytearray",
            ClassType::List => "list",
            ClassType::Tuple => "tuple",
            ClassType::Set => "set",
            ClassType::FrozenSet => "frozenset",
            ClassType::Dict => "dict",
            ClassType::Range => "range",
            ClassType::Type => "type",
            ClassType::NoneType => "NoneType",
            ClassType::Function => "function",
            ClassType::Exc(exc) => exc.name(),
        }
    }
}

/// Exception classes known to the runtime. Only the whitelisted subset is
/// visible inside the sandbox; the rest exist so internal failures carry
/// the conventional names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcType {
    Exception,
    ValueError,
    TypeError,
    KeyError,
    IndexError,
    AttributeError,
    RuntimeError,
    StopIteration,
    ZeroDivisionError,
    NameError,
    ImportError,
    RecursionError,
    OverflowError,
}

impl ExcType {
    pub fn name(self) -> &'static str {
        match self {
            ExcType::Exception => "Exception",
            ExcType::ValueError => "ValueError",
            ExcType::TypeError => "TypeError",
            ExcType::KeyError => "KeyError",
            ExcType::IndexError => "IndexError",
            ExcType::AttributeError => "AttributeError",
            ExcType::RuntimeError => "RuntimeError",
            ExcType::StopIteration => "StopIteration",
            ExcType::ZeroDivisionError => "ZeroDivisionError",
            ExcType::NameError => "NameError",
            ExcType::ImportError => "ImportError",
            ExcType::RecursionError => "RecursionError",
            ExcType::OverflowError => "OverflowError",
        }
    }

    /// Subclass relation, flattened to what an `except` arm must honor.
    pub fn is_caught_by(self, handler: ExcType) -> bool {
        if self == handler || handler == ExcType::Exception {
            return true;
        }
        matches!(
            (self, handler),
            (ExcType::RecursionError, ExcType::RuntimeError)
        )
    }
}

/// A raised exception travelling through evaluation as an error value.
#[derive(Debug, Clone, PartialEq)]
pub struct PyExc {
    pub ty: ExcType,
    pub message: String,
}

impl PyExc {
    pub fn new(ty: ExcType, message: impl Into<String>) -> Self {
        Self {
            ty,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExcType::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExcType::ValueError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(ExcType::NameError, format!("name '{}' is not defined", name))
    }
}

pub type EvalResult<T> = std::result::Result<T, PyExc>;

/// State behind `iter()`, `map()`, `enumerate()` and friends. Ranges stay
/// lazy so `range(10**9)` costs nothing until consumed; everything else is
/// materialized eagerly.
pub enum IterState {
    Seq { items: Vec<Value>, pos: usize },
    Range { next: i64, stop: i64, step: i64 },
}

impl IterState {
    pub fn next_item(&mut self) -> Option<Value> {
        match self {
            IterState::Seq { items, pos } => {
                if *pos < items.len() {
                    let item = items[*pos].clone();
                    *pos += 1;
                    Some(item)
                } else {
                    None
                }
            }
            IterState::Range { next, stop, step } => {
                let exhausted = if *step >= 0 { *next >= *stop } else { *next <= *stop };
                if exhausted {
                    None
                } else {
                    let item = Value::Int(*next);
                    *next += *step;
                    Some(item)
                }
            }
        }
    }
}

pub fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    if step > 0 {
        if stop > start {
            (stop - start + step - 1) / step
        } else {
            0
        }
    } else if stop < start {
        (start - stop + (-step) - 1) / (-step)
    } else {
        0
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_int_like(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(if *b { 1 } else { 0 }),
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

/// `==` between any two values. Numeric kinds compare across type; other
/// kinds compare within their own family.
pub fn py_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (
            Value::Complex { re, im },
            other @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
        ) => as_f64(other).is_some_and(|v| *re == v && *im == 0.0),
        (
            other @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
            Value::Complex { re, im },
        ) => as_f64(other).is_some_and(|v| *re == v && *im == 0.0),
        (Value::Complex { re: ar, im: ai }, Value::Complex { re: br, im: bi }) => {
            ar == br && ai == bi
        }
        (Value::Int(x), Value::Int(y)) => x == y,
        (
            x @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
            y @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
        ) => match (as_int_like(x), as_int_like(y)) {
            (Some(xi), Some(yi)) => xi == yi,
            _ => as_f64(x).unwrap() == as_f64(y).unwrap(),
        },
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Bytes(x), Value::ByteArray(y)) | (Value::ByteArray(y), Value::Bytes(x)) => {
            **x == *y.borrow()
        }
        (Value::ByteArray(x), Value::ByteArray(y)) => *x.borrow() == *y.borrow(),
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| py_eq(a, b))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| py_eq(a, b))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| py_eq(v, &other)))
        }
        (Value::Set(x), Value::Set(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            set_eq(&x, &y)
        }
        (Value::FrozenSet(x), Value::FrozenSet(y)) => set_eq(x, y),
        (Value::Set(x), Value::FrozenSet(y)) => set_eq(&x.borrow(), y),
        (Value::FrozenSet(x), Value::Set(y)) => set_eq(x, &y.borrow()),
        (
            Value::Range {
                start: s1,
                stop: e1,
                step: t1,
            },
            Value::Range {
                start: s2,
                stop: e2,
                step: t2,
            },
        ) => {
            let (l1, l2) = (range_len(*s1, *e1, *t1), range_len(*s2, *e2, *t2));
            l1 == l2 && (l1 == 0 || (s1 == s2 && (l1 == 1 || t1 == t2)))
        }
        (Value::Class(x), Value::Class(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Exception(x), Value::Exception(y)) => Rc::ptr_eq(x, y) || x == y,
        _ => false,
    }
}

fn set_eq(x: &[Value], y: &[Value]) -> bool {
    x.len() == y.len() && x.iter().all(|a| y.iter().any(|b| py_eq(a, b)))
}

/// `<` for the orderable kinds; anything else is a TypeError, with the
/// conventional message.
pub fn py_lt(a: &Value, b: &Value) -> EvalResult<bool> {
    match (a, b) {
        (
            x @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
            y @ (Value::Bool(_) | Value::Int(_) | Value::Float(_)),
        ) => match (as_int_like(x), as_int_like(y)) {
            (Some(xi), Some(yi)) => Ok(xi < yi),
            _ => Ok(as_f64(x).unwrap() < as_f64(y).unwrap()),
        },
        (Value::Str(x), Value::Str(y)) => Ok(x < y),
        (Value::Bytes(x), Value::Bytes(y)) => Ok(x < y),
        (Value::List(x), Value::List(y)) => seq_lt(&x.borrow(), &y.borrow()),
        (Value::Tuple(x), Value::Tuple(y)) => seq_lt(x, y),
        _ => Err(PyExc::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn seq_lt(x: &[Value], y: &[Value]) -> EvalResult<bool> {
    for (a, b) in x.iter().zip(y.iter()) {
        if !py_eq(a, b) {
            return py_lt(a, b);
        }
    }
    Ok(x.len() < y.len())
}

/// Keys a mapping will accept; mirrors hashability in the source language.
pub fn is_hashable(value: &Value) -> bool {
    match value {
        Value::None
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Complex { .. }
        | Value::Str(_)
        | Value::Bytes(_)
        | Value::Range { .. }
        | Value::FrozenSet(_)
        | Value::Class(_)
        | Value::Builtin(_)
        | Value::Function(_) => true,
        Value::Tuple(items) => items.iter().all(is_hashable),
        _ => false,
    }
}

/// `repr()` notation.
pub fn py_repr(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Complex { re, im } => {
            if *re == 0.0 {
                format!("{}j", format_float_bare(*im))
            } else if *im < 0.0 || (*im == 0.0 && im.is_sign_negative()) {
                format!("({}{}j)", format_float_bare(*re), format_float_bare(*im))
            } else {
                format!("({}+{}j)", format_float_bare(*re), format_float_bare(*im))
            }
        }
        Value::Str(s) => repr_str(s),
        Value::Bytes(b) => format!("b{}", repr_bytes(b)),
        Value::ByteArray(b) => format!("bytearray(b{})", repr_bytes(&b.borrow())),
        Value::List(items) => {
            let inner: Vec<String> = items.borrow().iter().map(py_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(py_repr).collect();
            if inner.len() == 1 {
                format!("({},)", inner[0])
            } else {
                format!("({})", inner.join(", "))
            }
        }
        Value::Dict(d) => {
            let inner: Vec<String> = d
                .borrow()
                .entries
                .iter()
                .map(|(k, v)| format!("{}: {}", py_repr(k), py_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Set(items) => {
            let items = items.borrow();
            if items.is_empty() {
                "set()".to_string()
            } else {
                let inner: Vec<String> = items.iter().map(py_repr).collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
        Value::FrozenSet(items) => {
            if items.is_empty() {
                "frozenset()".to_string()
            } else {
                let inner: Vec<String> = items.iter().map(py_repr).collect();
                format!("frozenset({{{}}})", inner.join(", "))
            }
        }
        Value::Range { start, stop, step } => {
            if *step == 1 {
                format!("range({}, {})", start, stop)
            } else {
                format!("range({}, {}, {})", start, stop, step)
            }
        }
        Value::Function(f) => format!("<function {}>", f.name),
        Value::Builtin(b) => format!("<built-in function {}>", b.name()),
        Value::Class(c) => format!("<class '{}'>", c.name()),
        Value::Exception(e) => format!("{}({})", e.ty.name(), repr_str(&e.message)),
        Value::BoundMethod(m) => {
            format!("<built-in method {} of {} object>", m.name, m.recv.type_name())
        }
        Value::Iterator(_) => "<iterator>".to_string(),
    }
}

/// `str()` notation: identical to repr except for text and exceptions.
pub fn py_str(value: &Value) -> String {
    match value {
        Value::Str(s) => s.as_ref().clone(),
        Value::Exception(e) => e.message.clone(),
        other => py_repr(other),
    }
}

pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if f == f.trunc() && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn format_float_bare(f: f64) -> String {
    if f == f.trunc() && f.abs() < 1e16 && f.is_finite() {
        format!("{}", f.trunc() as i64)
    } else {
        format!("{}", f)
    }
}

fn repr_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn repr_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('\'');
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            other => out.push_str(&format!("\\x{:02x}", other)),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_types() {
        assert!(py_eq(&Value::Int(5), &Value::Float(5.0)));
        assert!(py_eq(&Value::Bool(true), &Value::Int(1)));
        assert!(!py_eq(&Value::Int(5), &Value::Float(5.1)));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert!(!py_eq(&Value::Float(f64::NAN), &Value::Float(f64::NAN)));
    }

    #[test]
    fn list_and_tuple_do_not_cross_compare() {
        let list = Value::list(vec![Value::Int(1)]);
        let tuple = Value::tuple(vec![Value::Int(1)]);
        assert!(!py_eq(&list, &tuple));
    }

    #[test]
    fn dict_equality_ignores_insertion_order() {
        let mut a = Dict::default();
        a.insert(Value::str("x"), Value::Int(1));
        a.insert(Value::str("y"), Value::Int(2));
        let mut b = Dict::default();
        b.insert(Value::str("y"), Value::Int(2));
        b.insert(Value::str("x"), Value::Int(1));
        assert!(py_eq(&Value::dict(a), &Value::dict(b)));
    }

    #[test]
    fn ordering_rejects_mixed_types() {
        let err = py_lt(&Value::str("a"), &Value::Int(1)).unwrap_err();
        assert_eq!(err.ty, ExcType::TypeError);
        assert!(err.message.contains("'str' and 'int'"));
    }

    #[test]
    fn repr_matches_source_language_notation() {
        assert_eq!(py_repr(&Value::Float(1.0)), "1.0");
        assert_eq!(py_repr(&Value::str("a'b")), "'a\\'b'");
        assert_eq!(
            py_repr(&Value::tuple(vec![Value::Int(1)])),
            "(1,)"
        );
        assert_eq!(py_repr(&Value::set(vec![])), "set()");
    }

    #[test]
    fn range_len_handles_both_directions() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(5, 0, -1), 5);
        assert_eq!(range_len(0, 5, -1), 0);
        assert_eq!(range_len(0, 10, 3), 4);
    }

    #[test]
    fn unhashable_keys_are_detected() {
        assert!(is_hashable(&Value::str("k")));
        assert!(is_hashable(&Value::tuple(vec![Value::Int(1)])));
        assert!(!is_hashable(&Value::list(vec![])));
        assert!(!is_hashable(&Value::tuple(vec![Value::list(vec![])])));
    }

    #[test]
    fn recursion_error_is_caught_by_runtime_error_handlers() {
        assert!(ExcType::RecursionError.is_caught_by(ExcType::RuntimeError));
        assert!(ExcType::ZeroDivisionError.is_caught_by(ExcType::Exception));
        assert!(!ExcType::ValueError.is_caught_by(ExcType::TypeError));
    }
}
