//! The sandbox environment: the only global name table user code sees.
//!
//! The table is a fixed whitelist. Anything absent from it — file I/O,
//! imports, reflection, frame introspection — fails name resolution at
//! run time instead of executing.

use std::collections::HashMap;

use crate::lang::value::{ClassType, Dict, ExcType, Value};

/// Whitelisted builtin functions. Constructors and exception classes are
/// [`Value::Class`] entries instead; constants are plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    All,
    Any,
    Bin,
    Chr,
    Divmod,
    Enumerate,
    Filter,
    Format,
    Hash,
    Hex,
    Id,
    Isinstance,
    Issubclass,
    Iter,
    Len,
    Map,
    Max,
    Min,
    Next,
    Oct,
    Ord,
    Pow,
    Print,
    Repr,
    Reversed,
    Round,
    Sorted,
    Sum,
    Zip,
}

impl Builtin {
    pub const ALL: [Builtin; 30] = [
        Builtin::Abs,
        Builtin::All,
        Builtin::Any,
        Builtin::Bin,
        Builtin::Chr,
        Builtin::Divmod,
        Builtin::Enumerate,
        Builtin::Filter,
        Builtin::Format,
        Builtin::Hash,
        Builtin::Hex,
        Builtin::Id,
        Builtin::Isinstance,
        Builtin::Issubclass,
        Builtin::Iter,
        Builtin::Len,
        Builtin::Map,
        Builtin::Max,
        Builtin::Min,
        Builtin::Next,
        Builtin::Oct,
        Builtin::Ord,
        Builtin::Pow,
        Builtin::Print,
        Builtin::Repr,
        Builtin::Reversed,
        Builtin::Round,
        Builtin::Sorted,
        Builtin::Sum,
        Builtin::Zip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Abs => "abs",
            Builtin::All => "all",
            Builtin::Any => "any",
            Builtin::Bin => "bin",
            Builtin::Chr => "chr",
            Builtin::Divmod => "divmod",
            Builtin::Enumerate => "enumerate",
            Builtin::Filter => "filter",
            Builtin::Format => "format",
            Builtin::Hash => "hash",
            Builtin::Hex => "hex",
            Builtin::Id => "id",
            Builtin::Isinstance => "isinstance",
            Builtin::Issubclass => "issubclass",
            Builtin::Iter => "iter",
            Builtin::Len => "len",
            Builtin::Map => "map",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Next => "next",
            Builtin::Oct => "oct",
            Builtin::Ord => "ord",
            Builtin::Pow => "pow",
            Builtin::Print => "print",
            Builtin::Repr => "repr",
            Builtin::Reversed => "reversed",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::Sum => "sum",
            Builtin::Zip => "zip",
        }
    }
}

const CONSTRUCTORS: [ClassType; 14] = [
    ClassType::Bool,
    ClassType::Int,
    ClassType::Float,
    ClassType::Complex,
    ClassType::Str,
    ClassType::Bytes,
    ClassType::ByteArray,
    ClassType::List,
    ClassType::Tuple,
    ClassType::Set,
    ClassType::FrozenSet,
    ClassType::Dict,
    ClassType::Range,
    ClassType::Type,
];

/// Exception classes visible inside the sandbox. Internal kinds such as
/// NameError still occur at run time, but their names do not resolve.
const EXPOSED_EXCEPTIONS: [ExcType; 9] = [
    ExcType::Exception,
    ExcType::ValueError,
    ExcType::TypeError,
    ExcType::KeyError,
    ExcType::IndexError,
    ExcType::AttributeError,
    ExcType::RuntimeError,
    ExcType::StopIteration,
    ExcType::ZeroDivisionError,
];

fn table_entries() -> Vec<(&'static str, Value)> {
    let mut entries: Vec<(&'static str, Value)> = Vec::new();
    for class in CONSTRUCTORS {
        entries.push((class.name(), Value::Class(class)));
    }
    for builtin in Builtin::ALL {
        entries.push((builtin.name(), Value::Builtin(builtin)));
    }
    for exc in EXPOSED_EXCEPTIONS {
        entries.push((exc.name(), Value::Class(ClassType::Exc(exc))));
    }
    entries.push(("True", Value::Bool(true)));
    entries.push(("False", Value::Bool(false)));
    entries.push(("None", Value::None));
    entries
}

/// Build the global table for one worker. Fresh per child; nothing is
/// shared between executions.
pub fn sandbox_globals() -> HashMap<String, Value> {
    let entries = table_entries();

    // `__builtins__` resolves to a mapping holding the same entries, so
    // builtin-table lookups stay inside the sandbox.
    let mut mirror = Dict::default();
    for (name, value) in &entries {
        mirror.insert(Value::str(*name), value.clone());
    }

    let mut globals: HashMap<String, Value> = entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    globals.insert("__builtins__".to_string(), Value::dict(mirror));
    globals.insert("__name__".to_string(), Value::str("__main__"));
    globals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_is_present() {
        let globals = sandbox_globals();
        for name in [
            "int", "float", "str", "bool", "list", "dict", "set", "tuple", "frozenset",
            "bytes", "bytearray", "complex", "range", "type", "len", "enumerate", "zip",
            "map", "filter", "reversed", "sorted", "abs", "min", "max", "sum", "pow",
            "round", "divmod", "all", "any", "chr", "ord", "hex", "bin", "oct", "format",
            "isinstance", "issubclass", "iter", "next", "repr", "hash", "id", "print",
            "Exception", "ValueError", "TypeError", "KeyError", "IndexError",
            "AttributeError", "ZeroDivisionError", "StopIteration", "RuntimeError",
        ] {
            assert!(globals.contains_key(name), "missing builtin {}", name);
        }
    }

    #[test]
    fn dangerous_names_are_absent() {
        let globals = sandbox_globals();
        for name in [
            "open", "exec", "eval", "compile", "input", "globals", "locals", "vars",
            "setattr", "delattr", "getattr", "hasattr", "__import__", "memoryview",
            "breakpoint", "exit", "quit", "help", "dir",
        ] {
            assert!(!globals.contains_key(name), "{} must not be exposed", name);
        }
    }

    #[test]
    fn builtins_name_resolves_to_the_same_table() {
        let globals = sandbox_globals();
        let Value::Dict(mirror) = &globals["__builtins__"] else {
            panic!("__builtins__ should be a mapping");
        };
        let mirror = mirror.borrow();
        assert!(mirror.contains(&Value::str("len")));
        assert!(mirror.contains(&Value::str("ValueError")));
        assert!(!mirror.contains(&Value::str("open")));
        // Entries are the same objects, not lookalikes.
        let from_mirror = mirror.get(&Value::str("len")).unwrap();
        assert!(from_mirror.is_same(&globals["len"]));
    }
}
