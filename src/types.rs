/// Core data model for the raptorbox execution core
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Dynamically-typed value as it crosses the supervisor/worker boundary.
///
/// This is the closed set of shapes test loaders may supply and entry
/// points may return. Serialization is the plain JSON subset: `Unit` is
/// `null`, sequences are arrays, mappings are objects with text keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Seq(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn is_float(&self) -> bool {
        matches!(self, DynamicValue::Float(_))
    }

    /// Numeric view used by the comparator's native-equality fallback.
    /// Booleans count as 0/1, mirroring the submission language.
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            DynamicValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            DynamicValue::Int(i) => Some(*i as f64),
            DynamicValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        DynamicValue::Int(v)
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::Float(v)
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        DynamicValue::Bool(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::Text(v.to_string())
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(v: Vec<DynamicValue>) -> Self {
        DynamicValue::Seq(v)
    }
}

/// Renders values the way the submission language would print them, so
/// "Expected X, got Y" messages read naturally to the person whose code
/// produced Y.
impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Unit => write!(f, "None"),
            DynamicValue::Bool(true) => write!(f, "True"),
            DynamicValue::Bool(false) => write!(f, "False"),
            DynamicValue::Int(i) => write!(f, "{}", i),
            DynamicValue::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            DynamicValue::Text(s) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            DynamicValue::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            DynamicValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// One test case, as supplied by an external loader.
///
/// Read-only inside the core; the worker receives a deep copy of `input`
/// and the process boundary keeps the caller's data out of reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Parameter name to value; the entry point is invoked with these as
    /// keyword arguments.
    pub input: BTreeMap<String, DynamicValue>,
    pub expected: DynamicValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Advisory only; presentation layers may hide inputs of hidden cases.
    #[serde(default)]
    pub hidden: bool,
}

impl TestCase {
    pub fn new(input: BTreeMap<String, DynamicValue>, expected: DynamicValue) -> Self {
        Self {
            input,
            expected,
            description: None,
            hidden: false,
        }
    }
}

/// Pass/fail record for a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub test_case: TestCase,
    pub passed: bool,
    /// Entry-point return value; absent on timeouts and pre-invocation
    /// failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<DynamicValue>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Aggregate outcome of one submission against its whole suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteVerdict {
    /// True iff every supplied test case produced a passing verdict.
    pub success: bool,
    /// Verdicts in the caller's case order, ending at the first failure.
    pub test_results: Vec<TestVerdict>,
    /// Sum of per-test `elapsed_ms`; spawn and supervision overhead is
    /// deliberately excluded.
    pub total_elapsed_ms: u64,
    pub passed_count: usize,
}

/// Everything that can go wrong while running a submission.
///
/// `Syntax` and `WorkerCrashed` are fatal for the whole suite; the rest
/// are demoted to per-test verdicts by the runner. These cross the worker
/// pipe, so they serialize.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFault {
    #[error("Line {line}: {message}")]
    Syntax { line: u32, message: String },

    #[error("{exception}: {message}")]
    Runtime { exception: String, message: String },

    #[error("Timeout: exceeded {} seconds", format_seconds(.deadline_ms))]
    Timeout { deadline_ms: u64 },

    #[error("Function '{name}' not found in code")]
    MissingEntry { name: String },

    #[error("Worker crashed: {detail}")]
    WorkerCrashed { detail: String },
}

/// "1", "2.5" — whole seconds without a trailing ".0".
pub(crate) fn format_seconds(ms: &u64) -> String {
    if ms % 1000 == 0 {
        format!("{}", ms / 1000)
    } else {
        format!("{}", *ms as f64 / 1000.0)
    }
}

/// Result type alias for raptorbox operations.
pub type Result<T> = std::result::Result<T, ExecutionFault>;
