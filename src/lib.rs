//! raptorbox: the isolated execution core of PracticeRaptor
//!
//! Takes a user submission plus a suite of test cases, runs each case in
//! a supervised child process under a wall-clock deadline, and produces
//! structured per-test verdicts with first-failure semantics. Submissions
//! execute inside an embedded interpreter whose global table is a fixed
//! whitelist; nothing outside it resolves.
//!
//! The two public operations are [`validate_syntax`] and [`run_suite`];
//! everything else supports them.

pub mod compare;
pub mod config;
pub mod exec;
pub mod lang;
pub mod runner;
pub mod types;

pub use compare::{values_equal, FLOAT_TOLERANCE};
pub use config::{RunConfig, DEFAULT_DEADLINE_MS, MAX_DEADLINE_MS, MIN_DEADLINE_MS};
pub use runner::{
    entry_point_from_signature, run_suite, signature_param_names, validate_syntax,
    DEFAULT_ENTRY_POINT,
};
pub use types::{
    DynamicValue, ExecutionFault, Result, SuiteVerdict, TestCase, TestVerdict,
};
