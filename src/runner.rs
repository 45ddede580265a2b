//! Test runner: validates the submission, drives the supervisor one test
//! case at a time, compares results, and aggregates a suite verdict with
//! first-failure semantics.

use uuid::Uuid;

use crate::compare;
use crate::config::RunConfig;
use crate::exec::{self, CaseRun, WorkerPayload};
use crate::types::{ExecutionFault, Result, SuiteVerdict, TestCase, TestVerdict};

/// Entry-point name used when none can be extracted from a signature.
pub const DEFAULT_ENTRY_POINT: &str = "solution";

/// Check that the submission parses, without executing anything. Uses
/// the same front-end as the worker, so acceptance here guarantees the
/// worker will not hit a parse failure later.
pub fn validate_syntax(source: &str) -> Result<()> {
    if source.trim().is_empty() {
        return Err(ExecutionFault::Syntax {
            line: 1,
            message: "code is empty".to_string(),
        });
    }
    crate::lang::parse(source)?;
    Ok(())
}

/// Run a submission against its test suite.
///
/// Returns `Err` only for suite-level fatals (syntax, worker crash);
/// per-test failures live inside the verdict. Test cases are processed
/// in order and the suite stops at the first non-passing verdict.
pub fn run_suite(
    source: &str,
    test_cases: &[TestCase],
    entry_point: &str,
    config: &RunConfig,
) -> Result<SuiteVerdict> {
    let run_id = Uuid::new_v4();
    for warning in config.validate().warnings {
        log::warn!("run {}: {}", run_id, warning);
    }
    let deadline_ms = config.effective_deadline_ms();
    if deadline_ms != config.deadline_ms {
        log::warn!(
            "run {}: deadline_ms {} clamped to {}",
            run_id,
            config.deadline_ms,
            deadline_ms
        );
    }

    validate_syntax(source)?;
    log::info!(
        "run {}: {} test case(s), entry point '{}', {} ms deadline",
        run_id,
        test_cases.len(),
        entry_point,
        deadline_ms
    );

    let mut verdicts: Vec<TestVerdict> = Vec::new();
    let mut total_elapsed_ms = 0u64;

    for (index, test_case) in test_cases.iter().enumerate() {
        let payload = WorkerPayload {
            source: source.to_string(),
            // The fork boundary already isolates the child; the clone
            // keeps the caller's tree untouched on this side too.
            input: test_case.input.clone(),
            entry_point: entry_point.to_string(),
        };

        let verdict = match exec::run_one(payload, deadline_ms) {
            Err(fault) => {
                log::warn!("run {}: case {} aborted the suite: {}", run_id, index, fault);
                return Err(fault);
            }
            Ok(CaseRun::Faulted(fault @ ExecutionFault::Syntax { .. })) => {
                // The validator accepted what the worker rejected; that
                // is an infrastructure bug, not a submission failure.
                log::warn!("run {}: post-validation parse failure: {}", run_id, fault);
                return Err(fault);
            }
            Ok(CaseRun::Faulted(fault)) => TestVerdict {
                test_case: test_case.clone(),
                passed: false,
                actual: None,
                elapsed_ms: 0,
                error_message: Some(fault.to_string()),
            },
            Ok(CaseRun::TimedOut { deadline_ms }) => TestVerdict {
                test_case: test_case.clone(),
                passed: false,
                actual: None,
                elapsed_ms: deadline_ms,
                error_message: Some(ExecutionFault::Timeout { deadline_ms }.to_string()),
            },
            Ok(CaseRun::Completed { actual, elapsed_ms }) => {
                let passed = compare::values_equal(&actual, &test_case.expected);
                let error_message = if passed {
                    None
                } else {
                    Some(format!("Expected {}, got {}", test_case.expected, actual))
                };
                TestVerdict {
                    test_case: test_case.clone(),
                    passed,
                    actual: Some(actual),
                    elapsed_ms,
                    error_message,
                }
            }
        };

        total_elapsed_ms += verdict.elapsed_ms;
        let passed = verdict.passed;
        verdicts.push(verdict);
        if !passed {
            break;
        }
    }

    let passed_count = verdicts.iter().filter(|v| v.passed).count();
    let success = verdicts.len() == test_cases.len() && passed_count == verdicts.len();
    log::info!(
        "run {}: success={} ({}/{} passed, {} ms)",
        run_id,
        success,
        passed_count,
        test_cases.len(),
        total_elapsed_ms
    );

    Ok(SuiteVerdict {
        success,
        test_results: verdicts,
        total_elapsed_ms,
        passed_count,
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Extract the function name from a canonical signature string such as
/// `def two_sum(nums: list[int], target: int) -> list[int]:`. Falls back
/// to [`DEFAULT_ENTRY_POINT`] when no name can be found.
pub fn entry_point_from_signature(signature: &str) -> String {
    let mut rest = signature;
    while let Some(pos) = rest.find("def") {
        let boundary_before = rest[..pos]
            .chars()
            .next_back()
            .map(|c| !is_ident_char(c))
            .unwrap_or(true);
        let tail = &rest[pos + 3..];
        let boundary_after = tail.chars().next().map(char::is_whitespace).unwrap_or(false);
        if boundary_before && boundary_after {
            let candidate = tail.trim_start();
            let name: String = candidate.chars().take_while(|&c| is_ident_char(c)).collect();
            if !name.is_empty() && !name.chars().next().unwrap().is_ascii_digit() {
                return name;
            }
        }
        rest = tail;
    }
    DEFAULT_ENTRY_POINT.to_string()
}

/// Parameter names from a signature, in declaration order, with
/// annotations and defaults stripped and `self` skipped. Callers use
/// this to check test-case inputs against the declared parameters.
pub fn signature_param_names(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let inner = &signature[open + 1..];

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut closed = false;
    for c in inner.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    closed = true;
                    break;
                }
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !closed {
        return Vec::new();
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }

    parts
        .iter()
        .filter_map(|part| {
            let name: String = part
                .trim_start()
                .chars()
                .take_while(|&c| is_ident_char(c))
                .collect();
            if name.is_empty() || name == "self" {
                None
            } else {
                Some(name)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_code_passes_validation() {
        assert!(validate_syntax("def solution(x): return x * 2").is_ok());
        assert!(validate_syntax("def f(x):\n    y = x * 2\n    return y\n").is_ok());
    }

    #[test]
    fn empty_source_is_rejected_with_fixed_message() {
        for source in ["", "   ", "\n\t\n"] {
            let Err(ExecutionFault::Syntax { message, .. }) = validate_syntax(source) else {
                panic!("expected syntax fault for {:?}", source);
            };
            assert_eq!(message, "code is empty");
        }
    }

    #[test]
    fn missing_colon_is_rejected_with_line() {
        let Err(ExecutionFault::Syntax { line, .. }) =
            validate_syntax("x = 1\ndef f(x) return x\n")
        else {
            panic!("expected syntax fault");
        };
        assert_eq!(line, 2);
    }

    #[test]
    fn signature_name_extraction() {
        assert_eq!(entry_point_from_signature("def solution(x):"), "solution");
        assert_eq!(
            entry_point_from_signature("def two_sum(nums: list[int], target: int) -> list[int]:"),
            "two_sum"
        );
        assert_eq!(entry_point_from_signature("def   spaced (x):"), "spaced");
        assert_eq!(entry_point_from_signature("defx = 1"), "solution");
        assert_eq!(entry_point_from_signature("no function here"), "solution");
        assert_eq!(entry_point_from_signature(""), "solution");
    }

    #[test]
    fn signature_param_extraction() {
        assert_eq!(
            signature_param_names("def two_sum(nums: list[int], target: int) -> list[int]:"),
            vec!["nums", "target"]
        );
        assert_eq!(
            signature_param_names("def f(a, b=3, c='x,y'):"),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            signature_param_names("def method(self, x):"),
            vec!["x"]
        );
        assert!(signature_param_names("def f():").is_empty());
        assert!(signature_param_names("not a signature").is_empty());
    }
}
