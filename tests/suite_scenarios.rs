//! End-to-end scenarios for the execution core.
//!
//! These run real supervised child processes, so they exercise the whole
//! path: validation, sandbox install, entry-point invocation, deadline
//! enforcement, comparison, and suite aggregation.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use raptorbox::{
    run_suite, validate_syntax, DynamicValue, ExecutionFault, RunConfig, SuiteVerdict, TestCase,
};

fn case(input: &[(&str, DynamicValue)], expected: DynamicValue) -> TestCase {
    let input: BTreeMap<String, DynamicValue> = input
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    TestCase::new(input, expected)
}

fn run(source: &str, cases: &[TestCase], deadline_ms: u64) -> SuiteVerdict {
    let _ = env_logger::builder().is_test(true).try_init();
    run_suite(
        source,
        cases,
        "solution",
        &RunConfig::with_deadline_ms(deadline_ms),
    )
    .expect("suite should not fail at the suite level")
}

#[test]
fn correct_solution_single_case() {
    let verdict = run(
        "def solution(x): return x * 2",
        &[case(&[("x", DynamicValue::Int(5))], DynamicValue::Int(10))],
        2000,
    );
    assert!(verdict.success);
    assert_eq!(verdict.test_results.len(), 1);
    assert!(verdict.test_results[0].passed);
    assert_eq!(verdict.test_results[0].actual, Some(DynamicValue::Int(10)));
    assert_eq!(verdict.passed_count, 1);
}

#[test]
fn wrong_answer_reports_expected_and_actual() {
    let verdict = run(
        "def solution(x): return x + 1",
        &[case(&[("x", DynamicValue::Int(5))], DynamicValue::Int(10))],
        2000,
    );
    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert!(!result.passed);
    assert_eq!(result.actual, Some(DynamicValue::Int(6)));
    let message = result.error_message.as_deref().unwrap();
    assert!(message.contains("10"), "message was: {}", message);
    assert!(message.contains('6'), "message was: {}", message);
}

#[test]
fn timeout_kills_the_worker_near_the_deadline() {
    let started = Instant::now();
    let verdict = run(
        "def solution(x):\n    while True:\n        pass\n",
        &[case(&[("x", DynamicValue::Int(0))], DynamicValue::Int(0))],
        1000,
    );
    let wall = started.elapsed();

    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert!(!result.passed);
    assert!(result.actual.is_none());
    assert!(
        result.error_message.as_deref().unwrap().starts_with("Timeout"),
        "message was: {:?}",
        result.error_message
    );
    assert_eq!(result.elapsed_ms, 1000);
    assert!(
        wall < Duration::from_millis(3000),
        "suite took {:?}, expected ~1 s plus grace",
        wall
    );
}

#[test]
fn runtime_error_surfaces_the_exception_name() {
    let verdict = run(
        "def solution(x): return 1 / 0",
        &[case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(0))],
        2000,
    );
    assert!(!verdict.success);
    let message = verdict.test_results[0]
        .error_message
        .as_deref()
        .unwrap()
        .to_lowercase();
    assert!(message.contains("zerodivision"), "message was: {}", message);
}

#[test]
fn missing_entry_point_fails_with_fixed_message() {
    let verdict = run(
        "def other(x): return x",
        &[case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(1))],
        2000,
    );
    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert!(result.actual.is_none());
    assert_eq!(result.elapsed_ms, 0);
    assert_eq!(
        result.error_message.as_deref().unwrap(),
        "Function 'solution' not found in code"
    );
}

#[test]
fn float_results_compare_with_tolerance() {
    let verdict = run(
        "def solution(): return 0.1 + 0.2",
        &[case(&[], DynamicValue::Float(0.3))],
        2000,
    );
    assert!(verdict.success, "0.1 + 0.2 should equal 0.3 within 1e-9");
}

#[test]
fn sandbox_rejects_import() {
    let verdict = run(
        "import os\ndef solution(): return 0\n",
        &[case(&[], DynamicValue::Int(0))],
        2000,
    );
    assert!(!verdict.success);
    let message = verdict.test_results[0].error_message.as_deref().unwrap();
    assert!(
        message.contains("os") || message.to_lowercase().contains("import"),
        "message was: {}",
        message
    );
}

#[test]
fn sandbox_hides_dangerous_builtins() {
    let verdict = run(
        "def solution(): return open('/etc/passwd')",
        &[case(&[], DynamicValue::Int(0))],
        2000,
    );
    assert!(!verdict.success);
    let message = verdict.test_results[0].error_message.as_deref().unwrap();
    assert!(
        message.contains("NameError") && message.contains("open"),
        "message was: {}",
        message
    );
}

#[test]
fn syntax_fault_is_suite_level_with_no_verdicts() {
    let fault = run_suite(
        "def solution(x) return x",
        &[case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(1))],
        "solution",
        &RunConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(fault, ExecutionFault::Syntax { .. }));
}

#[test]
fn empty_source_reports_code_is_empty() {
    let Err(ExecutionFault::Syntax { message, .. }) = validate_syntax("   \n  ") else {
        panic!("expected syntax fault");
    };
    assert_eq!(message, "code is empty");
}

#[test]
fn suite_stops_at_first_failure_and_keeps_order() {
    let cases = [
        case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(1)),
        case(&[("x", DynamicValue::Int(2))], DynamicValue::Int(99)),
        case(&[("x", DynamicValue::Int(3))], DynamicValue::Int(3)),
    ];
    let verdict = run("def solution(x): return x", &cases, 2000);

    assert!(!verdict.success);
    assert_eq!(verdict.test_results.len(), 2, "third case must not run");
    assert!(verdict.test_results[0].passed);
    assert!(!verdict.test_results[1].passed);
    assert_eq!(verdict.test_results[0].test_case, cases[0]);
    assert_eq!(verdict.test_results[1].test_case, cases[1]);
    assert_eq!(verdict.passed_count, 1);
}

#[test]
fn all_cases_pass_in_order() {
    let cases = [
        case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(2)),
        case(&[("x", DynamicValue::Int(5))], DynamicValue::Int(10)),
        case(&[("x", DynamicValue::Int(0))], DynamicValue::Int(0)),
    ];
    let verdict = run("def solution(x): return x * 2", &cases, 2000);

    assert!(verdict.success);
    assert_eq!(verdict.test_results.len(), 3);
    assert_eq!(verdict.passed_count, 3);
    let sum: u64 = verdict.test_results.iter().map(|r| r.elapsed_ms).sum();
    assert_eq!(verdict.total_elapsed_ms, sum);
    for result in &verdict.test_results {
        assert!(result.elapsed_ms <= 2000 + 200, "elapsed within deadline + grace");
    }
}

#[test]
fn caller_test_cases_are_not_mutated() {
    let original = case(
        &[(
            "xs",
            DynamicValue::Seq(vec![DynamicValue::Int(1), DynamicValue::Int(2)]),
        )],
        DynamicValue::Int(0),
    );
    let snapshot = original.clone();
    // The submission mutates its input aggressively.
    let _ = run(
        "def solution(xs):\n    xs.append(99)\n    xs[0] = -1\n    return 0\n",
        &[original.clone()],
        2000,
    );
    assert_eq!(original, snapshot);
}

#[test]
fn deterministic_code_gives_identical_outcomes() {
    let source = "def solution(xs): return sorted(xs)";
    let cases = [case(
        &[(
            "xs",
            DynamicValue::Seq(vec![
                DynamicValue::Int(3),
                DynamicValue::Int(1),
                DynamicValue::Int(2),
            ]),
        )],
        DynamicValue::Seq(vec![
            DynamicValue::Int(1),
            DynamicValue::Int(2),
            DynamicValue::Int(3),
        ]),
    )];

    let first = run(source, &cases, 2000);
    let second = run(source, &cases, 2000);
    assert_eq!(first.success, second.success);
    let pattern = |v: &SuiteVerdict| -> Vec<(bool, Option<DynamicValue>)> {
        v.test_results
            .iter()
            .map(|r| (r.passed, r.actual.clone()))
            .collect()
    };
    assert_eq!(pattern(&first), pattern(&second));
}

#[test]
fn structured_values_cross_the_boundary_losslessly() {
    let mut expected_map = BTreeMap::new();
    expected_map.insert(
        "evens".to_string(),
        DynamicValue::Seq(vec![DynamicValue::Int(0), DynamicValue::Int(2)]),
    );
    expected_map.insert("count".to_string(), DynamicValue::Int(2));

    let verdict = run(
        concat!(
            "def solution(limit):\n",
            "    evens = [n for n in range(limit) if n % 2 == 0]\n",
            "    return {'evens': evens, 'count': len(evens)}\n",
        ),
        &[case(
            &[("limit", DynamicValue::Int(4))],
            DynamicValue::Map(expected_map),
        )],
        2000,
    );
    assert!(verdict.success, "verdict: {:?}", verdict.test_results[0]);
}

#[test]
fn tuples_and_lists_compare_equal_across_the_boundary() {
    let verdict = run(
        "def solution(): return (1, 2)",
        &[case(
            &[],
            DynamicValue::Seq(vec![DynamicValue::Int(1), DynamicValue::Int(2)]),
        )],
        2000,
    );
    assert!(verdict.success);
}

#[test]
fn second_case_after_timeout_is_not_run() {
    let cases = [
        case(&[("x", DynamicValue::Int(0))], DynamicValue::Int(0)),
        case(&[("x", DynamicValue::Int(1))], DynamicValue::Int(1)),
    ];
    let verdict = run(
        "def solution(x):\n    while True:\n        pass\n",
        &cases,
        500,
    );
    assert!(!verdict.success);
    assert_eq!(verdict.test_results.len(), 1);
}

#[test]
fn submissions_can_use_helpers_and_recursion() {
    let verdict = run(
        concat!(
            "def fib(n):\n",
            "    if n < 2:\n",
            "        return n\n",
            "    return fib(n - 1) + fib(n - 2)\n",
            "\n",
            "def solution(n):\n",
            "    return fib(n)\n",
        ),
        &[case(&[("n", DynamicValue::Int(10))], DynamicValue::Int(55))],
        5000,
    );
    assert!(verdict.success);
}

#[test]
fn exceptions_raised_and_caught_inside_the_sandbox() {
    let verdict = run(
        concat!(
            "def solution(x):\n",
            "    try:\n",
            "        if x < 0:\n",
            "            raise ValueError('negative')\n",
            "        return x\n",
            "    except ValueError:\n",
            "        return -1\n",
        ),
        &[case(&[("x", DynamicValue::Int(-5))], DynamicValue::Int(-1))],
        2000,
    );
    assert!(verdict.success);
}

#[test]
fn deadline_is_clamped_into_bounds() {
    // A deadline of 0 would otherwise kill every worker instantly; the
    // clamp floors it at 1 ms, and an oversized value is capped.
    let config = RunConfig::with_deadline_ms(1_000_000);
    assert_eq!(config.effective_deadline_ms(), 60_000);
}
