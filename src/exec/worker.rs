//! Child-worker body: everything that happens inside the forked process.
//!
//! The worker installs the sandbox, evaluates the submission, invokes the
//! entry point with the test input as keyword arguments, and ships one
//! outcome back over the reply pipe before exiting. It never sees the
//! expected value; comparison belongs to the runner.

use std::collections::BTreeMap;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::time::Instant;

use crate::exec::ipc::{self, WireOutcome};
use crate::lang::convert::{input_to_kwargs, value_to_dynamic};
use crate::lang::interp::Interp;
use crate::types::{DynamicValue, ExecutionFault};

/// Stack for the evaluation thread. Sized so the interpreter's recursion
/// limit is reached long before the OS stack runs out.
const EVAL_STACK_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct WorkerPayload {
    pub source: String,
    pub input: BTreeMap<String, DynamicValue>,
    pub entry_point: String,
}

/// Entry point of the forked child. Writes exactly one outcome to the
/// pipe and exits without returning to the caller's stack.
pub fn worker_main(payload: WorkerPayload, mut pipe: File) -> ! {
    close_inherited_fds(pipe.as_raw_fd());
    let outcome = run_in_eval_thread(payload);
    let exit_code = match ipc::write_outcome(&mut pipe, &outcome) {
        Ok(()) => 0,
        Err(e) => {
            // Best effort: tell the supervisor why the real outcome never
            // arrived. A torn first write leaves the pipe undecodable and
            // the supervisor reports the crash from that.
            let fallback = WireOutcome::Fault {
                fault: ExecutionFault::WorkerCrashed {
                    detail: format!("outcome write failed: {}", e),
                },
            };
            match ipc::write_outcome(&mut pipe, &fallback) {
                Ok(()) => 0,
                Err(_) => 1,
            }
        }
    };
    drop(pipe);
    // Skip atexit machinery inherited from the parent.
    unsafe { libc::_exit(exit_code) }
}

/// Drop every descriptor forked over from the parent except stdio and
/// the reply pipe. Holding a copy of another supervisor's pipe would
/// keep that pipe from reaching end-of-stream.
fn close_inherited_fds(keep: i32) {
    let Ok(entries) = std::fs::read_dir("/proc/self/fd") else {
        return;
    };
    let fds: Vec<i32> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_string_lossy().parse().ok())
        .collect();
    for fd in fds {
        if fd > 2 && fd != keep {
            unsafe { libc::close(fd) };
        }
    }
}

/// Run the submission on a dedicated big-stack thread so deep user
/// recursion hits the interpreter's RecursionError, not the OS guard
/// page.
fn run_in_eval_thread(payload: WorkerPayload) -> WireOutcome {
    let handle = std::thread::Builder::new()
        .stack_size(EVAL_STACK_BYTES)
        .spawn(move || execute(&payload));
    match handle {
        Ok(joinable) => joinable.join().unwrap_or(WireOutcome::Fault {
            fault: ExecutionFault::WorkerCrashed {
                detail: "evaluation thread panicked".to_string(),
            },
        }),
        Err(e) => WireOutcome::Fault {
            fault: ExecutionFault::WorkerCrashed {
                detail: format!("failed to start evaluation thread: {}", e),
            },
        },
    }
}

fn execute(payload: &WorkerPayload) -> WireOutcome {
    let module = match crate::lang::parse(&payload.source) {
        Ok(module) => module,
        Err(err) => {
            return WireOutcome::Fault { fault: err.into() };
        }
    };

    let mut interp = Interp::new();
    if let Err(exc) = interp.run_module(&module) {
        return WireOutcome::Fault {
            fault: ExecutionFault::Runtime {
                exception: exc.ty.name().to_string(),
                message: exc.message,
            },
        };
    }

    let Some(entry) = interp.global_lookup(&payload.entry_point) else {
        return WireOutcome::Fault {
            fault: ExecutionFault::MissingEntry {
                name: payload.entry_point.clone(),
            },
        };
    };

    let kwargs = input_to_kwargs(&payload.input);
    let started = Instant::now();
    let returned = interp.call_callable(&entry, Vec::new(), kwargs);
    let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0).round().max(0.0) as u64;

    match returned {
        Ok(value) => match value_to_dynamic(&value) {
            Ok(actual) => WireOutcome::Ok { actual, elapsed_ms },
            Err(exc) => WireOutcome::Fault {
                fault: ExecutionFault::Runtime {
                    exception: exc.ty.name().to_string(),
                    message: exc.message,
                },
            },
        },
        Err(exc) => WireOutcome::Fault {
            fault: ExecutionFault::Runtime {
                exception: exc.ty.name().to_string(),
                message: exc.message,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(source: &str, entry: &str, input: &[(&str, DynamicValue)]) -> WorkerPayload {
        WorkerPayload {
            source: source.to_string(),
            input: input
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            entry_point: entry.to_string(),
        }
    }

    #[test]
    fn successful_invocation_reports_actual_and_elapsed() {
        let outcome = execute(&payload(
            "def solution(x): return x * 2",
            "solution",
            &[("x", DynamicValue::Int(5))],
        ));
        let WireOutcome::Ok { actual, .. } = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(actual, DynamicValue::Int(10));
    }

    #[test]
    fn missing_entry_point_is_reported_by_name() {
        let outcome = execute(&payload("def other(x): return x", "solution", &[]));
        assert_eq!(
            outcome,
            WireOutcome::Fault {
                fault: ExecutionFault::MissingEntry {
                    name: "solution".to_string()
                }
            }
        );
    }

    #[test]
    fn runtime_errors_carry_the_exception_name() {
        let outcome = execute(&payload(
            "def solution(x): return 1 / 0",
            "solution",
            &[("x", DynamicValue::Int(1))],
        ));
        let WireOutcome::Fault {
            fault: ExecutionFault::Runtime { exception, message },
        } = outcome
        else {
            panic!("expected runtime fault");
        };
        assert_eq!(exception, "ZeroDivisionError");
        assert_eq!(message, "division by zero");
    }

    #[test]
    fn import_attempts_surface_as_runtime_faults() {
        let outcome = execute(&payload(
            "import os\ndef solution(): return 0\n",
            "solution",
            &[],
        ));
        let WireOutcome::Fault {
            fault: ExecutionFault::Runtime { exception, message },
        } = outcome
        else {
            panic!("expected runtime fault");
        };
        assert_eq!(exception, "ImportError");
        assert!(message.contains("os"));
    }

    #[test]
    fn parse_failures_surface_as_syntax_faults() {
        let outcome = execute(&payload("def solution(x) return x", "solution", &[]));
        assert!(matches!(
            outcome,
            WireOutcome::Fault {
                fault: ExecutionFault::Syntax { .. }
            }
        ));
    }

    #[test]
    fn entry_point_receives_keyword_arguments() {
        let outcome = execute(&payload(
            "def solution(a, b): return a - b",
            "solution",
            &[("a", DynamicValue::Int(10)), ("b", DynamicValue::Int(4))],
        ));
        let WireOutcome::Ok { actual, .. } = outcome else {
            panic!("expected success");
        };
        assert_eq!(actual, DynamicValue::Int(6));
    }

    #[test]
    fn non_finite_float_returns_are_runtime_faults() {
        for source in [
            "def solution(): return float('nan')",
            "def solution(): return float('inf')",
            "def solution(): return 1e308 * 10",
        ] {
            let outcome = execute(&payload(source, "solution", &[]));
            let WireOutcome::Fault {
                fault: ExecutionFault::Runtime { message, .. },
            } = outcome
            else {
                panic!("expected runtime fault for {:?}", source);
            };
            assert!(
                message.contains("not representable"),
                "message was: {}",
                message
            );
        }
    }

    #[test]
    fn non_data_return_values_are_runtime_faults() {
        let outcome = execute(&payload(
            "def solution(): return len",
            "solution",
            &[],
        ));
        assert!(matches!(
            outcome,
            WireOutcome::Fault {
                fault: ExecutionFault::Runtime { .. }
            }
        ));
    }
}
