//! Supervisor: owns one worker process per test case and enforces the
//! wall-clock deadline.
//!
//! A dedicated waiter thread blocks in waitpid and reports through a
//! bounded channel; the supervisor waits on that channel with a timeout.
//! On deadline it escalates SIGTERM → grace → SIGKILL, and never returns
//! while the child is still runnable.

use std::fs::File;
use std::io::Read;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, pipe, ForkResult, Pid};

use crate::exec::ipc::{self, WireOutcome};
use crate::exec::worker::{self, WorkerPayload};
use crate::types::{DynamicValue, ExecutionFault, Result};

/// How long a worker gets between SIGTERM and SIGKILL.
pub const TERMINATION_GRACE_MS: u64 = 100;

/// What one supervised execution produced. Comparison against the
/// expected value happens in the runner, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseRun {
    Completed { actual: DynamicValue, elapsed_ms: u64 },
    Faulted(ExecutionFault),
    TimedOut { deadline_ms: u64 },
}

fn crashed(detail: impl Into<String>) -> ExecutionFault {
    ExecutionFault::WorkerCrashed {
        detail: detail.into(),
    }
}

/// Run one test case in a fresh worker process, bounded by `deadline_ms`
/// of wall-clock time. The only error this returns is `WorkerCrashed`;
/// all submission-level failures come back as [`CaseRun`] values.
pub fn run_one(payload: WorkerPayload, deadline_ms: u64) -> Result<CaseRun> {
    let (reply_read, reply_write) =
        pipe().map_err(|e| crashed(format!("reply pipe creation failed: {}", e)))?;

    match unsafe { fork() } {
        Err(e) => Err(crashed(format!("fork failed: {}", e))),
        Ok(ForkResult::Child) => {
            drop(reply_read);
            worker::worker_main(payload, File::from(reply_write))
        }
        Ok(ForkResult::Parent { child }) => {
            // The parent's copy of the write end must go away now, or
            // reading the reply would never see end-of-stream.
            drop(reply_write);
            supervise(child, File::from(reply_read), deadline_ms)
        }
    }
}

fn supervise(child: Pid, reply: File, deadline_ms: u64) -> Result<CaseRun> {
    let (exit_tx, exit_rx) = crossbeam_channel::bounded::<nix::Result<WaitStatus>>(1);
    let waiter = thread::spawn(move || {
        let status = loop {
            match waitpid(child, None) {
                Err(Errno::EINTR) => continue,
                other => break other,
            }
        };
        let _ = exit_tx.send(status);
    });

    // Drain the reply pipe concurrently, so a worker writing an outcome
    // larger than the pipe buffer cannot wedge against a supervisor that
    // only reads after exit.
    let reader = thread::spawn(move || {
        let mut reply = reply;
        let mut bytes = Vec::new();
        let _ = reply.read_to_end(&mut bytes);
        bytes
    });

    let outcome = match exit_rx.recv_timeout(Duration::from_millis(deadline_ms)) {
        Ok(Ok(status)) => {
            log::debug!("worker {} exited with {:?}", child, status);
            let bytes = reader.join().unwrap_or_default();
            decode_reply(&bytes)
        }
        Ok(Err(e)) => {
            let _ = reader.join();
            Err(crashed(format!("waitpid failed: {}", e)))
        }
        Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
            log::warn!(
                "worker {} exceeded {} ms deadline, terminating",
                child,
                deadline_ms
            );
            terminate(child, &exit_rx);
            let _ = reader.join();
            Ok(CaseRun::TimedOut { deadline_ms })
        }
        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
            let _ = reader.join();
            Err(crashed("supervisor channel closed unexpectedly"))
        }
    };

    let _ = waiter.join();
    outcome
}

fn decode_reply(bytes: &[u8]) -> Result<CaseRun> {
    match ipc::read_outcome(bytes) {
        Some(WireOutcome::Ok { actual, elapsed_ms }) => Ok(CaseRun::Completed { actual, elapsed_ms }),
        Some(WireOutcome::Fault {
            fault: fault @ ExecutionFault::WorkerCrashed { .. },
        }) => Err(fault),
        Some(WireOutcome::Fault { fault }) => Ok(CaseRun::Faulted(fault)),
        None => Err(crashed("no outcome from worker")),
    }
}

/// SIGTERM, a bounded grace interval, then SIGKILL. Safe to run against a
/// child that already exited: signal errors on a reaped pid are ignored.
fn terminate(child: Pid, exit_rx: &crossbeam_channel::Receiver<nix::Result<WaitStatus>>) {
    let _ = kill(child, Signal::SIGTERM);
    if exit_rx
        .recv_timeout(Duration::from_millis(TERMINATION_GRACE_MS))
        .is_ok()
    {
        return;
    }
    log::warn!("worker {} survived SIGTERM, sending SIGKILL", child);
    let _ = kill(child, Signal::SIGKILL);
    // SIGKILL cannot be ignored; the waiter's waitpid must return.
    let _ = exit_rx.recv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Instant;

    fn payload(source: &str, input: &[(&str, DynamicValue)]) -> WorkerPayload {
        WorkerPayload {
            source: source.to_string(),
            input: input
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            entry_point: "solution".to_string(),
        }
    }

    #[test]
    fn completed_run_returns_the_actual_value() {
        let run = run_one(
            payload("def solution(x): return x * 2", &[("x", DynamicValue::Int(21))]),
            2000,
        )
        .unwrap();
        let CaseRun::Completed { actual, .. } = run else {
            panic!("expected completion, got {:?}", run);
        };
        assert_eq!(actual, DynamicValue::Int(42));
    }

    #[test]
    fn worker_faults_come_back_as_values() {
        let run = run_one(
            payload("def solution(x): return 1 / 0", &[("x", DynamicValue::Int(1))]),
            2000,
        )
        .unwrap();
        let CaseRun::Faulted(ExecutionFault::Runtime { exception, .. }) = run else {
            panic!("expected runtime fault, got {:?}", run);
        };
        assert_eq!(exception, "ZeroDivisionError");
    }

    #[test]
    fn infinite_loop_is_killed_at_the_deadline() {
        let started = Instant::now();
        let run = run_one(
            payload(
                "def solution(x):\n    while True:\n        pass\n",
                &[("x", DynamicValue::Int(0))],
            ),
            500,
        )
        .unwrap();
        let elapsed = started.elapsed();
        assert_eq!(run, CaseRun::TimedOut { deadline_ms: 500 });
        // Deadline plus grace plus spawn/reap slack.
        assert!(
            elapsed < Duration::from_millis(2000),
            "took {:?}, expected well under 2 s",
            elapsed
        );
        assert!(elapsed >= Duration::from_millis(500));
    }

    #[test]
    fn timeout_termination_reaps_the_child() {
        let run = run_one(
            payload(
                "def solution():\n    while True:\n        pass\n",
                &[],
            ),
            300,
        )
        .unwrap();
        assert!(matches!(run, CaseRun::TimedOut { .. }));
        // A second run immediately afterwards must not be affected by
        // leftover children.
        let run = run_one(payload("def solution(): return 1", &[]), 2000).unwrap();
        assert!(matches!(run, CaseRun::Completed { .. }));
    }

    #[test]
    fn fast_functions_finish_well_before_the_deadline() {
        let started = Instant::now();
        let run = run_one(payload("def solution(): return 7", &[]), 10_000).unwrap();
        assert!(matches!(run, CaseRun::Completed { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
