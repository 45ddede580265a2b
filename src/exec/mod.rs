//! Process-isolated execution: the supervisor/worker pair and their
//! reply-channel encoding.

pub mod ipc;
pub mod supervisor;
pub mod worker;

pub use supervisor::{run_one, CaseRun, TERMINATION_GRACE_MS};
pub use worker::WorkerPayload;
