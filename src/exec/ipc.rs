//! Reply-channel encoding between supervisor and worker.
//!
//! One JSON document travels worker → supervisor over the pipe; the
//! worker writes it immediately before exiting, so end-of-stream with no
//! decodable document means the worker died first.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::types::{DynamicValue, ExecutionFault};

/// The single message a worker ships back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireOutcome {
    Ok {
        actual: DynamicValue,
        elapsed_ms: u64,
    },
    Fault {
        fault: ExecutionFault,
    },
}

pub fn write_outcome(sink: &mut impl Write, outcome: &WireOutcome) -> io::Result<()> {
    let encoded = serde_json::to_vec(outcome)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    sink.write_all(&encoded)?;
    sink.flush()
}

/// Decode what the worker managed to write. `None` covers the empty and
/// torn-write cases alike; the supervisor reports both as a crash.
pub fn read_outcome(bytes: &[u8]) -> Option<WireOutcome> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips() {
        let outcome = WireOutcome::Ok {
            actual: DynamicValue::Seq(vec![DynamicValue::Int(1), DynamicValue::Text("x".into())]),
            elapsed_ms: 12,
        };
        let mut buffer = Vec::new();
        write_outcome(&mut buffer, &outcome).unwrap();
        assert_eq!(read_outcome(&buffer), Some(outcome));
    }

    #[test]
    fn fault_round_trips() {
        let outcome = WireOutcome::Fault {
            fault: ExecutionFault::MissingEntry {
                name: "solution".into(),
            },
        };
        let mut buffer = Vec::new();
        write_outcome(&mut buffer, &outcome).unwrap();
        assert_eq!(read_outcome(&buffer), Some(outcome));
    }

    #[test]
    fn empty_and_torn_payloads_decode_to_none() {
        assert_eq!(read_outcome(b""), None);
        let outcome = WireOutcome::Ok {
            actual: DynamicValue::Int(5),
            elapsed_ms: 1,
        };
        let mut buffer = Vec::new();
        write_outcome(&mut buffer, &outcome).unwrap();
        buffer.truncate(buffer.len() / 2);
        assert_eq!(read_outcome(&buffer), None);
    }
}
