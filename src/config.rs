//! Per-run limits recognized by the execution core.

use serde::{Deserialize, Serialize};

/// Deadline applied when the caller does not supply one.
pub const DEFAULT_DEADLINE_MS: u64 = 5000;
/// Lower bound on a per-test deadline.
pub const MIN_DEADLINE_MS: u64 = 1;
/// Upper bound on a per-test deadline.
pub const MAX_DEADLINE_MS: u64 = 60_000;

/// Limits for one `run_suite` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock budget per test case, milliseconds. Values outside
    /// [`MIN_DEADLINE_MS`, `MAX_DEADLINE_MS`] are clamped at use.
    pub deadline_ms: u64,
    /// Advisory memory hint, reserved for platform-level enforcement.
    /// The core records it but never acts on it.
    pub memory_hint_mb: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_DEADLINE_MS,
            memory_hint_mb: None,
        }
    }
}

/// Validation outcome with detailed errors and warnings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl RunConfig {
    pub fn with_deadline_ms(deadline_ms: u64) -> Self {
        Self {
            deadline_ms,
            ..Self::default()
        }
    }

    /// Validate the configuration without mutating it.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.deadline_ms < MIN_DEADLINE_MS {
            result.add_error(format!(
                "deadline_ms {} is below the minimum of {} ms",
                self.deadline_ms, MIN_DEADLINE_MS
            ));
        }
        if self.deadline_ms > MAX_DEADLINE_MS {
            result.add_error(format!(
                "deadline_ms {} exceeds the maximum of {} ms",
                self.deadline_ms, MAX_DEADLINE_MS
            ));
        }
        if self.deadline_ms < 50 && self.deadline_ms >= MIN_DEADLINE_MS {
            result.add_warning(format!(
                "deadline_ms {} is very low; process spawn alone may exceed it",
                self.deadline_ms
            ));
        }
        if let Some(hint) = self.memory_hint_mb {
            if hint == 0 {
                result.add_error("memory_hint_mb cannot be zero".to_string());
            }
        }

        result
    }

    /// Deadline with the [1, 60000] bound applied.
    pub fn effective_deadline_ms(&self) -> u64 {
        self.deadline_ms.clamp(MIN_DEADLINE_MS, MAX_DEADLINE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deadline_is_five_seconds() {
        assert_eq!(RunConfig::default().deadline_ms, 5000);
    }

    #[test]
    fn out_of_range_deadlines_are_clamped() {
        assert_eq!(RunConfig::with_deadline_ms(0).effective_deadline_ms(), 1);
        assert_eq!(
            RunConfig::with_deadline_ms(90_000).effective_deadline_ms(),
            60_000
        );
        assert_eq!(
            RunConfig::with_deadline_ms(2500).effective_deadline_ms(),
            2500
        );
    }

    #[test]
    fn validate_flags_zero_and_oversized_deadlines() {
        let result = RunConfig::with_deadline_ms(0).validate();
        assert!(!result.is_valid());

        let result = RunConfig::with_deadline_ms(120_000).validate();
        assert!(!result.is_valid());

        let result = RunConfig::default().validate();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn tiny_deadline_warns_but_remains_valid() {
        let result = RunConfig::with_deadline_ms(5).validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }
}
