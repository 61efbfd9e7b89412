//! Attempt outcomes.

use std::time::Duration;

use chrono::Utc;

use crate::ledger::LedgerRow;
use crate::phone::PhoneNumber;

use super::state::FlowState;

// ============================================================================
// Outcome
// ============================================================================

/// The terminal result of one attempt.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Identifier the attempt consumed.
    pub phone: PhoneNumber,
    /// Whether the whole wizard completed.
    pub succeeded: bool,
    /// Furthest state the attempt reached.
    pub step_reached: FlowState,
    /// Why the attempt failed, when it did.
    pub failure_reason: Option<String>,
    /// Wall-clock attempt duration.
    pub duration: Duration,
}

impl Outcome {
    /// A completed attempt.
    #[must_use]
    pub fn success(phone: PhoneNumber, duration: Duration) -> Self {
        Self {
            phone,
            succeeded: true,
            step_reached: FlowState::Completed,
            failure_reason: None,
            duration,
        }
    }

    /// A failed attempt, recording how far it got and why it stopped.
    #[must_use]
    pub fn failure(
        phone: PhoneNumber,
        step_reached: FlowState,
        reason: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            phone,
            succeeded: false,
            step_reached,
            failure_reason: Some(reason.into()),
            duration,
        }
    }

    /// Renders the outcome as a ledger row.
    #[must_use]
    pub fn to_row(&self) -> LedgerRow {
        LedgerRow {
            identifier: self.phone.digits().to_string(),
            timestamp: Utc::now(),
            succeeded: self.succeeded,
            step_reached: self.step_reached.as_str().to_string(),
            reason: self.failure_reason.clone().unwrap_or_default(),
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_row() {
        let phone = PhoneNumber::parse("+15550001234").unwrap();
        let row = Outcome::success(phone, Duration::from_millis(4_200)).to_row();
        assert_eq!(row.identifier, "15550001234");
        assert!(row.succeeded);
        assert_eq!(row.step_reached, "completed");
        assert!(row.reason.is_empty());
        assert_eq!(row.duration_ms, 4_200);
    }

    #[test]
    fn test_failure_row_carries_reason_and_step() {
        let phone = PhoneNumber::parse("+380501112233").unwrap();
        let outcome = Outcome::failure(
            phone,
            FlowState::PhoneSubmitted,
            "too many attempts",
            Duration::from_millis(900),
        );
        let row = outcome.to_row();
        assert!(!row.succeeded);
        assert_eq!(row.step_reached, "phone_submitted");
        assert_eq!(row.reason, "too many attempts");
    }
}
