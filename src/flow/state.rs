//! Flow state machine.
//!
//! The attempt advances through an explicit linear state machine; the
//! furthest state reached is recorded with every outcome, success or not,
//! so operators can see exactly where attempts die.
//!
//! Transitions are a pure function. Illegal transitions return `None`
//! instead of panicking; the controller treats that as a bug signal and
//! holds the current state.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// FlowState
// ============================================================================

/// Attempt progress states, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Attempt created, session not yet usable.
    Initialized,
    /// Signup page loaded and the form rendered.
    Navigated,
    /// Phone number submitted, classifier window open.
    PhoneSubmitted,
    /// Code dispatch confirmed, waiting for the code.
    OtpPending,
    /// Code accepted, profile form rendered.
    OtpVerified,
    /// Profile submitted.
    ProfileSubmitted,
    /// Signup confirmed. Terminal.
    Completed,
    /// Attempt failed at whatever state it reached. Terminal.
    Rejected,
}

impl FlowState {
    /// Whether the state accepts no further events.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Snake-case name used in logs and ledger rows.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Navigated => "navigated",
            Self::PhoneSubmitted => "phone_submitted",
            Self::OtpPending => "otp_pending",
            Self::OtpVerified => "otp_verified",
            Self::ProfileSubmitted => "profile_submitted",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FlowEvent
// ============================================================================

/// Events that move the attempt forward, or end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// The signup form rendered.
    PageLoaded,
    /// The phone number went in and was submitted.
    PhoneSubmitted,
    /// The classifier confirmed the code was dispatched.
    CodeDispatched,
    /// The site accepted the entered code.
    CodeAccepted,
    /// The profile form was submitted.
    ProfileSubmitted,
    /// The signup was confirmed complete.
    Confirmed,
    /// The attempt failed, from any live state.
    Failed,
}

// ============================================================================
// transition
// ============================================================================

/// Pure transition function. `None` means the event is illegal in the
/// given state; terminal states accept nothing.
#[must_use]
pub fn transition(state: FlowState, event: FlowEvent) -> Option<FlowState> {
    use FlowEvent as E;
    use FlowState as S;

    if state.is_terminal() {
        return None;
    }
    match (state, event) {
        (_, E::Failed) => Some(S::Rejected),
        (S::Initialized, E::PageLoaded) => Some(S::Navigated),
        (S::Navigated, E::PhoneSubmitted) => Some(S::PhoneSubmitted),
        (S::PhoneSubmitted, E::CodeDispatched) => Some(S::OtpPending),
        (S::OtpPending, E::CodeAccepted) => Some(S::OtpVerified),
        (S::OtpVerified, E::ProfileSubmitted) => Some(S::ProfileSubmitted),
        (S::ProfileSubmitted, E::Confirmed) => Some(S::Completed),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_order() {
        let path = [
            (FlowEvent::PageLoaded, FlowState::Navigated),
            (FlowEvent::PhoneSubmitted, FlowState::PhoneSubmitted),
            (FlowEvent::CodeDispatched, FlowState::OtpPending),
            (FlowEvent::CodeAccepted, FlowState::OtpVerified),
            (FlowEvent::ProfileSubmitted, FlowState::ProfileSubmitted),
            (FlowEvent::Confirmed, FlowState::Completed),
        ];
        let mut state = FlowState::Initialized;
        for (event, expected) in path {
            state = transition(state, event).unwrap();
            assert_eq!(state, expected);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failure_from_any_live_state() {
        for state in [
            FlowState::Initialized,
            FlowState::Navigated,
            FlowState::PhoneSubmitted,
            FlowState::OtpPending,
            FlowState::OtpVerified,
            FlowState::ProfileSubmitted,
        ] {
            assert_eq!(
                transition(state, FlowEvent::Failed),
                Some(FlowState::Rejected)
            );
        }
    }

    #[test]
    fn test_no_state_skipping() {
        assert_eq!(
            transition(FlowState::Initialized, FlowEvent::CodeDispatched),
            None
        );
        assert_eq!(
            transition(FlowState::Navigated, FlowEvent::Confirmed),
            None
        );
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert_eq!(transition(FlowState::Completed, FlowEvent::Failed), None);
        assert_eq!(
            transition(FlowState::Rejected, FlowEvent::PageLoaded),
            None
        );
    }

    #[test]
    fn test_ledger_names_are_snake_case() {
        assert_eq!(FlowState::OtpPending.as_str(), "otp_pending");
        assert_eq!(FlowState::ProfileSubmitted.to_string(), "profile_submitted");
    }
}
