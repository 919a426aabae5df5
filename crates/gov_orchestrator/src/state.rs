//! The per-cycle state machine (spec §4.11).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Idle,
    Collect,
    Plan,
    Validate,
    Apply,
    Observe,
    CommitOrRollback,
    Report,
}

impl CycleState {
    /// The fixed linear order; `Report` wraps back to `Idle`.
    pub fn next(self) -> CycleState {
        match self {
            CycleState::Idle => CycleState::Collect,
            CycleState::Collect => CycleState::Plan,
            CycleState::Plan => CycleState::Validate,
            CycleState::Validate => CycleState::Apply,
            CycleState::Apply => CycleState::Observe,
            CycleState::Observe => CycleState::CommitOrRollback,
            CycleState::CommitOrRollback => CycleState::Report,
            CycleState::Report => CycleState::Idle,
        }
    }

    /// Cancellation is only honored up to and including `Validate` (spec §5:
    /// "between IDLE and APPLY, cancel is honored"; from APPLY onward the
    /// cycle must still OBSERVE and roll back on error rather than abort).
    pub fn is_cancellable(self) -> bool {
        matches!(self, CycleState::Idle | CycleState::Collect | CycleState::Plan | CycleState::Validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_from_report_to_idle() {
        let mut state = CycleState::Idle;
        for _ in 0..8 {
            state = state.next();
        }
        assert_eq!(state, CycleState::Idle);
    }

    #[test]
    fn only_pre_apply_states_are_cancellable() {
        assert!(CycleState::Validate.is_cancellable());
        assert!(!CycleState::Apply.is_cancellable());
        assert!(!CycleState::Observe.is_cancellable());
        assert!(!CycleState::CommitOrRollback.is_cancellable());
        assert!(!CycleState::Report.is_cancellable());
    }
}
