//! Status transition rules.

use super::types::TaskStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// Expected moves of `None → InProgress → {Success, Fail} → None`.
///
/// Direct status writes are never refused; the manager only uses this to flag
/// writes that skip the normal cycle.
pub struct StatusTransition;

impl StatusTransition {
    pub fn validate(from: TaskStatus, to: TaskStatus) -> Result<(), TransitionError> {
        let is_valid = match (from, to) {
            // Same-value writes are still observed by listeners.
            (a, b) if a == b => true,

            // Reset is always allowed
            (_, TaskStatus::None) => true,

            // trigger() jumps straight to InProgress from any resting state
            (TaskStatus::None | TaskStatus::Success | TaskStatus::Fail, TaskStatus::InProgress) => {
                true
            }

            (TaskStatus::InProgress, TaskStatus::Success | TaskStatus::Fail) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(status: TaskStatus) -> bool {
        status.is_finished()
    }

    pub fn description(status: TaskStatus) -> &'static str {
        match status {
            TaskStatus::None => "not run",
            TaskStatus::InProgress => "running",
            TaskStatus::Success => "complete",
            TaskStatus::Fail => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(StatusTransition::validate(TaskStatus::None, TaskStatus::InProgress).is_ok());
        assert!(StatusTransition::validate(TaskStatus::InProgress, TaskStatus::Fail).is_ok());
        assert!(StatusTransition::validate(TaskStatus::Success, TaskStatus::None).is_ok());
        assert!(StatusTransition::validate(TaskStatus::Fail, TaskStatus::InProgress).is_ok());
        assert!(StatusTransition::validate(TaskStatus::Success, TaskStatus::Success).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(
            StatusTransition::validate(TaskStatus::None, TaskStatus::Success),
            Err(TransitionError::InvalidTransition {
                from: TaskStatus::None,
                to: TaskStatus::Success
            })
        );
        assert!(StatusTransition::validate(TaskStatus::Success, TaskStatus::Fail).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(StatusTransition::is_terminal(TaskStatus::Success));
        assert!(StatusTransition::is_terminal(TaskStatus::Fail));
        assert!(!StatusTransition::is_terminal(TaskStatus::InProgress));
    }
}
