use thiserror::Error;

use crate::domain::SubmissionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionAction {
    Confirm,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
    pub reason: &'static str,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal submission transition from {from:?} via {action:?}")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub action: SubmissionAction,
}

/// `Submitted` is the only non-terminal state.
pub fn submission_transition(
    status: SubmissionStatus,
    action: SubmissionAction,
) -> Result<(SubmissionStatus, StateTransition), TransitionError> {
    let (to, reason) = match (status, action) {
        (SubmissionStatus::Submitted, SubmissionAction::Confirm) => {
            (SubmissionStatus::Confirmed, "ledger_observed")
        }
        (SubmissionStatus::Submitted, SubmissionAction::Timeout) => {
            (SubmissionStatus::TimedOut, "deadline_elapsed")
        }
        (from, action) => return Err(TransitionError { from, action }),
    };
    Ok((
        to,
        StateTransition {
            from: status,
            to,
            reason,
        },
    ))
}
