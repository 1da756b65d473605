use super::domain::{CommitmentId, LessonStatus};

/// Legal lifecycle moves: a pending request can be scheduled, rejected, or
/// withdrawn; a scheduled lesson can be cancelled or completed. Terminal
/// states admit no further moves.
pub const fn can_transition(from: LessonStatus, to: LessonStatus) -> bool {
    matches!(
        (from, to),
        (LessonStatus::Pending, LessonStatus::Scheduled)
            | (LessonStatus::Pending, LessonStatus::Rejected)
            | (LessonStatus::Pending, LessonStatus::Cancelled)
            | (LessonStatus::Scheduled, LessonStatus::Cancelled)
            | (LessonStatus::Scheduled, LessonStatus::Completed)
    )
}

pub fn ensure(from: LessonStatus, to: LessonStatus) -> Result<(), TransitionError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::Illegal { from, to })
    }
}

/// Error raised by post-admission lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("no lesson found for id {0}")]
    NotFound(CommitmentId),
    #[error("cannot move a {from} lesson to {to}")]
    Illegal {
        from: LessonStatus,
        to: LessonStatus,
    },
    #[error("a conflicting lesson was booked while this request was pending")]
    StaleConflict,
    #[error("booking backend unavailable: {0}")]
    Unavailable(String),
}
