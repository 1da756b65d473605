use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    AvailabilitySlot, Commitment, CommitmentId, LessonStatus, PackageId, StudentId, TeacherId,
};

/// Durable store of lesson records. The admission engine is the only writer;
/// `insert` implementations must refuse a second schedule-occupying
/// commitment in the same one-on-one slot with [`LedgerError::Conflict`]
/// (a unique constraint in a persistent backend), which backs up the
/// per-teacher serialization in the service.
pub trait CommitmentLedger: Send + Sync {
    fn insert(&self, commitment: Commitment) -> Result<Commitment, LedgerError>;
    /// Compare-and-set status change: succeeds only while the stored status
    /// still equals `from`, otherwise [`LedgerError::Conflict`]. Keeps a
    /// raced transition from overwriting a terminal state.
    fn update_status(
        &self,
        id: &CommitmentId,
        from: LessonStatus,
        to: LessonStatus,
    ) -> Result<Commitment, LedgerError>;
    fn fetch(&self, id: &CommitmentId) -> Result<Option<Commitment>, LedgerError>;
    /// Schedule-occupying commitments for the teacher whose interval starts
    /// before `window_end` and ends after `window_start`.
    fn list_active_for_teacher(
        &self,
        teacher_id: &TeacherId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError>;
    fn list_active_for_student(
        &self,
        student_id: &StudentId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError>;
}

/// Error enumeration for ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("a commitment already occupies that slot")]
    Conflict,
    #[error("commitment not found")]
    NotFound,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of teacher-declared open slots.
pub trait AvailabilityStore: Send + Sync {
    fn list_slots(
        &self,
        teacher_id: &TeacherId,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("availability store unavailable: {0}")]
    Unavailable(String),
}

/// Teacher preferences consulted at admission time. `auto_accept` returns
/// `None` when the teacher has never set the flag; the engine treats unset
/// as true.
pub trait TeacherDirectory: Send + Sync {
    fn auto_accept(&self, teacher_id: &TeacherId) -> Result<Option<bool>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("teacher directory unavailable: {0}")]
    Unavailable(String),
}

/// Prepaid lesson balances. `reserve` takes one lesson off the package and
/// returns the remaining balance; `release` gives it back when the paired
/// ledger insert fails, keeping the two mutations both-or-neither.
pub trait PackageStore: Send + Sync {
    fn reserve(&self, package_id: &PackageId) -> Result<u32, PackageError>;
    fn release(&self, package_id: &PackageId) -> Result<(), PackageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("package not found")]
    NotFound,
    #[error("no lessons remaining on package")]
    Exhausted,
    #[error("package store unavailable: {0}")]
    Unavailable(String),
}
