//! Lesson booking admission: the one subsystem where a correctness bug
//! double-books a teacher or oversells a group class.
//!
//! The conflict and capacity rules live in [`policy`] as a pure evaluator;
//! [`service`] wires it to the commitment ledger, availability store,
//! teacher directory, package store, and best-effort side-effect dispatch,
//! serializing admission per teacher so concurrent requests for the same
//! slot resolve to exactly one winner.

pub mod dispatch;
pub mod domain;
pub mod interval;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use dispatch::{
    BestEffort, DispatchError, NotificationIntent, NotificationKind, SideEffectDispatcher,
};
pub use domain::{
    AvailabilitySlot, Commitment, CommitmentId, CommitmentStatusView, LessonRequest, LessonStatus,
    LessonType, PackageId, Party, StudentId, TeacherId,
};
pub use interval::{Interval, IntervalError};
pub use policy::{AdmissionError, AdmissionGrant, AdmissionPolicy, ConflictKind, PolicyConfig};
pub use repository::{
    AvailabilityError, AvailabilityStore, CommitmentLedger, DirectoryError, LedgerError,
    PackageError, PackageStore, TeacherDirectory,
};
pub use router::booking_router;
pub use service::{BookingConfig, BookingService};
pub use transitions::{can_transition, TransitionError};
