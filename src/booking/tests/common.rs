use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::booking::dispatch::{DispatchError, NotificationIntent, SideEffectDispatcher};
use crate::booking::domain::{
    AvailabilitySlot, Commitment, CommitmentId, LessonRequest, LessonStatus, LessonType, StudentId,
    TeacherId,
};
use crate::booking::interval::Interval;
use crate::booking::memory::{
    InMemoryAvailabilityStore, InMemoryCommitmentLedger, InMemoryPackageStore,
    InMemoryTeacherDirectory, RecordingDispatcher,
};
use crate::booking::repository::{CommitmentLedger, LedgerError};
use crate::booking::service::{BookingConfig, BookingService};

/// Fixed decision instant for deterministic tests; all fixture lessons sit
/// later the same day.
pub(super) fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 8, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, hour, minute, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn teacher() -> TeacherId {
    TeacherId("teacher-1".to_string())
}

pub(super) fn other_teacher() -> TeacherId {
    TeacherId("teacher-2".to_string())
}

pub(super) fn student(n: u32) -> StudentId {
    StudentId(format!("student-{n}"))
}

pub(super) type MemoryService = BookingService<
    InMemoryCommitmentLedger,
    InMemoryAvailabilityStore,
    InMemoryTeacherDirectory,
    InMemoryPackageStore,
    RecordingDispatcher,
>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) ledger: Arc<InMemoryCommitmentLedger>,
    pub(super) availability: Arc<InMemoryAvailabilityStore>,
    pub(super) directory: Arc<InMemoryTeacherDirectory>,
    pub(super) packages: Arc<InMemoryPackageStore>,
    pub(super) dispatcher: Arc<RecordingDispatcher>,
}

pub(super) fn harness() -> Harness {
    harness_with(BookingConfig::default())
}

pub(super) fn harness_with(config: BookingConfig) -> Harness {
    let ledger = Arc::new(InMemoryCommitmentLedger::default());
    let availability = Arc::new(InMemoryAvailabilityStore::default());
    let directory = Arc::new(InMemoryTeacherDirectory::default());
    let packages = Arc::new(InMemoryPackageStore::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = Arc::new(BookingService::new(
        ledger.clone(),
        availability.clone(),
        directory.clone(),
        packages.clone(),
        dispatcher.clone(),
        config,
    ));
    Harness {
        service,
        ledger,
        availability,
        directory,
        packages,
        dispatcher,
    }
}

pub(super) fn one_on_one_request(
    teacher_id: TeacherId,
    student_id: StudentId,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> LessonRequest {
    LessonRequest {
        teacher_id,
        student_id,
        subject: "Algebra".to_string(),
        start,
        duration_minutes,
        lesson_type: LessonType::OneOnOne,
        package_id: None,
    }
}

pub(super) fn group_request(
    teacher_id: TeacherId,
    student_id: StudentId,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> LessonRequest {
    LessonRequest {
        teacher_id,
        student_id,
        subject: "Algebra".to_string(),
        start,
        duration_minutes,
        lesson_type: LessonType::Group,
        package_id: None,
    }
}

pub(super) fn group_slot(
    teacher_id: TeacherId,
    start: DateTime<Utc>,
    duration_minutes: u32,
    max_capacity: u32,
) -> AvailabilitySlot {
    AvailabilitySlot {
        teacher_id,
        date: start.date_naive(),
        start_time: start.time(),
        end_time: start.time() + Duration::minutes(i64::from(duration_minutes)),
        lesson_type: LessonType::Group,
        max_capacity,
    }
}

pub(super) fn one_on_one_slot(
    teacher_id: TeacherId,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> AvailabilitySlot {
    AvailabilitySlot {
        teacher_id,
        date: start.date_naive(),
        start_time: start.time(),
        end_time: start.time() + Duration::minutes(i64::from(duration_minutes)),
        lesson_type: LessonType::OneOnOne,
        max_capacity: 1,
    }
}

pub(super) fn commitment(
    n: u32,
    teacher_id: TeacherId,
    student_id: StudentId,
    start: DateTime<Utc>,
    duration_minutes: u32,
    lesson_type: LessonType,
    status: LessonStatus,
) -> Commitment {
    Commitment {
        id: CommitmentId(format!("fixture-{n:03}")),
        teacher_id,
        student_id,
        subject: "Algebra".to_string(),
        interval: Interval::new(start, duration_minutes).expect("positive duration"),
        lesson_type,
        status,
    }
}

/// Ledger whose writes always fail, for persistence-failure paths. Reads
/// succeed so the request survives the conflict checks.
pub(super) struct UnavailableLedger;

impl CommitmentLedger for UnavailableLedger {
    fn insert(&self, _commitment: Commitment) -> Result<Commitment, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn update_status(
        &self,
        _id: &CommitmentId,
        _from: LessonStatus,
        _to: LessonStatus,
    ) -> Result<Commitment, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn fetch(&self, _id: &CommitmentId) -> Result<Option<Commitment>, LedgerError> {
        Ok(None)
    }

    fn list_active_for_teacher(
        &self,
        _teacher_id: &TeacherId,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError> {
        Ok(Vec::new())
    }

    fn list_active_for_student(
        &self,
        _student_id: &StudentId,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError> {
        Ok(Vec::new())
    }
}

/// Dispatcher whose hooks always fail, proving side effects stay best-effort.
pub(super) struct FailingDispatcher;

impl SideEffectDispatcher for FailingDispatcher {
    fn sync_calendar(&self, _commitment: &Commitment) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("calendar offline".to_string()))
    }

    fn create_meeting_link(&self, _commitment: &Commitment) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("meeting vendor offline".to_string()))
    }

    fn notify(&self, _intent: NotificationIntent) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("inbox offline".to_string()))
    }
}
