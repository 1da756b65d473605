use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{AvailabilitySlot, Commitment, LessonRequest, LessonType};
use super::interval::Interval;

/// Stable reason codes carried on every rejection so callers can tell
/// "slot full" apart from "you already have a lesson then".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    InvalidRequest,
    StudentDoubleBooked,
    TeacherSlotTaken,
    CapacityFull,
    InvalidPackage,
    PersistenceFailure,
}

impl ConflictKind {
    pub const fn code(self) -> &'static str {
        match self {
            ConflictKind::InvalidRequest => "invalid_request",
            ConflictKind::StudentDoubleBooked => "student_double_booked",
            ConflictKind::TeacherSlotTaken => "teacher_slot_taken",
            ConflictKind::CapacityFull => "capacity_full",
            ConflictKind::InvalidPackage => "invalid_package",
            ConflictKind::PersistenceFailure => "persistence_failure",
        }
    }
}

/// Admission outcome when a booking request cannot be honored.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("student already has an overlapping lesson")]
    StudentDoubleBooked,
    #[error("teacher is not free during the requested interval")]
    TeacherSlotTaken,
    #[error("group slot is already at capacity ({capacity})")]
    CapacityFull { capacity: u32 },
    #[error("lesson package cannot cover this booking: {0}")]
    InvalidPackage(#[from] super::repository::PackageError),
    #[error("booking could not be persisted: {0}")]
    PersistenceFailure(String),
}

impl AdmissionError {
    pub const fn kind(&self) -> ConflictKind {
        match self {
            AdmissionError::InvalidRequest(_) => ConflictKind::InvalidRequest,
            AdmissionError::StudentDoubleBooked => ConflictKind::StudentDoubleBooked,
            AdmissionError::TeacherSlotTaken => ConflictKind::TeacherSlotTaken,
            AdmissionError::CapacityFull { .. } => ConflictKind::CapacityFull,
            AdmissionError::InvalidPackage(_) => ConflictKind::InvalidPackage,
            AdmissionError::PersistenceFailure(_) => ConflictKind::PersistenceFailure,
        }
    }

    /// Policy rejections need different parameters to succeed; a persistence
    /// failure is safe to retry verbatim.
    pub const fn is_retryable_verbatim(&self) -> bool {
        matches!(self, AdmissionError::PersistenceFailure(_))
    }
}

/// Knobs for the pure admission policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Capacity assumed for a group slot with no matching availability
    /// record. Explicit and configurable rather than a silent constant.
    pub default_group_capacity: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_group_capacity: 10,
        }
    }
}

/// What an admitted request is entitled to. `same_slot_peers` counts the
/// group lessons already sharing the slot at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionGrant {
    pub interval: Interval,
    pub same_slot_peers: u32,
}

/// Stateless evaluator applying the conflict and capacity policy to a
/// request. All inputs are pre-loaded by the caller; no I/O happens here.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    config: PolicyConfig,
}

impl AdmissionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Field-level validation, run before any read. The current instant is
    /// passed in so decisions stay deterministic under test.
    pub fn validate(
        &self,
        request: &LessonRequest,
        now: DateTime<Utc>,
    ) -> Result<Interval, AdmissionError> {
        if request.teacher_id.0.trim().is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "teacher_id must not be blank".to_string(),
            ));
        }
        if request.student_id.0.trim().is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "student_id must not be blank".to_string(),
            ));
        }
        if request.subject.trim().is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "subject must not be blank".to_string(),
            ));
        }
        let interval = Interval::new(request.start, request.duration_minutes)
            .map_err(|err| AdmissionError::InvalidRequest(err.to_string()))?;
        if interval.start() <= now {
            return Err(AdmissionError::InvalidRequest(
                "start must be in the future".to_string(),
            ));
        }
        Ok(interval)
    }

    /// Full admission decision for a validated request: student self-conflict
    /// first, then the teacher conflict/capacity branch.
    pub fn evaluate(
        &self,
        request: &LessonRequest,
        interval: Interval,
        student_commitments: &[Commitment],
        teacher_commitments: &[Commitment],
        slot: Option<&AvailabilitySlot>,
    ) -> Result<AdmissionGrant, AdmissionError> {
        let student_clash = student_commitments
            .iter()
            .filter(|commitment| commitment.status.occupies_schedule())
            .any(|commitment| commitment.interval.overlaps(&interval));
        if student_clash {
            return Err(AdmissionError::StudentDoubleBooked);
        }

        let same_slot_peers =
            self.check_teacher(interval, request.lesson_type, teacher_commitments, slot, None)?;

        Ok(AdmissionGrant {
            interval,
            same_slot_peers,
        })
    }

    /// Teacher-side conflict and capacity check, shared between first
    /// admission and the re-validation of a stale pending acceptance (which
    /// excludes the pending lesson itself via `exclude`).
    pub fn check_teacher(
        &self,
        interval: Interval,
        lesson_type: LessonType,
        teacher_commitments: &[Commitment],
        slot: Option<&AvailabilitySlot>,
        exclude: Option<&super::domain::CommitmentId>,
    ) -> Result<u32, AdmissionError> {
        let overlapping: Vec<&Commitment> = teacher_commitments
            .iter()
            .filter(|commitment| Some(&commitment.id) != exclude)
            .filter(|commitment| commitment.status.occupies_schedule())
            .filter(|commitment| commitment.interval.overlaps(&interval))
            .collect();

        match lesson_type {
            // One-on-one lessons claim the teacher's full attention; any
            // overlap of any kind blocks them.
            LessonType::OneOnOne => {
                if overlapping.is_empty() {
                    Ok(0)
                } else {
                    Err(AdmissionError::TeacherSlotTaken)
                }
            }
            LessonType::Group => {
                let foreign_overlap = overlapping
                    .iter()
                    .any(|commitment| !commitment.interval.same_slot(&interval));
                if foreign_overlap {
                    return Err(AdmissionError::TeacherSlotTaken);
                }
                if overlapping
                    .iter()
                    .any(|commitment| commitment.lesson_type == LessonType::OneOnOne)
                {
                    return Err(AdmissionError::TeacherSlotTaken);
                }

                // Only same-slot group lessons remain; count them against the
                // slot capacity.
                let current = overlapping.len() as u32;
                let capacity = match slot {
                    Some(slot) => slot.max_capacity,
                    None => {
                        debug!(
                            default_capacity = self.config.default_group_capacity,
                            "no availability slot matches the group request, using default capacity"
                        );
                        self.config.default_group_capacity
                    }
                };
                if current >= capacity {
                    return Err(AdmissionError::CapacityFull { capacity });
                }
                Ok(current)
            }
        }
    }
}
