use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::interval::Interval;

/// Identifier wrapper for teachers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherId(pub String);

/// Identifier wrapper for students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for persisted lessons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentId(pub String);

/// Identifier wrapper for prepaid lesson packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(pub String);

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a lesson claims the teacher exclusively or shares a group slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    OneOnOne,
    Group,
}

/// Lifecycle of a persisted lesson. Cancelled, Rejected, and Completed are
/// terminal; only Cancelled and Rejected stop occupying the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Pending,
    Scheduled,
    Cancelled,
    Rejected,
    Completed,
}

impl LessonStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LessonStatus::Pending => "pending",
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Cancelled => "cancelled",
            LessonStatus::Rejected => "rejected",
            LessonStatus::Completed => "completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            LessonStatus::Cancelled | LessonStatus::Rejected | LessonStatus::Completed
        )
    }

    /// Cancelled and Rejected lessons release their time; everything else
    /// still blocks the calendar for conflict purposes.
    pub const fn occupies_schedule(self) -> bool {
        !matches!(self, LessonStatus::Cancelled | LessonStatus::Rejected)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The party acting on a lesson, used to route notifications to the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Teacher,
    Student,
}

/// Incoming booking request before any admission decision has been made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub lesson_type: LessonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<PackageId>,
}

/// A persisted lesson occupying time on one teacher's and one student's
/// schedule. Owned exclusively by the commitment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub subject: String,
    pub interval: Interval,
    pub lesson_type: LessonType,
    pub status: LessonStatus,
}

impl Commitment {
    pub fn status_view(&self) -> CommitmentStatusView {
        CommitmentStatusView {
            id: self.id.clone(),
            teacher_id: self.teacher_id.clone(),
            student_id: self.student_id.clone(),
            subject: self.subject.clone(),
            start: self.interval.start(),
            end: self.interval.end(),
            duration_minutes: self.interval.duration_minutes(),
            lesson_type: self.lesson_type,
            status: self.status.label(),
        }
    }
}

/// Teacher-declared open slot. Read-only to the admission engine; produced
/// upstream by recurring-pattern expansion and ad-hoc entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub lesson_type: LessonType,
    pub max_capacity: u32,
}

/// Sanitized representation of a lesson's exposed state for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CommitmentStatusView {
    pub id: CommitmentId,
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    pub lesson_type: LessonType,
    pub status: &'static str,
}
