use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::dispatch::{BestEffort, NotificationIntent, NotificationKind, SideEffectDispatcher};
use super::domain::{
    AvailabilitySlot, Commitment, CommitmentId, LessonRequest, LessonStatus, LessonType, Party,
    TeacherId,
};
use super::interval::Interval;
use super::policy::{AdmissionError, AdmissionPolicy, PolicyConfig};
use super::repository::{
    AvailabilityStore, CommitmentLedger, LedgerError, PackageStore, TeacherDirectory,
};
use super::transitions::{self, TransitionError};

/// Engine-level settings: the pure policy knobs plus the conflict scan
/// window and the side-effect retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    pub policy: PolicyConfig,
    /// Margin scanned around a requested interval when loading existing
    /// commitments. Lessons are bounded well under this.
    pub conflict_window_hours: i64,
    pub dispatch_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            conflict_window_hours: 24,
            dispatch_attempts: 2,
        }
    }
}

static COMMITMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_commitment_id() -> CommitmentId {
    let id = COMMITMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CommitmentId(format!("lesson-{id:06}"))
}

/// Service composing the ledger, availability store, teacher directory,
/// package store, and side-effect dispatcher around the pure admission
/// policy. All commitment mutation in the system goes through here.
pub struct BookingService<L, V, T, P, D> {
    ledger: Arc<L>,
    availability: Arc<V>,
    directory: Arc<T>,
    packages: Arc<P>,
    dispatcher: BestEffort<D>,
    policy: AdmissionPolicy,
    conflict_window: Duration,
    admission_locks: Mutex<HashMap<TeacherId, Arc<Mutex<()>>>>,
}

impl<L, V, T, P, D> BookingService<L, V, T, P, D>
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        availability: Arc<V>,
        directory: Arc<T>,
        packages: Arc<P>,
        dispatcher: Arc<D>,
        config: BookingConfig,
    ) -> Self {
        Self {
            ledger,
            availability,
            directory,
            packages,
            dispatcher: BestEffort::new(dispatcher, config.dispatch_attempts),
            policy: AdmissionPolicy::new(config.policy),
            conflict_window: Duration::hours(config.conflict_window_hours),
            admission_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Decide a booking request and, on admission, persist the commitment in
    /// its initial status. The current instant is passed explicitly so the
    /// engine never reads the wall clock itself.
    pub fn try_admit(
        &self,
        request: LessonRequest,
        now: DateTime<Utc>,
    ) -> Result<Commitment, AdmissionError> {
        let interval = self.policy.validate(&request, now)?;

        // Serialize the check-then-insert sequence per teacher; two
        // concurrent requests for the same empty slot must not both pass the
        // conflict check.
        let lock = self
            .teacher_lock(&request.teacher_id)
            .map_err(AdmissionError::PersistenceFailure)?;
        let _guard = lock
            .lock()
            .map_err(|_| AdmissionError::PersistenceFailure("admission lock poisoned".into()))?;

        let (window_start, window_end) = self.conflict_window_around(interval);
        let student_commitments = self
            .ledger
            .list_active_for_student(&request.student_id, window_start, window_end)
            .map_err(|err| AdmissionError::PersistenceFailure(err.to_string()))?;
        let teacher_commitments = self
            .ledger
            .list_active_for_teacher(&request.teacher_id, window_start, window_end)
            .map_err(|err| AdmissionError::PersistenceFailure(err.to_string()))?;
        let slot = self.matching_slot(&request.teacher_id, interval, request.lesson_type)?;

        self.policy.evaluate(
            &request,
            interval,
            &student_commitments,
            &teacher_commitments,
            slot.as_ref(),
        )?;

        let auto_accept = self
            .directory
            .auto_accept(&request.teacher_id)
            .map_err(|err| AdmissionError::PersistenceFailure(err.to_string()))?
            .unwrap_or(true);
        let initial_status = if auto_accept {
            LessonStatus::Scheduled
        } else {
            LessonStatus::Pending
        };

        // The package reservation and the ledger insert must be
        // both-or-neither; a failed insert releases the reserved lesson.
        if let Some(package_id) = &request.package_id {
            self.packages.reserve(package_id)?;
        }

        let commitment = Commitment {
            id: next_commitment_id(),
            teacher_id: request.teacher_id.clone(),
            student_id: request.student_id.clone(),
            subject: request.subject.clone(),
            interval,
            lesson_type: request.lesson_type,
            status: initial_status,
        };

        let stored = match self.ledger.insert(commitment) {
            Ok(stored) => stored,
            Err(err) => {
                if let Some(package_id) = &request.package_id {
                    let _ = self.packages.release(package_id);
                }
                return Err(match err {
                    // Unique-constraint trip: another writer won the slot.
                    LedgerError::Conflict => AdmissionError::TeacherSlotTaken,
                    other => AdmissionError::PersistenceFailure(other.to_string()),
                });
            }
        };
        drop(_guard);

        info!(
            lesson = %stored.id,
            teacher = %stored.teacher_id.0,
            status = stored.status.label(),
            "booking admitted"
        );

        if stored.status == LessonStatus::Scheduled {
            self.dispatcher.dispatch_scheduled(stored.clone());
        }
        let kind = match stored.status {
            LessonStatus::Scheduled => NotificationKind::BookingScheduled,
            _ => NotificationKind::BookingRequested,
        };
        self.dispatcher
            .dispatch_notification(NotificationIntent::for_commitment(
                &stored.teacher_id.0,
                kind,
                &stored,
            ));

        Ok(stored)
    }

    /// Teacher accepts a pending request. The original conflict check is
    /// replayed under the admission lock; a request made stale by a booking
    /// that landed in the meantime is rejected instead of scheduled.
    pub fn accept_pending(&self, id: &CommitmentId) -> Result<Commitment, TransitionError> {
        let commitment = self.fetch_existing(id)?;
        transitions::ensure(commitment.status, LessonStatus::Scheduled)?;

        let lock = self
            .teacher_lock(&commitment.teacher_id)
            .map_err(TransitionError::Unavailable)?;
        let _guard = lock
            .lock()
            .map_err(|_| TransitionError::Unavailable("admission lock poisoned".into()))?;

        if self.pending_went_stale(&commitment)? {
            let rejected = self.transition(id, LessonStatus::Pending, LessonStatus::Rejected)?;
            drop(_guard);
            self.dispatcher
                .dispatch_notification(NotificationIntent::for_commitment(
                    &rejected.student_id.0,
                    NotificationKind::BookingRejected,
                    &rejected,
                ));
            return Err(TransitionError::StaleConflict);
        }

        let updated = self.transition(id, LessonStatus::Pending, LessonStatus::Scheduled)?;
        drop(_guard);

        self.dispatcher.dispatch_scheduled(updated.clone());
        self.dispatcher
            .dispatch_notification(NotificationIntent::for_commitment(
                &updated.student_id.0,
                NotificationKind::BookingScheduled,
                &updated,
            ));
        Ok(updated)
    }

    /// Teacher declines a pending request.
    pub fn reject_pending(&self, id: &CommitmentId) -> Result<Commitment, TransitionError> {
        let commitment = self.fetch_existing(id)?;
        transitions::ensure(commitment.status, LessonStatus::Rejected)?;
        let updated = self.transition(id, commitment.status, LessonStatus::Rejected)?;
        self.dispatcher
            .dispatch_notification(NotificationIntent::for_commitment(
                &updated.student_id.0,
                NotificationKind::BookingRejected,
                &updated,
            ));
        Ok(updated)
    }

    /// Either party withdraws a pending or scheduled lesson; the other party
    /// is notified.
    pub fn cancel(&self, id: &CommitmentId, by: Party) -> Result<Commitment, TransitionError> {
        let commitment = self.fetch_existing(id)?;
        transitions::ensure(commitment.status, LessonStatus::Cancelled)?;
        let updated = self.transition(id, commitment.status, LessonStatus::Cancelled)?;
        let counterparty = match by {
            Party::Teacher => updated.student_id.0.clone(),
            Party::Student => updated.teacher_id.0.clone(),
        };
        self.dispatcher
            .dispatch_notification(NotificationIntent::for_commitment(
                &counterparty,
                NotificationKind::BookingCancelled,
                &updated,
            ));
        Ok(updated)
    }

    /// Mark a scheduled lesson as delivered. Completed lessons are immutable.
    pub fn complete(&self, id: &CommitmentId) -> Result<Commitment, TransitionError> {
        let commitment = self.fetch_existing(id)?;
        transitions::ensure(commitment.status, LessonStatus::Completed)?;
        let updated = self.transition(id, commitment.status, LessonStatus::Completed)?;
        self.dispatcher
            .dispatch_notification(NotificationIntent::for_commitment(
                &updated.student_id.0,
                NotificationKind::BookingCompleted,
                &updated,
            ));
        Ok(updated)
    }

    /// Fetch a lesson for API responses.
    pub fn get(&self, id: &CommitmentId) -> Result<Commitment, TransitionError> {
        self.fetch_existing(id)
    }

    /// Wait until every queued side effect has been delivered or abandoned.
    /// Demo and test hook; the request path never waits on dispatch.
    pub fn flush_side_effects(&self) {
        self.dispatcher.flush();
    }

    /// Apply a status change through the ledger's compare-and-set. A raced
    /// writer loses here even after passing the legality check: the ledger
    /// reports `Conflict` and the caller sees the move that actually won.
    fn transition(
        &self,
        id: &CommitmentId,
        from: LessonStatus,
        to: LessonStatus,
    ) -> Result<Commitment, TransitionError> {
        match self.ledger.update_status(id, from, to) {
            Ok(updated) => Ok(updated),
            Err(LedgerError::Conflict) => {
                let current = self.fetch_existing(id)?;
                Err(TransitionError::Illegal {
                    from: current.status,
                    to,
                })
            }
            Err(LedgerError::NotFound) => Err(TransitionError::NotFound(id.clone())),
            Err(other) => Err(TransitionError::Unavailable(other.to_string())),
        }
    }

    fn fetch_existing(&self, id: &CommitmentId) -> Result<Commitment, TransitionError> {
        self.ledger
            .fetch(id)
            .map_err(|err| TransitionError::Unavailable(err.to_string()))?
            .ok_or_else(|| TransitionError::NotFound(id.clone()))
    }

    fn pending_went_stale(&self, commitment: &Commitment) -> Result<bool, TransitionError> {
        let (window_start, window_end) = self.conflict_window_around(commitment.interval);
        let teacher_commitments = self
            .ledger
            .list_active_for_teacher(&commitment.teacher_id, window_start, window_end)
            .map_err(|err| TransitionError::Unavailable(err.to_string()))?;
        let student_commitments = self
            .ledger
            .list_active_for_student(&commitment.student_id, window_start, window_end)
            .map_err(|err| TransitionError::Unavailable(err.to_string()))?;
        let slot = self
            .matching_slot(&commitment.teacher_id, commitment.interval, commitment.lesson_type)
            .map_err(|err| TransitionError::Unavailable(err.to_string()))?;

        let teacher_conflict = self
            .policy
            .check_teacher(
                commitment.interval,
                commitment.lesson_type,
                &teacher_commitments,
                slot.as_ref(),
                Some(&commitment.id),
            )
            .is_err();
        let student_conflict = student_commitments
            .iter()
            .filter(|existing| existing.id != commitment.id)
            .filter(|existing| existing.status.occupies_schedule())
            .any(|existing| existing.interval.overlaps(&commitment.interval));

        Ok(teacher_conflict || student_conflict)
    }

    /// Group availability slot with the same teacher, date, and start time
    /// as the request, consulted only for group capacity. A one-on-one slot
    /// published at the same start never supplies a group capacity.
    fn matching_slot(
        &self,
        teacher_id: &TeacherId,
        interval: Interval,
        lesson_type: LessonType,
    ) -> Result<Option<AvailabilitySlot>, AdmissionError> {
        if lesson_type != LessonType::Group {
            return Ok(None);
        }
        let slots = self
            .availability
            .list_slots(teacher_id, interval.start().date_naive())
            .map_err(|err| AdmissionError::PersistenceFailure(err.to_string()))?;
        Ok(slots
            .into_iter()
            .filter(|slot| slot.lesson_type == LessonType::Group)
            .find(|slot| slot.start_time == interval.start().time()))
    }

    fn conflict_window_around(&self, interval: Interval) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            interval.start() - self.conflict_window,
            interval.end() + self.conflict_window,
        )
    }

    fn teacher_lock(&self, teacher_id: &TeacherId) -> Result<Arc<Mutex<()>>, String> {
        let mut registry = self
            .admission_locks
            .lock()
            .map_err(|_| "admission lock registry poisoned".to_string())?;
        Ok(registry.entry(teacher_id.clone()).or_default().clone())
    }
}
