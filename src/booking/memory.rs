//! In-memory collaborator implementations backing the default server wiring,
//! the CLI demo, and the integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use super::dispatch::{DispatchError, NotificationIntent, SideEffectDispatcher};
use super::domain::{
    AvailabilitySlot, Commitment, CommitmentId, LessonStatus, LessonType, PackageId, StudentId,
    TeacherId,
};
use super::repository::{
    AvailabilityError, AvailabilityStore, CommitmentLedger, DirectoryError, LedgerError,
    PackageError, PackageStore, TeacherDirectory,
};

#[derive(Default, Clone)]
pub struct InMemoryCommitmentLedger {
    records: Arc<Mutex<HashMap<CommitmentId, Commitment>>>,
}

impl InMemoryCommitmentLedger {
    pub fn all(&self) -> Vec<Commitment> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        guard.values().cloned().collect()
    }
}

impl CommitmentLedger for InMemoryCommitmentLedger {
    fn insert(&self, commitment: Commitment) -> Result<Commitment, LedgerError> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        if guard.contains_key(&commitment.id) {
            return Err(LedgerError::Conflict);
        }
        // Analogue of the one-on-one unique constraint a SQL backend would
        // carry: no two occupying commitments may overlap on one teacher when
        // either claims exclusive attention.
        let exclusive_clash = guard.values().any(|existing| {
            existing.teacher_id == commitment.teacher_id
                && existing.status.occupies_schedule()
                && commitment.status.occupies_schedule()
                && existing.interval.overlaps(&commitment.interval)
                && (existing.lesson_type == LessonType::OneOnOne
                    || commitment.lesson_type == LessonType::OneOnOne)
        });
        if exclusive_clash {
            return Err(LedgerError::Conflict);
        }
        guard.insert(commitment.id.clone(), commitment.clone());
        Ok(commitment)
    }

    fn update_status(
        &self,
        id: &CommitmentId,
        from: LessonStatus,
        to: LessonStatus,
    ) -> Result<Commitment, LedgerError> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let record = guard.get_mut(id).ok_or(LedgerError::NotFound)?;
        if record.status != from {
            return Err(LedgerError::Conflict);
        }
        record.status = to;
        Ok(record.clone())
    }

    fn fetch(&self, id: &CommitmentId) -> Result<Option<Commitment>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_active_for_teacher(
        &self,
        teacher_id: &TeacherId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.teacher_id == teacher_id)
            .filter(|record| record.status.occupies_schedule())
            .filter(|record| {
                record.interval.start() < window_end && record.interval.end() > window_start
            })
            .cloned()
            .collect())
    }

    fn list_active_for_student(
        &self,
        student_id: &StudentId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Commitment>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.student_id == student_id)
            .filter(|record| record.status.occupies_schedule())
            .filter(|record| {
                record.interval.start() < window_end && record.interval.end() > window_start
            })
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAvailabilityStore {
    slots: Arc<Mutex<Vec<AvailabilitySlot>>>,
}

impl InMemoryAvailabilityStore {
    pub fn publish(&self, slot: AvailabilitySlot) {
        let mut guard = self.slots.lock().expect("availability mutex poisoned");
        guard.push(slot);
    }
}

impl AvailabilityStore for InMemoryAvailabilityStore {
    fn list_slots(
        &self,
        teacher_id: &TeacherId,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        let guard = self.slots.lock().expect("availability mutex poisoned");
        Ok(guard
            .iter()
            .filter(|slot| &slot.teacher_id == teacher_id && slot.date == date)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTeacherDirectory {
    auto_accept: Arc<Mutex<HashMap<TeacherId, bool>>>,
}

impl InMemoryTeacherDirectory {
    pub fn set_auto_accept(&self, teacher_id: TeacherId, enabled: bool) {
        let mut guard = self.auto_accept.lock().expect("directory mutex poisoned");
        guard.insert(teacher_id, enabled);
    }
}

impl TeacherDirectory for InMemoryTeacherDirectory {
    fn auto_accept(&self, teacher_id: &TeacherId) -> Result<Option<bool>, DirectoryError> {
        let guard = self.auto_accept.lock().expect("directory mutex poisoned");
        Ok(guard.get(teacher_id).copied())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPackageStore {
    balances: Arc<Mutex<HashMap<PackageId, u32>>>,
}

impl InMemoryPackageStore {
    pub fn grant(&self, package_id: PackageId, lessons: u32) {
        let mut guard = self.balances.lock().expect("package mutex poisoned");
        guard.insert(package_id, lessons);
    }

    pub fn remaining(&self, package_id: &PackageId) -> Option<u32> {
        let guard = self.balances.lock().expect("package mutex poisoned");
        guard.get(package_id).copied()
    }
}

impl PackageStore for InMemoryPackageStore {
    fn reserve(&self, package_id: &PackageId) -> Result<u32, PackageError> {
        let mut guard = self.balances.lock().expect("package mutex poisoned");
        let balance = guard.get_mut(package_id).ok_or(PackageError::NotFound)?;
        if *balance == 0 {
            return Err(PackageError::Exhausted);
        }
        *balance -= 1;
        Ok(*balance)
    }

    fn release(&self, package_id: &PackageId) -> Result<(), PackageError> {
        let mut guard = self.balances.lock().expect("package mutex poisoned");
        let balance = guard.get_mut(package_id).ok_or(PackageError::NotFound)?;
        *balance += 1;
        Ok(())
    }
}

/// Dispatcher that records every hook invocation so tests and the demo can
/// assert on the side-effect trail.
#[derive(Default, Clone)]
pub struct RecordingDispatcher {
    calendar_syncs: Arc<Mutex<Vec<CommitmentId>>>,
    meeting_links: Arc<Mutex<Vec<CommitmentId>>>,
    notifications: Arc<Mutex<Vec<NotificationIntent>>>,
}

impl RecordingDispatcher {
    pub fn calendar_syncs(&self) -> Vec<CommitmentId> {
        self.calendar_syncs
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
    }

    pub fn meeting_links(&self) -> Vec<CommitmentId> {
        self.meeting_links
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
    }

    pub fn notifications(&self) -> Vec<NotificationIntent> {
        self.notifications
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
    }
}

impl SideEffectDispatcher for RecordingDispatcher {
    fn sync_calendar(&self, commitment: &Commitment) -> Result<(), DispatchError> {
        self.calendar_syncs
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(commitment.id.clone());
        Ok(())
    }

    fn create_meeting_link(&self, commitment: &Commitment) -> Result<(), DispatchError> {
        self.meeting_links
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(commitment.id.clone());
        Ok(())
    }

    fn notify(&self, intent: NotificationIntent) -> Result<(), DispatchError> {
        self.notifications
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(intent);
        Ok(())
    }
}
