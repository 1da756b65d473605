use std::marker::PhantomData;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::domain::Commitment;

/// Notification addressed to the counterparty of a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub user_id: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl NotificationIntent {
    pub fn for_commitment(user_id: &str, kind: NotificationKind, commitment: &Commitment) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            payload: json!({
                "lesson_id": commitment.id.0,
                "subject": commitment.subject,
                "start": commitment.interval.start(),
                "duration_minutes": commitment.interval.duration_minutes(),
                "status": commitment.status.label(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingScheduled,
    BookingRejected,
    BookingCancelled,
    BookingCompleted,
}

/// Trait describing outbound integration hooks (calendar providers, meeting
/// link vendors, notification inbox).
pub trait SideEffectDispatcher: Send + Sync {
    fn sync_calendar(&self, commitment: &Commitment) -> Result<(), DispatchError>;
    fn create_meeting_link(&self, commitment: &Commitment) -> Result<(), DispatchError>;
    fn notify(&self, intent: NotificationIntent) -> Result<(), DispatchError>;
}

/// Side-effect dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("side-effect transport unavailable: {0}")]
    Transport(String),
}

enum SideEffectJob {
    Scheduled(Commitment),
    Notification(NotificationIntent),
    Flush(mpsc::Sender<()>),
}

/// Wrapper enforcing the best-effort contract: hooks run on a dedicated
/// worker thread so transport latency never extends the admission path, each
/// hook is attempted at most `max_attempts` times, and failures are logged
/// and swallowed. Nothing here can unwind an admission decision.
pub struct BestEffort<D> {
    jobs: mpsc::Sender<SideEffectJob>,
    _dispatcher: PhantomData<fn() -> D>,
}

impl<D> BestEffort<D>
where
    D: SideEffectDispatcher + 'static,
{
    pub fn new(inner: Arc<D>, max_attempts: u32) -> Self {
        let (jobs, queue) = mpsc::channel();
        let worker = Worker {
            inner,
            max_attempts: max_attempts.max(1),
        };
        thread::spawn(move || worker.run(queue));
        Self {
            jobs,
            _dispatcher: PhantomData,
        }
    }

    /// Queue calendar sync and meeting link creation for a freshly scheduled
    /// lesson; returns without waiting on any transport.
    pub fn dispatch_scheduled(&self, commitment: Commitment) {
        let _ = self.jobs.send(SideEffectJob::Scheduled(commitment));
    }

    pub fn dispatch_notification(&self, intent: NotificationIntent) {
        let _ = self.jobs.send(SideEffectJob::Notification(intent));
    }

    /// Block until every previously queued job has been delivered or
    /// abandoned. Demo and test hook; the request path never calls this.
    pub fn flush(&self) {
        let (done, drained) = mpsc::channel();
        if self.jobs.send(SideEffectJob::Flush(done)).is_ok() {
            let _ = drained.recv();
        }
    }
}

struct Worker<D> {
    inner: Arc<D>,
    max_attempts: u32,
}

impl<D> Worker<D>
where
    D: SideEffectDispatcher,
{
    fn run(self, queue: mpsc::Receiver<SideEffectJob>) {
        while let Ok(job) = queue.recv() {
            match job {
                SideEffectJob::Scheduled(commitment) => {
                    self.attempt("calendar_sync", || self.inner.sync_calendar(&commitment));
                    self.attempt("meeting_link", || self.inner.create_meeting_link(&commitment));
                }
                SideEffectJob::Notification(intent) => {
                    self.attempt("notification", || self.inner.notify(intent.clone()));
                }
                SideEffectJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    fn attempt<F>(&self, effect: &str, mut hook: F)
    where
        F: FnMut() -> Result<(), DispatchError>,
    {
        for attempt in 1..=self.max_attempts {
            match hook() {
                Ok(()) => return,
                Err(err) if attempt == self.max_attempts => {
                    warn!(effect, attempt, error = %err, "side effect abandoned");
                }
                Err(err) => {
                    warn!(effect, attempt, error = %err, "side effect failed, retrying");
                }
            }
        }
    }
}
