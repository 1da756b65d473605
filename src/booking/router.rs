use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::dispatch::SideEffectDispatcher;
use super::domain::{CommitmentId, LessonRequest, Party};
use super::policy::{AdmissionError, ConflictKind};
use super::repository::{AvailabilityStore, CommitmentLedger, PackageStore, TeacherDirectory};
use super::service::BookingService;
use super::transitions::TransitionError;

/// Router builder exposing the booking admission and lifecycle endpoints.
pub fn booking_router<L, V, T, P, D>(service: Arc<BookingService<L, V, T, P, D>>) -> Router
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/bookings", post(submit_handler::<L, V, T, P, D>))
        .route(
            "/api/v1/bookings/:booking_id",
            get(status_handler::<L, V, T, P, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/accept",
            post(accept_handler::<L, V, T, P, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/reject",
            post(reject_handler::<L, V, T, P, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/cancel",
            post(cancel_handler::<L, V, T, P, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/complete",
            post(complete_handler::<L, V, T, P, D>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelPayload {
    #[serde(default)]
    pub(crate) by: Option<Party>,
}

pub(crate) async fn submit_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    axum::Json(request): axum::Json<LessonRequest>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    match service.try_admit(request, Utc::now()) {
        Ok(commitment) => {
            (StatusCode::CREATED, axum::Json(commitment.status_view())).into_response()
        }
        Err(error) => admission_error_response(error),
    }
}

pub(crate) async fn status_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    match service.get(&CommitmentId(booking_id)) {
        Ok(commitment) => (StatusCode::OK, axum::Json(commitment.status_view())).into_response(),
        Err(error) => transition_error_response(error),
    }
}

pub(crate) async fn accept_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    match service.accept_pending(&CommitmentId(booking_id)) {
        Ok(commitment) => (StatusCode::OK, axum::Json(commitment.status_view())).into_response(),
        Err(error) => transition_error_response(error),
    }
}

pub(crate) async fn reject_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    match service.reject_pending(&CommitmentId(booking_id)) {
        Ok(commitment) => (StatusCode::OK, axum::Json(commitment.status_view())).into_response(),
        Err(error) => transition_error_response(error),
    }
}

pub(crate) async fn cancel_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    Path(booking_id): Path<String>,
    payload: Option<axum::Json<CancelPayload>>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    let by = payload
        .and_then(|axum::Json(payload)| payload.by)
        .unwrap_or(Party::Student);
    match service.cancel(&CommitmentId(booking_id), by) {
        Ok(commitment) => (StatusCode::OK, axum::Json(commitment.status_view())).into_response(),
        Err(error) => transition_error_response(error),
    }
}

pub(crate) async fn complete_handler<L, V, T, P, D>(
    State(service): State<Arc<BookingService<L, V, T, P, D>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    L: CommitmentLedger + 'static,
    V: AvailabilityStore + 'static,
    T: TeacherDirectory + 'static,
    P: PackageStore + 'static,
    D: SideEffectDispatcher + 'static,
{
    match service.complete(&CommitmentId(booking_id)) {
        Ok(commitment) => (StatusCode::OK, axum::Json(commitment.status_view())).into_response(),
        Err(error) => transition_error_response(error),
    }
}

fn admission_error_response(error: AdmissionError) -> Response {
    let status = match error.kind() {
        ConflictKind::InvalidRequest | ConflictKind::InvalidPackage => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ConflictKind::StudentDoubleBooked
        | ConflictKind::TeacherSlotTaken
        | ConflictKind::CapacityFull => StatusCode::CONFLICT,
        ConflictKind::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": error.to_string(),
        "reason": error.kind().code(),
    });
    (status, axum::Json(body)).into_response()
}

fn transition_error_response(error: TransitionError) -> Response {
    let (status, reason) = match &error {
        TransitionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        TransitionError::Illegal { .. } => (StatusCode::CONFLICT, "illegal_transition"),
        TransitionError::StaleConflict => (StatusCode::CONFLICT, "stale_conflict"),
        TransitionError::Unavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unavailable"),
    };
    let body = json!({
        "error": error.to_string(),
        "reason": reason,
    });
    (status, axum::Json(body)).into_response()
}
