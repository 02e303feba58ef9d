use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::schedule::{InstructorId, ScheduleDraft, ScheduleId};
use crate::server::types::schedule_error_response;
use crate::types::AppState;

/// GET /instructors/:instructor_id/schedules
/// Returns the instructor's authoritative schedule list
pub async fn get_instructor_schedules(
    Path(instructor_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /instructors/{}/schedules", instructor_id);

    let instructor = InstructorId::new(instructor_id);
    match s.engine.instructor_schedules(&instructor).await {
        Ok(schedules) => (StatusCode::OK, Json(schedules)).into_response(),
        Err(e) => schedule_error_response(e),
    }
}

/// POST /instructors/:instructor_id/schedules
/// Validates and conflict-checks a candidate, then commits and propagates it
pub async fn post_add_schedule(
    Path(instructor_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(draft): Json<ScheduleDraft>,
) -> Response {
    info!("POST /instructors/{}/schedules", instructor_id);

    let instructor = InstructorId::new(instructor_id);
    match s.engine.add_schedule(&instructor, draft).await {
        Ok(schedule) => (StatusCode::CREATED, Json(schedule)).into_response(),
        Err(e) => schedule_error_response(e),
    }
}

/// PUT /instructors/:instructor_id/schedules/:schedule_id
/// Replaces a schedule in place, keeping its id stable
pub async fn put_replace_schedule(
    Path((instructor_id, schedule_id)): Path<(String, String)>,
    State(s): State<Arc<AppState>>,
    Json(draft): Json<ScheduleDraft>,
) -> Response {
    info!("PUT /instructors/{}/schedules/{}", instructor_id, schedule_id);

    let instructor = InstructorId::new(instructor_id);
    let schedule = ScheduleId::new(schedule_id);
    match s.engine.replace_schedule(&instructor, &schedule, draft).await {
        Ok(schedule) => (StatusCode::OK, Json(schedule)).into_response(),
        Err(e) => schedule_error_response(e),
    }
}

/// DELETE /instructors/:instructor_id/schedules/:schedule_id
/// Removes a schedule and cleans up its denormalized copies
pub async fn delete_schedule(
    Path((instructor_id, schedule_id)): Path<(String, String)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(
        "DELETE /instructors/{}/schedules/{}",
        instructor_id, schedule_id
    );

    let instructor = InstructorId::new(instructor_id);
    let schedule = ScheduleId::new(schedule_id);
    match s.engine.remove_schedule(&instructor, &schedule).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => schedule_error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckScheduleRequest {
    #[serde(flatten)]
    pub candidate: ScheduleDraft,
    /// Id of the schedule being edited, excluded from the comparison.
    #[serde(default)]
    pub exclude_id: Option<ScheduleId>,
}

/// POST /instructors/:instructor_id/schedules/check
/// Side-effect-free conflict preview for form validation
pub async fn post_check_schedule(
    Path(instructor_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(request): Json<CheckScheduleRequest>,
) -> Response {
    info!("POST /instructors/{}/schedules/check", instructor_id);

    let instructor = InstructorId::new(instructor_id);
    match s
        .engine
        .check_candidate(&instructor, request.candidate, request.exclude_id.as_ref())
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => schedule_error_response(e),
    }
}
