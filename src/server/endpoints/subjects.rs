use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::schedule::{InstructorId, SubjectId};
use crate::server::types::schedule_error_response;
use crate::store::DocumentStore;
use crate::sync::ScheduleError;
use crate::types::AppState;

/// GET /subjects/:subject_id/schedules
/// Returns the subject's denormalized schedule copies
pub async fn get_subject_schedules(
    Path(subject_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /subjects/{}/schedules", subject_id);

    let subject = SubjectId::new(subject_id);
    match s.engine.store().subject_schedule_copies(&subject).await {
        Ok(copies) => (StatusCode::OK, Json(copies)).into_response(),
        Err(e) => schedule_error_response(ScheduleError::Store(e)),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignRequest {
    pub old_instructor_id: InstructorId,
    pub new_instructor_id: InstructorId,
}

/// POST /subjects/:subject_id/reassign
/// Moves the subject's schedule copies between instructors
pub async fn post_reassign_instructor(
    Path(subject_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(request): Json<ReassignRequest>,
) -> Response {
    info!("POST /subjects/{}/reassign", subject_id);

    let subject = SubjectId::new(subject_id);
    match s
        .engine
        .reassign_instructor(
            &subject,
            &request.old_instructor_id,
            &request.new_instructor_id,
        )
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(e) => schedule_error_response(e),
    }
}
