//! Response types shared by the endpoint handlers.

use crate::sync::ScheduleError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A JSON API error body.
pub struct ApiErrorType {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, message, detail): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            message: message.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "detail": self.detail,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Maps an engine error onto the wire.
///
/// The distinctions the operator needs are kept visible: a conflict body
/// lists the clashing schedules, and a propagation failure carries the
/// schedule that WAS committed so nobody resubmits it.
pub fn schedule_error_response(err: ScheduleError) -> Response {
    match err {
        ScheduleError::Validation(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "validation_failed",
                "detail": e.to_string(),
            })),
        )
            .into_response(),

        ScheduleError::Conflict { conflicts } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "schedule_conflict",
                "conflicts": conflicts,
            })),
        )
            .into_response(),

        ScheduleError::UnknownSchedule {
            instructor_id,
            schedule_id,
        } => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "schedule not found",
            Some(format!(
                "instructor {instructor_id} has no schedule {schedule_id}"
            )),
        ))
        .into_response(),

        ScheduleError::Propagation {
            stage,
            committed,
            source,
        } => (
            StatusCode::MULTI_STATUS,
            Json(json!({
                "error": "propagation_failed",
                "detail": format!("{stage} write failed: {source}"),
                "committed": *committed,
            })),
        )
            .into_response(),

        ScheduleError::Store(e) => {
            let status = if e.is_retryable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            ApiErrorType::from((status, "document store failure", Some(e.to_string())))
                .into_response()
        }
    }
}
