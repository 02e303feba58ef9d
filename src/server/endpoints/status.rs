use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::types::AppState;

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// POST /reconcile
/// Replays outstanding propagation markers immediately
pub async fn post_reconcile(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /reconcile");

    let settled = s.engine.reconcile().await;
    let pending = s.engine.journal().pending_count().unwrap_or(0);
    (
        StatusCode::OK,
        Json(json!({ "settled": settled, "pending": pending })),
    )
        .into_response()
}
