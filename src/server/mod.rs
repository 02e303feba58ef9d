use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::server::endpoints::{schedules, status, subjects};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Instructor-facing schedule operations
    let instructor_router = Router::new()
        .route(
            "/instructors/:instructor_id/schedules",
            get(schedules::get_instructor_schedules).post(schedules::post_add_schedule),
        )
        .route(
            "/instructors/:instructor_id/schedules/check",
            post(schedules::post_check_schedule),
        )
        .route(
            "/instructors/:instructor_id/schedules/:schedule_id",
            put(schedules::put_replace_schedule).delete(schedules::delete_schedule),
        );

    // Subject-facing denormalized views
    let subject_router = Router::new()
        .route(
            "/subjects/:subject_id/schedules",
            get(subjects::get_subject_schedules),
        )
        .route(
            "/subjects/:subject_id/reassign",
            post(subjects::post_reassign_instructor),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .route("/reconcile", post(status::post_reconcile))
        .merge(instructor_router)
        .merge(subject_router)
        .with_state(app_state)
}
