//! Route definitions for exam notifications.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{notification, timetable};
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET, POST  /
/// GET        /{code}
/// GET        /{code}/status-log
/// POST       /{code}/transition
/// GET        /{code}/slots
/// GET        /{code}/subjects
/// GET        /{code}/timetable
/// GET        /{code}/timetable/conflicts
/// POST       /{code}/publish
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(notification::list_notifications).post(notification::create_notification),
        )
        .route("/{code}", get(notification::get_notification))
        .route("/{code}/status-log", get(notification::status_log))
        .route(
            "/{code}/transition",
            post(notification::transition_notification),
        )
        .route("/{code}/slots", get(notification::list_slots))
        .route("/{code}/subjects", get(notification::list_subjects))
        .route("/{code}/timetable", get(timetable::get_timetable))
        .route(
            "/{code}/timetable/conflicts",
            get(timetable::get_timetable_conflicts),
        )
        .route("/{code}/publish", post(notification::publish_notification))
}
