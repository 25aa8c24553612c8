pub mod draft;
pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /notifications                                   list, create
/// /notifications/{code}                            get
/// /notifications/{code}/status-log                 status log
/// /notifications/{code}/transition                 completed / cancelled (POST)
/// /notifications/{code}/slots                      slot grid
/// /notifications/{code}/subjects                   subject pool
/// /notifications/{code}/timetable                  saved entries
/// /notifications/{code}/timetable/conflicts        conflicts of saved entries
/// /notifications/{code}/publish                    publication gate (POST)
///
/// /notifications/{code}/draft                                 open session (POST)
/// /notifications/{code}/draft/{draft_id}                      get, discard (DELETE)
/// /notifications/{code}/draft/{draft_id}/assign               assign one (POST)
/// /notifications/{code}/draft/{draft_id}/unassign             unassign (POST)
/// /notifications/{code}/draft/{draft_id}/entries/{subject_id} attach resources (PUT)
/// /notifications/{code}/draft/{draft_id}/auto-assign          auto-assign (POST)
/// /notifications/{code}/draft/{draft_id}/clear                clear (POST)
/// /notifications/{code}/draft/{draft_id}/conflicts            conflicts of the session
/// /notifications/{code}/draft/{draft_id}/save                 save (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest(
        "/notifications",
        notification::router().merge(draft::router()),
    )
}
