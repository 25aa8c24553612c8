//! Route definitions for draft sessions, merged into `/notifications`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::draft;
use crate::state::AppState;

/// ```text
/// POST               /{code}/draft
/// GET, DELETE        /{code}/draft/{draft_id}
/// POST               /{code}/draft/{draft_id}/assign
/// POST               /{code}/draft/{draft_id}/unassign
/// PUT                /{code}/draft/{draft_id}/entries/{subject_id}
/// POST               /{code}/draft/{draft_id}/auto-assign
/// POST               /{code}/draft/{draft_id}/clear
/// GET                /{code}/draft/{draft_id}/conflicts
/// POST               /{code}/draft/{draft_id}/save
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{code}/draft", post(draft::open_draft))
        .route(
            "/{code}/draft/{draft_id}",
            get(draft::get_draft).delete(draft::discard_draft),
        )
        .route("/{code}/draft/{draft_id}/assign", post(draft::assign_subject))
        .route(
            "/{code}/draft/{draft_id}/unassign",
            post(draft::unassign_subject),
        )
        .route(
            "/{code}/draft/{draft_id}/entries/{subject_id}",
            put(draft::update_entry_resources),
        )
        .route(
            "/{code}/draft/{draft_id}/auto-assign",
            post(draft::auto_assign),
        )
        .route("/{code}/draft/{draft_id}/clear", post(draft::clear_draft))
        .route(
            "/{code}/draft/{draft_id}/conflicts",
            get(draft::draft_conflicts),
        )
        .route("/{code}/draft/{draft_id}/save", post(draft::save_draft))
}
