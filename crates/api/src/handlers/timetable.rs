//! Read handlers for the saved timetable of a notification.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use examcell_core::conflict::{self, ConflictRecord};
use examcell_core::store::TimetableStore;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Conflicts together with how many entries they touch.
#[derive(Debug, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictRecord>,
    pub affected_entries: usize,
}

impl ConflictReport {
    pub fn new(conflicts: Vec<ConflictRecord>) -> Self {
        let affected_entries = conflict::affected_entries(&conflicts);
        Self {
            conflicts,
            affected_entries,
        }
    }
}

/// GET /api/v1/notifications/{code}/timetable
pub async fn get_timetable(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let entries = state.store.timetable_entries(&code).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/notifications/{code}/timetable/conflicts
pub async fn get_timetable_conflicts(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let entries = state.store.timetable_entries(&code).await?;
    Ok(Json(DataResponse {
        data: ConflictReport::new(conflict::detect(&entries)),
    }))
}
