//! Handlers for draft timetables of a notification.
//!
//! `POST /draft` opens a session and returns its `draft_id`. The session is
//! edited in memory through `/draft/{draft_id}/...` and persisted with
//! `POST /draft/{draft_id}/save`. Sessions are private to whoever opened
//! them; concurrent saves are resolved by the store's version check. Every
//! edit re-reads the notification so a draft whose notification has left
//! `Draft` can no longer change.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use examcell_core::assignment::{AssignRequest, AssignmentEngine, DraftSnapshot, RestoreReport};
use examcell_core::error::CoreError;
use examcell_core::store::{ensure_editable, TimetableStore};
use examcell_core::timetable::EntryResources;
use examcell_core::types::DbId;

use crate::drafts::DraftHandle;
use crate::error::{AppError, AppResult};
use crate::handlers::timetable::ConflictReport;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /draft/{draft_id}/unassign`.
#[derive(Debug, Deserialize)]
pub struct UnassignRequest {
    pub subject_id: DbId,
}

/// Response of `POST /draft`.
#[derive(Debug, Serialize)]
pub struct OpenedDraft {
    pub draft_id: Uuid,
    pub restored: RestoreReport,
    pub draft: DraftSnapshot,
}

/// Response of `POST /draft/auto-assign`.
#[derive(Debug, Serialize)]
pub struct AutoAssignResult {
    pub assigned: usize,
    pub remaining: usize,
    pub draft: DraftSnapshot,
}

/// Response of `POST /draft/{draft_id}/save`.
#[derive(Debug, Serialize)]
pub struct SavedDraft {
    pub version: i32,
    pub entries: usize,
}

fn draft_not_found(draft_id: Uuid) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Draft",
        id: draft_id.to_string(),
    })
}

/// Draft session `draft_id` of `code`, which must exist.
async fn find_draft(state: &AppState, code: &str, draft_id: Uuid) -> AppResult<DraftHandle> {
    state.notifications().get(code).await?;
    state
        .drafts
        .get(code, draft_id)
        .await
        .ok_or_else(|| draft_not_found(draft_id))
}

/// Draft session `draft_id` of `code`, provided the notification is still
/// editable.
async fn editable_draft(state: &AppState, code: &str, draft_id: Uuid) -> AppResult<DraftHandle> {
    let notification = state.notifications().get(code).await?;
    ensure_editable(&notification)?;
    state
        .drafts
        .get(code, draft_id)
        .await
        .ok_or_else(|| draft_not_found(draft_id))
}

/// POST /api/v1/notifications/{code}/draft
///
/// Resolve the subject pool and slot grid, then resume from the saved
/// timetable in a new session. Other open sessions are left alone.
pub async fn open_draft(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let notification = state.notifications().get(&code).await?;
    let mut engine = AssignmentEngine::initialize(&notification, &state.resolver()).await?;
    let saved = state.store.timetable_entries(&code).await?;
    let restored = engine.restore(saved);
    let draft = engine.snapshot();
    let (draft_id, _) = state.drafts.open(engine).await;

    tracing::info!(
        notification = %code,
        %draft_id,
        base_version = draft.base_version,
        slots = draft.slots.len(),
        unassigned = draft.unassigned.len(),
        restored = restored.restored,
        dropped = restored.dropped,
        "Draft opened"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: OpenedDraft {
                draft_id,
                restored,
                draft,
            },
        }),
    ))
}

/// GET /api/v1/notifications/{code}/draft/{draft_id}
pub async fn get_draft(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let handle = find_draft(&state, &code, draft_id).await?;
    let snapshot = handle.lock().await.snapshot();
    Ok(Json(DataResponse { data: snapshot }))
}

/// DELETE /api/v1/notifications/{code}/draft/{draft_id}
///
/// Discard the in-memory session. The saved timetable is untouched.
pub async fn discard_draft(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<StatusCode> {
    if state.drafts.discard(&code, draft_id).await {
        tracing::debug!(notification = %code, %draft_id, "Draft discarded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(draft_not_found(draft_id))
    }
}

/// POST /api/v1/notifications/{code}/draft/{draft_id}/assign
pub async fn assign_subject(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
    Json(input): Json<AssignRequest>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let entry = handle.lock().await.assign_one(input)?;

    tracing::debug!(
        notification = %code,
        subject_id = entry.subject_id(),
        date = %entry.date,
        session_index = entry.session_index,
        "Subject assigned"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// POST /api/v1/notifications/{code}/draft/{draft_id}/unassign
pub async fn unassign_subject(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
    Json(input): Json<UnassignRequest>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let subject = handle.lock().await.unassign(input.subject_id)?;
    tracing::debug!(notification = %code, subject_id = input.subject_id, "Subject unassigned");
    Ok(Json(DataResponse { data: subject }))
}

/// PUT /api/v1/notifications/{code}/draft/{draft_id}/entries/{subject_id}
///
/// Replace the room, invigilators and time window of an assigned subject.
pub async fn update_entry_resources(
    State(state): State<AppState>,
    Path((code, draft_id, subject_id)): Path<(String, Uuid, DbId)>,
    Json(input): Json<EntryResources>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let entry = handle.lock().await.attach_resources(subject_id, input)?;
    tracing::debug!(
        notification = %code,
        subject_id,
        room = ?entry.room,
        chief_invigilator = ?entry.chief_invigilator,
        "Entry resources updated"
    );
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/notifications/{code}/draft/{draft_id}/auto-assign
pub async fn auto_assign(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let mut engine = handle.lock().await;
    let assigned = engine.auto_assign();
    let remaining = engine.unassigned().len();

    tracing::info!(notification = %code, assigned, remaining, "Auto-assign finished");

    Ok(Json(DataResponse {
        data: AutoAssignResult {
            assigned,
            remaining,
            draft: engine.snapshot(),
        },
    }))
}

/// POST /api/v1/notifications/{code}/draft/{draft_id}/clear
pub async fn clear_draft(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let mut engine = handle.lock().await;
    engine.clear();
    tracing::debug!(notification = %code, "Draft cleared");
    Ok(Json(DataResponse {
        data: engine.snapshot(),
    }))
}

/// GET /api/v1/notifications/{code}/draft/{draft_id}/conflicts
pub async fn draft_conflicts(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let handle = find_draft(&state, &code, draft_id).await?;
    let conflicts = handle.lock().await.conflicts();
    Ok(Json(DataResponse {
        data: ConflictReport::new(conflicts),
    }))
}

/// POST /api/v1/notifications/{code}/draft/{draft_id}/save
///
/// Persist the session's entries if nobody saved since it was loaded or last
/// saved. A session that lost the race must be reopened.
pub async fn save_draft(
    State(state): State<AppState>,
    Path((code, draft_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let handle = editable_draft(&state, &code, draft_id).await?;
    let mut engine = handle.lock().await;

    let result = state
        .store
        .save_timetable(&code, engine.base_version(), engine.entries())
        .await;
    let version = match result {
        Ok(version) => version,
        Err(err @ CoreError::StaleDraft { .. }) => {
            tracing::warn!(
                notification = %code,
                %draft_id,
                error = %err,
                "Stale draft save rejected"
            );
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    engine.mark_saved(version);

    Ok(Json(DataResponse {
        data: SavedDraft {
            version,
            entries: engine.entries().len(),
        },
    }))
}
