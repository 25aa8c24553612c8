//! Handlers for exam notifications: creation, reads, status changes and
//! publication.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::Validate;

use examcell_core::notification::{
    ExamWindow, NewNotification, NotificationScope, StatusChange,
};
use examcell_core::slot_grid::SessionWindow;
use examcell_core::types::DbId;

use crate::error::AppResult;
use crate::query::StatusFilter;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /notifications`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 64, message = "code must be 1-64 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "select at least one programme"))]
    pub programme_codes: Vec<String>,
    #[validate(length(min = 1, message = "select at least one batch"))]
    pub batch_ids: Vec<DbId>,
    #[validate(length(min = 1, message = "select at least one semester"))]
    pub semester_ids: Vec<DbId>,
    #[validate(length(min = 1, message = "select at least one regulation"))]
    pub regulation_ids: Vec<DbId>,
    pub exam_type_id: Option<DbId>,
    pub exam_name_id: Option<DbId>,
    pub session_template_id: Option<DbId>,
    pub month_year_id: Option<DbId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
    #[serde(default)]
    pub sessions: Vec<SessionWindow>,
    #[validate(length(min = 1, message = "created_by is required"))]
    pub created_by: String,
}

impl From<CreateNotificationRequest> for NewNotification {
    fn from(req: CreateNotificationRequest) -> Self {
        NewNotification {
            code: req.code,
            title: req.title,
            scope: NotificationScope {
                programme_codes: req
                    .programme_codes
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<BTreeSet<_>>(),
                batch_ids: req.batch_ids.into_iter().collect(),
                semester_ids: req.semester_ids.into_iter().collect(),
                regulation_ids: req.regulation_ids.into_iter().collect(),
            },
            exam_type_id: req.exam_type_id,
            exam_name_id: req.exam_name_id,
            session_template_id: req.session_template_id,
            month_year_id: req.month_year_id,
            window: ExamWindow {
                start_date: req.start_date,
                end_date: req.end_date,
                default_start_time: req.default_start_time,
                default_end_time: req.default_end_time,
            },
            sessions: req.sessions,
            created_by: req.created_by,
        }
    }
}

/// Body of `POST /notifications/{code}/publish`.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub approver: String,
}

/// POST /api/v1/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    Json(input): Json<CreateNotificationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let notification = state.notifications().create(input.into()).await?;

    tracing::info!(
        notification = %notification.code,
        created_by = %notification.created_by,
        slots = notification.slots().len(),
        "Exam notification created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: notification }),
    ))
}

/// GET /api/v1/notifications?status=
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<impl IntoResponse> {
    let notifications = state.notifications().list(filter.status).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/{code}
pub async fn get_notification(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let notification = state.notifications().get(&code).await?;
    Ok(Json(DataResponse { data: notification }))
}

/// GET /api/v1/notifications/{code}/status-log
pub async fn status_log(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let log = state.notifications().status_log(&code).await?;
    Ok(Json(DataResponse { data: log }))
}

/// POST /api/v1/notifications/{code}/transition
///
/// Moves a notification to `completed` or `cancelled`. A `published` target
/// is refused by the core; publishing goes through `POST .../publish`.
pub async fn transition_notification(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(change): Json<StatusChange>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.notifications().transition(&code, &change).await?;
    if outcome.appended {
        tracing::info!(
            notification = %code,
            to = %change.to,
            actor = %change.actor,
            "Notification status changed"
        );
        if outcome.notification.status.is_terminal() {
            state.drafts.discard_notification(&code).await;
        }
    }
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/notifications/{code}/slots
pub async fn list_slots(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let notification = state.notifications().get(&code).await?;
    Ok(Json(DataResponse {
        data: notification.slots(),
    }))
}

/// GET /api/v1/notifications/{code}/subjects
///
/// The subject pool for the notification's scope, with expected head counts.
pub async fn list_subjects(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let notification = state.notifications().get(&code).await?;
    let pool = state.resolver().resolve(&notification.scope).await?;
    Ok(Json(DataResponse { data: pool }))
}

/// POST /api/v1/notifications/{code}/publish
///
/// Re-checks the saved timetable for conflicts and publishes it.
pub async fn publish_notification(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<PublishRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .publication_gate()
        .publish(&code, &input.approver)
        .await?;
    let discarded = state.drafts.discard_notification(&code).await;
    if discarded > 0 {
        tracing::debug!(notification = %code, discarded, "Draft sessions closed on publish");
    }
    Ok(Json(DataResponse { data: outcome }))
}
