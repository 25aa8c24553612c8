//! Row model for the `exam_notifications` table.

use chrono::{NaiveDate, NaiveTime};
use examcell_core::error::CoreError;
use examcell_core::notification::{ExamParams, ExamWindow, Notification, NotificationScope};
use examcell_core::slot_grid::SessionWindow;
use examcell_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `exam_notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamNotificationRow {
    pub id: DbId,
    pub code: String,
    pub title: String,
    pub programme_codes: Vec<String>,
    pub batch_ids: Vec<DbId>,
    pub semester_ids: Vec<DbId>,
    pub regulation_ids: Vec<DbId>,
    pub exam_type_id: DbId,
    pub exam_name_id: DbId,
    pub session_template_id: DbId,
    pub month_year_id: DbId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
    pub sessions: Json<Vec<SessionWindow>>,
    pub status: String,
    pub draft_version: i32,
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ExamNotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: ExamNotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            scope: NotificationScope {
                programme_codes: row.programme_codes.into_iter().collect(),
                batch_ids: row.batch_ids.into_iter().collect(),
                semester_ids: row.semester_ids.into_iter().collect(),
                regulation_ids: row.regulation_ids.into_iter().collect(),
            },
            exam: ExamParams {
                exam_type_id: row.exam_type_id,
                exam_name_id: row.exam_name_id,
                session_template_id: row.session_template_id,
                month_year_id: row.month_year_id,
            },
            window: ExamWindow {
                start_date: row.start_date,
                end_date: row.end_date,
                default_start_time: row.default_start_time,
                default_end_time: row.default_end_time,
            },
            sessions: row.sessions.0,
            status: row.status.parse()?,
            draft_version: row.draft_version,
            code: row.code,
            title: row.title,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
