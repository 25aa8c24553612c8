//! Repository for the `exam_notifications` table.

use examcell_core::notification::{Notification, NotificationStatus};
use examcell_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::ExamNotificationRow;

const COLUMNS: &str = "\
    id, code, title, programme_codes, batch_ids, semester_ids, regulation_ids, \
    exam_type_id, exam_name_id, session_template_id, month_year_id, \
    start_date, end_date, default_start_time, default_end_time, sessions, \
    status, draft_version, created_by, created_at, updated_at";

/// Queries for exam notifications, keyed by their external code.
pub struct ExamNotificationRepo;

impl ExamNotificationRepo {
    /// Insert a new notification row.
    pub async fn insert(
        conn: &mut PgConnection,
        notification: &Notification,
    ) -> Result<ExamNotificationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO exam_notifications \
                (code, title, programme_codes, batch_ids, semester_ids, regulation_ids, \
                 exam_type_id, exam_name_id, session_template_id, month_year_id, \
                 start_date, end_date, default_start_time, default_end_time, sessions, \
                 status, draft_version, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
                     $11, $12, $13, $14, $15, $16, $17, $18, $19, $19) \
             RETURNING {COLUMNS}"
        );
        let scope = &notification.scope;
        sqlx::query_as::<_, ExamNotificationRow>(&query)
            .bind(&notification.code)
            .bind(&notification.title)
            .bind(scope.programme_codes.iter().cloned().collect::<Vec<_>>())
            .bind(scope.batch_ids.iter().copied().collect::<Vec<_>>())
            .bind(scope.semester_ids.iter().copied().collect::<Vec<_>>())
            .bind(scope.regulation_ids.iter().copied().collect::<Vec<_>>())
            .bind(notification.exam.exam_type_id)
            .bind(notification.exam.exam_name_id)
            .bind(notification.exam.session_template_id)
            .bind(notification.exam.month_year_id)
            .bind(notification.window.start_date)
            .bind(notification.window.end_date)
            .bind(notification.window.default_start_time)
            .bind(notification.window.default_end_time)
            .bind(Json(&notification.sessions))
            .bind(notification.status.as_str())
            .bind(notification.draft_version)
            .bind(&notification.created_by)
            .bind(notification.created_at)
            .fetch_one(conn)
            .await
    }

    /// Find a notification by code.
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<ExamNotificationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exam_notifications WHERE code = $1");
        sqlx::query_as::<_, ExamNotificationRow>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Find a notification by code and lock its row until the transaction
    /// ends. Status changes and timetable saves serialize on this lock.
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<ExamNotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exam_notifications WHERE code = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, ExamNotificationRow>(&query)
            .bind(code)
            .fetch_optional(conn)
            .await
    }

    /// List notifications, newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<ExamNotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exam_notifications \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ExamNotificationRow>(&query)
            .bind(status.map(NotificationStatus::as_str))
            .fetch_all(pool)
            .await
    }

    /// Set the status of a locked notification.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status: NotificationStatus,
    ) -> Result<ExamNotificationRow, sqlx::Error> {
        let query = format!(
            "UPDATE exam_notifications SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExamNotificationRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// Increment the draft version and return the new value.
    pub async fn bump_draft_version(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let (version,): (i32,) = sqlx::query_as(
            "UPDATE exam_notifications SET draft_version = draft_version + 1 \
             WHERE id = $1 RETURNING draft_version",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(version)
    }
}
