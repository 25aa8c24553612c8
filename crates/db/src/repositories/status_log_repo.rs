//! Repository for the append-only `exam_notification_status_log` table.
//!
//! Rows are only ever inserted; the table's trigger rejects updates and
//! deletes.

use examcell_core::notification::{NotificationStatus, StatusChange};
use examcell_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::status_log::StatusLogRow;

const COLUMNS: &str = "\
    id, notification_id, seq, from_status, to_status, actor, reason, changed_at";

pub struct StatusLogRepo;

impl StatusLogRepo {
    /// Append the next entry for a notification whose row is locked by the
    /// caller's transaction.
    pub async fn append(
        conn: &mut PgConnection,
        notification_id: DbId,
        from_status: Option<NotificationStatus>,
        change: &StatusChange,
    ) -> Result<StatusLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO exam_notification_status_log \
                (notification_id, seq, from_status, to_status, actor, reason) \
             SELECT $1, COALESCE(MAX(seq), 0) + 1, $2, $3, $4, $5 \
             FROM exam_notification_status_log WHERE notification_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StatusLogRow>(&query)
            .bind(notification_id)
            .bind(from_status.map(NotificationStatus::as_str))
            .bind(change.to.as_str())
            .bind(&change.actor)
            .bind(&change.reason)
            .fetch_one(conn)
            .await
    }

    /// Latest entry for a notification.
    pub async fn last(
        conn: &mut PgConnection,
        notification_id: DbId,
    ) -> Result<Option<StatusLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exam_notification_status_log \
             WHERE notification_id = $1 ORDER BY seq DESC LIMIT 1"
        );
        sqlx::query_as::<_, StatusLogRow>(&query)
            .bind(notification_id)
            .fetch_optional(conn)
            .await
    }

    /// Full log of a notification in sequence order.
    pub async fn list_by_code(pool: &PgPool, code: &str) -> Result<Vec<StatusLogRow>, sqlx::Error> {
        sqlx::query_as::<_, StatusLogRow>(
            "SELECT l.id, l.notification_id, l.seq, l.from_status, l.to_status, \
                    l.actor, l.reason, l.changed_at \
             FROM exam_notification_status_log l \
             JOIN exam_notifications n ON n.id = l.notification_id \
             WHERE n.code = $1 \
             ORDER BY l.seq",
        )
        .bind(code)
        .fetch_all(pool)
        .await
    }
}
