//! Row model for the append-only `exam_notification_status_log` table.

use examcell_core::error::CoreError;
use examcell_core::notification::StatusLogEntry;
use examcell_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `exam_notification_status_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusLogRow {
    pub id: DbId,
    pub notification_id: DbId,
    pub seq: i32,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor: String,
    pub reason: Option<String>,
    pub changed_at: Timestamp,
}

impl TryFrom<StatusLogRow> for StatusLogEntry {
    type Error = CoreError;

    fn try_from(row: StatusLogRow) -> Result<Self, Self::Error> {
        Ok(StatusLogEntry {
            seq: row.seq,
            from_status: row.from_status.as_deref().map(str::parse).transpose()?,
            to_status: row.to_status.parse()?,
            actor: row.actor,
            reason: row.reason,
            changed_at: row.changed_at,
        })
    }
}
