use chrono::NaiveDate;

use crate::conflict::ConflictRecord;
use crate::notification::NotificationStatus;
use crate::types::{DbId, SessionIndex};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate id: {entity} with id {id} already exists")]
    DuplicateId { entity: &'static str, id: String },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: NotificationStatus,
        to: NotificationStatus,
    },

    #[error("Unknown subject: {0} is not available in this draft")]
    UnknownSubject(DbId),

    #[error("Slot not in range: {date} session {session_index}")]
    SlotNotInRange {
        date: NaiveDate,
        session_index: SessionIndex,
    },

    #[error("Unresolved conflicts: {} conflict(s) block publication", conflicts.len())]
    UnresolvedConflicts { conflicts: Vec<ConflictRecord> },

    #[error("Stale draft: edited from version {expected}, stored version is {actual}")]
    StaleDraft { expected: i32, actual: i32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing exam notification.
    pub fn notification_not_found(code: &str) -> Self {
        CoreError::NotFound {
            entity: "ExamNotification",
            id: code.to_string(),
        }
    }
}
