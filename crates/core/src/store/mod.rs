//! Storage seams for the scheduling core.
//!
//! Services receive their store as an `Arc<S>` at construction time. The
//! PostgreSQL implementation lives in the `db` crate; [`memory::MemoryStore`]
//! backs the unit and HTTP tests.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::notification::{Notification, NotificationScope, NotificationStatus, StatusChange, StatusLogEntry};
use crate::subject_pool::{EnrollmentCount, SubjectRecord};
use crate::timetable::TimetableEntry;
use crate::types::DbId;

/// Check run against the persisted entries inside a transition, while the
/// notification is locked.
pub type EntryCheck = dyn Fn(&[TimetableEntry]) -> Result<(), CoreError> + Send + Sync;

/// Result of a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub notification: Notification,
    /// `false` when the change had already been applied by the same actor.
    pub appended: bool,
}

/// Notifications and their append-only status log.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert `notification` and its first status log entry atomically.
    ///
    /// Returns [`CoreError::DuplicateId`] if the code is taken.
    async fn insert_notification(
        &self,
        notification: &Notification,
        created: &StatusChange,
    ) -> Result<Notification, CoreError>;

    async fn find_notification(&self, code: &str) -> Result<Option<Notification>, CoreError>;

    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>, CoreError>;

    /// Status log entries in sequence order.
    async fn status_log(&self, code: &str) -> Result<Vec<StatusLogEntry>, CoreError>;

    /// The single entry point for status changes.
    ///
    /// With the notification locked: plan the change with
    /// [`crate::notification::plan_transition`], run `precondition` (if any)
    /// against the persisted timetable, then write the status and append one
    /// log entry. Nothing is written when any step fails. A `Published`
    /// target without a precondition is refused.
    async fn transition(
        &self,
        code: &str,
        change: &StatusChange,
        precondition: Option<&EntryCheck>,
    ) -> Result<TransitionOutcome, CoreError>;
}

/// Persisted timetable entries with an optimistic version stamp.
#[async_trait]
pub trait TimetableStore: Send + Sync {
    async fn timetable_entries(&self, code: &str) -> Result<Vec<TimetableEntry>, CoreError>;

    /// Replace all entries of a `Draft` notification if its stored version is
    /// still `base_version`. Returns the new version.
    ///
    /// Fails with [`CoreError::StaleDraft`] on a version mismatch, with
    /// [`CoreError::Conflict`] once the notification has left `Draft`, and
    /// with [`CoreError::DuplicateId`] if a subject appears twice.
    async fn save_timetable(
        &self,
        code: &str,
        base_version: i32,
        entries: &[TimetableEntry],
    ) -> Result<i32, CoreError>;
}

/// Read-only master data used by the subject pool.
#[async_trait]
pub trait SubjectCatalog: Send + Sync {
    /// Subject rows that may fall in `scope`. Implementations may
    /// over-fetch; the resolver filters again.
    async fn subjects_for_scope(
        &self,
        scope: &NotificationScope,
    ) -> Result<Vec<SubjectRecord>, CoreError>;

    /// Active student counts grouped by programme, batch, semester and
    /// regulation.
    async fn enrollment_for_scope(
        &self,
        scope: &NotificationScope,
    ) -> Result<Vec<EnrollmentCount>, CoreError>;
}

/// Everything the API needs from storage.
#[async_trait]
pub trait ExamStore: NotificationStore + TimetableStore + SubjectCatalog {
    /// Verify the backing store is reachable.
    async fn ping(&self) -> Result<(), CoreError>;
}

/// Reject edits to a notification that has left `Draft`.
pub fn ensure_editable(notification: &Notification) -> Result<(), CoreError> {
    if notification.status == NotificationStatus::Draft {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Timetable of notification {} is locked in status {}",
            notification.code, notification.status
        )))
    }
}

/// Reject a timetable that places any subject more than once.
pub fn ensure_unique_subjects(entries: &[TimetableEntry]) -> Result<(), CoreError> {
    let mut seen: HashSet<DbId> = HashSet::with_capacity(entries.len());
    match entries.iter().find(|e| !seen.insert(e.subject_id())) {
        Some(entry) => Err(CoreError::DuplicateId {
            entity: "TimetableEntry",
            id: entry.subject_id().to_string(),
        }),
        None => Ok(()),
    }
}
