//! Publication gate: the only path from `Draft` to `Published`.

use std::sync::Arc;

use crate::conflict;
use crate::error::CoreError;
use crate::notification::{NotificationStatus, StatusChange};
use crate::store::{EntryCheck, NotificationStore, TransitionOutcome};
use crate::timetable::TimetableEntry;

/// Reason recorded on the status log when a timetable is published.
pub const PUBLISHED_REASON: &str = "timetable published";

/// Fail with [`CoreError::UnresolvedConflicts`] if `entries` contain any
/// conflict.
pub fn ensure_publishable(entries: &[TimetableEntry]) -> Result<(), CoreError> {
    let conflicts = conflict::detect(entries);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(CoreError::UnresolvedConflicts { conflicts })
    }
}

/// Publishes a notification after re-checking its persisted timetable.
pub struct PublicationGate<S: ?Sized> {
    store: Arc<S>,
}

impl<S: NotificationStore + ?Sized> PublicationGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Detect conflicts on the persisted entries and transition to
    /// `Published` in one store operation, recording `approver` as actor.
    pub async fn publish(
        &self,
        code: &str,
        approver: &str,
    ) -> Result<TransitionOutcome, CoreError> {
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(CoreError::Validation(
                "approver must not be empty".to_string(),
            ));
        }

        let change = StatusChange {
            to: NotificationStatus::Published,
            actor: approver.to_string(),
            reason: Some(PUBLISHED_REASON.to_string()),
        };
        let check: &EntryCheck = &ensure_publishable;
        let outcome = self.store.transition(code, &change, Some(check)).await;

        match &outcome {
            Ok(done) if done.appended => {
                tracing::info!(notification = %code, approver, "Timetable published");
            }
            Err(CoreError::UnresolvedConflicts { conflicts }) => {
                tracing::warn!(
                    notification = %code,
                    conflicts = conflicts.len(),
                    "Publish rejected"
                );
            }
            _ => {}
        }
        outcome
    }
}
