//! In-memory [`ExamStore`] used by tests and local experiments.
//!
//! A single async mutex guards all state, which gives every trait method the
//! same all-or-nothing behaviour the PostgreSQL store gets from transactions.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    EntryCheck, ExamStore, NotificationStore, SubjectCatalog, TimetableStore, TransitionOutcome,
};
use crate::error::CoreError;
use crate::notification::{
    plan_transition, Notification, NotificationScope, NotificationStatus, StatusChange,
    StatusLogEntry, TransitionPlan,
};
use crate::subject_pool::{EnrollmentCount, SubjectRecord};
use crate::timetable::TimetableEntry;

#[derive(Default)]
struct MemoryState {
    notifications: BTreeMap<String, Notification>,
    status_logs: HashMap<String, Vec<StatusLogEntry>>,
    entries: HashMap<String, Vec<TimetableEntry>>,
    subjects: Vec<SubjectRecord>,
    enrollment: Vec<EnrollmentCount>,
}

/// Process-local store keeping everything behind one mutex.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subject master data.
    pub async fn seed_subjects(&self, subjects: Vec<SubjectRecord>) {
        self.state.lock().await.subjects = subjects;
    }

    /// Replace the enrollment counts.
    pub async fn seed_enrollment(&self, enrollment: Vec<EnrollmentCount>) {
        self.state.lock().await.enrollment = enrollment;
    }

    /// Overwrite stored entries without version checks, the way a writer
    /// bypassing the draft workflow would.
    pub async fn overwrite_entries(&self, code: &str, entries: Vec<TimetableEntry>) {
        self.state
            .lock()
            .await
            .entries
            .insert(code.to_string(), entries);
    }
}

fn next_log_entry(
    log: &[StatusLogEntry],
    from: Option<NotificationStatus>,
    change: &StatusChange,
) -> StatusLogEntry {
    StatusLogEntry {
        seq: log.last().map_or(1, |last| last.seq + 1),
        from_status: from,
        to_status: change.to,
        actor: change.actor.clone(),
        reason: change.reason.clone(),
        changed_at: chrono::Utc::now(),
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        notification: &Notification,
        created: &StatusChange,
    ) -> Result<Notification, CoreError> {
        let mut state = self.state.lock().await;
        if state.notifications.contains_key(&notification.code) {
            return Err(CoreError::DuplicateId {
                entity: "ExamNotification",
                id: notification.code.clone(),
            });
        }

        let entry = next_log_entry(&[], None, created);
        state
            .notifications
            .insert(notification.code.clone(), notification.clone());
        state
            .status_logs
            .insert(notification.code.clone(), vec![entry]);
        Ok(notification.clone())
    }

    async fn find_notification(&self, code: &str) -> Result<Option<Notification>, CoreError> {
        Ok(self.state.lock().await.notifications.get(code).cloned())
    }

    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>, CoreError> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .values()
            .filter(|n| status.map_or(true, |s| n.status == s))
            .cloned()
            .collect())
    }

    async fn status_log(&self, code: &str) -> Result<Vec<StatusLogEntry>, CoreError> {
        Ok(self
            .state
            .lock()
            .await
            .status_logs
            .get(code)
            .cloned()
            .unwrap_or_default())
    }

    async fn transition(
        &self,
        code: &str,
        change: &StatusChange,
        precondition: Option<&EntryCheck>,
    ) -> Result<TransitionOutcome, CoreError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let current = state
            .notifications
            .get(code)
            .cloned()
            .ok_or_else(|| CoreError::notification_not_found(code))?;
        let log = state.status_logs.entry(code.to_string()).or_default();

        match plan_transition(current.status, log.last(), change, precondition.is_some())? {
            TransitionPlan::AlreadyApplied => Ok(TransitionOutcome {
                notification: current,
                appended: false,
            }),
            TransitionPlan::Apply => {
                if let Some(check) = precondition {
                    let entries = state.entries.get(code).map(Vec::as_slice).unwrap_or(&[]);
                    check(entries)?;
                }

                let entry = next_log_entry(log, Some(current.status), change);
                let mut updated = current;
                updated.status = change.to;
                updated.updated_at = entry.changed_at;

                log.push(entry);
                state
                    .notifications
                    .insert(code.to_string(), updated.clone());
                Ok(TransitionOutcome {
                    notification: updated,
                    appended: true,
                })
            }
        }
    }
}

#[async_trait]
impl TimetableStore for MemoryStore {
    async fn timetable_entries(&self, code: &str) -> Result<Vec<TimetableEntry>, CoreError> {
        let state = self.state.lock().await;
        if !state.notifications.contains_key(code) {
            return Err(CoreError::notification_not_found(code));
        }
        Ok(state.entries.get(code).cloned().unwrap_or_default())
    }

    async fn save_timetable(
        &self,
        code: &str,
        base_version: i32,
        entries: &[TimetableEntry],
    ) -> Result<i32, CoreError> {
        let mut state = self.state.lock().await;
        let notification = state
            .notifications
            .get_mut(code)
            .ok_or_else(|| CoreError::notification_not_found(code))?;

        super::ensure_editable(notification)?;
        if notification.draft_version != base_version {
            return Err(CoreError::StaleDraft {
                expected: base_version,
                actual: notification.draft_version,
            });
        }

        super::ensure_unique_subjects(entries)?;

        notification.draft_version += 1;
        notification.updated_at = chrono::Utc::now();
        let version = notification.draft_version;
        state.entries.insert(code.to_string(), entries.to_vec());
        Ok(version)
    }
}

#[async_trait]
impl SubjectCatalog for MemoryStore {
    async fn subjects_for_scope(
        &self,
        _scope: &NotificationScope,
    ) -> Result<Vec<SubjectRecord>, CoreError> {
        Ok(self.state.lock().await.subjects.clone())
    }

    async fn enrollment_for_scope(
        &self,
        _scope: &NotificationScope,
    ) -> Result<Vec<EnrollmentCount>, CoreError> {
        Ok(self.state.lock().await.enrollment.clone())
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
