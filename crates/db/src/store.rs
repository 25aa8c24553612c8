//! [`PgExamStore`]: the core storage traits over PostgreSQL.
//!
//! Status changes and timetable saves lock the notification row with
//! `SELECT ... FOR UPDATE`, so a publish and a concurrent save can never
//! interleave between the conflict check and the status write.

use async_trait::async_trait;
use examcell_core::error::CoreError;
use examcell_core::notification::{
    plan_transition, Notification, NotificationScope, NotificationStatus, StatusChange,
    StatusLogEntry, TransitionPlan,
};
use examcell_core::store::{
    ensure_editable, ensure_unique_subjects, EntryCheck, ExamStore, NotificationStore,
    SubjectCatalog, TimetableStore, TransitionOutcome,
};
use examcell_core::subject_pool::{EnrollmentCount, SubjectRecord};
use examcell_core::timetable::TimetableEntry;

use crate::models::status_log::StatusLogRow;
use crate::repositories::{
    EnrollmentRepo, ExamNotificationRepo, StatusLogRepo, SubjectRepo, TimetableEntryRepo,
};
use crate::DbPool;

const NOTIFICATION_CODE_CONSTRAINT: &str = "uq_exam_notifications_code";
const ENTRY_SUBJECT_CONSTRAINT: &str = "uq_exam_timetable_entries_subject";

/// PostgreSQL-backed [`ExamStore`].
#[derive(Clone)]
pub struct PgExamStore {
    pool: DbPool,
}

impl PgExamStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map an infrastructure failure to [`CoreError::Storage`], logging the
/// underlying error.
fn storage_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

fn unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some(constraint))
}

fn into_log(rows: Vec<StatusLogRow>) -> Result<Vec<StatusLogEntry>, CoreError> {
    rows.into_iter().map(StatusLogEntry::try_from).collect()
}

#[async_trait]
impl NotificationStore for PgExamStore {
    async fn insert_notification(
        &self,
        notification: &Notification,
        created: &StatusChange,
    ) -> Result<Notification, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = match ExamNotificationRepo::insert(&mut tx, notification).await {
            Ok(row) => row,
            Err(err) if unique_violation(&err, NOTIFICATION_CODE_CONSTRAINT) => {
                return Err(CoreError::DuplicateId {
                    entity: "ExamNotification",
                    id: notification.code.clone(),
                });
            }
            Err(err) => return Err(storage_error(err)),
        };
        StatusLogRepo::append(&mut tx, row.id, None, created)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        row.try_into()
    }

    async fn find_notification(&self, code: &str) -> Result<Option<Notification>, CoreError> {
        ExamNotificationRepo::find_by_code(&self.pool, code)
            .await
            .map_err(storage_error)?
            .map(Notification::try_from)
            .transpose()
    }

    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>, CoreError> {
        ExamNotificationRepo::list(&self.pool, status)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn status_log(&self, code: &str) -> Result<Vec<StatusLogEntry>, CoreError> {
        let rows = StatusLogRepo::list_by_code(&self.pool, code)
            .await
            .map_err(storage_error)?;
        into_log(rows)
    }

    async fn transition(
        &self,
        code: &str,
        change: &StatusChange,
        precondition: Option<&EntryCheck>,
    ) -> Result<TransitionOutcome, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = ExamNotificationRepo::lock_by_code(&mut tx, code)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CoreError::notification_not_found(code))?;
        let id = row.id;
        let current = Notification::try_from(row)?;

        let last = StatusLogRepo::last(&mut tx, id)
            .await
            .map_err(storage_error)?
            .map(StatusLogEntry::try_from)
            .transpose()?;

        match plan_transition(current.status, last.as_ref(), change, precondition.is_some())? {
            TransitionPlan::AlreadyApplied => {
                tracing::debug!(notification = %code, to = %change.to, "Transition already applied");
                Ok(TransitionOutcome {
                    notification: current,
                    appended: false,
                })
            }
            TransitionPlan::Apply => {
                if let Some(check) = precondition {
                    let entries: Vec<TimetableEntry> =
                        TimetableEntryRepo::list_for_notification(&mut tx, id)
                            .await
                            .map_err(storage_error)?
                            .into_iter()
                            .map(TimetableEntry::from)
                            .collect();
                    check(&entries)?;
                }

                let updated = ExamNotificationRepo::update_status(&mut tx, id, change.to)
                    .await
                    .map_err(storage_error)?;
                StatusLogRepo::append(&mut tx, id, Some(current.status), change)
                    .await
                    .map_err(storage_error)?;
                tx.commit().await.map_err(storage_error)?;

                tracing::info!(
                    notification = %code,
                    from = %current.status,
                    to = %change.to,
                    actor = %change.actor,
                    "Notification status changed"
                );
                Ok(TransitionOutcome {
                    notification: updated.try_into()?,
                    appended: true,
                })
            }
        }
    }
}

#[async_trait]
impl TimetableStore for PgExamStore {
    async fn timetable_entries(&self, code: &str) -> Result<Vec<TimetableEntry>, CoreError> {
        let row = ExamNotificationRepo::find_by_code(&self.pool, code)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CoreError::notification_not_found(code))?;

        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        let rows = TimetableEntryRepo::list_for_notification(&mut conn, row.id)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(TimetableEntry::from).collect())
    }

    async fn save_timetable(
        &self,
        code: &str,
        base_version: i32,
        entries: &[TimetableEntry],
    ) -> Result<i32, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = ExamNotificationRepo::lock_by_code(&mut tx, code)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CoreError::notification_not_found(code))?;
        let id = row.id;
        let notification = Notification::try_from(row)?;

        ensure_editable(&notification)?;
        if notification.draft_version != base_version {
            return Err(CoreError::StaleDraft {
                expected: base_version,
                actual: notification.draft_version,
            });
        }

        ensure_unique_subjects(entries)?;

        if let Err(err) = TimetableEntryRepo::replace_all(&mut tx, id, entries).await {
            if unique_violation(&err, ENTRY_SUBJECT_CONSTRAINT) {
                tracing::warn!(notification = %code, error = %err, "Duplicate timetable entry");
                return Err(CoreError::Conflict(format!(
                    "Timetable of notification {code} places a subject more than once"
                )));
            }
            return Err(storage_error(err));
        }
        let version = ExamNotificationRepo::bump_draft_version(&mut tx, id)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;

        tracing::info!(
            notification = %code,
            entries = entries.len(),
            version,
            "Timetable saved"
        );
        Ok(version)
    }
}

#[async_trait]
impl SubjectCatalog for PgExamStore {
    async fn subjects_for_scope(
        &self,
        scope: &NotificationScope,
    ) -> Result<Vec<SubjectRecord>, CoreError> {
        let rows = SubjectRepo::list_for_scope(&self.pool, scope)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(SubjectRecord::from).collect())
    }

    async fn enrollment_for_scope(
        &self,
        scope: &NotificationScope,
    ) -> Result<Vec<EnrollmentCount>, CoreError> {
        let rows = EnrollmentRepo::counts_for_scope(&self.pool, scope)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(EnrollmentCount::from).collect())
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(storage_error)
    }
}
