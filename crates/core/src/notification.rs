//! Exam notification lifecycle: scope, validation and the status machine.
//!
//! A notification names the academic scope and date window being scheduled.
//! Its status only moves along the edges in [`state_machine`], and every move
//! is appended to an immutable status log by the store.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slot_grid::{self, SessionWindow, Slot, DEFAULT_SESSION_LABEL};
use crate::store::{NotificationStore, TransitionOutcome};
use crate::types::{DbId, Timestamp};

/// Reason recorded on the status log entry written at creation.
pub const CREATED_REASON: &str = "created";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Notification lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Draft,
    Published,
    Completed,
    Cancelled,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 4] = [
        NotificationStatus::Draft,
        NotificationStatus::Published,
        NotificationStatus::Completed,
        NotificationStatus::Cancelled,
    ];

    /// Stable lowercase name, used as the database value.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::Draft => "draft",
            NotificationStatus::Published => "published",
            NotificationStatus::Completed => "completed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        state_machine::valid_transitions(self).is_empty()
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification status '{s}'")))
    }
}

/// Allowed status edges.
pub mod state_machine {
    use super::NotificationStatus::{self, Cancelled, Completed, Draft, Published};
    use crate::error::CoreError;

    /// Statuses reachable from `from` in one step.
    pub fn valid_transitions(from: NotificationStatus) -> &'static [NotificationStatus] {
        match from {
            Draft => &[Published, Cancelled],
            Published => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition(from: NotificationStatus, to: NotificationStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(
        from: NotificationStatus,
        to: NotificationStatus,
    ) -> Result<(), CoreError> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition { from, to })
        }
    }
}

// ---------------------------------------------------------------------------
// Scope and parameters
// ---------------------------------------------------------------------------

/// The academic scope a notification schedules exams for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationScope {
    pub programme_codes: BTreeSet<String>,
    pub batch_ids: BTreeSet<DbId>,
    pub semester_ids: BTreeSet<DbId>,
    pub regulation_ids: BTreeSet<DbId>,
}

impl NotificationScope {
    /// Reject a scope with any empty set.
    pub fn validate(&self) -> Result<(), CoreError> {
        let empty: Vec<&str> = [
            ("programme_codes", self.programme_codes.is_empty()),
            ("batch_ids", self.batch_ids.is_empty()),
            ("semester_ids", self.semester_ids.is_empty()),
            ("regulation_ids", self.regulation_ids.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, is_empty)| is_empty.then_some(name))
        .collect();

        if empty.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Scope must not be empty: {}",
                empty.join(", ")
            )))
        }
    }
}

/// Exam identifiers that describe what is being scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamParams {
    pub exam_type_id: DbId,
    pub exam_name_id: DbId,
    pub session_template_id: DbId,
    pub month_year_id: DbId,
}

/// Date range and default daily time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Caller input for [`NotificationService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub code: String,
    pub title: String,
    pub scope: NotificationScope,
    pub exam_type_id: Option<DbId>,
    pub exam_name_id: Option<DbId>,
    pub session_template_id: Option<DbId>,
    pub month_year_id: Option<DbId>,
    pub window: ExamWindow,
    /// Session template; empty means one session spanning the default window.
    #[serde(default)]
    pub sessions: Vec<SessionWindow>,
    pub created_by: String,
}

/// A persisted exam notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub code: String,
    pub title: String,
    pub scope: NotificationScope,
    pub exam: ExamParams,
    pub window: ExamWindow,
    pub sessions: Vec<SessionWindow>,
    pub status: NotificationStatus,
    /// Incremented on every saved timetable; drafts carry it as their base.
    pub draft_version: i32,
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    /// The slot grid for this notification's window and session template.
    pub fn slots(&self) -> Vec<Slot> {
        slot_grid::generate(self.window.start_date, self.window.end_date, &self.sessions)
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusChange {
    pub to: NotificationStatus,
    pub actor: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One row of the append-only status log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLogEntry {
    pub seq: i32,
    pub from_status: Option<NotificationStatus>,
    pub to_status: NotificationStatus,
    pub actor: String,
    pub reason: Option<String>,
    pub changed_at: Timestamp,
}

/// What a store should do with a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Write the new status and append a log entry.
    Apply,
    /// The same change by the same actor already took effect; write nothing.
    AlreadyApplied,
}

/// Decide how to handle `change` given the current status and the latest log
/// entry. Retrying a change that already took effect with the same actor is
/// a no-op rather than an error.
///
/// `guarded` tells whether the store runs a precondition over the persisted
/// timetable. `Published` is refused without one, so only the publication
/// gate can reach it.
pub fn plan_transition(
    current: NotificationStatus,
    last_entry: Option<&StatusLogEntry>,
    change: &StatusChange,
    guarded: bool,
) -> Result<TransitionPlan, CoreError> {
    if change.to == NotificationStatus::Published && !guarded {
        return Err(CoreError::Validation(
            "A notification can only be published through the publication gate".to_string(),
        ));
    }
    if current == change.to {
        if let Some(last) = last_entry {
            if last.to_status == change.to && last.actor == change.actor {
                return Ok(TransitionPlan::AlreadyApplied);
            }
        }
    }
    state_machine::validate_transition(current, change.to)?;
    Ok(TransitionPlan::Apply)
}

/// Validate creation input and build the notification record in `Draft`.
pub fn prepare_notification(input: NewNotification, now: Timestamp) -> Result<Notification, CoreError> {
    let code = input.code.trim().to_string();
    if code.is_empty() {
        return Err(CoreError::Validation(
            "Notification code must not be empty".to_string(),
        ));
    }
    if input.title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    let created_by = input.created_by.trim().to_string();
    if created_by.is_empty() {
        return Err(CoreError::Validation(
            "created_by must not be empty".to_string(),
        ));
    }

    input.scope.validate()?;

    let exam = ExamParams {
        exam_type_id: required_id(input.exam_type_id, "exam_type_id")?,
        exam_name_id: required_id(input.exam_name_id, "exam_name_id")?,
        session_template_id: required_id(input.session_template_id, "session_template_id")?,
        month_year_id: required_id(input.month_year_id, "month_year_id")?,
    };

    let window = input.window;
    if window.start_date > window.end_date {
        return Err(CoreError::Validation(format!(
            "start_date {} is after end_date {}",
            window.start_date, window.end_date
        )));
    }
    if window.default_start_time >= window.default_end_time {
        return Err(CoreError::Validation(format!(
            "default_start_time {} must be before default_end_time {}",
            window.default_start_time, window.default_end_time
        )));
    }

    let sessions = if input.sessions.is_empty() {
        vec![SessionWindow {
            label: DEFAULT_SESSION_LABEL.to_string(),
            start_time: window.default_start_time,
            end_time: window.default_end_time,
        }]
    } else {
        input.sessions
    };
    slot_grid::validate_sessions(&sessions)?;

    Ok(Notification {
        code,
        title: input.title.trim().to_string(),
        scope: input.scope,
        exam,
        window,
        sessions,
        status: NotificationStatus::Draft,
        draft_version: 0,
        created_by,
        created_at: now,
        updated_at: now,
    })
}

fn required_id(value: Option<DbId>, field: &str) -> Result<DbId, CoreError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(CoreError::Validation(format!(
            "{field} must be a positive identifier, got {id}"
        ))),
        None => Err(CoreError::Validation(format!("{field} is required"))),
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Create, read and transition notifications through a [`NotificationStore`].
pub struct NotificationService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: NotificationStore + ?Sized> NotificationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate and persist a new notification in `Draft`, appending the
    /// creation entry to its status log.
    pub async fn create(&self, input: NewNotification) -> Result<Notification, CoreError> {
        let notification = prepare_notification(input, chrono::Utc::now())?;
        let created = StatusChange {
            to: NotificationStatus::Draft,
            actor: notification.created_by.clone(),
            reason: Some(CREATED_REASON.to_string()),
        };
        self.store.insert_notification(&notification, &created).await
    }

    /// Fetch a notification. Cancelled notifications stay readable.
    pub async fn get(&self, code: &str) -> Result<Notification, CoreError> {
        self.store
            .find_notification(code)
            .await?
            .ok_or_else(|| CoreError::notification_not_found(code))
    }

    pub async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>, CoreError> {
        self.store.list_notifications(status).await
    }

    pub async fn status_log(&self, code: &str) -> Result<Vec<StatusLogEntry>, CoreError> {
        self.get(code).await?;
        self.store.status_log(code).await
    }

    /// Move a notification along one allowed edge. `Published` is refused
    /// here; it is reached through [`crate::publication::PublicationGate`].
    pub async fn transition(
        &self,
        code: &str,
        change: &StatusChange,
    ) -> Result<TransitionOutcome, CoreError> {
        if change.actor.trim().is_empty() {
            return Err(CoreError::Validation("actor must not be empty".to_string()));
        }
        self.store.transition(code, change, None).await
    }
}
