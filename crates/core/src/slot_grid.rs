//! Exam slot grid: every (date, session) cell a subject can be dropped onto.
//!
//! The grid is a pure function of the notification window and its session
//! template, so it is regenerated on demand and never persisted.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::SessionIndex;

/// Upper bound on sessions per exam day.
pub const MAX_SESSIONS_PER_DAY: usize = 8;

/// Label given to the implicit single session built from a notification's
/// default time window.
pub const DEFAULT_SESSION_LABEL: &str = "default";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One session window within an exam day (e.g. forenoon 09:30-12:30).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub label: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Identity of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub session_index: SessionIndex,
}

/// A single assignable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub session_index: SessionIndex,
    pub label: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            session_index: self.session_index,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate the ordered slot grid for `[start_date, end_date]`.
///
/// Days are emitted in calendar order and, within a day, sessions in template
/// order. An empty template or an inverted range yields an empty grid.
pub fn generate(start_date: NaiveDate, end_date: NaiveDate, sessions: &[SessionWindow]) -> Vec<Slot> {
    if sessions.is_empty() || start_date > end_date {
        return Vec::new();
    }

    start_date
        .iter_days()
        .take_while(|day| *day <= end_date)
        .flat_map(|date| {
            (0..).zip(sessions).map(move |(session_index, window)| Slot {
                date,
                session_index,
                label: window.label.clone(),
                start_time: window.start_time,
                end_time: window.end_time,
            })
        })
        .collect()
}

/// Number of calendar days in `[start_date, end_date]`, zero when inverted.
pub fn day_count(start_date: NaiveDate, end_date: NaiveDate) -> usize {
    if start_date > end_date {
        return 0;
    }
    usize::try_from((end_date - start_date).num_days() + 1).unwrap_or(0)
}

/// Check a session template: non-empty labels, `start < end`, strictly
/// increasing and non-overlapping windows.
pub fn validate_sessions(sessions: &[SessionWindow]) -> Result<(), CoreError> {
    if sessions.len() > MAX_SESSIONS_PER_DAY {
        return Err(CoreError::Validation(format!(
            "At most {MAX_SESSIONS_PER_DAY} sessions per day are supported, got {}",
            sessions.len()
        )));
    }

    for window in sessions {
        if window.label.trim().is_empty() {
            return Err(CoreError::Validation(
                "Session label must not be empty".to_string(),
            ));
        }
        if window.start_time >= window.end_time {
            return Err(CoreError::Validation(format!(
                "Session '{}' must start before it ends ({} >= {})",
                window.label, window.start_time, window.end_time
            )));
        }
    }

    for pair in sessions.windows(2) {
        if pair[1].start_time < pair[0].end_time {
            return Err(CoreError::Validation(format!(
                "Session '{}' overlaps or precedes session '{}'",
                pair[1].label, pair[0].label
            )));
        }
    }

    Ok(())
}
