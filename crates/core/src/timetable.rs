//! Timetable entries: one subject placed on one slot.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slot_grid::{Slot, SlotKey};
use crate::subject_pool::SubjectDemandEntry;
use crate::types::{DbId, SessionIndex};

/// A subject assigned to a slot, optionally with a room and invigilators.
///
/// `subject.student_count` is a snapshot taken when the entry was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(flatten)]
    pub subject: SubjectDemandEntry,
    pub date: NaiveDate,
    pub session_index: SessionIndex,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub chief_invigilator: Option<String>,
    #[serde(default)]
    pub invigilators: Vec<String>,
}

impl TimetableEntry {
    /// Place `subject` on `slot` using the slot's time window.
    pub fn place(subject: SubjectDemandEntry, slot: &Slot) -> Self {
        Self {
            subject,
            date: slot.date,
            session_index: slot.session_index,
            start_time: slot.start_time,
            end_time: slot.end_time,
            room: None,
            chief_invigilator: None,
            invigilators: Vec::new(),
        }
    }

    pub fn subject_id(&self) -> DbId {
        self.subject.subject_id
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            session_index: self.session_index,
        }
    }

    /// Apply resource edits. Blank room/invigilator strings clear the field.
    pub fn apply_resources(&mut self, resources: EntryResources) -> Result<(), CoreError> {
        let start_time = resources.start_time.unwrap_or(self.start_time);
        let end_time = resources.end_time.unwrap_or(self.end_time);
        if start_time >= end_time {
            return Err(CoreError::Validation(format!(
                "Entry for {} must start before it ends ({start_time} >= {end_time})",
                self.subject.subject_code
            )));
        }

        self.start_time = start_time;
        self.end_time = end_time;
        self.room = non_blank(resources.room);
        self.chief_invigilator = non_blank(resources.chief_invigilator);
        self.invigilators = resources
            .invigilators
            .into_iter()
            .filter_map(|id| non_blank(Some(id)))
            .collect();
        Ok(())
    }
}

/// Room, invigilators and optional time override attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntryResources {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub chief_invigilator: Option<String>,
    #[serde(default)]
    pub invigilators: Vec<String>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
