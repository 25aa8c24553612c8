//! Row model for the `exam_timetable_entries` table.

use chrono::{NaiveDate, NaiveTime};
use examcell_core::subject_pool::SubjectDemandEntry;
use examcell_core::timetable::TimetableEntry;
use examcell_core::types::{DbId, SessionIndex, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `exam_timetable_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimetableEntryRow {
    pub id: DbId,
    pub notification_id: DbId,
    pub subject_id: DbId,
    pub subject_code: String,
    pub subject_name: String,
    pub syllabus_code: Option<String>,
    pub programme_code: String,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub student_count: i64,
    pub exam_date: NaiveDate,
    pub session_index: SessionIndex,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub chief_invigilator: Option<String>,
    pub invigilators: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<TimetableEntryRow> for TimetableEntry {
    fn from(row: TimetableEntryRow) -> Self {
        TimetableEntry {
            subject: SubjectDemandEntry {
                subject_id: row.subject_id,
                subject_code: row.subject_code,
                subject_name: row.subject_name,
                syllabus_code: row.syllabus_code,
                programme_code: row.programme_code,
                semester_id: row.semester_id,
                regulation_id: row.regulation_id,
                student_count: row.student_count,
            },
            date: row.exam_date,
            session_index: row.session_index,
            start_time: row.start_time,
            end_time: row.end_time,
            room: row.room,
            chief_invigilator: row.chief_invigilator,
            invigilators: row.invigilators,
        }
    }
}
