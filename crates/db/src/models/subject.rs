//! Read models over the `subjects` and `students` master data.

use examcell_core::subject_pool::{EnrollmentCount, SubjectRecord};
use examcell_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `subjects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub syllabus_code: Option<String>,
    pub programme_code: String,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub is_active: bool,
}

impl From<SubjectRow> for SubjectRecord {
    fn from(row: SubjectRow) -> Self {
        SubjectRecord {
            id: row.id,
            code: row.code,
            name: row.name,
            syllabus_code: row.syllabus_code,
            programme_code: row.programme_code,
            semester_id: row.semester_id,
            regulation_id: row.regulation_id,
            is_active: row.is_active,
        }
    }
}

/// Active students grouped by programme, batch, semester and regulation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnrollmentRow {
    pub programme_code: String,
    pub batch_id: DbId,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub student_count: i64,
}

impl From<EnrollmentRow> for EnrollmentCount {
    fn from(row: EnrollmentRow) -> Self {
        EnrollmentCount {
            programme_code: row.programme_code,
            batch_id: row.batch_id,
            semester_id: row.semester_id,
            regulation_id: row.regulation_id,
            student_count: row.student_count,
        }
    }
}
