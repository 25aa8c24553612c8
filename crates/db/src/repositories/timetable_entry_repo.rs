//! Repository for the `exam_timetable_entries` table.

use examcell_core::timetable::TimetableEntry;
use examcell_core::types::DbId;
use sqlx::PgConnection;

use crate::models::timetable_entry::TimetableEntryRow;

const COLUMNS: &str = "\
    id, notification_id, subject_id, subject_code, subject_name, syllabus_code, \
    programme_code, semester_id, regulation_id, student_count, exam_date, \
    session_index, start_time, end_time, room, chief_invigilator, invigilators, \
    created_at, updated_at";

pub struct TimetableEntryRepo;

impl TimetableEntryRepo {
    /// Entries of a notification ordered by slot.
    pub async fn list_for_notification(
        conn: &mut PgConnection,
        notification_id: DbId,
    ) -> Result<Vec<TimetableEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exam_timetable_entries \
             WHERE notification_id = $1 \
             ORDER BY exam_date, session_index, start_time, subject_code, id"
        );
        sqlx::query_as::<_, TimetableEntryRow>(&query)
            .bind(notification_id)
            .fetch_all(conn)
            .await
    }

    /// Replace every entry of a notification within the caller's transaction.
    pub async fn replace_all(
        conn: &mut PgConnection,
        notification_id: DbId,
        entries: &[TimetableEntry],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM exam_timetable_entries WHERE notification_id = $1")
            .bind(notification_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let subject = &entry.subject;
            sqlx::query(
                "INSERT INTO exam_timetable_entries \
                    (notification_id, subject_id, subject_code, subject_name, syllabus_code, \
                     programme_code, semester_id, regulation_id, student_count, exam_date, \
                     session_index, start_time, end_time, room, chief_invigilator, invigilators) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            )
            .bind(notification_id)
            .bind(subject.subject_id)
            .bind(&subject.subject_code)
            .bind(&subject.subject_name)
            .bind(&subject.syllabus_code)
            .bind(&subject.programme_code)
            .bind(subject.semester_id)
            .bind(subject.regulation_id)
            .bind(subject.student_count)
            .bind(entry.date)
            .bind(entry.session_index)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(&entry.room)
            .bind(&entry.chief_invigilator)
            .bind(&entry.invigilators)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
