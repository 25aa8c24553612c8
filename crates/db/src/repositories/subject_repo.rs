//! Read-only queries over subject and student master data.

use examcell_core::notification::NotificationScope;
use sqlx::PgPool;

use crate::models::subject::{EnrollmentRow, SubjectRow};

fn scope_arrays(scope: &NotificationScope) -> (Vec<String>, Vec<i64>, Vec<i64>) {
    (
        scope.programme_codes.iter().cloned().collect(),
        scope.semester_ids.iter().copied().collect(),
        scope.regulation_ids.iter().copied().collect(),
    )
}

pub struct SubjectRepo;

impl SubjectRepo {
    /// Active subjects whose programme, semester and regulation are all in
    /// scope.
    pub async fn list_for_scope(
        pool: &PgPool,
        scope: &NotificationScope,
    ) -> Result<Vec<SubjectRow>, sqlx::Error> {
        let (programmes, semesters, regulations) = scope_arrays(scope);
        sqlx::query_as::<_, SubjectRow>(
            "SELECT id, code, name, syllabus_code, programme_code, semester_id, \
                    regulation_id, is_active \
             FROM subjects \
             WHERE is_active \
               AND programme_code = ANY($1) \
               AND semester_id = ANY($2) \
               AND regulation_id = ANY($3) \
             ORDER BY programme_code, semester_id, code, id",
        )
        .bind(programmes)
        .bind(semesters)
        .bind(regulations)
        .fetch_all(pool)
        .await
    }
}

pub struct EnrollmentRepo;

impl EnrollmentRepo {
    /// Active student counts per combination within scope.
    pub async fn counts_for_scope(
        pool: &PgPool,
        scope: &NotificationScope,
    ) -> Result<Vec<EnrollmentRow>, sqlx::Error> {
        let (programmes, semesters, regulations) = scope_arrays(scope);
        let batches: Vec<i64> = scope.batch_ids.iter().copied().collect();
        sqlx::query_as::<_, EnrollmentRow>(
            "SELECT programme_code, batch_id, semester_id, regulation_id, \
                    COUNT(*) AS student_count \
             FROM students \
             WHERE is_active \
               AND programme_code = ANY($1) \
               AND batch_id = ANY($2) \
               AND semester_id = ANY($3) \
               AND regulation_id = ANY($4) \
             GROUP BY programme_code, batch_id, semester_id, regulation_id",
        )
        .bind(programmes)
        .bind(batches)
        .bind(semesters)
        .bind(regulations)
        .fetch_all(pool)
        .await
    }
}
