//! Subject pool: the subjects a notification must schedule, with demand.
//!
//! The catalog supplies raw subject rows and grouped enrollment counts; the
//! filtering, aggregation and ordering happen here so they are identical for
//! every storage backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::notification::NotificationScope;
use crate::store::SubjectCatalog;
use crate::types::DbId;

/// A subject row from master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub syllabus_code: Option<String>,
    pub programme_code: String,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub is_active: bool,
}

/// Active, currently-enrolled students grouped by academic combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCount {
    pub programme_code: String,
    pub batch_id: DbId,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub student_count: i64,
}

/// A subject that needs an exam slot, with its expected head count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDemandEntry {
    pub subject_id: DbId,
    pub subject_code: String,
    pub subject_name: String,
    pub syllabus_code: Option<String>,
    pub programme_code: String,
    pub semester_id: DbId,
    pub regulation_id: DbId,
    pub student_count: i64,
}

fn in_scope(scope: &NotificationScope, subject: &SubjectRecord) -> bool {
    subject.is_active
        && scope.programme_codes.contains(&subject.programme_code)
        && scope.semester_ids.contains(&subject.semester_id)
        && scope.regulation_ids.contains(&subject.regulation_id)
}

/// Build the demand list for `scope`.
///
/// One entry per distinct active subject whose programme, semester and
/// regulation all fall inside the scope. The student count sums enrollment
/// for the subject's combination across the scoped batches; zero is kept.
/// Output is ordered by programme, semester, subject code and id.
pub fn resolve_pool(
    scope: &NotificationScope,
    subjects: &[SubjectRecord],
    enrollment: &[EnrollmentCount],
) -> Vec<SubjectDemandEntry> {
    let mut headcount: BTreeMap<(&str, DbId, DbId), i64> = BTreeMap::new();
    for row in enrollment
        .iter()
        .filter(|row| scope.batch_ids.contains(&row.batch_id))
    {
        *headcount
            .entry((row.programme_code.as_str(), row.semester_id, row.regulation_id))
            .or_default() += row.student_count.max(0);
    }

    let mut distinct: BTreeMap<DbId, &SubjectRecord> = BTreeMap::new();
    for subject in subjects.iter().filter(|s| in_scope(scope, s)) {
        distinct.entry(subject.id).or_insert(subject);
    }

    let mut pool: Vec<SubjectDemandEntry> = distinct
        .into_values()
        .map(|subject| SubjectDemandEntry {
            subject_id: subject.id,
            subject_code: subject.code.clone(),
            subject_name: subject.name.clone(),
            syllabus_code: subject.syllabus_code.clone(),
            programme_code: subject.programme_code.clone(),
            semester_id: subject.semester_id,
            regulation_id: subject.regulation_id,
            student_count: headcount
                .get(&(
                    subject.programme_code.as_str(),
                    subject.semester_id,
                    subject.regulation_id,
                ))
                .copied()
                .unwrap_or(0),
        })
        .collect();

    pool.sort_by(|a, b| {
        (&a.programme_code, a.semester_id, &a.subject_code, a.subject_id).cmp(&(
            &b.programme_code,
            b.semester_id,
            &b.subject_code,
            b.subject_id,
        ))
    });
    pool
}

/// Reads master data through a [`SubjectCatalog`] and resolves the pool.
pub struct SubjectPoolResolver<C: ?Sized> {
    catalog: Arc<C>,
}

impl<C: SubjectCatalog + ?Sized> SubjectPoolResolver<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    pub async fn resolve(
        &self,
        scope: &NotificationScope,
    ) -> Result<Vec<SubjectDemandEntry>, CoreError> {
        let subjects = self.catalog.subjects_for_scope(scope).await?;
        let enrollment = self.catalog.enrollment_for_scope(scope).await?;
        Ok(resolve_pool(scope, &subjects, &enrollment))
    }
}
