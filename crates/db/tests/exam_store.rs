use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Utc};
use examcell_core::error::CoreError;
use examcell_core::notification::{
    prepare_notification, ExamWindow, NewNotification, NotificationScope, NotificationStatus,
    StatusChange,
};
use examcell_core::slot_grid::SessionWindow;
use examcell_core::store::{EntryCheck, NotificationStore, SubjectCatalog, TimetableStore};
use examcell_core::publication::ensure_publishable;
use examcell_core::subject_pool::resolve_pool;
use examcell_core::timetable::TimetableEntry;
use examcell_db::PgExamStore;
use sqlx::PgPool;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn scope() -> NotificationScope {
    NotificationScope {
        programme_codes: ["BE-CSE".to_string()].into(),
        batch_ids: [2022].into(),
        semester_ids: [5].into(),
        regulation_ids: [2021].into(),
    }
}

fn new_notification(code: &str) -> NewNotification {
    NewNotification {
        code: code.to_string(),
        title: "End semester examinations".to_string(),
        scope: scope(),
        exam_type_id: Some(1),
        exam_name_id: Some(1),
        session_template_id: Some(1),
        month_year_id: Some(1),
        window: ExamWindow {
            start_date: date("2026-02-06"),
            end_date: date("2026-02-07"),
            default_start_time: time("09:30"),
            default_end_time: time("12:30"),
        },
        sessions: vec![
            SessionWindow {
                label: "FN".to_string(),
                start_time: time("09:30"),
                end_time: time("12:30"),
            },
            SessionWindow {
                label: "AN".to_string(),
                start_time: time("14:00"),
                end_time: time("17:00"),
            },
        ],
        created_by: "coe".to_string(),
    }
}

fn created() -> StatusChange {
    StatusChange {
        to: NotificationStatus::Draft,
        actor: "coe".to_string(),
        reason: Some("created".to_string()),
    }
}

fn change(to: NotificationStatus, actor: &str) -> StatusChange {
    StatusChange {
        to,
        actor: actor.to_string(),
        reason: None,
    }
}

async fn seed_master_data(pool: &PgPool) {
    sqlx::query("INSERT INTO programmes (code, name) VALUES ('BE-CSE', 'Computer Science')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO subjects (code, name, programme_code, semester_id, regulation_id, is_active) \
         VALUES ('CS3501', 'Compiler Design', 'BE-CSE', 5, 2021, TRUE), \
                ('CS3551', 'Distributed Computing', 'BE-CSE', 5, 2021, TRUE), \
                ('CS3591', 'Computer Networks', 'BE-CSE', 5, 2021, FALSE), \
                ('CS3691', 'Embedded Systems', 'BE-CSE', 6, 2021, TRUE)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO students \
            (register_no, name, programme_code, batch_id, semester_id, regulation_id, is_active) \
         VALUES ('R001', 'Asha', 'BE-CSE', 2022, 5, 2021, TRUE), \
                ('R002', 'Bala', 'BE-CSE', 2022, 5, 2021, TRUE), \
                ('R003', 'Chitra', 'BE-CSE', 2022, 5, 2021, FALSE), \
                ('R004', 'Dev', 'BE-CSE', 2023, 5, 2021, TRUE)",
    )
    .execute(pool)
    .await
    .unwrap();
}

async fn insert(store: &PgExamStore, code: &str) {
    let notification = prepare_notification(new_notification(code), Utc::now()).unwrap();
    store
        .insert_notification(&notification, &created())
        .await
        .unwrap();
}

async fn resolved_entries(store: &PgExamStore) -> Vec<TimetableEntry> {
    let scope = scope();
    let subjects = store.subjects_for_scope(&scope).await.unwrap();
    let enrollment = store.enrollment_for_scope(&scope).await.unwrap();
    let notification = store.find_notification("EN-01").await.unwrap().unwrap();
    let slots = notification.slots();
    resolve_pool(&scope, &subjects, &enrollment)
        .into_iter()
        .zip(&slots)
        .map(|(subject, slot)| TimetableEntry::place(subject, slot))
        .collect()
}

// ---------------------------------------------------------------------------
// Notifications and status log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_and_find_notification(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    let found = store.find_notification("EN-01").await.unwrap().unwrap();
    assert_eq!(found.status, NotificationStatus::Draft);
    assert_eq!(found.sessions.len(), 2);
    assert_eq!(found.scope, scope());
    assert_eq!(found.draft_version, 0);

    let log = store.status_log("EN-01").await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].seq, 1);
    assert_eq!(log[0].from_status, None);

    assert!(store.find_notification("EN-99").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_code_is_rejected(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    let again = prepare_notification(new_notification("EN-01"), Utc::now()).unwrap();
    assert_matches!(
        store.insert_notification(&again, &created()).await,
        Err(CoreError::DuplicateId { .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters_by_status(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;
    insert(&store, "EN-02").await;
    store
        .transition("EN-02", &change(NotificationStatus::Cancelled, "coe"), None)
        .await
        .unwrap();

    assert_eq!(store.list_notifications(None).await.unwrap().len(), 2);
    let drafts = store
        .list_notifications(Some(NotificationStatus::Draft))
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].code, "EN-01");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transition_appends_log_and_retry_is_idempotent(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    let publish = change(NotificationStatus::Published, "principal");
    let gate: &EntryCheck = &ensure_publishable;
    let first = store.transition("EN-01", &publish, Some(gate)).await.unwrap();
    assert!(first.appended);
    assert_eq!(first.notification.status, NotificationStatus::Published);

    let retry = store.transition("EN-01", &publish, Some(gate)).await.unwrap();
    assert!(!retry.appended);

    let log = store.status_log("EN-01").await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].seq, 2);
    assert_eq!(log[1].from_status, Some(NotificationStatus::Draft));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_transition_writes_nothing(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    assert_matches!(
        store
            .transition("EN-01", &change(NotificationStatus::Completed, "coe"), None)
            .await,
        Err(CoreError::InvalidTransition { .. })
    );
    assert_matches!(
        store
            .transition("EN-99", &change(NotificationStatus::Cancelled, "coe"), None)
            .await,
        Err(CoreError::NotFound { .. })
    );
    assert_eq!(store.status_log("EN-01").await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_log_is_append_only(pool: PgPool) {
    let store = PgExamStore::new(pool.clone());
    insert(&store, "EN-01").await;

    let update = sqlx::query("UPDATE exam_notification_status_log SET actor = 'someone'")
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM exam_notification_status_log")
        .execute(&pool)
        .await;
    assert!(delete.is_err());
}

// ---------------------------------------------------------------------------
// Subject catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_subject_pool_counts_active_students_in_scope(pool: PgPool) {
    seed_master_data(&pool).await;
    let store = PgExamStore::new(pool);

    let scope = scope();
    let subjects = store.subjects_for_scope(&scope).await.unwrap();
    assert_eq!(subjects.len(), 2);

    let enrollment = store.enrollment_for_scope(&scope).await.unwrap();
    let pool = resolve_pool(&scope, &subjects, &enrollment);
    let codes: Vec<_> = pool.iter().map(|s| s.subject_code.as_str()).collect();
    assert_eq!(codes, vec!["CS3501", "CS3551"]);
    assert!(pool.iter().all(|s| s.student_count == 2));
}

// ---------------------------------------------------------------------------
// Timetable
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_timetable_round_trip_and_version(pool: PgPool) {
    seed_master_data(&pool).await;
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    let mut entries = resolved_entries(&store).await;
    entries[0].room = Some("R1".to_string());
    entries[0].invigilators = vec!["S1".to_string(), "S2".to_string()];

    let version = store.save_timetable("EN-01", 0, &entries).await.unwrap();
    assert_eq!(version, 1);

    let saved = store.timetable_entries("EN-01").await.unwrap();
    assert_eq!(saved, entries);

    assert_matches!(
        store.save_timetable("EN-01", 0, &entries).await,
        Err(CoreError::StaleDraft {
            expected: 0,
            actual: 1
        })
    );
    assert_eq!(store.save_timetable("EN-01", 1, &[]).await.unwrap(), 2);
    assert!(store.timetable_entries("EN-01").await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_rejects_repeated_subject(pool: PgPool) {
    seed_master_data(&pool).await;
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    let mut entries = resolved_entries(&store).await;
    entries.push(entries[0].clone());

    assert_matches!(
        store.save_timetable("EN-01", 0, &entries).await,
        Err(CoreError::DuplicateId { .. })
    );
    assert!(store.timetable_entries("EN-01").await.unwrap().is_empty());
    let notification = store.find_notification("EN-01").await.unwrap().unwrap();
    assert_eq!(notification.draft_version, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_published_timetable_is_locked(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;
    let gate: &EntryCheck = &ensure_publishable;
    store
        .transition(
            "EN-01",
            &change(NotificationStatus::Published, "principal"),
            Some(gate),
        )
        .await
        .unwrap();

    assert_matches!(
        store.save_timetable("EN-01", 0, &[]).await,
        Err(CoreError::Conflict(_))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_publish_without_precondition_is_refused(pool: PgPool) {
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;

    assert_matches!(
        store
            .transition("EN-01", &change(NotificationStatus::Published, "principal"), None)
            .await,
        Err(CoreError::Validation(_))
    );
    let notification = store.find_notification("EN-01").await.unwrap().unwrap();
    assert_eq!(notification.status, NotificationStatus::Draft);
    assert_eq!(store.status_log("EN-01").await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_precondition_rolls_back(pool: PgPool) {
    seed_master_data(&pool).await;
    let store = PgExamStore::new(pool);
    insert(&store, "EN-01").await;
    let entries = resolved_entries(&store).await;
    store.save_timetable("EN-01", 0, &entries).await.unwrap();

    let reject: &EntryCheck = &|entries: &[TimetableEntry]| {
        assert_eq!(entries.len(), 2);
        Err(CoreError::Validation("rejected".to_string()))
    };
    let result = store
        .transition(
            "EN-01",
            &change(NotificationStatus::Published, "principal"),
            Some(reject),
        )
        .await;
    assert_matches!(result, Err(CoreError::Validation(_)));

    let notification = store.find_notification("EN-01").await.unwrap().unwrap();
    assert_eq!(notification.status, NotificationStatus::Draft);
    assert_eq!(store.status_log("EN-01").await.unwrap().len(), 1);
}
