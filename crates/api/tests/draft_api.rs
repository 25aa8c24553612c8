//! Integration tests for the draft timetable endpoints and publication.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use examcell_core::store::TimetableStore;

use common::{
    build_test_app, create_notification, draft_uri, get, open_draft, post_empty, post_json,
    seed_subjects, send, uri, CODE,
};

fn assign(subject_id: i64, date: &str, session_index: i16, room: &str, chief: &str) -> Value {
    json!({
        "subject_id": subject_id,
        "date": date,
        "session_index": session_index,
        "room": room,
        "chief_invigilator": chief,
    })
}

fn placements(draft: &Value) -> Vec<(String, String, i64)> {
    draft["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["subject_code"].as_str().unwrap().to_string(),
                e["date"].as_str().unwrap().to_string(),
                e["session_index"].as_i64().unwrap(),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// End-to-end flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auto_assign_save_and_publish() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A", "B", "C"]).await;
    create_notification(&app).await;

    let (status, opened) = post_empty(&app, &uri("/draft")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(opened["data"]["draft"]["unassigned"].as_array().unwrap().len(), 3);
    assert_eq!(opened["data"]["draft"]["base_version"], 0);
    assert_eq!(opened["data"]["restored"]["restored"], 0);
    let draft_id = opened["data"]["draft_id"].as_str().unwrap().to_string();

    let (status, auto) = post_empty(&app, &draft_uri(&draft_id, "/auto-assign")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(auto["data"]["assigned"], 3);
    assert_eq!(auto["data"]["remaining"], 0);
    assert_eq!(
        placements(&auto["data"]["draft"]),
        vec![
            ("A".to_string(), "2026-02-06".to_string(), 0),
            ("B".to_string(), "2026-02-06".to_string(), 1),
            ("C".to_string(), "2026-02-07".to_string(), 0),
        ]
    );

    let (_, conflicts) = get(&app, &draft_uri(&draft_id, "/conflicts")).await;
    assert!(conflicts["data"]["conflicts"].as_array().unwrap().is_empty());

    let (status, saved) = post_empty(&app, &draft_uri(&draft_id, "/save")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["data"]["version"], 1);
    assert_eq!(saved["data"]["entries"], 3);

    let (status, published) =
        post_json(&app, &uri("/publish"), json!({ "approver": "principal" })).await;
    assert_eq!(status, StatusCode::OK, "{published}");
    assert_eq!(published["data"]["appended"], true);
    assert_eq!(published["data"]["notification"]["status"], "published");

    let (status, _) = get(&app, &draft_uri(&draft_id, "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, timetable) = get(&app, &uri("/timetable")).await;
    assert_eq!(timetable["data"].as_array().unwrap().len(), 3);

    let (_, log) = get(&app, &uri("/status-log")).await;
    let log = log["data"].as_array().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1]["actor"], "principal");
}

#[tokio::test]
async fn room_clash_blocks_publication() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["D", "E"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;

    let (status, _) =
        post_json(&app, &draft_uri(&draft, "/assign"), assign(1, "2026-02-06", 0, "R1", "I1")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) =
        post_json(&app, &draft_uri(&draft, "/assign"), assign(2, "2026-02-06", 0, "R1", "I2")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, report) = get(&app, &draft_uri(&draft, "/conflicts")).await;
    let conflicts = report["data"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["kind"], "room_clash");
    assert_eq!(report["data"]["affected_entries"], 2);

    let (status, _) = post_empty(&app, &draft_uri(&draft, "/save")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) =
        post_json(&app, &uri("/publish"), json!({ "approver": "principal" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "UNRESOLVED_CONFLICTS");
    assert_eq!(json["conflicts"].as_array().unwrap().len(), 1);

    let (_, notification) = get(&app, &uri("")).await;
    assert_eq!(notification["data"]["status"], "draft");

    let (_, saved) = get(&app, &uri("/timetable/conflicts")).await;
    assert_eq!(saved["data"]["conflicts"].as_array().unwrap().len(), 1);

    // Moving the second subject to the afternoon resolves the clash.
    let (status, _) =
        post_json(&app, &draft_uri(&draft, "/unassign"), json!({ "subject_id": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    post_json(&app, &draft_uri(&draft, "/assign"), assign(2, "2026-02-06", 1, "R1", "I2")).await;
    let (status, saved) = post_empty(&app, &draft_uri(&draft, "/save")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["data"]["version"], 2);

    let (status, _) = post_json(&app, &uri("/publish"), json!({ "approver": "principal" })).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Draft editing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reopening_restores_saved_entries() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A", "B"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;
    post_json(&app, &draft_uri(&draft, "/assign"), assign(2, "2026-02-07", 1, "R2", "I1")).await;
    post_empty(&app, &draft_uri(&draft, "/save")).await;

    let (status, _) = send(&app, Method::DELETE, &draft_uri(&draft, ""), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &draft_uri(&draft, ""), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, opened) = post_empty(&app, &uri("/draft")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(opened["data"]["draft_id"], json!(draft));
    assert_eq!(opened["data"]["restored"]["restored"], 1);
    assert_eq!(opened["data"]["restored"]["dropped"], 0);
    assert_eq!(opened["data"]["draft"]["base_version"], 1);
    assert_eq!(
        placements(&opened["data"]["draft"]),
        vec![("B".to_string(), "2026-02-07".to_string(), 1)]
    );
    assert_eq!(opened["data"]["draft"]["entries"][0]["room"], "R2");
}

#[tokio::test]
async fn unknown_subject_returns_404() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;

    let (status, json) =
        post_json(&app, &draft_uri(&draft, "/assign"), assign(99, "2026-02-06", 0, "R1", "I1")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "UNKNOWN_SUBJECT");
}

#[tokio::test]
async fn slot_outside_grid_returns_400() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;

    let (status, json) =
        post_json(&app, &draft_uri(&draft, "/assign"), assign(1, "2026-02-09", 0, "R1", "I1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "SLOT_NOT_IN_RANGE");

    let (status, json) =
        post_json(&app, &draft_uri(&draft, "/assign"), assign(1, "2026-02-06", 5, "R1", "I1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "SLOT_NOT_IN_RANGE");

    let (_, snapshot) = get(&app, &draft_uri(&draft, "")).await;
    assert_eq!(snapshot["data"]["unassigned"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn entry_resources_can_be_replaced() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;
    post_json(&app, &draft_uri(&draft, "/assign"), assign(1, "2026-02-06", 0, "R1", "I1")).await;

    let (status, json) = send(
        &app,
        Method::PUT,
        &draft_uri(&draft, "/entries/1"),
        Some(json!({
            "room": "Hall-2",
            "chief_invigilator": "I9",
            "invigilators": ["S1", "S2"],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["room"], "Hall-2");
    assert_eq!(json["data"]["chief_invigilator"], "I9");
    assert_eq!(json["data"]["invigilators"], json!(["S1", "S2"]));

    let (status, json) = send(
        &app,
        Method::PUT,
        &draft_uri(&draft, "/entries/42"),
        Some(json!({ "room": "Hall-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "UNKNOWN_SUBJECT");
}

#[tokio::test]
async fn clear_and_unassign_return_subjects_to_pool() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A", "B", "C"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;
    post_empty(&app, &draft_uri(&draft, "/auto-assign")).await;

    let (status, json) =
        post_json(&app, &draft_uri(&draft, "/unassign"), json!({ "subject_id": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["subject_code"], "B");

    let (status, json) = post_empty(&app, &draft_uri(&draft, "/clear")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["entries"].as_array().unwrap().is_empty());
    let codes: Vec<_> = json["data"]["unassigned"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["subject_code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn unknown_draft_id_returns_404() {
    let (app, _) = build_test_app();
    create_notification(&app).await;

    let missing = "00000000-0000-4000-8000-000000000000";
    let (status, json) = post_empty(&app, &draft_uri(missing, "/auto-assign")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn draft_of_another_notification_is_not_reachable() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    post_json(
        &app,
        "/api/v1/notifications",
        common::notification_body("EN-MAR-26"),
    )
    .await;
    let draft = open_draft(&app).await;

    let (status, _) = get(
        &app,
        &format!("/api/v1/notifications/EN-MAR-26/draft/{draft}"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Concurrency and locking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_operator_does_not_overwrite_first_session() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A", "B"]).await;
    create_notification(&app).await;

    let first = open_draft(&app).await;
    let (status, _) =
        post_json(&app, &draft_uri(&first, "/assign"), assign(1, "2026-02-06", 0, "R1", "I1")).await;
    assert_eq!(status, StatusCode::CREATED);

    // A second operator opens the same notification and saves first.
    let second = open_draft(&app).await;
    assert_ne!(first, second);
    let (_, untouched) = get(&app, &draft_uri(&second, "")).await;
    assert!(untouched["data"]["entries"].as_array().unwrap().is_empty());
    let (status, saved) = post_empty(&app, &draft_uri(&second, "/save")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["data"]["version"], 1);

    // The first operator's edit is still in their own session.
    let (_, mine) = get(&app, &draft_uri(&first, "")).await;
    assert_eq!(mine["data"]["entries"].as_array().unwrap().len(), 1);

    // Saving it over the newer version is refused.
    let (status, json) = post_empty(&app, &draft_uri(&first, "/save")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "STALE_DRAFT");
    assert!(store.timetable_entries(CODE).await.unwrap().is_empty());

    // Reopening picks up the winning version, after which a save succeeds.
    let reopened = open_draft(&app).await;
    post_json(&app, &draft_uri(&reopened, "/assign"), assign(1, "2026-02-06", 0, "R1", "I1")).await;
    let (status, saved) = post_empty(&app, &draft_uri(&reopened, "/save")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["data"]["version"], 2);
    assert_eq!(store.timetable_entries(CODE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn save_over_newer_stored_version_returns_409() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let draft = open_draft(&app).await;
    post_empty(&app, &draft_uri(&draft, "/auto-assign")).await;

    // A writer outside this process saves first.
    store.save_timetable(CODE, 0, &[]).await.unwrap();

    let (status, json) = post_empty(&app, &draft_uri(&draft, "/save")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "STALE_DRAFT");
}

#[tokio::test]
async fn publishing_closes_every_session() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let first = open_draft(&app).await;
    let second = open_draft(&app).await;

    let (status, _) = post_json(&app, &uri("/publish"), json!({ "approver": "principal" })).await;
    assert_eq!(status, StatusCode::OK);

    for draft in [first, second] {
        let (status, _) = get(&app, &draft_uri(&draft, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn published_notification_cannot_be_drafted() {
    let (app, store) = build_test_app();
    seed_subjects(&store, &["A"]).await;
    create_notification(&app).await;
    let (status, _) = post_json(&app, &uri("/publish"), json!({ "approver": "principal" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_empty(&app, &uri("/draft")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn blank_approver_returns_400() {
    let (app, _) = build_test_app();
    create_notification(&app).await;

    let (status, json) = post_json(&app, &uri("/publish"), json!({ "approver": " " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}
