#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use examcell_api::config::ServerConfig;
use examcell_api::router::build_app_router;
use examcell_api::state::AppState;
use examcell_core::store::memory::MemoryStore;
use examcell_core::subject_pool::{EnrollmentCount, SubjectRecord};

pub const CODE: &str = "EN-FEB-26";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        db_max_connections: 1,
    }
}

/// Build the full application router over an in-memory store.
///
/// Uses the same builder as `main.rs`, so tests exercise the production
/// middleware stack. The store is returned for seeding and direct writes.
pub fn build_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    (build_app_router(state), store)
}

/// Seed active subjects (ids from 1, codes as given) for BE-CSE semester 5,
/// regulation 2021, with 58 enrolled students in batch 2022.
pub async fn seed_subjects(store: &MemoryStore, codes: &[&str]) {
    store
        .seed_subjects(
            codes
                .iter()
                .zip(1..)
                .map(|(code, id)| SubjectRecord {
                    id,
                    code: code.to_string(),
                    name: format!("Subject {code}"),
                    syllabus_code: None,
                    programme_code: "BE-CSE".to_string(),
                    semester_id: 5,
                    regulation_id: 2021,
                    is_active: true,
                })
                .collect(),
        )
        .await;
    store
        .seed_enrollment(vec![EnrollmentCount {
            programme_code: "BE-CSE".to_string(),
            batch_id: 2022,
            semester_id: 5,
            regulation_id: 2021,
            student_count: 58,
        }])
        .await;
}

/// Creation body for a two-day, two-session notification.
pub fn notification_body(code: &str) -> Value {
    json!({
        "code": code,
        "title": "End semester examinations",
        "programme_codes": ["BE-CSE"],
        "batch_ids": [2022],
        "semester_ids": [5],
        "regulation_ids": [2021],
        "exam_type_id": 1,
        "exam_name_id": 1,
        "session_template_id": 1,
        "month_year_id": 1,
        "start_date": "2026-02-06",
        "end_date": "2026-02-07",
        "default_start_time": "09:30:00",
        "default_end_time": "12:30:00",
        "sessions": [
            { "label": "FN", "start_time": "09:30:00", "end_time": "12:30:00" },
            { "label": "AN", "start_time": "14:00:00", "end_time": "17:00:00" }
        ],
        "created_by": "coe"
    })
}

/// Send a request and return the status and parsed JSON body (`Null` when
/// the body is empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None).await
}

/// Create the standard notification and assert it succeeded.
pub async fn create_notification(app: &Router) {
    let (status, json) = post_json(app, "/api/v1/notifications", notification_body(CODE)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
}

pub fn uri(suffix: &str) -> String {
    format!("/api/v1/notifications/{CODE}{suffix}")
}

/// Open a draft session on the standard notification and return its id.
pub async fn open_draft(app: &Router) -> String {
    let (status, json) = post_empty(app, &uri("/draft")).await;
    assert_eq!(status, StatusCode::CREATED, "open draft failed: {json}");
    json["data"]["draft_id"].as_str().unwrap().to_string()
}

pub fn draft_uri(draft_id: &str, suffix: &str) -> String {
    uri(&format!("/draft/{draft_id}{suffix}"))
}
