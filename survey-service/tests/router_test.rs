//! In-process router tests: requests go through `build_router` via
//! `tower::ServiceExt::oneshot`, without binding a socket.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::io;
use std::sync::{Arc, Mutex};
use survey_service::services::{Database, GenerationClient};
use survey_service::startup::{build_router, AppState};
use tempfile::TempDir;
use tower::util::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

async fn router() -> (Router, Arc<Database>, TempDir) {
    common::init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&dir);

    let db = Database::new(&config.database.path, 1).await.unwrap();
    db.create_schema().await.unwrap();
    let db = Arc::new(db);
    let generation = GenerationClient::new(&config.generation).unwrap();

    let state = AppState {
        config: Arc::new(config),
        db: db.clone(),
        generation: Arc::new(generation),
    };

    (build_router(state), db, dir)
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_then_alert_example() {
    let (app, db, _dir) = router().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/submitSurvey")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"email":"a@x.com","address":"1 Main St","score":80}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = db.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(stored.level, "high security level");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/fire-alert")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        body_json(response.into_body()).await,
        serde_json::json!({"address": "1 Main St"})
    );
}

#[tokio::test]
async fn every_route_answers_preflight() {
    let (app, _db, _dir) = router().await;

    for uri in ["/submitSurvey", "/fire-alert", "/downloadAccess", "/generate", "/ping"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "POST, GET, OPTIONS",
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn conflict_body_names_the_email() {
    let (app, _db, _dir) = router().await;

    let submit = || {
        Request::builder()
            .method("POST")
            .uri("/submitSurvey")
            .body(Body::from(
                r#"{"email":"dup@x.com","address":"1 Main St","score":10}"#,
            ))
            .unwrap()
    };

    let first = app.clone().oneshot(submit()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(submit()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("dup@x.com"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn request_span_carries_generated_request_id() {
    let (app, _db, _dir) = router().await;

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = app
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let output = logs.contents();

    assert!(
        output.contains(&format!("request_id={}", request_id)),
        "{}",
        output
    );
    assert!(!output.contains("request_id=-"), "{}", output);
}
