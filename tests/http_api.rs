use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use blind_clock::{
    config::AppConfig,
    dao::session_store::memory::MemorySessionStore,
    routes,
    services::access::OPERATOR_TOKEN_HEADER,
    state::{AppState, SharedState},
};

const TOKEN: &str = "floor-secret";

async fn app() -> Router {
    let state = state();
    state
        .set_session_store(Arc::new(MemorySessionStore::new()))
        .await;
    routes::router(state)
}

fn state() -> SharedState {
    AppState::new(
        AppConfig::builtin()
            .unwrap()
            .with_operator_token(Some(TOKEN.to_string())),
    )
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(OPERATOR_TOKEN_HEADER, token);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn started_session(app: &Router) -> String {
    let (status, created) = call(
        app,
        Method::POST,
        "/admin/sessions",
        Some(TOKEN),
        Some(json!({ "name": "Friday deepstack" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["sessionId"].as_str().unwrap().to_string();

    let (status, _) = call(
        app,
        Method::POST,
        &format!("/admin/sessions/{id}/start"),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

#[tokio::test]
async fn healthcheck_reports_store_state() {
    let (status, body) = call(&app().await, Method::GET, "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scheduleLevels"], 15);

    let degraded = routes::router(state());
    let (status, body) = call(&degraded, Method::GET, "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");

    let uri = format!("/sessions/{}/clock", Uuid::new_v4());
    let (status, _) = call(&degraded, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn session_lifecycle_drives_the_clock() {
    let app = app().await;
    let (status, created) = call(
        &app,
        Method::POST,
        "/admin/sessions",
        Some(TOKEN),
        Some(json!({ "name": "Sunday main" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["sessionId"].as_str().unwrap().to_string();

    let (status, clock) = call(&app, Method::GET, &format!("/sessions/{id}/clock"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clock["sessionStatus"], "NOT_STARTED");
    assert!(clock["levelStartTime"].is_null());
    assert_eq!(clock["levels"].as_array().unwrap().len(), 15);

    let (status, started) = call(
        &app,
        Method::POST,
        &format!("/admin/sessions/{id}/start"),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "ACTIVE");
    assert_eq!(started["currentLevelIndex"], 0);

    let (status, advanced) = call(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/level"),
        Some(TOKEN),
        Some(json!({ "levelIndex": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advanced["currentLevelIndex"], 3);

    let (_, clock) = call(&app, Method::GET, &format!("/sessions/{id}/clock"), None, None).await;
    assert_eq!(clock["currentLevelIndex"], 3);
    assert_eq!(clock["currentLevel"]["index"], 3);
    assert_eq!(clock["levelStartTime"], advanced["levelStartTime"]);
    assert_eq!(clock["sessionStatus"], "ACTIVE");

    let (status, finished) = call(
        &app,
        Method::POST,
        &format!("/admin/sessions/{id}/finish"),
        Some(TOKEN),
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["status"], "COMPLETED");

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/level"),
        Some(TOKEN),
        Some(json!({ "levelIndex": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn advancement_failures_are_distinguishable() {
    let app = app().await;
    let id = started_session(&app).await;
    let uri = format!("/sessions/{id}/level");

    let (status, body) = call(&app, Method::PUT, &uri, None, Some(json!({ "levelIndex": 1 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("unauthorized"));

    let (status, _) = call(
        &app,
        Method::PUT,
        &uri,
        Some("guess"),
        Some(json!({ "levelIndex": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/sessions/{}/level", Uuid::new_v4()),
        Some(TOKEN),
        Some(json!({ "levelIndex": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(TOKEN),
        Some(json!({ "levelIndex": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("0..=14"));

    let (_, clock) = call(&app, Method::GET, &format!("/sessions/{id}/clock"), None, None).await;
    assert_eq!(clock["currentLevelIndex"], 0);
}

#[tokio::test]
async fn level_can_also_be_posted() {
    let app = app().await;
    let id = started_session(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/level"),
        Some(TOKEN),
        Some(json!({ "levelIndex": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentLevelIndex"], 2);
}

#[tokio::test]
async fn payouts_follow_registration_and_privilege() {
    let app = app().await;
    let id = started_session(&app).await;
    let uri = format!("/sessions/{id}/payouts");

    let clock_uri = format!("/sessions/{id}/clock");

    let (status, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["showPayouts"], false);
    assert!(body.get("tiers").is_none());
    let (_, clock) = call(&app, Method::GET, &clock_uri, None, None).await;
    assert_eq!(clock["showPayouts"], false);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/admin/sessions/{id}/registration"),
        Some(TOKEN),
        Some(json!({ "registrationClosed": true, "entries": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["showPayouts"], true);
    assert_eq!(body["entries"], 40);
    assert!(body["tiers"].is_array());
    let (_, clock) = call(&app, Method::GET, &clock_uri, None, None).await;
    assert_eq!(clock["showPayouts"], true);
}

#[tokio::test]
async fn session_management_requires_operator() {
    let app = app().await;
    let (status, _) = call(&app, Method::GET, "/admin/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/admin/sessions",
        Some(TOKEN),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sessions) = call(&app, Method::GET, "/admin/sessions", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn openapi_document_lists_clock_routes() {
    let (status, doc) = call(&app().await, Method::GET, "/api-doc/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/sessions/{id}/clock"));
    assert!(paths.contains_key("/sessions/{id}/level"));
    assert!(paths.contains_key("/admin/sessions"));
}
