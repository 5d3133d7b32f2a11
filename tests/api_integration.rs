//! HTTP integration tests for the taskbook Axum routes.
//!
//! These tests exercise the public routes using `tower::ServiceExt::oneshot`
//! to send synthetic requests directly to the router without starting a TCP
//! listener. The store behind the router is the in-memory backend with time
//! pinned to Sunday 2024-03-10, so no network or spreadsheet is needed.
//!
//! # Testing strategy
//!
//! Each test builds a fresh router via `common::build_test_app()` and keeps a
//! handle on the shared `AppState` to seed and inspect the store directly.
//! The helpers `get()`, `get_text()` and `post_form()` return status plus a
//! parsed body (or the redirect target) for concise assertions.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{build_test_app, sunday};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::json!(null));
    (status, json)
}

async fn get_text(app: Router, uri: &str) -> (StatusCode, String, Option<String>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned(), location)
}

/// POST an url-encoded form; returns the status and the `Location` header.
async fn post_form(app: Router, uri: &str, form: &str) -> (StatusCode, Option<String>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    (status, location)
}

// == Day views ==================================================================

#[tokio::test]
async fn root_redirects_to_today() {
    let (app, _) = build_test_app(sunday()).await;
    let (status, _, location) = get_text(app, "/").await;
    assert!(status.is_redirection());
    assert_eq!(location.as_deref(), Some("/today"));
}

#[tokio::test]
async fn today_page_lists_todos_and_overdue() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Buy milk", "2 bottles", "2024-03-10").await.unwrap();
    state.store.add("File taxes", "", "2024-03-01").await.unwrap();
    state.store.add("Dentist", "", "2024-03-11").await.unwrap();

    let (status, html, _) = get_text(app, "/today").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("2024-03-10 (日)"));
    assert!(html.contains("Buy milk"));
    assert!(html.contains("2 bottles"));
    assert!(html.contains("Overdue"));
    assert!(html.contains("File taxes"));
    assert!(!html.contains("Dentist"));
}

#[tokio::test]
async fn tomorrow_and_date_views_show_only_that_day() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Dentist", "", "2024-03-11").await.unwrap();
    state.store.add("Trip", "", "2024-03-20").await.unwrap();
    state.store.add("Old", "", "2024-03-01").await.unwrap();

    let (status, html, _) = get_text(app.clone(), "/tomorrow").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Dentist"));
    assert!(!html.contains("Trip"));
    assert!(!html.contains("Overdue"));

    let (status, html, _) = get_text(app, "/date/2024-03-20").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Trip"));
    assert!(html.contains("2024-03-20 (水)"));
}

#[tokio::test]
async fn invalid_date_redirects_to_today() {
    let (app, _) = build_test_app(sunday()).await;
    let (status, _, location) = get_text(app, "/date/2024-13-45").await;
    assert!(status.is_redirection());
    assert_eq!(location.as_deref(), Some("/today"));
}

#[tokio::test]
async fn titles_are_html_escaped() {
    let (app, state) = build_test_app(sunday()).await;
    state
        .store
        .add("<script>alert(1)</script>", "", "2024-03-10")
        .await
        .unwrap();
    let (_, html, _) = get_text(app, "/today").await;
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

// == Form actions ===============================================================

#[tokio::test]
async fn add_creates_todo_and_redirects_to_its_day() {
    let (app, state) = build_test_app(sunday()).await;
    let (status, location) = post_form(
        app.clone(),
        "/add",
        "title=Buy+milk&content=&due_date=2024-03-11",
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/tomorrow"));

    let todo = state.store.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.day_of_week, "月");

    let (_, location) = post_form(app, "/add", "title=Trip&due_date=2024-03-20").await;
    assert_eq!(location.as_deref(), Some("/date/2024-03-20"));
}

#[tokio::test]
async fn add_with_blank_title_writes_nothing() {
    let (app, state) = build_test_app(sunday()).await;
    let (status, location) = post_form(app, "/add", "title=+++&due_date=2024-03-10").await;
    assert!(status.is_redirection());
    assert_eq!(location.as_deref(), Some("/add"));
    assert!(state.store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_form_prefills_due_date() {
    let (app, _) = build_test_app(sunday()).await;
    let (status, html, _) = get_text(app.clone(), "/add?due_date=2024-03-12").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("value=\"2024-03-12\""));

    let (_, html, _) = get_text(app, "/add").await;
    assert!(html.contains("value=\"2024-03-10\""));
}

#[tokio::test]
async fn edit_updates_and_migrates() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Draft", "", "2024-03-10").await.unwrap();

    let (status, html, _) = get_text(app.clone(), "/edit/1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("value=\"Draft\""));

    let (status, location) = post_form(
        app,
        "/edit/1",
        "title=Final&content=done+soon&due_date=2024-03-25",
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/date/2024-03-25"));

    let moved = state
        .store
        .list(Some("2024-03-25".into()))
        .await
        .unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].title, "Final");
    assert_eq!(moved[0].content, "done soon");
    assert!(state.store.list(Some("2024-03-10".into())).await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_unknown_id_redirects_to_today() {
    let (app, _) = build_test_app(sunday()).await;
    let (status, _, location) = get_text(app.clone(), "/edit/99").await;
    assert!(status.is_redirection());
    assert_eq!(location.as_deref(), Some("/today"));

    let (_, location) = post_form(app, "/edit/99", "title=x").await;
    assert_eq!(location.as_deref(), Some("/today"));
}

#[tokio::test]
async fn complete_and_delete_return_to_the_given_day() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Yesterday chore", "", "2024-03-09").await.unwrap();
    state.store.add("Throwaway", "", "2024-03-09").await.unwrap();

    let (_, location) = post_form(app.clone(), "/complete/1", "return_to=2024-03-09").await;
    assert_eq!(location.as_deref(), Some("/yesterday"));
    assert!(state.store.get_by_id(1).await.unwrap().unwrap().is_completed());

    let (_, location) = post_form(app.clone(), "/delete/2", "return_to=").await;
    assert_eq!(location.as_deref(), Some("/today"));
    assert!(state.store.get_by_id(2).await.unwrap().is_none());

    // Unknown ids are not an error.
    let (status, _) = post_form(app, "/delete/42", "return_to=2024-03-09").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn shared_id_actions_resolve_to_the_near_sheet() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Near one", "", "2024-03-10").await.unwrap();
    state.store.add("Far one", "", "2024-03-20").await.unwrap();

    let (_, location) = post_form(app, "/complete/1", "return_to=2024-03-20").await;
    assert_eq!(location.as_deref(), Some("/date/2024-03-20"));

    let near = state.store.list(Some("2024-03-10".into())).await.unwrap();
    assert!(near[0].is_completed());
    let far = state.store.list(Some("2024-03-20".into())).await.unwrap();
    assert_eq!(far[0].id, 1);
    assert!(!far[0].is_completed());
}

#[tokio::test]
async fn carryover_moves_to_tomorrow() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Stretch", "10 min", "2024-03-08").await.unwrap();

    let (_, location) = post_form(app, "/carryover/1", "").await;
    assert_eq!(location.as_deref(), Some("/tomorrow"));
    let todo = state.store.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(todo.due_date, "2024-03-11");
    assert_eq!(todo.content, "10 min");
}

// == JSON API ===================================================================

#[tokio::test]
async fn api_lists_and_filters() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("undated", "", "").await.unwrap();
    state.store.add("today", "", "2024-03-10").await.unwrap();
    state.store.add("far", "", "2024-04-01").await.unwrap();

    let (status, json) = get(app.clone(), "/api/todos").await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["today", "far", "undated"]);

    let (_, json) = get(app, "/api/todos?due_date=2024-04-01").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["title"], "far");
    assert_eq!(json[0]["status"], "pending");
}

#[tokio::test]
async fn api_get_by_id_and_not_found() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("Buy milk", "", "2024-03-10").await.unwrap();

    let (status, json) = get(app.clone(), "/api/todos/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Buy milk");
    assert_eq!(json["day_of_week"], "日");

    let (status, json) = get(app, "/api/todos/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn api_overdue() {
    let (app, state) = build_test_app(sunday()).await;
    state.store.add("late", "", "2024-03-09").await.unwrap();
    state.store.add("done late", "", "2024-03-08").await.unwrap();
    state.store.complete(2).await.unwrap();

    let (status, json) = get(app, "/api/todos/overdue").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["title"], "late");
}

// == Health and middleware ======================================================

#[tokio::test]
async fn health_probes() {
    let (app, _) = build_test_app(sunday()).await;
    let (status, body, _) = get_text(app.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    let (status, _, _) = get_text(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_count_requests_and_table_calls() {
    let (app, _) = build_test_app(sunday()).await;
    get_text(app.clone(), "/edit/5").await;
    let (status, body, _) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("taskbook_http_request_duration_seconds"));
    assert!(body.contains("path=\"/edit/:id\""));
    assert!(body.contains("taskbook_table_calls_total"));
    assert!(body.contains("operation=\"ensure_header\""));
}

#[tokio::test]
async fn request_id_is_propagated() {
    let (app, _) = build_test_app(sunday()).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn stylesheet_is_served() {
    let (app, _) = build_test_app(sunday()).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/static/style.css")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/css; charset=utf-8"
    );
}
