//! # Web — HTTP Server for the Task List
//!
//! Runs an Axum HTTP server with server-rendered pages (askama templates) for
//! day-by-day task management, a small read-only JSON API, and the usual
//! health and metrics probes.
//!
//! ## Route Groups
//!
//! - [`routes_todos`] — HTML views and form posts (`/today`, `/add`, `/edit/{id}`, ...)
//! - [`routes_api`] — JSON reads under `/api/todos`
//! - [`routes_health`] — `/healthz`, `/readyz`, `/metrics`
//!
//! Handlers only ever see todo ids; row positions stay inside the store.

mod routes_api;
mod routes_health;
mod routes_todos;
mod views;

use crate::prom_metrics::{self, Metrics};
use crate::store::TodoStore;
use anyhow::Result;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Instrument};

pub struct AppState {
    pub store: TodoStore,
    pub prom_metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: TodoStore, prom_metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(AppState {
            store,
            prom_metrics,
        })
    }
}

/// Middleware that records HTTP request duration into the Prometheus histogram,
/// generates (or propagates) a request ID for correlation, and wraps the
/// request in a tracing span using `.instrument()` for proper async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Collapse ids and dates into placeholders so histogram labels stay bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                seg.to_string()
            } else if seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else if crate::clock::parse_date(seg).is_some() {
                ":date".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical URL of a day view: the named views for yesterday, today and
/// tomorrow, `/date/{date}` for anything else.
pub(crate) fn day_path(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        -1 => "/yesterday".to_string(),
        0 => "/today".to_string(),
        1 => "/tomorrow".to_string(),
        _ => format!("/date/{}", crate::clock::format_date(date)),
    }
}

/// Log a store failure and answer 500 with a plain-text body.
pub(crate) fn page_error(e: anyhow::Error) -> Response {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", e)).into_response()
}

/// Log a store failure and answer 500 with a JSON body.
pub(crate) fn api_error(e: anyhow::Error) -> Response {
    error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": e.to_string()})),
    )
        .into_response()
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/today") }))
        .route("/today", get(routes_todos::handler_today))
        .route("/yesterday", get(routes_todos::handler_yesterday))
        .route("/tomorrow", get(routes_todos::handler_tomorrow))
        .route("/date/{date}", get(routes_todos::handler_date))
        .route(
            "/add",
            get(routes_todos::handler_add_form).post(routes_todos::handler_add),
        )
        .route(
            "/edit/{id}",
            get(routes_todos::handler_edit_form).post(routes_todos::handler_edit),
        )
        .route("/complete/{id}", post(routes_todos::handler_complete))
        .route("/delete/{id}", post(routes_todos::handler_delete))
        .route("/carryover/{id}", post(routes_todos::handler_carryover))
        .route("/static/style.css", get(routes_todos::handler_style))
        .route("/api/todos", get(routes_api::handler_api_todos))
        .route("/api/todos/overdue", get(routes_api::handler_api_overdue))
        .route("/api/todos/{id}", get(routes_api::handler_api_todo))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(host: &str, port: u16, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(host, port, "taskbook running; open http://{}:{}/", host, port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalize_path_preserves_named_routes() {
        assert_eq!(normalize_path("/today"), "/today");
        assert_eq!(normalize_path("/api/todos/overdue"), "/api/todos/overdue");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn normalize_path_collapses_ids_and_dates() {
        assert_eq!(normalize_path("/edit/42"), "/edit/:id");
        assert_eq!(normalize_path("/api/todos/7"), "/api/todos/:id");
        assert_eq!(normalize_path("/date/2024-03-10"), "/date/:date");
    }

    #[test]
    fn normalize_path_handles_empty_and_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn day_path_names_adjacent_days() {
        let today = day(2024, 3, 10);
        assert_eq!(day_path(day(2024, 3, 9), today), "/yesterday");
        assert_eq!(day_path(today, today), "/today");
        assert_eq!(day_path(day(2024, 3, 11), today), "/tomorrow");
        assert_eq!(day_path(day(2024, 3, 20), today), "/date/2024-03-20");
    }
}
