//! # Todo JSON API
//!
//! Read-only JSON views over the store.
//!
//! | Endpoint | Store call |
//! |----------|------------|
//! | `GET /api/todos` | `list(None)` |
//! | `GET /api/todos?due_date=YYYY-MM-DD` | `list(Some(due_date))` |
//! | `GET /api/todos/overdue` | `overdue()` |
//! | `GET /api/todos/{id}` | `get_by_id(id)` |

use super::{api_error, AppState};
use crate::store::DueDate;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct TodosQuery {
    due_date: Option<String>,
}

pub(super) async fn handler_api_todos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TodosQuery>,
) -> impl IntoResponse {
    let filter = params.due_date.map(DueDate::from);
    match state.store.list(filter).await {
        Ok(todos) => Json(todos).into_response(),
        Err(e) => api_error(e),
    }
}

pub(super) async fn handler_api_overdue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.overdue().await {
        Ok(todos) => Json(todos).into_response(),
        Err(e) => api_error(e),
    }
}

/// NEAR wins when both partitions hold the id.
pub(super) async fn handler_api_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    match state.store.get_by_id(id).await {
        Ok(Some(todo)) => Json(todo).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("todo {} not found", id)})),
        )
            .into_response(),
        Err(e) => api_error(e),
    }
}
