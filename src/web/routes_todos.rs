//! # Todo Pages and Form Actions
//!
//! Server-rendered day views plus the form posts that mutate todos. Every
//! mutation answers with a redirect back to a day view (post/redirect/get).
//!
//! | Endpoint | Action |
//! |----------|--------|
//! | `GET /today`, `/yesterday`, `/tomorrow` | Day view; today also lists overdue todos |
//! | `GET /date/{YYYY-MM-DD}` | Day view for any date; unparsable dates go to `/today` |
//! | `GET /add?due_date=` | Empty form, due date prefilled (today by default) |
//! | `POST /add` | Create, then show the todo's due day |
//! | `GET /edit/{id}`, `POST /edit/{id}` | Edit form and update |
//! | `POST /complete/{id}`, `POST /delete/{id}` | Back to the `return_to` day |
//! | `POST /carryover/{id}` | Move to tomorrow, then show tomorrow |
//!
//! Ids are only unique per worksheet and `{id}` carries no partition, so when
//! `Todos` and `Todos_Future` both hold an id, every action above resolves to
//! the `Todos` record, even from a `/date/...` view listing the future one.

use super::views::{render, EditPage, IndexPage, TodoRow};
use super::{day_path, page_error, AppState};
use crate::clock::{format_date, parse_date};
use crate::store::codec::weekday_label;
use crate::store::DueDate;
use axum::extract::{Form, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

const STYLE_CSS: &str = include_str!("../../static/style.css");

pub(super) async fn handler_today(State(state): State<Arc<AppState>>) -> Response {
    let today = state.store.today();
    day_view(&state, today, today).await
}

pub(super) async fn handler_yesterday(State(state): State<Arc<AppState>>) -> Response {
    let today = state.store.today();
    day_view(&state, today - Duration::days(1), today).await
}

pub(super) async fn handler_tomorrow(State(state): State<Arc<AppState>>) -> Response {
    let today = state.store.today();
    day_view(&state, today + Duration::days(1), today).await
}

pub(super) async fn handler_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Response {
    match parse_date(&date) {
        Some(date) => day_view(&state, date, state.store.today()).await,
        None => Redirect::to("/today").into_response(),
    }
}

async fn day_view(state: &AppState, date: NaiveDate, today: NaiveDate) -> Response {
    let current_date = format_date(date);
    let todos = match state.store.list(Some(DueDate::from(date))).await {
        Ok(todos) => todos,
        Err(e) => return page_error(e),
    };
    let show_overdue = date == today;
    let overdue = if show_overdue {
        match state.store.overdue().await {
            Ok(todos) => todos,
            Err(e) => return page_error(e),
        }
    } else {
        Vec::new()
    };

    let view = match (date - today).num_days() {
        -1 => "yesterday",
        0 => "today",
        1 => "tomorrow",
        _ => "custom",
    };
    render(&IndexPage {
        heading: format!("{} ({})", current_date, weekday_label(&current_date)),
        view,
        current_date,
        prev_path: day_path(date - Duration::days(1), today),
        next_path: day_path(date + Duration::days(1), today),
        todos: todos.into_iter().map(TodoRow::from).collect(),
        overdue: overdue.into_iter().map(TodoRow::from).collect(),
        show_overdue,
    })
}

#[derive(Deserialize)]
pub(super) struct AddQuery {
    due_date: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct TodoForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    due_date: String,
}

#[derive(Deserialize)]
pub(super) struct ReturnForm {
    #[serde(default)]
    return_to: String,
}

/// Where to land after a write: the day view of `date`, or today when the
/// date is empty or malformed.
fn landing(state: &AppState, date: &str) -> Redirect {
    let today = state.store.today();
    match parse_date(date) {
        Some(date) => Redirect::to(&day_path(date, today)),
        None => Redirect::to("/today"),
    }
}

pub(super) async fn handler_add_form(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AddQuery>,
) -> Response {
    let today = state.store.today();
    let due = params
        .due_date
        .as_deref()
        .and_then(parse_date)
        .unwrap_or(today);
    render(&EditPage {
        heading: "Add todo",
        action: "/add".to_string(),
        submit_label: "Add",
        title: String::new(),
        content: String::new(),
        due_date: format_date(due),
        cancel_path: day_path(due, today),
    })
}

pub(super) async fn handler_add(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TodoForm>,
) -> Response {
    let title = form.title.trim();
    if title.is_empty() {
        return Redirect::to("/add").into_response();
    }
    let due_date = DueDate::from(form.due_date.as_str());
    if let Err(e) = state
        .store
        .add(title, form.content.trim(), due_date.clone())
        .await
    {
        return page_error(e);
    }
    landing(&state, due_date.as_str()).into_response()
}

pub(super) async fn handler_edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Response {
    let todo = match state.store.get_by_id(id).await {
        Ok(Some(todo)) => todo,
        Ok(None) => return Redirect::to("/today").into_response(),
        Err(e) => return page_error(e),
    };
    let today = state.store.today();
    let cancel_path = match todo.due() {
        Some(due) => day_path(due, today),
        None => "/today".to_string(),
    };
    render(&EditPage {
        heading: "Edit todo",
        action: format!("/edit/{}", id),
        submit_label: "Save",
        title: todo.title,
        content: todo.content,
        due_date: todo.due_date,
        cancel_path,
    })
}

pub(super) async fn handler_edit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<TodoForm>,
) -> Response {
    let title = form.title.trim();
    if title.is_empty() {
        return Redirect::to(&format!("/edit/{}", id)).into_response();
    }
    let due_date = DueDate::from(form.due_date.as_str());
    match state
        .store
        .update(id, title, form.content.trim(), due_date.clone())
        .await
    {
        Ok(true) => landing(&state, due_date.as_str()).into_response(),
        Ok(false) => Redirect::to("/today").into_response(),
        Err(e) => page_error(e),
    }
}

pub(super) async fn handler_complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<ReturnForm>,
) -> Response {
    match state.store.complete(id).await {
        Ok(_) => landing(&state, &form.return_to).into_response(),
        Err(e) => page_error(e),
    }
}

pub(super) async fn handler_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<ReturnForm>,
) -> Response {
    match state.store.delete(id).await {
        Ok(_) => landing(&state, &form.return_to).into_response(),
        Err(e) => page_error(e),
    }
}

pub(super) async fn handler_carryover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Response {
    let tomorrow = state.store.today() + Duration::days(1);
    match state.store.carry_over(id, tomorrow).await {
        Ok(_) => Redirect::to("/tomorrow").into_response(),
        Err(e) => page_error(e),
    }
}

pub(super) async fn handler_style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}
