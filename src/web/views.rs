//! Askama page models. Every field is precomputed so the templates stay
//! free of logic beyond loops and flags.

use super::page_error;
use crate::store::Todo;
use askama::Template;
use axum::response::{Html, IntoResponse, Response};

pub(super) struct TodoRow {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub due_date: String,
    pub day_of_week: String,
    pub completed: bool,
    pub completed_at: String,
}

impl From<Todo> for TodoRow {
    fn from(t: Todo) -> Self {
        TodoRow {
            id: t.id,
            completed: t.is_completed(),
            title: t.title,
            content: t.content,
            due_date: t.due_date,
            day_of_week: t.day_of_week,
            completed_at: t.completed_at,
        }
    }
}

/// One day's list.
#[derive(Template)]
#[template(path = "index.html")]
pub(super) struct IndexPage {
    /// e.g. `2024-03-10 (日)`
    pub heading: String,
    /// `today`, `yesterday`, `tomorrow` or `custom`; selects the active tab.
    pub view: &'static str,
    pub current_date: String,
    pub prev_path: String,
    pub next_path: String,
    pub todos: Vec<TodoRow>,
    pub overdue: Vec<TodoRow>,
    pub show_overdue: bool,
}

/// Add and edit form.
#[derive(Template)]
#[template(path = "edit.html")]
pub(super) struct EditPage {
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub title: String,
    pub content: String,
    pub due_date: String,
    pub cancel_path: String,
}

pub(super) fn render(page: &impl Template) -> Response {
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => page_error(anyhow::anyhow!("template error: {}", e)),
    }
}
