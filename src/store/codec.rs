//! Row codec: the positional 9-column layout shared with spreadsheets written
//! by earlier versions of the app.
//!
//! | col | field |
//! |-----|-------|
//! | A | id |
//! | B | title |
//! | C | content |
//! | D | day_of_week |
//! | E | due_date |
//! | F | created_at |
//! | G | completed_at |
//! | H | status |
//! | I | legacy target date |

use super::{Status, Todo};
use chrono::Datelike;

pub const COLUMN_COUNT: usize = 9;

pub const HEADER: [&str; COLUMN_COUNT] = [
    "ID",
    "タイトル",
    "内容",
    "曜日",
    "期日",
    "作成日時",
    "完了日時",
    "状態",
    "対象日",
];

/// Weekday labels, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

pub const STATUS_PENDING: &str = "未完了";
pub const STATUS_COMPLETED: &str = "完了";

pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|s| s.to_string()).collect()
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => STATUS_PENDING,
            Status::Completed => STATUS_COMPLETED,
        }
    }

    /// Anything other than the completed label reads as pending.
    pub fn from_label(label: &str) -> Self {
        if label == STATUS_COMPLETED {
            Status::Completed
        } else {
            Status::Pending
        }
    }
}

/// Weekday label for a due date; empty when the date is empty or malformed.
pub fn weekday_label(due_date: &str) -> String {
    crate::clock::parse_date(due_date)
        .map(|d| WEEKDAY_LABELS[d.weekday().num_days_from_monday() as usize].to_string())
        .unwrap_or_default()
}

/// Decode a row. Returns `None` unless column A is a run of ASCII digits,
/// which is how header and blank rows get skipped.
pub fn decode(row: &[String]) -> Option<Todo> {
    let raw_id = row.first()?;
    if raw_id.is_empty() || !raw_id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id = raw_id.parse::<u64>().ok()?;
    let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

    Some(Todo {
        id,
        title: cell(1),
        content: cell(2),
        day_of_week: cell(3),
        due_date: cell(4),
        created_at: cell(5),
        completed_at: cell(6),
        status: row
            .get(7)
            .map(|s| Status::from_label(s))
            .unwrap_or_default(),
        legacy_target_date: cell(8),
    })
}

pub fn encode(todo: &Todo) -> Vec<String> {
    vec![
        todo.id.to_string(),
        todo.title.clone(),
        todo.content.clone(),
        todo.day_of_week.clone(),
        todo.due_date.clone(),
        todo.created_at.clone(),
        todo.completed_at.clone(),
        todo.status.label().to_string(),
        todo.legacy_target_date.clone(),
    ]
}
