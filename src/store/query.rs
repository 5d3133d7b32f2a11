//! Listing and overdue scanning across both partitions.

use super::partition::records;
use super::{DueDate, Partition, Todo, TodoStore};
use anyhow::Result;
use chrono::NaiveDate;

impl TodoStore {
    /// All records, NEAR before FUTURE, optionally restricted to one due date.
    ///
    /// The filter is an exact string match on the stored `due_date`, so a row
    /// holding `2024-1-5` does not match `2024-01-05`. Output is sorted by due
    /// date with undated records last; ties keep scan order.
    pub async fn list(&self, due_date: Option<DueDate>) -> Result<Vec<Todo>> {
        let all = self.scan_all().await?;
        Ok(filter_and_sort(all, due_date.as_ref().map(DueDate::as_str)))
    }

    /// Pending records whose due date parses and is before today, oldest first.
    pub async fn overdue(&self) -> Result<Vec<Todo>> {
        let today = self.clock.today();
        let all = self.scan_all().await?;
        Ok(select_overdue(all, today))
    }

    async fn scan_all(&self) -> Result<Vec<Todo>> {
        let mut out = Vec::new();
        for partition in Partition::ALL {
            let rows = self.tables.read_all_rows(partition).await?;
            out.extend(records(&rows).map(|(_, t)| t));
        }
        Ok(out)
    }
}

pub(crate) fn filter_and_sort(mut todos: Vec<Todo>, due_date: Option<&str>) -> Vec<Todo> {
    if let Some(wanted) = due_date {
        todos.retain(|t| t.due_date == wanted);
    }
    todos.sort_by(|a, b| {
        (a.due_date.is_empty(), a.due_date.as_str())
            .cmp(&(b.due_date.is_empty(), b.due_date.as_str()))
    });
    todos
}

pub(crate) fn select_overdue(todos: Vec<Todo>, today: NaiveDate) -> Vec<Todo> {
    let mut overdue: Vec<(NaiveDate, Todo)> = todos
        .into_iter()
        .filter(|t| !t.is_completed())
        .filter_map(|t| t.due().filter(|d| *d < today).map(|d| (d, t)))
        .collect();
    overdue.sort_by_key(|(d, _)| *d);
    overdue.into_iter().map(|(_, t)| t).collect()
}
