//! Record lifecycle: add, lookup, update (with cross-partition move),
//! complete, carry-over and delete.

use super::codec::{self, weekday_label};
use super::partition::{next_id, records, route};
use super::{DueDate, Partition, Status, Todo, TodoStore};
use crate::clock;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Where a record currently lives. Row indices never leave this module.
struct Located {
    partition: Partition,
    row_index: usize,
    todo: Todo,
}

impl TodoStore {
    /// Create a pending record and return its id within its partition.
    ///
    /// Title validation is the caller's job; the store writes whatever it is given.
    pub async fn add(
        &self,
        title: &str,
        content: &str,
        due_date: impl Into<DueDate>,
    ) -> Result<u64> {
        let due_date = due_date.into();
        let now = self.clock.now();
        let _guard = self.write_lock.lock().await;

        let partition = route(due_date.as_str(), now.date());
        let rows = self.tables.read_all_rows(partition).await?;
        let id = next_id(&rows);
        let todo = Todo {
            id,
            title: title.to_string(),
            content: content.to_string(),
            day_of_week: weekday_label(due_date.as_str()),
            due_date: due_date.into_string(),
            created_at: clock::format_timestamp(now),
            completed_at: String::new(),
            status: Status::Pending,
            legacy_target_date: String::new(),
        };
        self.tables
            .append_row(partition, codec::encode(&todo))
            .await?;
        info!(id, %partition, due_date = %todo.due_date, "todo added");
        Ok(id)
    }

    /// First record with this id, searching NEAR before FUTURE.
    pub async fn get_by_id(&self, id: u64) -> Result<Option<Todo>> {
        Ok(self.locate(id).await?.map(|found| found.todo))
    }

    /// Replace title, content and due date. Returns `false` when no record has
    /// this id.
    ///
    /// `created_at`, `status` and `completed_at` are kept. If the new due date
    /// belongs to the other partition the record is appended there under a
    /// freshly allocated id and removed from its old partition.
    pub async fn update(
        &self,
        id: u64,
        title: &str,
        content: &str,
        due_date: impl Into<DueDate>,
    ) -> Result<bool> {
        let due_date = due_date.into();
        let today = self.clock.today();
        let _guard = self.write_lock.lock().await;

        let Some(found) = self.locate(id).await? else {
            return Ok(false);
        };
        self.rewrite(found, title, content, due_date, today).await?;
        Ok(true)
    }

    /// Mark a record completed and stamp `completed_at` with the current time.
    ///
    /// Completing an already-completed record refreshes the timestamp.
    pub async fn complete(&self, id: u64) -> Result<bool> {
        let now = self.clock.now();
        let _guard = self.write_lock.lock().await;

        let Some(mut found) = self.locate(id).await? else {
            return Ok(false);
        };
        found.todo.status = Status::Completed;
        found.todo.completed_at = clock::format_timestamp(now);
        self.tables
            .overwrite_row(found.partition, found.row_index, codec::encode(&found.todo))
            .await?;
        info!(id, partition = %found.partition, "todo completed");
        Ok(true)
    }

    /// Move a record to a new due date, keeping its title and content.
    pub async fn carry_over(&self, id: u64, new_due_date: impl Into<DueDate>) -> Result<bool> {
        let due_date = new_due_date.into();
        let today = self.clock.today();
        let _guard = self.write_lock.lock().await;

        let Some(found) = self.locate(id).await? else {
            return Ok(false);
        };
        let title = found.todo.title.clone();
        let content = found.todo.content.clone();
        self.rewrite(found, &title, &content, due_date, today)
            .await?;
        Ok(true)
    }

    pub async fn delete(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let Some(found) = self.locate(id).await? else {
            return Ok(false);
        };
        self.tables
            .delete_row(found.partition, found.row_index)
            .await?;
        info!(id, partition = %found.partition, "todo deleted");
        Ok(true)
    }

    async fn locate(&self, id: u64) -> Result<Option<Located>> {
        for partition in Partition::ALL {
            let rows = self.tables.read_all_rows(partition).await?;
            let hit = records(&rows).find(|(_, t)| t.id == id);
            if let Some((row_index, todo)) = hit {
                return Ok(Some(Located {
                    partition,
                    row_index,
                    todo,
                }));
            }
        }
        debug!(id, "todo not found");
        Ok(None)
    }

    /// Write new fields for a located record, moving it if its partition changes.
    async fn rewrite(
        &self,
        found: Located,
        title: &str,
        content: &str,
        due_date: DueDate,
        today: NaiveDate,
    ) -> Result<()> {
        let destination = route(due_date.as_str(), today);
        let mut todo = Todo {
            id: found.todo.id,
            title: title.to_string(),
            content: content.to_string(),
            day_of_week: weekday_label(due_date.as_str()),
            due_date: due_date.into_string(),
            created_at: found.todo.created_at,
            completed_at: found.todo.completed_at,
            status: found.todo.status,
            legacy_target_date: String::new(),
        };

        if destination == found.partition {
            self.tables
                .overwrite_row(found.partition, found.row_index, codec::encode(&todo))
                .await?;
            info!(id = todo.id, partition = %destination, "todo updated");
            return Ok(());
        }

        let rows = self.tables.read_all_rows(destination).await?;
        todo.id = next_id(&rows);
        self.tables
            .append_row(destination, codec::encode(&todo))
            .await?;
        self.tables
            .delete_row(found.partition, found.row_index)
            .await?;
        info!(
            old_id = found.todo.id,
            new_id = todo.id,
            from = %found.partition,
            to = %destination,
            "todo moved between partitions"
        );
        Ok(())
    }
}
