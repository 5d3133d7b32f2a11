//! # Store — Todo Records on a Two-Sheet Spreadsheet
//!
//! Emulates a small database on top of two tables reached through the
//! [`TableStore`] port: a NEAR partition (due today, tomorrow, in the past, or
//! undated) and a FUTURE partition (due after tomorrow).
//!
//! ## Module Structure
//!
//! - [`codec`] — positional row ⇄ [`Todo`]
//! - [`partition`] — partition routing and per-partition id allocation
//! - [`records`] — add / get / update / complete / carry-over / delete
//! - [`query`] — listing with due-date filter and the overdue scan
//!
//! ## Identity
//!
//! Ids are unique only inside a partition. When an update moves a record to
//! the other partition it receives a new id there and the old row is deleted.
//! Lookups by id search NEAR first, then FUTURE.
//!
//! ## Concurrency
//!
//! Mutations are serialized inside one process by `write_lock`, which covers
//! the read → allocate id → write sequence. Nothing coordinates separate
//! processes writing to the same spreadsheet; two of them can still hand out
//! the same id.

pub mod codec;
pub mod partition;
mod query;
mod records;

pub use partition::Partition;

use crate::clock::{self, Clock};
use crate::sheets::TableStore;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ── Record types ────────────────────────────────────────────────

/// Completion state. The only transition is `Pending` → `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Weekday label computed from `due_date` when the record was written.
    pub day_of_week: String,
    /// `YYYY-MM-DD`, or empty for undated records.
    pub due_date: String,
    pub created_at: String,
    /// Non-empty exactly when `status` is `Completed`.
    pub completed_at: String,
    pub status: Status,
    /// Column kept for spreadsheets written by older versions; always empty.
    pub legacy_target_date: String,
}

impl Todo {
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Parsed due date, `None` when empty or malformed.
    pub fn due(&self) -> Option<NaiveDate> {
        clock::parse_date(&self.due_date)
    }
}

/// A due-date argument: either a typed date or a raw string.
///
/// Strings are stored as given (trimmed). Malformed strings are not rejected;
/// they route to NEAR, get an empty weekday label, and never count as overdue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueDate(String);

impl DueDate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        clock::parse_date(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for DueDate {
    fn from(s: &str) -> Self {
        DueDate(s.trim().to_string())
    }
}

impl From<String> for DueDate {
    fn from(s: String) -> Self {
        DueDate::from(s.as_str())
    }
}

impl From<&String> for DueDate {
    fn from(s: &String) -> Self {
        DueDate::from(s.as_str())
    }
}

impl From<NaiveDate> for DueDate {
    fn from(d: NaiveDate) -> Self {
        DueDate(clock::format_date(d))
    }
}

impl From<Option<NaiveDate>> for DueDate {
    fn from(d: Option<NaiveDate>) -> Self {
        d.map(DueDate::from).unwrap_or_default()
    }
}

// ── Store ───────────────────────────────────────────────────────

pub struct TodoStore {
    tables: Arc<dyn TableStore>,
    clock: Arc<dyn Clock>,
    write_lock: tokio::sync::Mutex<()>,
}

impl TodoStore {
    /// Wrap a backing store, making sure both partitions carry the header row.
    ///
    /// Fails when the backing store cannot be reached; callers treat that as
    /// fatal at startup.
    pub async fn open(tables: Arc<dyn TableStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let header = codec::header_row();
        for partition in Partition::ALL {
            tables.ensure_header(partition, &header).await?;
        }
        info!("todo store ready");
        Ok(Self {
            tables,
            clock,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Cheap liveness probe against the backing store.
    pub async fn health_check(&self) -> Result<()> {
        self.tables.read_all_rows(Partition::Near).await?;
        Ok(())
    }
}
