//! Partition routing and id allocation.

use super::codec;
use super::Todo;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Undated, past, today and tomorrow.
    Near,
    /// Strictly after tomorrow.
    Future,
}

impl Partition {
    /// Scan order for lookups and listings.
    pub const ALL: [Partition; 2] = [Partition::Near, Partition::Future];

    /// Worksheet title holding this partition.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Partition::Near => "Todos",
            Partition::Future => "Todos_Future",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Near => "near",
            Partition::Future => "future",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the partition for a due date. Empty and malformed dates go to NEAR.
pub fn route(due_date: &str, today: NaiveDate) -> Partition {
    match crate::clock::parse_date(due_date) {
        Some(due) if due > today + Duration::days(1) => Partition::Future,
        _ => Partition::Near,
    }
}

/// Decodable records of a partition with their row index. Row 0 is the header.
pub fn records(rows: &[Vec<String>]) -> impl Iterator<Item = (usize, Todo)> + '_ {
    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, row)| codec::decode(row).map(|t| (i, t)))
}

/// Highest id in the partition plus one, or 1 when it holds no records.
/// Ids freed by deletion below the maximum are never handed out again.
pub fn next_id(rows: &[Vec<String>]) -> u64 {
    records(rows).map(|(_, t)| t.id).max().map_or(1, |max| max + 1)
}
