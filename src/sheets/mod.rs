//! # Sheets — Tabular Storage Port and Adapters
//!
//! The store talks to its two partitions only through [`TableStore`], a
//! minimal row-oriented interface: read everything, append, overwrite or
//! delete a row by index, and make sure the header is in place.
//!
//! `row_index` is the 0-based position in the vector returned by
//! [`TableStore::read_all_rows`]; row 0 is the header.
//!
//! ## Adapters
//!
//! - [`google`] — Google Sheets v4 REST API, one worksheet per partition
//! - [`memory`] — in-process tables for tests and `serve --memory`
//! - [`instrumented`] — decorator counting calls into Prometheus

pub mod auth;
pub mod google;
pub mod instrumented;
pub mod memory;

use crate::store::Partition;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Every row of the partition, header included, in sheet order.
    async fn read_all_rows(&self, partition: Partition) -> Result<Vec<Vec<String>>>;

    async fn append_row(&self, partition: Partition, row: Vec<String>) -> Result<()>;

    async fn overwrite_row(
        &self,
        partition: Partition,
        row_index: usize,
        row: Vec<String>,
    ) -> Result<()>;

    async fn delete_row(&self, partition: Partition, row_index: usize) -> Result<()>;

    /// Idempotent. See [`header_action`] for how an existing first row is treated.
    async fn ensure_header(&self, partition: Partition, header: &[String]) -> Result<()>;
}

/// What `ensure_header` has to do given the current first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    Keep,
    /// Row 0 is missing, blank, or a damaged header: write the header over it.
    Write,
    /// Row 0 already holds a record: insert the header above it.
    Insert,
}

pub fn header_action(first_row: Option<&[String]>, header: &[String]) -> HeaderAction {
    let Some(row) = first_row else {
        return HeaderAction::Write;
    };
    if row.iter().all(|c| c.trim().is_empty()) {
        return HeaderAction::Write;
    }
    let first = row[0].as_str();
    if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) {
        return HeaderAction::Insert;
    }
    if Some(first) != header.first().map(String::as_str) || row.len() < header.len() {
        return HeaderAction::Write;
    }
    HeaderAction::Keep
}
