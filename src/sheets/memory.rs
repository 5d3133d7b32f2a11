//! In-process [`TableStore`]. Used by the test suites and by `serve --memory`.

use super::{header_action, HeaderAction, TableStore};
use crate::store::Partition;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct MemoryTables {
    tables: Mutex<HashMap<Partition, Vec<Vec<String>>>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a partition's rows wholesale (header included).
    pub fn with_rows(self, partition: Partition, rows: Vec<Vec<String>>) -> Self {
        self.guard().insert(partition, rows);
        self
    }

    /// Snapshot of a partition's rows.
    pub fn rows(&self, partition: Partition) -> Vec<Vec<String>> {
        self.guard().get(&partition).cloned().unwrap_or_default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Partition, Vec<Vec<String>>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TableStore for MemoryTables {
    async fn read_all_rows(&self, partition: Partition) -> Result<Vec<Vec<String>>> {
        Ok(self.rows(partition))
    }

    async fn append_row(&self, partition: Partition, row: Vec<String>) -> Result<()> {
        self.guard().entry(partition).or_default().push(row);
        Ok(())
    }

    async fn overwrite_row(
        &self,
        partition: Partition,
        row_index: usize,
        row: Vec<String>,
    ) -> Result<()> {
        let mut tables = self.guard();
        let rows = tables.entry(partition).or_default();
        let len = rows.len();
        match rows.get_mut(row_index) {
            Some(slot) => *slot = row,
            None => bail!(
                "row {} out of range in {} ({} rows)",
                row_index,
                partition.sheet_name(),
                len
            ),
        }
        Ok(())
    }

    async fn delete_row(&self, partition: Partition, row_index: usize) -> Result<()> {
        let mut tables = self.guard();
        let rows = tables.entry(partition).or_default();
        if row_index >= rows.len() {
            bail!(
                "row {} out of range in {} ({} rows)",
                row_index,
                partition.sheet_name(),
                rows.len()
            );
        }
        rows.remove(row_index);
        Ok(())
    }

    async fn ensure_header(&self, partition: Partition, header: &[String]) -> Result<()> {
        let mut tables = self.guard();
        let rows = tables.entry(partition).or_default();
        match header_action(rows.first().map(Vec::as_slice), header) {
            HeaderAction::Keep => {}
            HeaderAction::Write => match rows.first_mut() {
                Some(first) => *first = header.to_vec(),
                None => rows.push(header.to_vec()),
            },
            HeaderAction::Insert => rows.insert(0, header.to_vec()),
        }
        Ok(())
    }
}
