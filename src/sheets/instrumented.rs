//! [`TableStore`] decorator that counts every call, and every failed call,
//! into [`Metrics`].

use super::TableStore;
use crate::prom_metrics::{Metrics, TableCallLabel};
use crate::store::Partition;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct Instrumented<T> {
    inner: T,
    metrics: Arc<Metrics>,
}

impl<T: TableStore> Instrumented<T> {
    pub fn new(inner: T, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }

    fn record<R>(&self, operation: &str, partition: Partition, result: Result<R>) -> Result<R> {
        let label = TableCallLabel {
            operation: operation.to_string(),
            partition: partition.as_str().to_string(),
        };
        self.metrics.table_calls.get_or_create(&label).inc();
        if let Err(e) = &result {
            self.metrics.table_errors.get_or_create(&label).inc();
            warn!(operation, %partition, error = %e, "table call failed");
        }
        result
    }
}

#[async_trait]
impl<T: TableStore> TableStore for Instrumented<T> {
    async fn read_all_rows(&self, partition: Partition) -> Result<Vec<Vec<String>>> {
        let result = self.inner.read_all_rows(partition).await;
        self.record("read_all_rows", partition, result)
    }

    async fn append_row(&self, partition: Partition, row: Vec<String>) -> Result<()> {
        let result = self.inner.append_row(partition, row).await;
        self.record("append_row", partition, result)
    }

    async fn overwrite_row(
        &self,
        partition: Partition,
        row_index: usize,
        row: Vec<String>,
    ) -> Result<()> {
        let result = self.inner.overwrite_row(partition, row_index, row).await;
        self.record("overwrite_row", partition, result)
    }

    async fn delete_row(&self, partition: Partition, row_index: usize) -> Result<()> {
        let result = self.inner.delete_row(partition, row_index).await;
        self.record("delete_row", partition, result)
    }

    async fn ensure_header(&self, partition: Partition, header: &[String]) -> Result<()> {
        let result = self.inner.ensure_header(partition, header).await;
        self.record("ensure_header", partition, result)
    }
}
