//! # Prometheus Metrics — Exposition for Scraping
//!
//! Exposes taskbook operational metrics in the Prometheus text exposition
//! format at `GET /metrics`.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `taskbook_http_request_duration_seconds` | Histogram | `method`, `path` | HTTP handler latency |
//! | `taskbook_table_calls_total` | Counter | `operation`, `partition` | Calls into the backing spreadsheet |
//! | `taskbook_table_errors_total` | Counter | `operation`, `partition` | Failed calls into the backing spreadsheet |
//!
//! HTTP paths are normalized before labelling (ids and dates collapsed) so the
//! label cardinality stays bounded.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Label set for backing-store calls.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TableCallLabel {
    pub operation: String,
    pub partition: String,
}

type HistogramFamily = Family<HttpLabel, Histogram, fn() -> Histogram>;

fn request_histogram() -> Histogram {
    // 5ms .. ~10s; Sheets round trips sit in the 100ms-1s range.
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}

/// Thread-safe metrics registry. All fields are atomic and cheap to clone.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: HistogramFamily,
    pub table_calls: Family<TableCallLabel, Counter>,
    pub table_errors: Family<TableCallLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration: HistogramFamily =
            Family::new_with_constructor(request_histogram);
        registry.register(
            "taskbook_http_request_duration_seconds",
            "HTTP request latency by method and normalized path",
            http_request_duration.clone(),
        );

        let table_calls = Family::<TableCallLabel, Counter>::default();
        registry.register(
            "taskbook_table_calls",
            "Calls into the backing spreadsheet by operation and partition",
            table_calls.clone(),
        );

        let table_errors = Family::<TableCallLabel, Counter>::default();
        registry.register(
            "taskbook_table_errors",
            "Failed calls into the backing spreadsheet by operation and partition",
            table_errors.clone(),
        );

        Self {
            registry,
            http_request_duration,
            table_calls,
            table_errors,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
