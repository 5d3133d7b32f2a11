//! Shared test helpers for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use taskbook::clock::FixedClock;
use taskbook::prom_metrics::Metrics;
use taskbook::sheets::instrumented::Instrumented;
use taskbook::sheets::memory::MemoryTables;
use taskbook::store::TodoStore;

/// 2024-03-10 is a Sunday (`日`).
pub fn sunday() -> NaiveDate {
    day(2024, 3, 10)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A store over fresh in-memory tables with time pinned to 09:00 on `today`.
///
/// The tables and clock are returned too so tests can inspect rows and move time.
pub async fn memory_store(today: NaiveDate) -> (TodoStore, Arc<MemoryTables>, Arc<FixedClock>) {
    let tables = Arc::new(MemoryTables::new());
    let clock = Arc::new(FixedClock::on(today));
    let store = TodoStore::open(tables.clone(), clock.clone())
        .await
        .expect("memory store opens");
    (store, tables, clock)
}

/// Build an Axum test app over an instrumented in-memory store.
pub async fn build_test_app(today: NaiveDate) -> (axum::Router, Arc<taskbook::web::AppState>) {
    let metrics = Arc::new(Metrics::new());
    let tables = Instrumented::new(MemoryTables::new(), metrics.clone());
    let store = TodoStore::open(Arc::new(tables), Arc::new(FixedClock::on(today)))
        .await
        .expect("memory store opens");
    let state = taskbook::web::AppState::new(store, metrics);
    (taskbook::web::build_router(state.clone()), state)
}

/// Path of the checked-in test service-account key.
pub fn fixture_key_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/service_account.json")
}

/// The test key with `token_uri` pointed at `token_uri`.
pub fn fixture_key_json(token_uri: &str) -> String {
    let raw = std::fs::read_to_string(fixture_key_path()).expect("fixture key readable");
    let mut key: serde_json::Value = serde_json::from_str(&raw).expect("fixture key is JSON");
    key["token_uri"] = serde_json::Value::String(token_uri.to_string());
    key.to_string()
}
