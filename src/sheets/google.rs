//! Google Sheets v4 adapter.
//!
//! Each partition is a worksheet (`Todos`, `Todos_Future`) in one spreadsheet.
//! Values are read and written with `valueInputOption=RAW` so dates and ids
//! stay plain strings instead of being reinterpreted by the Sheets locale.
//!
//! | Port operation | Sheets call |
//! |----------------|-------------|
//! | `read_all_rows` | `GET values/{sheet}!A:I` |
//! | `append_row` | `POST values/{sheet}!A:I:append` |
//! | `overwrite_row` | `PUT values/{sheet}!A{n}:I{n}` |
//! | `delete_row` | `batchUpdate` → `deleteDimension` |
//! | `ensure_header` | `GET values/{sheet}!A1:I1`, then `PUT` or `insertDimension` + `PUT` |
//!
//! Failures are retried up to [`MAX_ATTEMPTS`] times with exponential
//! backoff. `GET` and `PUT` are retried on 429, 5xx, timeouts and connection
//! failures. `POST` calls (`append`, `batchUpdate`) shift or add rows, so they
//! are retried only on 429 or when the connection was never made.

use super::auth::TokenSource;
use super::{header_action, HeaderAction, TableStore};
use crate::store::Partition;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

pub const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Size given to worksheets created on first use.
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLS: u32 = 10;

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct GoogleSheets {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
    sheet_ids: HashMap<Partition, i64>,
    backoff_base: Duration,
}

impl GoogleSheets {
    /// Connect to a spreadsheet, creating any missing partition worksheet and
    /// dropping a blank default first sheet left over from spreadsheet creation.
    pub async fn open(
        http: reqwest::Client,
        base_url: &str,
        spreadsheet_id: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let mut sheets = GoogleSheets {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            tokens,
            sheet_ids: HashMap::new(),
            backoff_base: BACKOFF_BASE,
        };

        let existing = sheets.list_sheets().await.with_context(|| {
            format!("cannot open spreadsheet {}", spreadsheet_id)
        })?;
        for partition in Partition::ALL {
            let title = partition.sheet_name();
            let sheet_id = match existing.iter().find(|s| s.title == title) {
                Some(s) => s.sheet_id,
                None => sheets.add_sheet(title).await?,
            };
            sheets.sheet_ids.insert(partition, sheet_id);
        }
        if let Some(first) = existing.first() {
            sheets.drop_if_blank_default(first).await;
        }
        Ok(sheets)
    }

    /// Shorten retry sleeps; tests use this to keep failure paths fast.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    fn sheet_id(&self, partition: Partition) -> Result<i64> {
        self.sheet_ids
            .get(&partition)
            .copied()
            .ok_or_else(|| anyhow!("worksheet {} not initialised", partition.sheet_name()))
    }

    async fn list_sheets(&self) -> Result<Vec<SheetProperties>> {
        let url = format!(
            "{}?fields=sheets.properties(sheetId,title)",
            self.spreadsheet_url()
        );
        let meta: SpreadsheetMeta = serde_json::from_value(self.call(Method::GET, &url, None).await?)?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<i64> {
        let reply = self
            .batch_update(json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        }
                    }
                }
            }]))
            .await?;
        let sheet_id = reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| anyhow!("addSheet reply for {} carried no sheetId", title))?;
        info!(title, sheet_id, "created worksheet");
        Ok(sheet_id)
    }

    /// Best effort: a failure here never blocks startup.
    async fn drop_if_blank_default(&self, first: &SheetProperties) {
        let ours = Partition::ALL.iter().any(|p| p.sheet_name() == first.title);
        if ours {
            return;
        }
        let range = format!("{}A1:Z", quoted_sheet(&first.title));
        let blank = match self.read_range(&range).await {
            Ok(rows) => rows.iter().flatten().all(|c| c.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, title = %first.title, "could not inspect first worksheet");
                return;
            }
        };
        if !blank {
            return;
        }
        match self
            .batch_update(json!([{ "deleteSheet": { "sheetId": first.sheet_id } }]))
            .await
        {
            Ok(_) => info!(title = %first.title, "removed blank default worksheet"),
            Err(e) => warn!(error = %e, title = %first.title, "could not remove blank worksheet"),
        }
    }

    async fn batch_update(&self, requests: Value) -> Result<Value> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        self.call(Method::POST, &url, Some(&json!({ "requests": requests })))
            .await
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let body = self.call(Method::GET, &self.values_url(range), None).await?;
        let range: ValueRange = serde_json::from_value(body)?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.call(Method::PUT, &url, Some(&body)).await?;
        Ok(())
    }

    /// Send one API request, retrying transient failures.
    async fn call(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let token = self.tokens.token().await?;
            let mut request = self.http.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let failure = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        if text.trim().is_empty() {
                            return Ok(Value::Null);
                        }
                        return Ok(serde_json::from_str(&text)?);
                    }
                    let text = response.text().await.unwrap_or_default();
                    if !should_retry_status(&method, status) {
                        bail!("{} {} returned {}: {}", method, url, status, text);
                    }
                    anyhow!("{} {} returned {}: {}", method, url, status, text)
                }
                Err(e) if e.is_connect() || (e.is_timeout() && is_repeatable(&method)) => {
                    anyhow!(e).context(format!("{} {} failed", method, url))
                }
                Err(e) => return Err(anyhow!(e).context(format!("{} {} failed", method, url))),
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(failure);
            }
            let delay = self.backoff_base * 2u32.pow(attempt - 1);
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %failure, "retrying sheets call");
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Whether sending the request twice leaves the sheet as sending it once.
fn is_repeatable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::PUT
}

fn should_retry_status(method: &Method, status: StatusCode) -> bool {
    // A 429 is rejected before the request is applied.
    status == StatusCode::TOO_MANY_REQUESTS || (is_transient(status) && is_repeatable(method))
}

/// A1 sheet prefix with the title quoted, e.g. `'Sheet 1'!`.
fn quoted_sheet(title: &str) -> String {
    format!("'{}'!", title.replace('\'', "''"))
}

fn cell_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn row_range(partition: Partition, row_index: usize) -> String {
    let n = row_index + 1;
    format!("{}!A{}:I{}", partition.sheet_name(), n, n)
}

#[async_trait]
impl TableStore for GoogleSheets {
    async fn read_all_rows(&self, partition: Partition) -> Result<Vec<Vec<String>>> {
        let rows = self
            .read_range(&format!("{}!A:I", partition.sheet_name()))
            .await?;
        debug!(%partition, rows = rows.len(), "read worksheet");
        Ok(rows)
    }

    async fn append_row(&self, partition: Partition, row: Vec<String>) -> Result<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("{}!A:I", partition.sheet_name()))
        );
        let body = json!({ "majorDimension": "ROWS", "values": [row] });
        self.call(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    async fn overwrite_row(
        &self,
        partition: Partition,
        row_index: usize,
        row: Vec<String>,
    ) -> Result<()> {
        self.write_range(&row_range(partition, row_index), vec![row])
            .await
    }

    async fn delete_row(&self, partition: Partition, row_index: usize) -> Result<()> {
        let sheet_id = self.sheet_id(partition)?;
        self.batch_update(json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row_index,
                    "endIndex": row_index + 1,
                }
            }
        }]))
        .await?;
        Ok(())
    }

    async fn ensure_header(&self, partition: Partition, header: &[String]) -> Result<()> {
        let first = self.read_range(&row_range(partition, 0)).await?;
        match header_action(first.first().map(Vec::as_slice), header) {
            HeaderAction::Keep => return Ok(()),
            HeaderAction::Write => {}
            HeaderAction::Insert => {
                let sheet_id = self.sheet_id(partition)?;
                self.batch_update(json!([{
                    "insertDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": 0,
                            "endIndex": 1,
                        },
                        "inheritFromBefore": false,
                    }
                }]))
                .await?;
            }
        }
        self.write_range(&row_range(partition, 0), vec![header.to_vec()])
            .await?;
        info!(%partition, "wrote header row");
        Ok(())
    }
}
