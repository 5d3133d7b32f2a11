//! # Config — Backend Settings
//!
//! Resolved from CLI flags with environment fallbacks (see `main.rs`); a
//! `.env` file in the working directory is loaded first by `dotenvy`.
//!
//! | Setting | Flag | Env | Default |
//! |---------|------|-----|---------|
//! | Spreadsheet id | `--spreadsheet-id` | `SPREADSHEET_ID` | required |
//! | Inline key JSON | `--credentials-json` | `GOOGLE_CREDENTIALS_JSON` | unset |
//! | Key file | `--credentials-file` | `GOOGLE_CREDENTIALS_FILE` | `credentials.json` |
//! | Timezone | `--timezone` | `APP_TIMEZONE` | `Asia/Tokyo` |

use crate::clock::SystemClock;
use crate::sheets::auth::{CredentialsSource, ServiceAccount};
use crate::sheets::google::{GoogleSheets, DEFAULT_BASE_URL};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Value shipped in the sample `.env`; treated the same as unset.
pub const PLACEHOLDER_SPREADSHEET_ID: &str = "your_spreadsheet_id_here";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Settings {
    pub spreadsheet_id: String,
    pub credentials: CredentialsSource,
    pub clock: SystemClock,
    pub sheets_base_url: String,
}

impl Settings {
    pub fn resolve(
        spreadsheet_id: Option<&str>,
        credentials_json: Option<&str>,
        credentials_file: &Path,
        timezone: &str,
    ) -> Result<Self> {
        let spreadsheet_id = usable_spreadsheet_id(spreadsheet_id).ok_or_else(|| {
            anyhow!("SPREADSHEET_ID is required (set via --spreadsheet-id or env)")
        })?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            credentials: CredentialsSource::resolve(credentials_json, credentials_file),
            clock: SystemClock::from_name(timezone)?,
            sheets_base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Authenticate and open the spreadsheet.
    pub async fn connect(&self) -> Result<GoogleSheets> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let key = self.credentials.load()?;
        let account = ServiceAccount::new(key, http.clone())?;
        tracing::info!(
            service_account = account.client_email(),
            spreadsheet_id = %self.spreadsheet_id,
            "connecting to Google Sheets"
        );
        GoogleSheets::open(
            http,
            &self.sheets_base_url,
            &self.spreadsheet_id,
            Arc::new(account),
        )
        .await
    }
}

/// Trimmed id, or `None` when blank or still the placeholder.
pub fn usable_spreadsheet_id(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && *s != PLACEHOLDER_SPREADSHEET_ID)
}
