//! # CLI Execution Functions
//!
//! Kept out of `main.rs` so the entry point stays a flag table. Contains the
//! execution logic for `serve` and `check`.

use anyhow::{bail, Result};
use std::sync::Arc;
use taskbook::clock::{Clock, SystemClock};
use taskbook::config::Settings;
use taskbook::prom_metrics::Metrics;
use taskbook::sheets::auth::CredentialsSource;
use taskbook::sheets::instrumented::Instrumented;
use taskbook::sheets::memory::MemoryTables;
use taskbook::sheets::TableStore;
use taskbook::store::TodoStore;
use taskbook::{setup_check, web};
use tracing::{error, info, warn};

use super::Cli;

/// Steps printed when the spreadsheet cannot be opened at startup.
const STARTUP_CHECKLIST: [&str; 3] = [
    "SPREADSHEET_ID in .env (or the environment) is the id from the spreadsheet URL",
    "the service-account key exists (credentials.json or GOOGLE_CREDENTIALS_JSON)",
    "the spreadsheet is shared with the service account as an editor",
];

pub fn run_serve(cli: &Cli, host: &str, port: u16, memory: bool) -> Result<()> {
    let metrics = Arc::new(Metrics::new());
    let rt = tokio::runtime::Runtime::new()?;

    let store = if memory {
        warn!("using in-memory store; todos are lost on exit");
        let clock = SystemClock::from_name(&cli.timezone)?;
        let tables = Instrumented::new(MemoryTables::new(), metrics.clone());
        rt.block_on(open_store(Arc::new(tables), Arc::new(clock)))?
    } else {
        let settings = Settings::resolve(
            cli.spreadsheet_id.as_deref(),
            cli.credentials_json.as_deref(),
            &cli.credentials_file,
            &cli.timezone,
        )?;
        let opened = rt.block_on(async {
            let sheets = settings.connect().await?;
            let tables = Instrumented::new(sheets, metrics.clone());
            open_store(Arc::new(tables), Arc::new(settings.clock)).await
        });
        match opened {
            Ok(store) => store,
            Err(e) => {
                error!(error = %format!("{:#}", e), "cannot open the spreadsheet");
                for (i, step) in STARTUP_CHECKLIST.iter().enumerate() {
                    error!("check {}: {}", i + 1, step);
                }
                bail!("startup failed; run `taskbook check` for details");
            }
        }
    };

    info!(today = %store.today(), timezone = %cli.timezone, "store opened");
    rt.block_on(web::run(host, port, web::AppState::new(store, metrics)))
}

async fn open_store(tables: Arc<dyn TableStore>, clock: Arc<dyn Clock>) -> Result<TodoStore> {
    TodoStore::open(tables, clock).await
}

pub fn run_check(cli: &Cli) -> Result<()> {
    let project_dir = std::env::current_dir()?;
    let credentials =
        CredentialsSource::resolve(cli.credentials_json.as_deref(), &cli.credentials_file);
    let report = setup_check::run(&project_dir, cli.spreadsheet_id.as_deref(), &credentials);
    print!("{}", report);
    if !report.is_ok() {
        bail!("{} setup problem(s) found", report.issues.len());
    }
    Ok(())
}
