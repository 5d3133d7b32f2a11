//! # Main — CLI Entry Point
//!
//! Parses flags (with environment fallbacks loaded from `.env`), initialises
//! logging, and dispatches to a subcommand.
//!
//! ## Subcommands
//!
//! - `serve`: start the web UI and JSON API on top of the spreadsheet
//!   (or an in-memory store with `--memory`).
//! - `check`: report whether the spreadsheet id and service-account key are
//!   in place, without contacting Google.
//!
//! ## Global Options
//!
//! - `--spreadsheet-id` / `SPREADSHEET_ID`: target spreadsheet.
//! - `--credentials-json` / `GOOGLE_CREDENTIALS_JSON`: inline service-account key.
//! - `--credentials-file` / `GOOGLE_CREDENTIALS_FILE`: key file (default `credentials.json`).
//! - `--timezone` / `APP_TIMEZONE`: civil timezone for "today" (default `Asia/Tokyo`).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskbook", version, about = "Day-by-day task list stored in Google Sheets")]
struct Cli {
    /// Google Spreadsheet id (the long token in the spreadsheet URL)
    #[arg(long, env = "SPREADSHEET_ID", global = true)]
    spreadsheet_id: Option<String>,

    /// Service-account key as inline JSON; takes precedence over --credentials-file
    #[arg(long, env = "GOOGLE_CREDENTIALS_JSON", global = true, hide_env_values = true)]
    credentials_json: Option<String>,

    /// Path to the service-account key file
    #[arg(
        long,
        env = "GOOGLE_CREDENTIALS_FILE",
        default_value = "credentials.json",
        global = true
    )]
    credentials_file: PathBuf,

    /// IANA timezone deciding what "today" is
    #[arg(long, env = "APP_TIMEZONE", default_value = "Asia/Tokyo", global = true)]
    timezone: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the task list over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 5000)]
        port: u16,
        /// Address to bind
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,
        /// Keep todos in memory instead of Google Sheets (lost on exit)
        #[arg(long)]
        memory: bool,
    },
    /// Check the local setup (spreadsheet id, credentials, project files)
    Check,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port, host, memory } => cli::run_serve(&cli, host, *port, *memory),
        Commands::Check => cli::run_check(&cli),
    }
}
