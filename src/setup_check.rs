//! # Setup Check — Pre-flight Diagnostics
//!
//! Backs `taskbook check`. Looks at the same inputs `serve` would use and
//! reports each one as `[OK]` or `[NG]`, without contacting Google.
//!
//! Blocking problems (no usable spreadsheet id, no loadable credentials)
//! make the report fail; a missing `.env` alone does not, since every value
//! can also come from the real environment.

use crate::config::usable_spreadsheet_id;
use crate::sheets::auth::CredentialsSource;
use std::fmt;
use std::path::{Path, PathBuf};

/// Project files looked for in the working directory.
pub const PROJECT_FILES: [(&str, &str); 2] = [
    (".env", "environment settings"),
    ("credentials.json", "service-account key"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine {
    pub ok: bool,
    pub message: String,
    /// Follow-up advice printed under the line.
    pub hint: Option<String>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub sections: Vec<(String, Vec<CheckLine>)>,
    /// Problems that will stop `serve` from starting.
    pub issues: Vec<String>,
    /// Service-account address the spreadsheet must be shared with.
    pub client_email: Option<String>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

fn ok(message: impl Into<String>) -> CheckLine {
    CheckLine {
        ok: true,
        message: message.into(),
        hint: None,
    }
}

fn ng(message: impl Into<String>, hint: Option<&str>) -> CheckLine {
    CheckLine {
        ok: false,
        message: message.into(),
        hint: hint.map(str::to_string),
    }
}

/// Run every check against `project_dir`.
///
/// A relative file credentials path is resolved against `project_dir`.
pub fn run(
    project_dir: &Path,
    spreadsheet_id: Option<&str>,
    credentials: &CredentialsSource,
) -> Report {
    let mut report = Report::default();

    let files = PROJECT_FILES
        .iter()
        .map(|(name, what)| {
            let line = format!("{:<20} {}", name, what);
            if project_dir.join(name).exists() {
                ok(line)
            } else {
                ng(line, None)
            }
        })
        .collect();
    report.sections.push(("Files".to_string(), files));

    let id_line = match usable_spreadsheet_id(spreadsheet_id) {
        Some(id) => ok(format!("SPREADSHEET_ID is set: {}", abbreviate(id, 20))),
        None => {
            report
                .issues
                .push("set SPREADSHEET_ID to the id of your spreadsheet".to_string());
            ng(
                "SPREADSHEET_ID is not set",
                Some("copy the id from the spreadsheet URL into .env"),
            )
        }
    };
    report
        .sections
        .push(("Spreadsheet".to_string(), vec![id_line]));

    let creds_line = check_credentials(project_dir, credentials, &mut report);
    report
        .sections
        .push(("Credentials".to_string(), vec![creds_line]));

    report
}

fn check_credentials(
    project_dir: &Path,
    credentials: &CredentialsSource,
    report: &mut Report,
) -> CheckLine {
    let (origin, raw) = match credentials {
        CredentialsSource::Inline(json) => ("GOOGLE_CREDENTIALS_JSON".to_string(), Ok(json.clone())),
        CredentialsSource::File(path) => {
            let path = resolve_path(project_dir, path);
            let origin = path.display().to_string();
            if !path.exists() {
                report
                    .issues
                    .push(format!("place the service-account key at {}", origin));
                return ng(
                    format!("{} not found", origin),
                    Some("download a JSON key from the Google Cloud Console"),
                );
            }
            let raw = std::fs::read_to_string(&path);
            (origin, raw)
        }
    };

    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            report.issues.push(format!("make {} readable", origin));
            return ng(format!("cannot read {}: {}", origin, e), None);
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(_) => {
            report.issues.push(format!("{} must contain JSON", origin));
            return ng(format!("{} is not JSON", origin), None);
        }
    };
    match value.get("client_email").and_then(|v| v.as_str()) {
        Some(email) => {
            report.client_email = Some(email.to_string());
            CheckLine {
                ok: true,
                message: format!("{} is a service-account key", origin),
                hint: Some(format!(
                    "share the spreadsheet with {} as an editor",
                    email
                )),
            }
        }
        None => {
            report
                .issues
                .push(format!("{} is not a service-account key", origin));
            ng(
                format!("{} has no client_email", origin),
                Some("download a service-account key, not an OAuth client secret"),
            )
        }
    }
}

fn resolve_path(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

fn abbreviate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, lines) in &self.sections {
            writeln!(f, "{}", title)?;
            for line in lines {
                let mark = if line.ok { "[OK]" } else { "[NG]" };
                writeln!(f, "  {} {}", mark, line.message)?;
                if let Some(hint) = &line.hint {
                    writeln!(f, "       -> {}", hint)?;
                }
            }
            writeln!(f)?;
        }
        if self.is_ok() {
            writeln!(f, "[OK] setup looks complete; start with `taskbook serve`")
        } else {
            writeln!(f, "Problems to fix before `taskbook serve`:")?;
            for issue in &self.issues {
                writeln!(f, "  - {}", issue)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = r#"{"type":"service_account","client_email":"bot@proj.iam.gserviceaccount.com"}"#;

    #[test]
    fn complete_setup_passes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "SPREADSHEET_ID=abc\n").unwrap();
        std::fs::write(dir.path().join("credentials.json"), KEY).unwrap();

        let report = run(
            dir.path(),
            Some("abc"),
            &CredentialsSource::File(PathBuf::from("credentials.json")),
        );
        assert!(report.is_ok(), "{}", report);
        assert_eq!(
            report.client_email.as_deref(),
            Some("bot@proj.iam.gserviceaccount.com")
        );
        assert!(report.to_string().contains("[OK] setup looks complete"));
    }

    #[test]
    fn placeholder_id_and_missing_key_are_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(
            dir.path(),
            Some("your_spreadsheet_id_here"),
            &CredentialsSource::File(PathBuf::from("credentials.json")),
        );
        assert_eq!(report.issues.len(), 2);
        let text = report.to_string();
        assert!(text.contains("[NG] SPREADSHEET_ID is not set"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn key_without_client_email_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(
            dir.path(),
            Some("abc"),
            &CredentialsSource::Inline(r#"{"installed":{}}"#.to_string()),
        );
        assert!(!report.is_ok());
        assert!(report.to_string().contains("has no client_email"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("credentials.json"), "{not json").unwrap();
        let report = run(
            dir.path(),
            Some("abc"),
            &CredentialsSource::File(PathBuf::from("credentials.json")),
        );
        assert!(report.to_string().contains("is not JSON"));
    }

    #[test]
    fn missing_env_file_alone_is_not_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(dir.path(), Some("abc"), &CredentialsSource::Inline(KEY.to_string()));
        assert!(report.is_ok());
        assert!(report.to_string().contains("[NG] .env"));
    }

    #[test]
    fn long_ids_are_abbreviated() {
        assert_eq!(abbreviate("abc", 20), "abc");
        assert_eq!(abbreviate("0123456789abcdefghijXYZ", 20), "0123456789abcdefghij...");
    }
}
