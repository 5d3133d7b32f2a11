//! Google service-account authentication.
//!
//! A service-account key (the JSON file downloaded from the Cloud Console) is
//! used to sign an RS256 JWT assertion, which is exchanged at the key's
//! `token_uri` for a short-lived bearer token. Tokens are cached until a
//! minute before they expire.
//!
//! The key comes either inline (`GOOGLE_CREDENTIALS_JSON`, for hosted
//! deployments where files are awkward) or from a file
//! (`GOOGLE_CREDENTIALS_FILE`, default `credentials.json`). Inline wins.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// OAuth scope granting read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for Sheets API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A fixed token. Used against mock servers and for pre-issued tokens.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Where the service-account key comes from.
#[derive(Debug, Clone)]
pub enum CredentialsSource {
    Inline(String),
    File(PathBuf),
}

impl CredentialsSource {
    /// Inline JSON when present and non-blank, otherwise the file path.
    pub fn resolve(inline: Option<&str>, file: &Path) -> Self {
        match inline.map(str::trim).filter(|s| !s.is_empty()) {
            Some(json) => CredentialsSource::Inline(json.to_string()),
            None => CredentialsSource::File(file.to_path_buf()),
        }
    }

    pub fn load(&self) -> Result<ServiceAccountKey> {
        match self {
            CredentialsSource::Inline(json) => ServiceAccountKey::from_json(json)
                .context("GOOGLE_CREDENTIALS_JSON is not a valid service-account key"),
            CredentialsSource::File(path) => ServiceAccountKey::from_file(path),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("credentials file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("{} is not a valid service-account key", path.display()))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Token source backed by a service-account key.
pub struct ServiceAccount {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    /// Fails early if the private key is not a usable RSA PEM.
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| anyhow!("service-account private key is unusable: {}", e))?;
        Ok(Self {
            key,
            encoding_key,
            http,
            cached: tokio::sync::Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed JWT assertion for the token endpoint.
    fn assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("token request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("token endpoint returned {}: {}", status, body);
        }
        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS as u64));
        debug!(expires_in = lifetime.as_secs(), "obtained access token");
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccount {
    async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_credentials_take_precedence() {
        let src = CredentialsSource::resolve(Some("{\"a\":1}"), Path::new("credentials.json"));
        assert!(matches!(src, CredentialsSource::Inline(_)));
        let src = CredentialsSource::resolve(Some("   "), Path::new("credentials.json"));
        assert!(matches!(src, CredentialsSource::File(_)));
        let src = CredentialsSource::resolve(None, Path::new("/etc/key.json"));
        assert!(matches!(src, CredentialsSource::File(p) if p == Path::new("/etc/key.json")));
    }

    #[test]
    fn missing_file_is_reported_by_path() {
        let err = CredentialsSource::File(PathBuf::from("/nonexistent/credentials.json"))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/credentials.json"));
    }

    #[test]
    fn key_without_token_uri_uses_google_default() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"a@b.iam.gserviceaccount.com","private_key":"x"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(key.private_key_id, None);
    }

    #[test]
    fn garbage_private_key_is_rejected() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"a@b.iam.gserviceaccount.com","private_key":"not a pem"}"#,
        )
        .unwrap();
        assert!(ServiceAccount::new(key, reqwest::Client::new()).is_err());
    }
}
