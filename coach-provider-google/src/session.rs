//! Cached OAuth tokens for the signed-in Google account.
//!
//! Stored as TOML at `~/.config/coach/google/session.toml`, owner-only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app_config::{Credentials, base_dir};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    /// Primary calendar summary of the account
    #[serde(default)]
    account: String,
}

impl Session {
    pub fn from_tokens(tokens: &AccessToken, account: &str) -> Self {
        Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
            account: account.to_string(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn path() -> Result<PathBuf> {
        Ok(base_dir()?.join("session.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            anyhow::bail!("Not signed in to Google Calendar, run `coach auth` first");
        }
        Self::read_from(&path)
    }

    pub fn save(&self) -> Result<()> {
        self.write_to(&Self::path()?)
    }

    fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Google session from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse Google session from {}", path.display()))
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize session")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
        }

        debug!(path = %path.display(), "Saved Google session");
        Ok(())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn client(&self, creds: &Credentials) -> Client {
        Client::new(
            creds.client_id.clone(),
            creds.client_secret.clone(),
            String::new(),
            self.access_token.clone(),
            self.refresh_token.clone(),
        )
    }

    /// Trade the refresh token for a new access token and persist it.
    ///
    /// When Google rejects the refresh token the saved session is deleted, so
    /// the next run asks for `coach auth` instead of retrying a dead token.
    /// Transport failures leave the session in place.
    pub async fn refresh(&mut self, creds: &Credentials) -> Result<()> {
        self.refresh_at(creds, &Self::path()?).await
    }

    async fn refresh_at(&mut self, creds: &Credentials, path: &Path) -> Result<()> {
        info!(account = %self.account, "Access token expired, refreshing");

        let mut tokens = match self.client(creds).refresh_access_token().await {
            // An error body parses into an empty token
            Ok(tokens) if tokens.access_token.is_empty() => {
                return Err(discard(path, "no access token in the response"));
            }
            Ok(tokens) => tokens,
            Err(e) if is_rejected(&e.to_string()) => return Err(discard(path, &e.to_string())),
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to refresh Google session"));
            }
        };

        if tokens.refresh_token.is_empty() {
            tokens.refresh_token = self.refresh_token.clone();
        }

        *self = Session::from_tokens(&tokens, &self.account);
        self.write_to(path)
    }
}

/// Whether a refresh error means Google no longer accepts the refresh token.
fn is_rejected(message: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "invalid_grant",
        "invalid_client",
        "unauthorized_client",
        "400 bad request",
        "401 unauthorized",
    ];
    let message = message.to_ascii_lowercase();
    MARKERS.iter().any(|marker| message.contains(marker))
}

fn discard(path: &Path, reason: &str) -> anyhow::Error {
    warn!(path = %path.display(), reason, "Refresh rejected, removing saved session");
    if let Err(e) = std::fs::remove_file(path) {
        warn!(error = %e, "Could not remove saved session");
    }
    anyhow::anyhow!("Google rejected the saved session ({reason}), run `coach auth` again")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: i64) -> Session {
        Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            account: "me@example.com".into(),
        }
    }

    #[test]
    fn expiry_includes_margin() {
        assert!(session(-5).is_expired());
        assert!(session(EXPIRY_MARGIN_SECS / 2).is_expired());
        assert!(!session(3600).is_expired());
    }

    #[test]
    fn written_session_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google").join("session.toml");

        session(3600).write_to(&path).unwrap();
        let parsed = Session::read_from(&path).unwrap();

        assert_eq!(parsed.account(), "me@example.com");
        assert!(!parsed.is_expired());
    }

    #[cfg(unix)]
    #[test]
    fn written_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");

        session(3600).write_to(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_account_defaults_to_empty() {
        let parsed: Session = toml::from_str(
            "access_token = \"a\"\nrefresh_token = \"r\"\nexpires_at = \"2999-01-01T00:00:00Z\"\n",
        )
        .unwrap();

        assert_eq!(parsed.account(), "");
    }

    #[test]
    fn only_token_rejections_count_as_rejected() {
        assert!(is_rejected(
            r#"HTTP status client error (400 Bad Request) for url (https://oauth2.googleapis.com/token)"#
        ));
        assert!(is_rejected(r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#));
        assert!(!is_rejected(
            "error sending request for url (https://oauth2.googleapis.com/token): tcp connect error: Connection refused (os error 111)"
        ));
        assert!(!is_rejected("dns error: failed to lookup address information"));
    }

    #[test]
    fn discarding_removes_the_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        session(-5).write_to(&path).unwrap();

        let err = discard(&path, "invalid_grant");

        assert!(!path.exists());
        assert!(err.to_string().contains("coach auth"));
    }

    #[tokio::test]
    async fn unreachable_google_keeps_the_session() {
        // Nothing listens on the discard port, so every connection is refused
        unsafe { std::env::set_var("HTTPS_PROXY", "http://127.0.0.1:9") };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let mut expired = session(-5);
        expired.write_to(&path).unwrap();
        let creds = Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        };

        let result = expired.refresh_at(&creds, &path).await;

        assert!(result.is_err());
        assert!(path.exists());
        assert_eq!(Session::read_from(&path).unwrap().refresh_token, "refresh");
    }
}
