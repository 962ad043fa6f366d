//! OAuth client credentials for the Google backend.
//!
//! Looked up in order:
//! 1. `COACH_GOOGLE_CLIENT_ID` / `COACH_GOOGLE_CLIENT_SECRET`
//! 2. `~/.config/coach/google/app_config.toml`
//! 3. `~/.config/coach/google/credentials.json` as downloaded from the Google
//!    Cloud console (`installed` or `web` client)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

const CLIENT_ID_VAR: &str = "COACH_GOOGLE_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "COACH_GOOGLE_CLIENT_SECRET";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

/// Directory holding credentials and the OAuth session.
pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("coach")
        .join("google"))
}

pub fn load() -> Result<Credentials> {
    if let Some(creds) = from_env() {
        debug!("Using Google client credentials from environment");
        return Ok(creds);
    }
    load_from_dir(&base_dir()?)
}

fn from_env() -> Option<Credentials> {
    let client_id = std::env::var(CLIENT_ID_VAR).ok()?;
    let client_secret = std::env::var(CLIENT_SECRET_VAR).ok()?;
    Some(Credentials {
        client_id,
        client_secret,
    })
}

fn load_from_dir(dir: &Path) -> Result<Credentials> {
    let toml_path = dir.join("app_config.toml");
    if toml_path.exists() {
        let contents = read(&toml_path)?;
        return toml::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", toml_path.display()));
    }

    let json_path = dir.join("credentials.json");
    if json_path.exists() {
        return parse_client_secrets(&read(&json_path)?)
            .with_context(|| format!("Failed to parse credentials from {}", json_path.display()));
    }

    anyhow::bail!(
        "Google credentials not found.\n\n\
        Set {CLIENT_ID_VAR} and {CLIENT_SECRET_VAR}, save the OAuth client JSON as {}, \
        or create {} with:\n\n\
        client_id = \"your-client-id.apps.googleusercontent.com\"\n\
        client_secret = \"your-client-secret\"",
        json_path.display(),
        toml_path.display()
    )
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials from {}", path.display()))
}

fn parse_client_secrets(contents: &str) -> Result<Credentials> {
    let file: ClientSecretsFile = serde_json::from_str(contents)?;
    file.installed
        .or(file.web)
        .context("Expected an \"installed\" or \"web\" OAuth client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_console_download() {
        let json = r#"{"installed":{"client_id":"id.apps.googleusercontent.com","project_id":"coach","client_secret":"s3cret","redirect_uris":["http://localhost"]}}"#;

        let creds = parse_client_secrets(json).unwrap();

        assert_eq!(creds.client_id, "id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "s3cret");
    }

    #[test]
    fn console_download_without_client_is_rejected() {
        assert!(parse_client_secrets(r#"{"service_account":{}}"#).is_err());
    }

    #[test]
    fn toml_file_wins_over_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app_config.toml"),
            "client_id = \"from-toml\"\nclient_secret = \"t\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("credentials.json"),
            r#"{"web":{"client_id":"from-json","client_secret":"j"}}"#,
        )
        .unwrap();

        assert_eq!(load_from_dir(dir.path()).unwrap().client_id, "from-toml");
    }

    #[test]
    fn missing_credentials_explain_setup() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_from_dir(dir.path()).unwrap_err().to_string();

        assert!(err.contains(CLIENT_ID_VAR));
        assert!(err.contains("app_config.toml"));
    }
}
