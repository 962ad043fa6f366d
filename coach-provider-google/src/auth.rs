//! `coach auth`: installed-app consent with a loopback redirect.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use google_calendar::Client;
use google_calendar::types::MinAccessRole;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::app_config::{self, Credentials};
use crate::session::Session;

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

const CALLBACK_PORT: u16 = 8085;
const CALLBACK_PATH: &str = "/callback";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What Google sends back to the redirect URI.
#[derive(Debug, PartialEq, Eq)]
struct AuthCode {
    code: String,
    state: String,
}

/// Local HTTP listener that waits for the OAuth redirect.
struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    async fn bind() -> Result<Self> {
        Self::bind_port(CALLBACK_PORT).await
    }

    async fn bind_port(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Port {port} is busy, cannot receive the OAuth redirect"))?;
        Ok(CallbackListener { listener })
    }

    fn redirect_uri() -> String {
        format!("http://localhost:{CALLBACK_PORT}{CALLBACK_PATH}")
    }

    /// Serve connections until one requests the callback path, and answer it
    /// with a small page. Preconnects and other paths (`/favicon.ico`) are
    /// skipped.
    async fn receive(self) -> Result<AuthCode> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("OAuth redirect never arrived")?;

            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            match timeout(REQUEST_TIMEOUT, reader.read_line(&mut request_line)).await {
                Ok(Ok(n)) if n > 0 => {}
                Ok(Ok(_)) => {
                    debug!(%peer, "Connection closed without a request");
                    continue;
                }
                Ok(Err(e)) => {
                    debug!(%peer, error = %e, "Could not read request");
                    continue;
                }
                Err(_) => {
                    debug!(%peer, "No request before timeout");
                    continue;
                }
            }

            let target = request_line.split_whitespace().nth(1).unwrap_or_default();
            let mut stream = reader.into_inner();

            if !is_callback(target) {
                debug!(%peer, target, "Ignoring request outside the callback path");
                respond(&mut stream, "404 Not Found", "").await;
                continue;
            }

            info!(%peer, "OAuth redirect received");
            let result = parse_callback(target);
            let page = match &result {
                Ok(_) => "<h1>Signed in</h1><p>Return to the terminal.</p>".to_string(),
                Err(e) => format!("<h1>Sign-in failed</h1><p>{e}</p>"),
            };
            respond(&mut stream, "200 OK", &page).await;

            return result;
        }
    }
}

async fn respond(stream: &mut TcpStream, status: &str, page: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
        page.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(error = %e, "Could not answer the OAuth redirect");
    }
    stream.shutdown().await.ok();
}

fn redirect_url(target: &str) -> Result<url::Url> {
    url::Url::parse("http://localhost")?
        .join(target)
        .with_context(|| format!("Malformed OAuth redirect '{target}'"))
}

fn is_callback(target: &str) -> bool {
    redirect_url(target).is_ok_and(|url| url.path() == CALLBACK_PATH)
}

/// Read `code` and `state` from a redirect target like `/callback?code=..&state=..`.
fn parse_callback(target: &str) -> Result<AuthCode> {
    let url = redirect_url(target)?;

    if url.path() != CALLBACK_PATH {
        bail!("Unexpected OAuth redirect path '{}'", url.path());
    }

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => bail!("Google denied access: {value}"),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(AuthCode {
        code: code.ok_or_else(|| anyhow!("OAuth redirect carried no code"))?,
        state: state.ok_or_else(|| anyhow!("OAuth redirect carried no state"))?,
    })
}

fn client_for(creds: &Credentials, access_token: String, refresh_token: String) -> Client {
    Client::new(
        creds.client_id.clone(),
        creds.client_secret.clone(),
        CallbackListener::redirect_uri(),
        access_token,
        refresh_token,
    )
}

/// The account name is the summary of its primary calendar.
async fn primary_account(client: &Client) -> Result<String> {
    let calendars = client
        .calendar_list()
        .list_all(MinAccessRole::default(), false, false)
        .await
        .context("Failed to list calendars of the new session")?
        .body;

    calendars
        .into_iter()
        .find(|cal| cal.primary)
        .map(|cal| cal.summary)
        .ok_or_else(|| anyhow!("Account has no primary calendar"))
}

/// Run the consent flow and save the session. Returns the account name.
pub async fn authenticate() -> Result<String> {
    let creds = app_config::load()?;
    let listener = CallbackListener::bind().await?;

    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let mut client = client_for(&creds, String::new(), String::new());
    let consent_url = client.user_consent_url(&scopes);

    eprintln!("\nOpen this URL in your browser to sign in:\n\n{consent_url}\n");
    if open::that(&consent_url).is_err() {
        eprintln!("(Browser did not open, copy the URL above)");
    }

    let AuthCode { code, state } = listener.receive().await?;

    let tokens = client
        .get_access_token(&code, &state)
        .await
        .context("Failed to exchange authorization code")?;

    let authed = client_for(&creds, tokens.access_token.clone(), tokens.refresh_token.clone());
    let account = primary_account(&authed).await?;

    Session::from_tokens(&tokens, &account).save()?;
    info!(%account, "Signed in to Google Calendar");

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_code_and_state() {
        let auth = parse_callback("/callback?state=xyz&code=4%2F0Ab&scope=calendar").unwrap();

        assert_eq!(
            auth,
            AuthCode {
                code: "4/0Ab".into(),
                state: "xyz".into()
            }
        );
    }

    #[test]
    fn denied_consent_is_an_error() {
        let err = parse_callback("/callback?error=access_denied").unwrap_err();

        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn incomplete_redirects_are_rejected() {
        assert!(parse_callback("/callback?state=xyz").is_err());
        assert!(parse_callback("/favicon.ico").is_err());
        assert!(parse_callback("").is_err());
    }

    #[test]
    fn redirect_uri_points_at_loopback() {
        assert_eq!(CallbackListener::redirect_uri(), "http://localhost:8085/callback");
    }

    async fn request(addr: std::net::SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
            .await
            .unwrap();
        response
    }

    #[tokio::test]
    async fn waits_past_unrelated_requests() {
        let listener = CallbackListener::bind_port(0).await.unwrap();
        let addr = listener.listener.local_addr().unwrap();
        let received = tokio::spawn(listener.receive());

        // Preconnect that never sends anything
        drop(TcpStream::connect(addr).await.unwrap());
        let favicon = request(addr, "/favicon.ico").await;
        let callback = request(addr, "/callback?code=abc&state=xyz").await;

        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(callback.starts_with("HTTP/1.1 200"));
        assert!(callback.contains("Signed in"));
        assert_eq!(
            received.await.unwrap().unwrap(),
            AuthCode {
                code: "abc".into(),
                state: "xyz".into()
            }
        );
    }

    #[tokio::test]
    async fn denied_callback_ends_the_wait() {
        let listener = CallbackListener::bind_port(0).await.unwrap();
        let addr = listener.listener.local_addr().unwrap();
        let received = tokio::spawn(listener.receive());

        let page = request(addr, "/callback?error=access_denied").await;

        assert!(page.contains("Sign-in failed"));
        assert!(received.await.unwrap().is_err());
    }

    #[test]
    fn only_the_callback_path_counts() {
        assert!(is_callback("/callback?code=a&state=b"));
        assert!(!is_callback("/favicon.ico"));
        assert!(!is_callback(""));
    }
}
